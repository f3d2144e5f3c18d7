//! Named-field objects

use std::collections::{BTreeMap, BTreeSet};

use super::combinations::bounded_product;
use super::{Pattern, Visited};
use crate::error::ContractError;
use crate::resolver::Resolver;
use crate::result::{Failure, MatchResult};
use crate::row::Row;
use crate::value::Value;

/// One declared object key.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub optional: bool,
    pub pattern: Pattern,
}

impl Field {
    #[must_use]
    pub fn required(name: impl Into<String>, pattern: Pattern) -> Self {
        Self {
            name: name.into(),
            optional: false,
            pattern,
        }
    }

    #[must_use]
    pub fn optional(name: impl Into<String>, pattern: Pattern) -> Self {
        Self {
            name: name.into(),
            optional: true,
            pattern,
        }
    }
}

/// A JSON object with declared keys, each mandatory or optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectPattern {
    fields: Vec<Field>,
    type_alias: Option<String>,
}

impl ObjectPattern {
    /// # Errors
    ///
    /// `Definition` when a key is declared twice (for instance both
    /// mandatory and optional).
    pub fn new(fields: Vec<Field>) -> Result<Self, ContractError> {
        let mut seen = BTreeSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(ContractError::Definition(format!(
                    "key \"{}\" is declared more than once",
                    field.name
                )));
            }
        }
        Ok(Self {
            fields,
            type_alias: None,
        })
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub(crate) fn type_alias(&self) -> Option<&str> {
        self.type_alias.as_deref()
    }

    pub(crate) fn with_type_alias(mut self, alias: &str) -> Self {
        self.type_alias = Some(alias.to_string());
        self
    }

    fn rebuilt(&self, fields: Vec<Field>) -> Pattern {
        Pattern::Object(Self {
            fields,
            type_alias: self.type_alias.clone(),
        })
    }

    /// Derived resolver for recursing into this object's fields.
    fn inside(&self, resolver: &Resolver) -> Resolver {
        match &self.type_alias {
            Some(alias) if !resolver.on_stack(alias) => resolver.pushing(alias),
            _ => resolver.clone(),
        }
    }

    // ── matches ──

    pub(crate) fn matches(&self, value: &Value, resolver: &Resolver) -> MatchResult {
        let Some(actual) = value.as_object() else {
            return resolver.mismatch("json object", value);
        };
        let key_check = resolver.key_check();
        let mut failures: Vec<Failure> = Vec::new();

        for field in &self.fields {
            match actual.get(&field.name) {
                Some(v) => {
                    if let Some(f) = resolver
                        .matches_pattern(&field.name, &field.pattern, v)
                        .into_failure()
                    {
                        failures.push(f.breadcrumb(&field.name));
                    }
                }
                None if !field.optional && key_check.check_missing => failures.push(
                    Failure::new(resolver.messages().missing_key("key", &field.name))
                        .breadcrumb(&field.name),
                ),
                None => {}
            }
        }

        if !key_check.allow_unexpected {
            for key in actual.keys().filter(|k| self.field(k).is_none()) {
                failures.push(
                    Failure::new(resolver.messages().unexpected_key("key", key)).breadcrumb(key),
                );
            }
        }

        MatchResult::from_failures(failures)
    }

    // ── generate ──

    pub(crate) fn generate(&self, resolver: &Resolver) -> Result<Value, ContractError> {
        let build = |r: &Resolver| -> Result<Value, ContractError> {
            let mut out = BTreeMap::new();
            for field in &self.fields {
                let value = if field.optional {
                    r.through_nullable(|r| r.generate(&field.name, &field.pattern))?
                } else {
                    Some(r.generate(&field.name, &field.pattern)?)
                };
                if let Some(value) = value {
                    out.insert(field.name.clone(), value);
                }
            }
            Ok(Value::Object(out))
        };
        match &self.type_alias {
            Some(alias) => resolver.entering(alias, build),
            None => build(resolver),
        }
    }

    // ── new_based_on ──

    pub(crate) fn new_based_on(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Pattern>, ContractError> {
        let inner = self.inside(resolver);
        let row_applies = self.fields.iter().any(|f| row.contains(&f.name));
        let examples = if row_applies {
            self.variants(row, &inner)?
        } else {
            Vec::new()
        };
        resolver
            .strategy()
            .positive_variants(examples, || self.variants(&Row::default(), &inner), resolver)
    }

    /// "All present" plus "each optional field (without an example) absent",
    /// each over a bounded product of the fields' own variants. Optional keys
    /// stay optional so a recursive reference below them can still be cut.
    fn variants(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Pattern>, ContractError> {
        let limit = resolver.max_combinations();
        let mut options: Vec<Vec<Pattern>> = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            options.push(match row.get(&field.name) {
                Some(example) => vec![Pattern::Exact(super::ExactValuePattern::new(
                    field.pattern.example_value(&field.name, example, resolver)?,
                ))],
                None => field.pattern.new_based_on(row, resolver)?,
            });
        }

        let mut variants: Vec<Pattern> = bounded_product(&options, limit)
            .into_iter()
            .map(|combination| {
                self.rebuilt(
                    self.fields
                        .iter()
                        .zip(combination)
                        .map(|(field, pattern)| Field {
                            name: field.name.clone(),
                            optional: field.optional,
                            pattern,
                        })
                        .collect(),
                )
            })
            .collect();

        for (absent, field) in self.fields.iter().enumerate() {
            if variants.len() >= limit {
                break;
            }
            if !field.optional || row.contains(&field.name) {
                continue;
            }
            let fields = self
                .fields
                .iter()
                .zip(&options)
                .enumerate()
                .filter(|(i, _)| *i != absent)
                .filter_map(|(_, (f, choices))| {
                    choices.first().map(|p| Field {
                        name: f.name.clone(),
                        optional: f.optional,
                        pattern: p.clone(),
                    })
                })
                .collect();
            variants.push(self.rebuilt(fields));
        }
        Ok(variants)
    }

    // ── negative_based_on ──

    /// Negate one field at a time; also drop each mandatory field in turn.
    pub(crate) fn negative_based_on(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Pattern>, ContractError> {
        let inner = self.inside(resolver);
        let limit = resolver.max_combinations();
        let baseline: Vec<Field> = self
            .fields
            .iter()
            .map(|field| {
                Ok(match row.get(&field.name) {
                    Some(example) => Field {
                        pattern: Pattern::Exact(super::ExactValuePattern::new(
                            field.pattern.example_value(&field.name, example, &inner)?,
                        )),
                        ..field.clone()
                    },
                    None => field.clone(),
                })
            })
            .collect::<Result<_, ContractError>>()?;

        let mut negatives = Vec::new();
        for (index, field) in self.fields.iter().enumerate() {
            for negative in field.pattern.negative_based_on(row, &inner)? {
                if negatives.len() >= limit {
                    return Ok(negatives);
                }
                let mut fields = baseline.clone();
                fields[index] = Field::required(&field.name, negative);
                negatives.push(self.rebuilt(fields));
            }
            if !field.optional && negatives.len() < limit {
                let fields = baseline
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != index)
                    .map(|(_, f)| f.clone())
                    .collect();
                negatives.push(self.rebuilt(fields));
            }
        }
        Ok(negatives)
    }

    // ── encompasses ──

    /// Every mandatory key here must be mandatory and compatible in `other`.
    /// Keys only `other` declares are always tolerated, whatever the key
    /// check of either resolver.
    pub(crate) fn encompasses(
        &self,
        other: &ObjectPattern,
        this_resolver: &Resolver,
        other_resolver: &Resolver,
        visited: &mut Visited,
    ) -> MatchResult {
        let messages = this_resolver.messages();
        let mut failures = Vec::new();

        for field in &self.fields {
            match other.field(&field.name) {
                Some(theirs) if theirs.optional && !field.optional => failures.push(
                    Failure::new(messages.missing_key("key", &field.name)).breadcrumb(&field.name),
                ),
                Some(theirs) => {
                    if let Some(f) = field
                        .pattern
                        .encompasses(&theirs.pattern, this_resolver, other_resolver, visited)
                        .into_failure()
                    {
                        failures.push(f.breadcrumb(&field.name));
                    }
                }
                None if !field.optional => failures.push(
                    Failure::new(messages.missing_key("key", &field.name)).breadcrumb(&field.name),
                ),
                None => {}
            }
        }

        MatchResult::from_failures(failures)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::pattern_from_json;
    use crate::strategy::GenerationStrategy;
    use serde_json::json;

    fn object(json: serde_json::Value) -> ObjectPattern {
        match pattern_from_json(&json).unwrap() {
            Pattern::Object(o) => o,
            other => panic!("not an object: {other:?}"),
        }
    }

    #[test]
    fn duplicate_keys_are_rejected() {
        let fields = vec![
            Field::required("a", Pattern::string()),
            Field::optional("a", Pattern::string()),
        ];
        assert!(ObjectPattern::new(fields).is_err());
    }

    #[test]
    fn missing_and_unexpected_keys() {
        let pattern = object(json!({"id": "(number)"}));
        let resolver = Resolver::default();
        let value = Value::from(json!({"extra": 1}));
        let report = pattern.matches(&value, &resolver).report();
        assert!(report.contains("Expected key named \"id\" was missing"));
        assert!(report.contains("Key named \"extra\" was unexpected"));

        let relaxed = resolver.with_key_check(crate::resolver::KeyCheck::default().allowing_unexpected());
        let report = pattern.matches(&value, &relaxed).report();
        assert!(!report.contains("extra"));
    }

    #[test]
    fn optional_fields_vary_one_at_a_time() {
        let pattern = object(json!({"a": "(string)", "b?": "(string)", "c?": "(string)"}));
        let variants = pattern.new_based_on(&Row::default(), &Resolver::default()).unwrap();
        // all present, b absent, c absent: not the 2^2 powerset
        assert_eq!(variants.len(), 3);
        let key_counts: Vec<usize> = variants
            .iter()
            .map(|v| match v {
                Pattern::Object(o) => o.fields().len(),
                _ => 0,
            })
            .collect();
        assert_eq!(key_counts, vec![3, 2, 2]);
    }

    #[test]
    fn combinations_are_bounded() {
        let mut doc = serde_json::Map::new();
        for i in 0..12 {
            doc.insert(format!("f{i}"), json!("(boolean?)"));
        }
        let pattern = object(serde_json::Value::Object(doc));
        let resolver = Resolver::default().with_max_combinations(10);
        let variants = pattern.new_based_on(&Row::default(), &resolver).unwrap();
        assert_eq!(variants.len(), 10);
    }

    #[test]
    fn row_examples_become_exact_values() {
        let pattern = object(json!({"id": "(number)", "name": "(string)"}));
        let row = Row::named("r").with("id", "10");
        let variants = pattern.new_based_on(&row, &Resolver::default()).unwrap();
        assert_eq!(variants.len(), 1);
        let value = variants[0].generate(&Resolver::default()).unwrap();
        assert_eq!(value.select("id"), Some(&Value::from(10)));
    }

    #[test]
    fn generative_mode_adds_vanilla_variant() {
        let pattern = object(json!({"id": "(number)"}));
        let row = Row::named("r").with("id", "10");
        let resolver =
            Resolver::default().with_strategy(GenerationStrategy::Generative { positive_only: false });
        let variants = pattern.new_based_on(&row, &resolver).unwrap();
        assert_eq!(variants.len(), 2);
    }

    #[test]
    fn invalid_row_example_is_an_error() {
        let pattern = object(json!({"id": "(number)"}));
        let row = Row::named("r").with("id", "ten");
        assert!(matches!(
            pattern.new_based_on(&row, &Resolver::default()),
            Err(ContractError::InvalidExample { .. })
        ));
    }

    #[test]
    fn negatives_touch_one_field_at_a_time() {
        let pattern = object(json!({"id": "(number)", "name": "(string)"}));
        let resolver = Resolver::default();
        let negatives = pattern.negative_based_on(&Row::default(), &resolver).unwrap();
        // 3 sibling kinds each, plus each mandatory key removed
        assert_eq!(negatives.len(), 8);
        for negative in negatives {
            let value = negative.generate(&resolver).unwrap();
            let result = pattern.matches(&value, &resolver);
            assert_eq!(result.failure_ref().map(Failure::leaf_count), Some(1));
        }
    }

    #[test]
    fn extra_fields_in_other_are_tolerated_by_default() {
        let resolver = Resolver::default();
        let older = object(json!({"id": "(number)"}));
        let newer = object(json!({"id": "(number)", "email": "(string)"}));
        let result = older.encompasses(&newer, &resolver, &resolver, &mut Visited::new());
        assert!(result.is_success(), "{}", result.report());
        assert!(!newer.encompasses(&older, &resolver, &resolver, &mut Visited::new()).is_success());
    }
}
