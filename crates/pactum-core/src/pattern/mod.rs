//! Pattern: the schema node
//!
//! A closed sum of pattern kinds sharing one interface:
//!
//! - `matches`: check a value, reporting every mismatch at a level
//! - `generate`: produce a conforming value
//! - `new_based_on`: positive variants honouring example rows
//! - `negative_based_on`: variants that violate the schema in one place
//! - `encompasses`: every value `other` accepts is accepted by `self`
//! - `parse`: read the text form of a value (query, header, example cell)

mod any;
pub(crate) mod combinations;
mod deferred;
mod enumeration;
mod exact;
mod format;
mod list;
mod object;
mod scalar;
mod shorthand;

use std::collections::{BTreeSet, HashSet};

pub use any::AnyPattern;
pub use deferred::DeferredPattern;
pub use enumeration::{EnumPattern, INVALID_ENUM_VALUE};
pub use exact::ExactValuePattern;
pub use format::{FormatKind, FormatPattern};
pub use list::{ListPattern, TuplePattern};
pub use object::{Field, ObjectPattern};
pub use scalar::{NumberPattern, StringPattern};
pub use shorthand::{parse_pattern, pattern_from_json};

use crate::error::ContractError;
use crate::resolver::Resolver;
use crate::result::MatchResult;
use crate::row::Row;
use crate::value::Value;

/// Pattern pairs whose `encompasses` comparison is in progress on the
/// current call stack. A repeat short-circuits to success so
/// self-referential schemas terminate; pairs are removed once compared.
pub type Visited = HashSet<(String, String)>;

/// A schema node.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Pattern {
    String(StringPattern),
    Number(NumberPattern),
    Boolean,
    Null,
    Format(FormatPattern),
    Enum(EnumPattern),
    Object(ObjectPattern),
    List(ListPattern),
    Tuple(TuplePattern),
    AnyOf(AnyPattern),
    Deferred(DeferredPattern),
    Exact(ExactValuePattern),
    Anything,
    #[default]
    NoBody,
}

impl Pattern {
    // ── Constructors ──

    #[must_use]
    pub fn string() -> Self {
        Self::String(StringPattern::default())
    }

    #[must_use]
    pub fn number() -> Self {
        Self::Number(NumberPattern::default())
    }

    #[must_use]
    pub fn integer() -> Self {
        Self::Number(NumberPattern::integer())
    }

    #[must_use]
    pub fn format(kind: FormatKind) -> Self {
        Self::Format(FormatPattern::new(kind))
    }

    #[must_use]
    pub fn exact(value: impl Into<Value>) -> Self {
        Self::Exact(ExactValuePattern::new(value.into()))
    }

    #[must_use]
    pub fn deferred(name: impl Into<String>) -> Self {
        Self::Deferred(DeferredPattern::new(name))
    }

    #[must_use]
    pub fn list(element: Pattern) -> Self {
        Self::List(ListPattern::new(element))
    }

    /// `inner` or null.
    #[must_use]
    pub fn nullable(inner: Pattern) -> Self {
        if inner.is_nullable() {
            return inner;
        }
        Self::AnyOf(AnyPattern::new(vec![Self::Null, inner]))
    }

    // ── Metadata ──

    /// Name used in mismatch messages.
    #[must_use]
    pub fn type_name(&self) -> String {
        match self {
            Self::String(_) => "string".to_string(),
            Self::Number(n) => n.type_name().to_string(),
            Self::Boolean => "boolean".to_string(),
            Self::Null => "null".to_string(),
            Self::Format(f) => f.kind().name().to_string(),
            Self::Enum(e) => e.type_name(),
            Self::Object(o) => o
                .type_alias()
                .map_or_else(|| "json object".to_string(), |a| format!("({a})")),
            Self::List(l) => l
                .type_alias()
                .map_or_else(|| "json array".to_string(), |a| format!("({a})")),
            Self::Tuple(_) => "json array".to_string(),
            Self::AnyOf(a) => a.type_name(),
            Self::Deferred(d) => format!("({})", d.name()),
            Self::Exact(e) => e.value().display_value(),
            Self::Anything => "anything".to_string(),
            Self::NoBody => "no body".to_string(),
        }
    }

    /// Schema name, when this node stands for a named type.
    #[must_use]
    pub fn type_alias(&self) -> Option<&str> {
        match self {
            Self::Object(o) => o.type_alias(),
            Self::List(l) => l.type_alias(),
            Self::AnyOf(a) => a.type_alias(),
            Self::Enum(e) => e.type_alias(),
            Self::Deferred(d) => Some(d.name()),
            _ => None,
        }
    }

    /// Attach a schema name to composite nodes; scalars are returned as is.
    #[must_use]
    pub fn with_type_alias(self, alias: &str) -> Self {
        match self {
            Self::Object(o) => Self::Object(o.with_type_alias(alias)),
            Self::List(l) => Self::List(l.with_type_alias(alias)),
            Self::AnyOf(a) => Self::AnyOf(a.with_type_alias(alias)),
            Self::Enum(e) => Self::Enum(e.with_type_alias(alias)),
            other => other,
        }
    }

    #[must_use]
    pub fn is_nullable(&self) -> bool {
        match self {
            Self::Null => true,
            Self::AnyOf(a) => a.is_nullable(),
            _ => false,
        }
    }

    /// Names of every deferred reference in this tree, without resolving them.
    #[must_use]
    pub fn references(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references(&self, names: &mut BTreeSet<String>) {
        match self {
            Self::Deferred(d) => {
                names.insert(d.name().to_string());
            }
            Self::Object(o) => o.fields().iter().for_each(|f| f.pattern.collect_references(names)),
            Self::List(l) => l.element().collect_references(names),
            Self::Tuple(t) => t.elements().iter().for_each(|e| e.collect_references(names)),
            Self::AnyOf(a) => a.branches().iter().for_each(|b| b.collect_references(names)),
            _ => {}
        }
    }

    // ── Operations ──

    /// Check `value` against this pattern.
    #[must_use]
    pub fn matches(&self, value: &Value, resolver: &Resolver) -> MatchResult {
        if resolver.is_mock_mode() {
            if let Some(result) = self.matches_stub_token(value, resolver) {
                return result;
            }
        }
        match self {
            Self::String(s) => s.matches(value, resolver),
            Self::Number(n) => n.matches(value, resolver),
            Self::Boolean => match value {
                Value::Boolean(_) => MatchResult::success(),
                other => resolver.mismatch("boolean", other),
            },
            Self::Null => match value {
                Value::Null => MatchResult::success(),
                other => resolver.mismatch("null", other),
            },
            Self::Format(f) => f.matches(value, resolver),
            Self::Enum(e) => e.matches(value, resolver),
            Self::Object(o) => o.matches(value, resolver),
            Self::List(l) => l.matches(value, resolver),
            Self::Tuple(t) => t.matches(value, resolver),
            Self::AnyOf(a) => a.matches(value, resolver),
            Self::Deferred(d) => d.matches(value, resolver),
            Self::Exact(e) => e.matches(value, resolver),
            Self::Anything => MatchResult::success(),
            Self::NoBody => match value {
                Value::NoBody => MatchResult::success(),
                Value::String(s) if s.is_empty() => MatchResult::success(),
                other => resolver.mismatch("no body", other),
            },
        }
    }

    /// Stub values may carry a type token such as `"(number)"` instead of a
    /// concrete value; the token matches when this pattern encompasses it.
    fn matches_stub_token(&self, value: &Value, resolver: &Resolver) -> Option<MatchResult> {
        let Value::String(text) = value else {
            return None;
        };
        if !(text.starts_with('(') && text.ends_with(')')) {
            return None;
        }
        if matches!(self, Self::String(_) | Self::Anything | Self::Exact(_)) {
            return None;
        }
        let token = parse_pattern(text).ok()?;
        Some(self.encompasses(&token, resolver, resolver, &mut Visited::new()))
    }

    /// Produce a conforming value.
    ///
    /// # Errors
    ///
    /// Contract errors: unknown types, non-terminating cycles, unsatisfiable
    /// constraints.
    pub fn generate(&self, resolver: &Resolver) -> Result<Value, ContractError> {
        let mut rng = rand::thread_rng();
        match self {
            Self::String(s) => s.generate(&mut rng),
            Self::Number(n) => Ok(n.generate(&mut rng)),
            Self::Boolean => Ok(Value::Boolean(rand::Rng::gen_bool(&mut rng, 0.5))),
            Self::Null => Ok(Value::Null),
            Self::Format(f) => Ok(f.generate(&mut rng)),
            Self::Enum(e) => e.generate(&mut rng),
            Self::Object(o) => o.generate(resolver),
            Self::List(l) => l.generate(resolver),
            Self::Tuple(t) => t.generate(resolver),
            Self::AnyOf(a) => a.generate(resolver),
            Self::Deferred(d) => d.generate(resolver),
            Self::Exact(e) => Ok(e.value().clone()),
            Self::Anything => Ok(Value::String(crate::datagen::random_alnum(&mut rng, 8))),
            Self::NoBody => Ok(Value::NoBody),
        }
    }

    /// Positive variants honouring the example values in `row`.
    ///
    /// # Errors
    ///
    /// Invalid examples and other contract errors.
    pub fn new_based_on(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Pattern>, ContractError> {
        match self {
            Self::Enum(e) => Ok(e.new_based_on()),
            Self::Object(o) => o.new_based_on(row, resolver),
            Self::List(l) => l.new_based_on(row, resolver),
            Self::Tuple(t) => t.new_based_on(row, resolver),
            Self::AnyOf(a) => a.new_based_on(row, resolver),
            Self::Deferred(d) => d.new_based_on(row, resolver),
            other => Ok(vec![other.clone()]),
        }
    }

    /// Variants that violate this pattern in exactly one place.
    ///
    /// # Errors
    ///
    /// Invalid examples and other contract errors.
    pub fn negative_based_on(
        &self,
        row: &Row,
        resolver: &Resolver,
    ) -> Result<Vec<Pattern>, ContractError> {
        Ok(match self {
            Self::String(s) => s.negative_based_on(),
            Self::Number(n) => n.negative_based_on(),
            Self::Boolean => vec![Self::Null, Self::number(), Self::string()],
            Self::Format(f) => f.negative_based_on(),
            Self::Enum(e) => e.negative_based_on(),
            Self::Object(o) => o.negative_based_on(row, resolver)?,
            Self::List(l) => l.negative_based_on(row, resolver)?,
            Self::Tuple(t) => t.negative_based_on(row, resolver)?,
            Self::AnyOf(a) => a.negative_based_on(row, resolver)?,
            Self::Deferred(d) => d.negative_based_on(row, resolver)?,
            Self::Null | Self::Exact(_) | Self::Anything | Self::NoBody => Vec::new(),
        })
    }

    /// Whether every value `other` accepts is accepted by `self`.
    #[must_use]
    pub fn encompasses(
        &self,
        other: &Pattern,
        this_resolver: &Resolver,
        other_resolver: &Resolver,
        visited: &mut Visited,
    ) -> MatchResult {
        if matches!(self, Self::Deferred(_)) || matches!(other, Self::Deferred(_)) {
            // A pair already in progress higher up the stack is a cycle:
            // assume success there and let the outer comparison decide.
            let pair = (visit_label(self), visit_label(other));
            if visited.contains(&pair) {
                return MatchResult::success();
            }
            let this = match resolve_one(self, this_resolver) {
                Ok(pattern) => pattern,
                Err(e) => return MatchResult::failure(e.to_string()),
            };
            let that = match resolve_one(other, other_resolver) {
                Ok(pattern) => pattern,
                Err(e) => return MatchResult::failure(e.to_string()),
            };
            visited.insert(pair.clone());
            let result = this.encompasses(that, this_resolver, other_resolver, visited);
            visited.remove(&pair);
            return result;
        }

        match other {
            Self::AnyOf(any) => {
                return MatchResult::from_failures(
                    any.branches()
                        .iter()
                        .filter_map(|branch| {
                            self.encompasses(branch, this_resolver, other_resolver, visited)
                                .into_failure()
                        })
                        .collect(),
                );
            }
            Self::Exact(exact) if !matches!(self, Self::Exact(_)) => {
                return self.matches(exact.value(), this_resolver);
            }
            Self::Enum(e) if !matches!(self, Self::AnyOf(_)) => {
                return MatchResult::from_failures(
                    e.values()
                        .iter()
                        .filter_map(|v| self.matches(v, this_resolver).into_failure())
                        .collect(),
                );
            }
            _ => {}
        }

        match (self, other) {
            (Self::Anything, _) => MatchResult::success(),
            (Self::String(a), Self::String(b)) => a.encompasses(b, this_resolver),
            (Self::String(a), Self::Format(_)) if a.is_unconstrained() => MatchResult::success(),
            (Self::Number(a), Self::Number(b)) => a.encompasses(b, this_resolver),
            (Self::Boolean, Self::Boolean)
            | (Self::Null, Self::Null)
            | (Self::NoBody, Self::NoBody) => MatchResult::success(),
            (Self::Format(a), Self::Format(b)) if a.kind() == b.kind() => MatchResult::success(),
            (Self::Exact(a), Self::Exact(b)) if a.value().same_as(b.value()) => {
                MatchResult::success()
            }
            (Self::Object(a), Self::Object(b)) => {
                a.encompasses(b, this_resolver, other_resolver, visited)
            }
            (Self::List(a), _) => a.encompasses(other, this_resolver, other_resolver, visited),
            (Self::Tuple(a), Self::Tuple(b)) => {
                a.encompasses(b, this_resolver, other_resolver, visited)
            }
            (Self::AnyOf(a), _) => a.encompasses(other, this_resolver, other_resolver, visited),
            _ => self.incompatible(other, this_resolver),
        }
    }

    fn incompatible(&self, other: &Pattern, resolver: &Resolver) -> MatchResult {
        MatchResult::failure(
            resolver
                .messages()
                .mismatch(&self.type_name(), &other.type_name()),
        )
    }

    /// Read the text form of a value of this pattern.
    ///
    /// # Errors
    ///
    /// `Unparsable` when `text` is not a value of this pattern.
    pub fn parse(&self, text: &str, resolver: &Resolver) -> Result<Value, ContractError> {
        match self {
            Self::String(_) | Self::Format(_) => Ok(Value::String(text.to_string())),
            Self::Number(n) => n.parse(text),
            Self::Boolean => match text.trim() {
                "true" => Ok(Value::Boolean(true)),
                "false" => Ok(Value::Boolean(false)),
                _ => Err(ContractError::unparsable("boolean", text)),
            },
            Self::Null => match text.trim() {
                "null" | "" => Ok(Value::Null),
                _ => Err(ContractError::unparsable("null", text)),
            },
            Self::Enum(e) => e.parse(text),
            Self::Object(_) | Self::List(_) | Self::Tuple(_) => {
                match serde_json::from_str::<serde_json::Value>(text) {
                    Ok(json @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => {
                        Ok(json.into())
                    }
                    _ => Err(ContractError::unparsable(self.type_name(), text)),
                }
            }
            Self::AnyOf(a) => a.parse(text, resolver),
            Self::Deferred(d) => resolver.resolve(d.name())?.parse(text, resolver),
            Self::Exact(e) => e.parse(text),
            Self::Anything => Ok(match serde_json::from_str::<serde_json::Value>(text) {
                Ok(json) => json.into(),
                Err(_) => Value::String(text.to_string()),
            }),
            Self::NoBody => {
                if text.trim().is_empty() {
                    Ok(Value::NoBody)
                } else {
                    Err(ContractError::unparsable("no body", text))
                }
            }
        }
    }

    /// Validate an example value, parsing it when given as text.
    ///
    /// # Errors
    ///
    /// `InvalidExample` when the example does not fit this pattern.
    pub fn example_value(
        &self,
        key: &str,
        example: &Value,
        resolver: &Resolver,
    ) -> Result<Value, ContractError> {
        let first = self.matches(example, resolver);
        if first.is_success() {
            return Ok(example.clone());
        }
        let invalid = |report: String| ContractError::InvalidExample {
            key: key.to_string(),
            value: example.display_value(),
            report,
        };
        let Value::String(text) = example else {
            return Err(invalid(first.report()));
        };
        let parsed = self.parse(text, resolver).map_err(|e| invalid(e.to_string()))?;
        match self.matches(&parsed, resolver) {
            MatchResult::Success(_) => Ok(parsed),
            failure => Err(invalid(failure.report())),
        }
    }
}

/// Named and aliased patterns are labelled by name; anonymous ones by
/// address, so two distinct anonymous objects never share a label.
fn visit_label(pattern: &Pattern) -> String {
    match pattern {
        Pattern::Deferred(d) => d.name().to_string(),
        other => other
            .type_alias()
            .map_or_else(|| format!("{other:p}"), str::to_string),
    }
}

fn resolve_one<'a>(
    pattern: &'a Pattern,
    resolver: &'a Resolver,
) -> Result<&'a Pattern, ContractError> {
    match pattern {
        Pattern::Deferred(d) => resolver.resolve(d.name()),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(json: serde_json::Value) -> Pattern {
        pattern_from_json(&json).unwrap()
    }

    #[test]
    fn aggregates_every_mismatch_at_a_level() {
        let pattern = object(json!({"id": "(number)", "height": "(number)"}));
        let value = Value::from(json!({"id": "abc", "height": "5 feet"}));
        let result = pattern.matches(&value, &Resolver::default());
        let failure = result.failure_ref().unwrap();
        assert_eq!(failure.leaf_count(), 2);
        let report = result.report();
        assert!(report.contains(">> id"));
        assert!(report.contains(">> height"));
        assert!(report.contains("\"5 feet\""));
    }

    #[test]
    fn encompasses_is_reflexive() {
        let resolver = Resolver::default().with_patterns([(
            "Person".to_string(),
            object(json!({"name": "(string)", "friend?": "(Person)"})),
        )]);
        for pattern in [
            Pattern::string(),
            Pattern::number(),
            Pattern::Boolean,
            Pattern::nullable(Pattern::string()),
            Pattern::list(Pattern::number()),
            object(json!({"a": "(string)", "b?": "(number)"})),
            Pattern::deferred("Person"),
            Pattern::Enum(EnumPattern::new(vec![Value::from("a"), Value::from("b")]).unwrap()),
        ] {
            let result = pattern.encompasses(&pattern, &resolver, &resolver, &mut Visited::new());
            assert!(result.is_success(), "{pattern:?}: {}", result.report());
        }
    }

    #[test]
    fn optional_field_monotonicity() {
        let resolver = Resolver::default();
        let wider = object(json!({"a": "(string)", "b?": "(string)"}));
        let narrower = object(json!({"a": "(string)"}));
        assert!(wider.encompasses(&narrower, &resolver, &resolver, &mut Visited::new()).is_success());
        assert!(!narrower.encompasses(&wider, &resolver, &resolver, &mut Visited::new()).is_success());
    }

    #[test]
    fn nullable_encompasses_inner_and_null() {
        let resolver = Resolver::default();
        let nullable = Pattern::nullable(Pattern::number());
        for other in [Pattern::number(), Pattern::Null] {
            assert!(nullable.encompasses(&other, &resolver, &resolver, &mut Visited::new()).is_success());
        }
        assert!(!Pattern::number().encompasses(&nullable, &resolver, &resolver, &mut Visited::new()).is_success());
    }

    #[test]
    fn fewer_enum_values_do_not_encompass_more() {
        let resolver = Resolver::default();
        let small = Pattern::Enum(EnumPattern::new(vec![Value::from("a")]).unwrap());
        let large = Pattern::Enum(EnumPattern::new(vec![Value::from("a"), Value::from("b")]).unwrap());
        assert!(large.encompasses(&small, &resolver, &resolver, &mut Visited::new()).is_success());
        assert!(!small.encompasses(&large, &resolver, &resolver, &mut Visited::new()).is_success());
        assert!(Pattern::string().encompasses(&large, &resolver, &resolver, &mut Visited::new()).is_success());
    }

    #[test]
    fn string_negatives_are_exactly_the_sibling_kinds() {
        let negatives = Pattern::string()
            .negative_based_on(&Row::default(), &Resolver::default())
            .unwrap();
        assert_eq!(negatives, vec![Pattern::Null, Pattern::number(), Pattern::Boolean]);
    }

    #[test]
    fn bounded_number_negatives_straddle_the_range() {
        let pattern = Pattern::Number(NumberPattern::default().with_minimum(10.0).with_maximum(20.0));
        let negatives = pattern
            .negative_based_on(&Row::default(), &Resolver::default())
            .unwrap();
        let resolver = Resolver::default();
        let below = negatives.iter().any(|p| match p {
            Pattern::Exact(e) => e.value().as_f64().is_some_and(|n| n < 10.0),
            _ => false,
        });
        let above = negatives.iter().any(|p| match p {
            Pattern::Exact(e) => e.value().as_f64().is_some_and(|n| n > 20.0),
            _ => false,
        });
        assert!(below && above);
        for sibling in [Pattern::Null, Pattern::string(), Pattern::Boolean] {
            assert!(negatives.contains(&sibling));
        }
        for negative in &negatives {
            let value = negative.generate(&resolver).unwrap();
            assert!(!pattern.matches(&value, &resolver).is_success());
        }
    }

    #[test]
    fn self_reference_through_optional_field_terminates() {
        let resolver = Resolver::default().with_patterns([(
            "Person".to_string(),
            object(json!({"name": "(string)", "friend?": "(Person)"})),
        )]);
        let value = Pattern::deferred("Person").generate(&resolver).unwrap();
        assert!(Pattern::deferred("Person").matches(&value, &resolver).is_success());
    }

    #[test]
    fn self_reference_through_nullable_terminates() {
        let resolver = Resolver::default().with_patterns([(
            "Node".to_string(),
            object(json!({"value": "(number)", "next": "(Node?)"})),
        )]);
        let value = Pattern::deferred("Node").generate(&resolver).unwrap();
        assert_eq!(value.select("next"), Some(&Value::Null));
    }

    #[test]
    fn non_nullable_self_reference_is_a_cycle_error() {
        let resolver = Resolver::default().with_patterns([(
            "Node".to_string(),
            object(json!({"value": "(number)", "next": "(Node)"})),
        )]);
        assert_eq!(
            Pattern::deferred("Node").generate(&resolver),
            Err(ContractError::Cycle("Node".into()))
        );
    }

    #[test]
    fn self_referential_encompasses_terminates() {
        let resolver = Resolver::default().with_patterns([(
            "Node".to_string(),
            object(json!({"value": "(number)", "next": "(Node?)"})),
        )]);
        let node = Pattern::deferred("Node");
        assert!(node.encompasses(&node, &resolver, &resolver, &mut Visited::new()).is_success());
    }

    #[test]
    fn self_referential_encompasses_still_detects_changes() {
        let older = Resolver::default().with_patterns([(
            "Node".to_string(),
            object(json!({"value": "(number)", "next": "(Node?)"})),
        )]);
        let newer = Resolver::default().with_patterns([(
            "Node".to_string(),
            object(json!({"value": "(string)", "next": "(Node?)"})),
        )]);
        let node = Pattern::deferred("Node");
        assert!(!node.encompasses(&node, &older, &newer, &mut Visited::new()).is_success());
    }

    #[test]
    fn extra_fields_are_compatible_under_the_default_resolver() {
        let resolver = Resolver::default();
        let older = object(json!({"id": "(number)"}));
        let newer = object(json!({"id": "(number)", "email": "(string)"}));
        let result = older.encompasses(&newer, &resolver, &resolver, &mut Visited::new());
        assert!(result.is_success(), "{}", result.report());
    }

    #[test]
    fn failed_reference_pair_does_not_satisfy_a_later_union_branch() {
        let resolver = Resolver::default().with_patterns([
            ("A".to_string(), object(json!({"x": "(string)"}))),
            ("B".to_string(), object(json!({"x": "(number)"}))),
        ]);
        let first = object(json!({"p": "(A)"}));
        let second = object(json!({"q": "(A)"}));
        let union = Pattern::AnyOf(AnyPattern::new(vec![first.clone(), second.clone()]));
        let other = object(json!({"p": "(B)", "q": "(B)"}));

        for branch in [&first, &second] {
            assert!(!branch.encompasses(&other, &resolver, &resolver, &mut Visited::new()).is_success());
        }
        let mut visited = Visited::new();
        assert!(!union.encompasses(&other, &resolver, &resolver, &mut visited).is_success());
        assert!(visited.is_empty());
    }

    #[test]
    fn references_are_collected_without_resolving() {
        let pattern = object(json!({"owner": "(Person)", "tags": ["(Tag?)"], "id": "(number)"}));
        assert_eq!(
            pattern.references(),
            BTreeSet::from(["Person".to_string(), "Tag".to_string()])
        );
    }

    #[test]
    fn unknown_deferred_type_fails_to_generate() {
        assert_eq!(
            Pattern::deferred("Missing").generate(&Resolver::default()),
            Err(ContractError::UnknownType("Missing".into()))
        );
    }

    #[test]
    fn mock_mode_accepts_type_tokens() {
        let resolver = Resolver::default().with_mock_mode(true);
        assert!(Pattern::number().matches(&Value::string("(number)"), &resolver).is_success());
        assert!(!Pattern::number().matches(&Value::string("(string)"), &resolver).is_success());
        assert!(!Pattern::number().matches(&Value::string("(number)"), &Resolver::default()).is_success());
    }

    #[test]
    fn example_values_are_parsed_and_validated() {
        let resolver = Resolver::default();
        assert_eq!(
            Pattern::number().example_value("id", &Value::string("10"), &resolver),
            Ok(Value::from(10))
        );
        assert!(matches!(
            Pattern::number().example_value("id", &Value::string("ten"), &resolver),
            Err(ContractError::InvalidExample { .. })
        ));
    }
}
