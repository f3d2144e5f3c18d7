//! Unions: "one of these patterns", including nullable

use rand::Rng;

use super::{Pattern, Visited};
use crate::error::ContractError;
use crate::resolver::Resolver;
use crate::result::MatchResult;
use crate::row::Row;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub struct AnyPattern {
    branches: Vec<Pattern>,
    type_alias: Option<String>,
}

impl AnyPattern {
    #[must_use]
    pub fn new(branches: Vec<Pattern>) -> Self {
        Self {
            branches,
            type_alias: None,
        }
    }

    #[must_use]
    pub fn branches(&self) -> &[Pattern] {
        &self.branches
    }

    pub(crate) fn type_alias(&self) -> Option<&str> {
        self.type_alias.as_deref()
    }

    pub(crate) fn with_type_alias(mut self, alias: &str) -> Self {
        self.type_alias = Some(alias.to_string());
        self
    }

    pub(crate) fn is_nullable(&self) -> bool {
        self.branches.iter().any(|b| matches!(b, Pattern::Null))
    }

    /// The single non-null branch of a plain nullable.
    fn nullable_inner(&self) -> Option<&Pattern> {
        if !self.is_nullable() {
            return None;
        }
        let mut rest = self.branches.iter().filter(|b| !matches!(b, Pattern::Null));
        match (rest.next(), rest.next()) {
            (Some(inner), None) => Some(inner),
            _ => None,
        }
    }

    pub(crate) fn type_name(&self) -> String {
        if let Some(alias) = &self.type_alias {
            return format!("({alias})");
        }
        if let Some(inner) = self.nullable_inner() {
            return format!("{} or null", inner.type_name());
        }
        self.branches
            .iter()
            .map(Pattern::type_name)
            .collect::<Vec<_>>()
            .join(" or ")
    }

    pub(crate) fn matches(&self, value: &Value, resolver: &Resolver) -> MatchResult {
        if matches!(value, Value::Null) && self.is_nullable() {
            return MatchResult::success();
        }
        // a nullable reports its inner pattern's failure as is
        if let Some(inner) = self.nullable_inner() {
            return inner.matches(value, resolver);
        }
        for branch in &self.branches {
            if let success @ MatchResult::Success(_) = branch.matches(value, resolver) {
                return success;
            }
        }
        resolver.mismatch(&self.type_name(), value)
    }

    pub(crate) fn generate(&self, resolver: &Resolver) -> Result<Value, ContractError> {
        let build = |r: &Resolver| -> Result<Value, ContractError> {
            if let Some(inner) = self.nullable_inner() {
                return Ok(r.through_nullable(|r| inner.generate(r))?.unwrap_or(Value::Null));
            }
            if self.branches.is_empty() {
                return Err(ContractError::Definition("union has no branches".into()));
            }
            let pick = rand::thread_rng().gen_range(0..self.branches.len());
            self.branches[pick].generate(r)
        };
        match &self.type_alias {
            Some(alias) => resolver.entering(alias, build),
            None => build(resolver),
        }
    }

    /// Every branch's variants. A recursive reference already being
    /// specialized stays nullable so it can still be cut at generation.
    pub(crate) fn new_based_on(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Pattern>, ContractError> {
        let nullable = self.is_nullable();
        let mut variants = Vec::new();
        for branch in &self.branches {
            for variant in branch.new_based_on(row, resolver)? {
                let recursive = matches!(&variant, Pattern::Deferred(d) if resolver.on_stack(d.name()));
                variants.push(if nullable && recursive {
                    Pattern::nullable(variant)
                } else {
                    variant
                });
                if variants.len() >= resolver.max_combinations() {
                    return Ok(variants);
                }
            }
        }
        Ok(variants)
    }

    /// Branch negatives that no branch still accepts.
    pub(crate) fn negative_based_on(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Pattern>, ContractError> {
        let mut negatives: Vec<Pattern> = Vec::new();
        for branch in &self.branches {
            for negative in branch.negative_based_on(row, resolver)? {
                let accepted = self.branches.iter().any(|b| {
                    b.encompasses(&negative, resolver, resolver, &mut Visited::new())
                        .is_success()
                });
                if !accepted && !negatives.contains(&negative) {
                    negatives.push(negative);
                }
            }
        }
        Ok(negatives)
    }

    pub(crate) fn encompasses(
        &self,
        other: &Pattern,
        this_resolver: &Resolver,
        other_resolver: &Resolver,
        visited: &mut Visited,
    ) -> MatchResult {
        for branch in &self.branches {
            if branch
                .encompasses(other, this_resolver, other_resolver, visited)
                .is_success()
            {
                return MatchResult::success();
            }
        }
        MatchResult::failure(
            this_resolver
                .messages()
                .mismatch(&self.type_name(), &other.type_name()),
        )
    }

    pub(crate) fn parse(&self, text: &str, resolver: &Resolver) -> Result<Value, ContractError> {
        if self.is_nullable() && matches!(text.trim(), "null" | "") {
            return Ok(Value::Null);
        }
        self.branches
            .iter()
            .filter(|b| !matches!(b, Pattern::Null))
            .find_map(|branch| {
                branch
                    .parse(text, resolver)
                    .ok()
                    .filter(|v| branch.matches(v, resolver).is_success())
            })
            .ok_or_else(|| ContractError::unparsable(self.type_name(), text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nullable_reports_inner_failure() {
        let pattern = Pattern::nullable(Pattern::number());
        let resolver = Resolver::default();
        assert!(pattern.matches(&Value::Null, &resolver).is_success());
        assert!(pattern.matches(&Value::from(1), &resolver).is_success());
        assert_eq!(
            pattern.matches(&Value::string("x"), &resolver).report(),
            "Expected number, actual was \"x\""
        );
    }

    #[test]
    fn union_names_every_branch() {
        let pattern = Pattern::AnyOf(AnyPattern::new(vec![Pattern::number(), Pattern::Boolean]));
        assert_eq!(
            pattern.matches(&Value::string("x"), &Resolver::default()).report(),
            "Expected number or boolean, actual was \"x\""
        );
    }

    #[test]
    fn negatives_exclude_values_another_branch_accepts() {
        let pattern = Pattern::nullable(Pattern::string());
        let negatives = pattern
            .negative_based_on(&Row::default(), &Resolver::default())
            .unwrap();
        assert_eq!(negatives, vec![Pattern::number(), Pattern::Boolean]);
    }

    #[test]
    fn parse_tries_branches_in_order() {
        let pattern = Pattern::AnyOf(AnyPattern::new(vec![Pattern::number(), Pattern::string()]));
        let resolver = Resolver::default();
        assert_eq!(pattern.parse("10", &resolver), Ok(Value::from(10)));
        assert_eq!(pattern.parse("ten", &resolver), Ok(Value::string("ten")));
    }
}
