//! Named references resolved through the resolver's type table

use super::Pattern;
use crate::error::ContractError;
use crate::resolver::Resolver;
use crate::result::MatchResult;
use crate::row::Row;
use crate::value::Value;

/// A reference such as `(Person)`, resolved one hop at use time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeferredPattern {
    name: String,
}

impl DeferredPattern {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn matches(&self, value: &Value, resolver: &Resolver) -> MatchResult {
        match resolver.resolve(&self.name) {
            Ok(pattern) => pattern.matches(value, resolver),
            Err(e) => MatchResult::failure(e.to_string()),
        }
    }

    pub(crate) fn generate(&self, resolver: &Resolver) -> Result<Value, ContractError> {
        resolver.guarded(&self.name, |r| r.resolve(&self.name)?.generate(r))
    }

    /// A reference already being specialized is left as is.
    pub(crate) fn new_based_on(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Pattern>, ContractError> {
        if resolver.on_stack(&self.name) {
            return Ok(vec![Pattern::Deferred(self.clone())]);
        }
        let inner = resolver.pushing(&self.name);
        inner.resolve(&self.name)?.new_based_on(row, &inner)
    }

    pub(crate) fn negative_based_on(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Pattern>, ContractError> {
        if resolver.on_stack(&self.name) {
            return Ok(Vec::new());
        }
        let inner = resolver.pushing(&self.name);
        inner.resolve(&self.name)?.negative_based_on(row, &inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::pattern_from_json;
    use serde_json::json;

    fn resolver() -> Resolver {
        Resolver::default().with_patterns([(
            "Person".to_string(),
            pattern_from_json(&json!({"name": "(string)", "friend?": "(Person)"})).unwrap(),
        )])
    }

    #[test]
    fn unknown_reference_fails_to_match() {
        let result = DeferredPattern::new("Nope").matches(&Value::Null, &Resolver::default());
        assert!(result.report().contains("Unknown type \"Nope\""));
    }

    #[test]
    fn recursive_specialization_terminates() {
        let resolver = resolver();
        let variants = DeferredPattern::new("Person")
            .new_based_on(&Row::default(), &resolver)
            .unwrap();
        assert_eq!(variants.len(), 2);
        for variant in variants {
            let value = variant.generate(&resolver).unwrap();
            assert!(Pattern::deferred("Person").matches(&value, &resolver).is_success());
        }
    }

    #[test]
    fn recursive_negatives_terminate() {
        let negatives = DeferredPattern::new("Person")
            .negative_based_on(&Row::default(), &resolver())
            .unwrap();
        // name: null, number, boolean, removed
        assert_eq!(negatives.len(), 4);
    }
}
