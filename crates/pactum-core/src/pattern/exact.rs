//! Literal value patterns

use crate::error::ContractError;
use crate::resolver::Resolver;
use crate::result::MatchResult;
use crate::value::Value;

/// Matches exactly one value. Produced by examples and literal contract text.
#[derive(Debug, Clone, PartialEq)]
pub struct ExactValuePattern {
    value: Value,
}

impl ExactValuePattern {
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self { value }
    }

    #[must_use]
    pub const fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn matches(&self, actual: &Value, resolver: &Resolver) -> MatchResult {
        if self.value.same_as(actual) {
            MatchResult::success()
        } else {
            resolver.mismatch(&self.value.display_value(), actual)
        }
    }

    pub(crate) fn parse(&self, text: &str) -> Result<Value, ContractError> {
        if self.value.to_literal() == text {
            Ok(self.value.clone())
        } else {
            Err(ContractError::unparsable(self.value.display_value(), text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_only_its_value() {
        let resolver = Resolver::default();
        let pattern = ExactValuePattern::new(Value::from(10));
        assert!(pattern.matches(&Value::number(10.0), &resolver).is_success());
        assert_eq!(
            pattern.matches(&Value::from(11), &resolver).report(),
            "Expected 10, actual was 11"
        );
    }

    #[test]
    fn parses_its_literal_form() {
        let pattern = ExactValuePattern::new(Value::from(true));
        assert_eq!(pattern.parse("true"), Ok(Value::from(true)));
        assert!(pattern.parse("false").is_err());
    }
}
