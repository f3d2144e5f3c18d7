//! Enumerated values

use rand::Rng;

use super::Pattern;
use crate::error::ContractError;
use crate::resolver::Resolver;
use crate::result::MatchResult;
use crate::value::Value;

/// Sentinel sent as an out-of-range enum value in negative tests.
pub const INVALID_ENUM_VALUE: &str = "__INVALID_ENUM_VALUE__";

/// One of a fixed set of values.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumPattern {
    values: Vec<Value>,
    type_alias: Option<String>,
}

impl EnumPattern {
    /// # Errors
    ///
    /// `Definition` when `values` is empty or mixes value types.
    pub fn new(values: Vec<Value>) -> Result<Self, ContractError> {
        let Some(first) = values.iter().find(|v| !matches!(v, Value::Null)) else {
            return Err(ContractError::Definition(
                "enum must declare at least one non-null value".into(),
            ));
        };
        let kind = first.type_name();
        if let Some(odd) = values
            .iter()
            .find(|v| !matches!(v, Value::Null) && v.type_name() != kind)
        {
            return Err(ContractError::Definition(format!(
                "enum mixes {kind} and {} values",
                odd.type_name()
            )));
        }
        Ok(Self {
            values,
            type_alias: None,
        })
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub(crate) fn type_alias(&self) -> Option<&str> {
        self.type_alias.as_deref()
    }

    pub(crate) fn with_type_alias(mut self, alias: &str) -> Self {
        self.type_alias = Some(alias.to_string());
        self
    }

    pub(crate) fn type_name(&self) -> String {
        let listed: Vec<String> = self.values.iter().map(Value::display_value).collect();
        format!("one of {}", listed.join(", "))
    }

    fn value_kind(&self) -> &'static str {
        self.values
            .iter()
            .find(|v| !matches!(v, Value::Null))
            .map_or("string", Value::type_name)
    }

    pub(crate) fn matches(&self, value: &Value, resolver: &Resolver) -> MatchResult {
        if self.values.iter().any(|v| v.same_as(value)) {
            MatchResult::success()
        } else {
            resolver.mismatch(&self.type_name(), value)
        }
    }

    pub(crate) fn generate(&self, rng: &mut impl Rng) -> Result<Value, ContractError> {
        if self.values.is_empty() {
            return Err(ContractError::Definition("enum has no values".into()));
        }
        Ok(self.values[rng.gen_range(0..self.values.len())].clone())
    }

    /// Each declared value as its own variant.
    pub(crate) fn new_based_on(&self) -> Vec<Pattern> {
        self.values.iter().cloned().map(Pattern::exact).collect()
    }

    /// An out-of-set value of the same kind, then the sibling kinds.
    pub(crate) fn negative_based_on(&self) -> Vec<Pattern> {
        let mut negatives = Vec::new();
        if !self.values.contains(&Value::Null) {
            negatives.push(Pattern::Null);
        }
        match self.value_kind() {
            "number" => {
                let beyond = self
                    .values
                    .iter()
                    .filter_map(Value::as_f64)
                    .fold(0.0_f64, f64::max)
                    + 1.0;
                negatives.push(Pattern::exact(Value::number(beyond)));
                negatives.extend([Pattern::string(), Pattern::Boolean]);
            }
            "boolean" => negatives.extend([Pattern::number(), Pattern::string()]),
            _ => {
                negatives.push(Pattern::exact(INVALID_ENUM_VALUE));
                negatives.extend([Pattern::number(), Pattern::Boolean]);
            }
        }
        negatives
    }

    pub(crate) fn parse(&self, text: &str) -> Result<Value, ContractError> {
        self.values
            .iter()
            .find(|v| v.to_literal() == text.trim())
            .cloned()
            .ok_or_else(|| ContractError::unparsable(self.type_name(), text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colours() -> EnumPattern {
        EnumPattern::new(vec![Value::from("red"), Value::from("green")]).unwrap()
    }

    #[test]
    fn rejects_mixed_or_empty_values() {
        assert!(EnumPattern::new(vec![]).is_err());
        assert!(EnumPattern::new(vec![Value::from("a"), Value::from(1)]).is_err());
        assert!(EnumPattern::new(vec![Value::from("a"), Value::Null]).is_ok());
    }

    #[test]
    fn matches_declared_values_only() {
        let resolver = Resolver::default();
        assert!(colours().matches(&Value::from("red"), &resolver).is_success());
        let result = colours().matches(&Value::from("blue"), &resolver);
        assert_eq!(
            result.report(),
            "Expected one of \"red\", \"green\", actual was \"blue\""
        );
    }

    #[test]
    fn negatives_include_the_invalid_sentinel() {
        let negatives = colours().negative_based_on();
        assert!(negatives.contains(&Pattern::exact(INVALID_ENUM_VALUE)));
        assert!(negatives.contains(&Pattern::Null));
    }

    #[test]
    fn numeric_enum_parses_text() {
        let pattern = EnumPattern::new(vec![Value::from(1), Value::from(2)]).unwrap();
        assert_eq!(pattern.parse("2"), Ok(Value::from(2)));
        assert!(pattern.parse("3").is_err());
    }
}
