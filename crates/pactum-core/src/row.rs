//! Example rows
//!
//! A row binds column names (field keys, header names, path placeholders) to
//! example values used when specializing a scenario.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ContractError;
use crate::value::Value;

/// Column holding a whole request body example.
pub const REQUEST_BODY: &str = "(REQUEST-BODY)";
/// Column holding a whole response body example.
pub const RESPONSE_BODY: &str = "(RESPONSE-BODY)";

/// One example row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub columns: BTreeMap<String, Value>,
}

impl Row {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.columns.insert(column.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.get(column)
    }

    #[must_use]
    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Replace `$(name)` references with bound test variables.
    ///
    /// # Errors
    ///
    /// `UnboundReference` when a referenced variable has no binding.
    pub fn substitute(&self, variables: &BTreeMap<String, String>) -> Result<Self, ContractError> {
        let columns = self
            .columns
            .iter()
            .map(|(column, value)| Ok((column.clone(), substitute_value(value, variables)?)))
            .collect::<Result<_, ContractError>>()?;
        Ok(Self {
            name: self.name.clone(),
            columns,
        })
    }
}

fn substitute_value(
    value: &Value,
    variables: &BTreeMap<String, String>,
) -> Result<Value, ContractError> {
    match value {
        Value::String(text) => match variable_reference(text) {
            Some(name) => variables
                .get(name)
                .map(|bound| Value::String(bound.clone()))
                .ok_or_else(|| ContractError::UnboundReference(name.to_string())),
            None => Ok(value.clone()),
        },
        Value::Object(map) => Ok(Value::Object(
            map.iter()
                .map(|(k, v)| Ok((k.clone(), substitute_value(v, variables)?)))
                .collect::<Result<_, ContractError>>()?,
        )),
        Value::Array(items) => Ok(Value::Array(
            items
                .iter()
                .map(|v| substitute_value(v, variables))
                .collect::<Result<_, _>>()?,
        )),
        other => Ok(other.clone()),
    }
}

fn variable_reference(text: &str) -> Option<&str> {
    text.trim()
        .strip_prefix("$(")
        .and_then(|rest| rest.strip_suffix(')'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_bound_variables() {
        let row = Row::named("r").with("id", "$(product_id)").with("name", "fixed");
        let vars = BTreeMap::from([("product_id".to_string(), "42".to_string())]);
        let row = row.substitute(&vars).unwrap();
        assert_eq!(row.get("id"), Some(&Value::string("42")));
        assert_eq!(row.get("name"), Some(&Value::string("fixed")));
    }

    #[test]
    fn unbound_variable_is_an_error() {
        let row = Row::named("r").with("id", "$(missing)");
        assert_eq!(
            row.substitute(&BTreeMap::new()),
            Err(ContractError::UnboundReference("missing".into()))
        );
    }
}
