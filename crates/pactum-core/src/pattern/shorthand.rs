//! Pattern shorthand used in contract documents
//!
//! `(string)`, `(number)`, `(T?)` nullable, `(T*)` list, `(Name)` reference,
//! and JSON example documents whose keys may end in `?` (optional).
//!
//! Constraints that a token cannot carry use a single-key object:
//!
//! ```yaml
//! status: { $enum: [pending, shipped] }
//! sku: { $string: { min_length: 3, max_length: 12, pattern: "[A-Z0-9-]+" } }
//! price: { $number: { minimum: 0, exclusive_minimum: true } }
//! quantity: { $integer: { minimum: 1, maximum: 99 } }
//! ```

use serde::Deserialize;

use super::{
    AnyPattern, EnumPattern, Field, FormatKind, NumberPattern, ObjectPattern, Pattern,
    StringPattern, TuplePattern,
};
use crate::error::ContractError;
use crate::value::Value;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct StringBounds {
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NumberBounds {
    minimum: Option<f64>,
    maximum: Option<f64>,
    #[serde(default)]
    exclusive_minimum: bool,
    #[serde(default)]
    exclusive_maximum: bool,
}

/// Parse one shorthand token. Text that is not a `(...)` token is a literal.
///
/// # Errors
///
/// `Definition` for an empty token.
pub fn parse_pattern(text: &str) -> Result<Pattern, ContractError> {
    let trimmed = text.trim();
    let Some(inner) = trimmed
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
    else {
        return Ok(Pattern::exact(trimmed));
    };
    let inner = inner.trim();
    if inner.is_empty() {
        return Err(ContractError::Definition("empty pattern token \"()\"".into()));
    }
    if let Some(base) = inner.strip_suffix('?') {
        return Ok(Pattern::nullable(parse_pattern(&format!("({base})"))?));
    }
    if let Some(base) = inner.strip_suffix('*') {
        return Ok(Pattern::list(parse_pattern(&format!("({base})"))?));
    }
    if let Some((_, type_part)) = inner.split_once(':') {
        // `(id:number)`: the name belongs to the enclosing path or key
        return parse_pattern(&format!("({})", type_part.trim()));
    }
    if inner.contains(" or ") {
        let branches = inner
            .split(" or ")
            .map(|branch| parse_pattern(&format!("({})", branch.trim())))
            .collect::<Result<Vec<_>, _>>()?;
        return Ok(Pattern::AnyOf(AnyPattern::new(branches)));
    }
    Ok(match inner {
        "string" => Pattern::String(StringPattern::default()),
        "number" => Pattern::number(),
        "integer" => Pattern::integer(),
        "boolean" => Pattern::Boolean,
        "null" => Pattern::Null,
        "date" => Pattern::format(FormatKind::Date),
        "datetime" => Pattern::format(FormatKind::DateTime),
        "uuid" => Pattern::format(FormatKind::Uuid),
        "email" => Pattern::format(FormatKind::Email),
        "base64" => Pattern::format(FormatKind::Base64),
        "anything" => Pattern::Anything,
        "empty" => Pattern::NoBody,
        name => Pattern::deferred(name),
    })
}

/// Build a pattern tree from a JSON example document with embedded shorthand.
///
/// A one-element array is a list of that element; any other array is a
/// tuple. Object keys ending in `?` are optional.
///
/// # Errors
///
/// Malformed tokens and duplicate keys.
pub fn pattern_from_json(json: &serde_json::Value) -> Result<Pattern, ContractError> {
    Ok(match json {
        serde_json::Value::String(text) => parse_pattern(text)?,
        serde_json::Value::Null => Pattern::Null,
        serde_json::Value::Bool(_) | serde_json::Value::Number(_) => {
            Pattern::exact(Value::from(json.clone()))
        }
        serde_json::Value::Array(items) if items.len() == 1 => {
            Pattern::list(pattern_from_json(&items[0])?)
        }
        serde_json::Value::Array(items) => Pattern::Tuple(TuplePattern::new(
            items.iter().map(pattern_from_json).collect::<Result<_, _>>()?,
        )),
        serde_json::Value::Object(map) if map.len() == 1 && is_constraint_key(map.keys().next()) => {
            let (key, body) = map.iter().next().ok_or_else(|| {
                ContractError::Definition("empty constraint object".into())
            })?;
            constrained(key, body)?
        }
        serde_json::Value::Object(map) => {
            let fields = map
                .iter()
                .map(|(key, value)| {
                    let pattern = pattern_from_json(value)?;
                    Ok(match key.strip_suffix('?') {
                        Some(name) => Field::optional(name, pattern),
                        None => Field::required(key.as_str(), pattern),
                    })
                })
                .collect::<Result<Vec<_>, ContractError>>()?;
            Pattern::Object(ObjectPattern::new(fields)?)
        }
    })
}

fn is_constraint_key(key: Option<&String>) -> bool {
    key.is_some_and(|k| matches!(k.as_str(), "$enum" | "$string" | "$number" | "$integer"))
}

fn constrained(key: &str, body: &serde_json::Value) -> Result<Pattern, ContractError> {
    let invalid = |e: serde_json::Error| ContractError::Definition(format!("invalid {key}: {e}"));
    match key {
        "$enum" => {
            let serde_json::Value::Array(values) = body else {
                return Err(ContractError::Definition("$enum takes a list of values".into()));
            };
            let values = values.iter().cloned().map(Value::from).collect();
            Ok(Pattern::Enum(EnumPattern::new(values)?))
        }
        "$string" => {
            let bounds: StringBounds = serde_json::from_value(body.clone()).map_err(invalid)?;
            let mut pattern = StringPattern::default();
            if let Some(min) = bounds.min_length {
                pattern = pattern.with_min_length(min);
            }
            if let Some(max) = bounds.max_length {
                pattern = pattern.with_max_length(max);
            }
            if let Some(regex) = bounds.pattern {
                pattern = pattern.with_regex(regex)?;
            }
            Ok(Pattern::String(pattern))
        }
        _ => {
            let bounds: NumberBounds = serde_json::from_value(body.clone()).map_err(invalid)?;
            let mut pattern = if key == "$integer" {
                NumberPattern::integer()
            } else {
                NumberPattern::default()
            };
            if let Some(min) = bounds.minimum {
                pattern = pattern.with_minimum(min);
            }
            if let Some(max) = bounds.maximum {
                pattern = pattern.with_maximum(max);
            }
            Ok(Pattern::Number(
                pattern.with_exclusive_bounds(bounds.exclusive_minimum, bounds.exclusive_maximum),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_tokens() {
        assert_eq!(parse_pattern("(string)").unwrap(), Pattern::string());
        assert_eq!(parse_pattern("(number)").unwrap(), Pattern::number());
        assert_eq!(parse_pattern("(uuid)").unwrap(), Pattern::format(FormatKind::Uuid));
        assert_eq!(parse_pattern("hello").unwrap(), Pattern::exact("hello"));
    }

    #[test]
    fn nullable_list_and_reference_tokens() {
        assert_eq!(parse_pattern("(number?)").unwrap(), Pattern::nullable(Pattern::number()));
        assert_eq!(parse_pattern("(string*)").unwrap(), Pattern::list(Pattern::string()));
        assert_eq!(parse_pattern("(Person)").unwrap(), Pattern::deferred("Person"));
        assert_eq!(parse_pattern("(id:number)").unwrap(), Pattern::number());
    }

    #[test]
    fn duplicate_optional_and_mandatory_key_is_rejected() {
        assert!(pattern_from_json(&json!({"a": "(string)", "a?": "(string)"})).is_err());
    }

    #[test]
    fn json_documents_become_trees() {
        let pattern = pattern_from_json(&json!({
            "id": "(number)",
            "tags": ["(string)"],
            "point": [1, "(number)"],
            "note?": "(string?)"
        }))
        .unwrap();
        let Pattern::Object(object) = pattern else {
            panic!("expected object");
        };
        assert_eq!(object.field("tags").map(|f| &f.pattern), Some(&Pattern::list(Pattern::string())));
        assert!(matches!(object.field("point").map(|f| &f.pattern), Some(Pattern::Tuple(_))));
        assert!(object.field("note").is_some_and(|f| f.optional));
    }

    #[test]
    fn constraint_objects() {
        let status = pattern_from_json(&json!({"$enum": ["pending", "shipped"]})).unwrap();
        assert_eq!(
            status,
            Pattern::Enum(EnumPattern::new(vec![Value::from("pending"), Value::from("shipped")]).unwrap())
        );

        let sku = pattern_from_json(&json!({"$string": {"min_length": 3, "pattern": "[A-Z]+"}})).unwrap();
        assert_eq!(
            sku,
            Pattern::String(StringPattern::default().with_min_length(3).with_regex("[A-Z]+").unwrap())
        );

        let quantity = pattern_from_json(&json!({"$integer": {"minimum": 1, "maximum": 99}})).unwrap();
        assert_eq!(
            quantity,
            Pattern::Number(NumberPattern::integer().with_minimum(1.0).with_maximum(99.0))
        );
    }

    #[test]
    fn malformed_constraints_are_definition_errors() {
        assert!(pattern_from_json(&json!({"$enum": "red"})).is_err());
        assert!(pattern_from_json(&json!({"$string": {"min": 3}})).is_err());
        assert!(pattern_from_json(&json!({"$number": {"minimum": "zero"}})).is_err());
    }

    #[test]
    fn dollar_keys_among_others_are_plain_fields() {
        let Pattern::Object(object) = pattern_from_json(&json!({"$enum": "(string)", "id": "(number)"})).unwrap()
        else {
            panic!("expected object");
        };
        assert!(object.field("$enum").is_some());
    }
}
