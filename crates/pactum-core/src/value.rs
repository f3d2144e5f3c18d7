//! Runtime values matched against and generated from patterns

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// A concrete value: a request/response body, a header, a query param, a fact.
///
/// Values are immutable once built. `NoBody` stands for an absent body and is
/// distinct from JSON `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum Value {
    String(String),
    Number(Number),
    Boolean(bool),
    Null,
    Object(BTreeMap<String, Value>),
    Array(Vec<Value>),
    #[default]
    NoBody,
}

impl Value {
    /// Parse body text: empty text is `NoBody`, JSON text is structured, anything
    /// else is kept as a plain string.
    #[must_use]
    pub fn parse_body(text: &str) -> Self {
        if text.trim().is_empty() {
            return Self::NoBody;
        }
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(json @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => json.into(),
            _ => Self::String(text.to_string()),
        }
    }

    /// Build a number value from an `f64`, keeping whole numbers integral.
    ///
    /// JSON has no NaN or infinity: a non-finite `n` becomes [`Value::Null`].
    /// Callers that must tell the two apart check `n.is_finite()` first.
    #[must_use]
    pub fn number(n: f64) -> Self {
        if n.fract() == 0.0 && n.abs() < 9.0e15 {
            #[allow(clippy::cast_possible_truncation)]
            return Self::Number(Number::from(n as i64));
        }
        Number::from_f64(n).map_or(Self::Null, Self::Number)
    }

    #[must_use]
    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    /// Short type name used in mismatch messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::String(_) => "string",
            Self::Number(_) => "number",
            Self::Boolean(_) => "boolean",
            Self::Null => "null",
            Self::Object(_) => "json object",
            Self::Array(_) => "json array",
            Self::NoBody => "no body",
        }
    }

    /// Rendering used in failure reports: strings quoted, everything else as JSON.
    #[must_use]
    pub fn display_value(&self) -> String {
        match self {
            Self::String(s) => format!("\"{s}\""),
            Self::NoBody => "no body".to_string(),
            other => other.to_literal(),
        }
    }

    /// The text form sent on the wire (header/query/path text, body text).
    #[must_use]
    pub fn to_literal(&self) -> String {
        match self {
            Self::String(s) => s.clone(),
            Self::Number(n) => n.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Null => "null".to_string(),
            Self::NoBody => String::new(),
            Self::Object(_) | Self::Array(_) => {
                serde_json::Value::from(self.clone()).to_string()
            }
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Structural equality where numbers compare numerically (`10 == 10.0`).
    #[must_use]
    pub fn same_as(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x == y,
                _ => a == b,
            },
            (Self::Object(a), Self::Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|other| v.same_as(other)))
            }
            (Self::Array(a), Self::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_as(y))
            }
            _ => self == other,
        }
    }

    /// Follow a dotted selector such as `address.city` or `items.0.id`.
    #[must_use]
    pub fn select(&self, selector: &str) -> Option<&Value> {
        if selector.is_empty() {
            return Some(self);
        }
        selector.split('.').try_fold(self, |current, part| match current {
            Self::Object(map) => map.get(part),
            Self::Array(items) => part.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Boolean(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(value: Value) -> Self {
        match value {
            Value::Null | Value::NoBody => Self::Null,
            Value::Boolean(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n.into())
    }
}
