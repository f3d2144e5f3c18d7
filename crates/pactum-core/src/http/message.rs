//! Concrete HTTP requests and responses

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Boundary used when encoding multipart bodies.
pub const MULTIPART_BOUNDARY: &str = "pactum-boundary";

/// One part of a multipart/form-data body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MultiPartValue {
    Content {
        name: String,
        content: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
    },
    File {
        name: String,
        filename: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        encoding: Option<String>,
    },
}

impl MultiPartValue {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Content { name, .. } | Self::File { name, .. } => name,
        }
    }
}

/// A concrete request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Value,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub form_fields: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub multipart: Vec<MultiPartValue>,
}

impl HttpRequest {
    #[must_use]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Value>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_form_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.form_fields.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_part(mut self, part: MultiPartValue) -> Self {
        self.multipart.push(part);
        self
    }

    /// Path segments without empty pieces from leading/trailing slashes.
    #[must_use]
    pub fn path_segments(&self) -> Vec<&str> {
        self.path
            .split('?')
            .next()
            .unwrap_or_default()
            .split('/')
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// `/path?query` as sent on the wire.
    #[must_use]
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query: Vec<String> = self.query.iter().map(|(k, v)| format!("{k}={v}")).collect();
        format!("{}?{}", self.path, query.join("&"))
    }

    /// The body as sent on the wire, with the content type it implies.
    /// Multipart parts win over form fields, which win over the body.
    #[must_use]
    pub fn wire_body(&self) -> Option<(String, String)> {
        if !self.multipart.is_empty() {
            return Some((
                format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
                encode_multipart(&self.multipart),
            ));
        }
        if !self.form_fields.is_empty() {
            let pairs: Vec<String> = self
                .form_fields
                .iter()
                .map(|(k, v)| format!("{}={}", form_encode(k), form_encode(v)))
                .collect();
            return Some(("application/x-www-form-urlencoded".to_string(), pairs.join("&")));
        }
        match &self.body {
            Value::NoBody => None,
            Value::String(text) => Some(("text/plain".to_string(), text.clone())),
            other => Some(("application/json".to_string(), other.to_literal())),
        }
    }
}

fn form_encode(text: &str) -> String {
    text.bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => (b as char).to_string(),
            b' ' => "+".to_string(),
            other => format!("%{other:02X}"),
        })
        .collect()
}

fn encode_multipart(parts: &[MultiPartValue]) -> String {
    let mut lines = Vec::new();
    for part in parts {
        lines.push(format!("--{MULTIPART_BOUNDARY}"));
        match part {
            MultiPartValue::Content {
                name,
                content,
                content_type,
            } => {
                lines.push(format!("Content-Disposition: form-data; name=\"{name}\""));
                if let Some(content_type) = content_type {
                    lines.push(format!("Content-Type: {content_type}"));
                }
                lines.push(String::new());
                lines.push(content.to_literal());
            }
            MultiPartValue::File {
                name,
                filename,
                content_type,
                encoding,
            } => {
                lines.push(format!(
                    "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\""
                ));
                if let Some(content_type) = content_type {
                    lines.push(format!("Content-Type: {content_type}"));
                }
                if let Some(encoding) = encoding {
                    lines.push(format!("Content-Transfer-Encoding: {encoding}"));
                }
                lines.push(String::new());
                lines.push(format!("< ./{filename}"));
            }
        }
    }
    lines.push(format!("--{MULTIPART_BOUNDARY}--"));
    lines.join("\r\n")
}

/// A concrete response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HttpResponse {
    pub status: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Value,
}

impl HttpResponse {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Value>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// The best-effort reply for a request no expectation matched.
    #[must_use]
    pub fn bad_request(report: impl Into<String>) -> Self {
        Self::new(400)
            .with_header("Content-Type", "text/plain")
            .with_body(Value::String(report.into()))
    }
}
