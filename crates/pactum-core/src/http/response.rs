//! Full response contract

use std::collections::BTreeMap;

use super::headers::{CONTENT_TYPE, HttpHeadersPattern};
use super::message::HttpResponse;
use super::request::match_body;
use crate::error::ContractError;
use crate::pattern::{Pattern, Visited};
use crate::resolver::Resolver;
use crate::result::{Failure, FailureReason, MatchResult};
use crate::row::{RESPONSE_BODY, Row};
use crate::value::Value;

/// Status a response must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedStatus {
    Exact(u16),
    /// Any 4xx: what a negative test expects back.
    ClientError,
}

impl ExpectedStatus {
    #[must_use]
    pub const fn accepts(self, status: u16) -> bool {
        match self {
            Self::Exact(code) => code == status,
            Self::ClientError => status >= 400 && status < 500,
        }
    }

    /// The code to send when generating a response.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Exact(code) => code,
            Self::ClientError => 400,
        }
    }
}

impl std::fmt::Display for ExpectedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(code) => write!(f, "{code}"),
            Self::ClientError => f.write_str("4xx"),
        }
    }
}

impl Default for ExpectedStatus {
    fn default() -> Self {
        Self::Exact(200)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HttpResponsePattern {
    pub status: ExpectedStatus,
    pub headers: HttpHeadersPattern,
    pub body: Pattern,
    /// Literal expected body declared by an example
    pub exact_body: Option<Value>,
}

impl HttpResponsePattern {
    #[must_use]
    pub fn new(status: u16) -> Self {
        Self {
            status: ExpectedStatus::Exact(status),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Pattern) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HttpHeadersPattern) -> Self {
        self.headers = headers;
        self
    }

    /// The response a negative test expects: any 4xx, any body.
    #[must_use]
    pub fn client_error() -> Self {
        Self {
            status: ExpectedStatus::ClientError,
            body: Pattern::Anything,
            ..Self::default()
        }
    }

    // ── matches ──

    /// Status (terminal), headers, body, then the exact-value assertion.
    /// A negative resolver skips the body.
    #[must_use]
    pub fn matches(&self, response: &HttpResponse, resolver: &Resolver) -> MatchResult {
        if !self.status.accepts(response.status) {
            return MatchResult::Failure(
                Failure::new(
                    resolver
                        .messages()
                        .mismatch(&format!("status {}", self.status), &format!("status {}", response.status)),
                )
                .with_reason(FailureReason::StatusMismatch)
                .breadcrumb("STATUS")
                .breadcrumb("RESPONSE"),
            );
        }

        let mut failures: Vec<Failure> = Vec::new();
        failures.extend(self.headers.matches(&response.headers, resolver).into_failure());
        if !resolver.is_negative() {
            failures.extend(match_body(&self.body, &response.body, resolver).into_failure());
            if let Some(expected) = &self.exact_body {
                if !expected.same_as(&response.body) {
                    failures.push(
                        Failure::new(
                            resolver
                                .messages()
                                .mismatch(&expected.display_value(), &response.body.display_value()),
                        )
                        .breadcrumb("BODY"),
                    );
                }
            }
        }
        MatchResult::from_failures(failures).breadcrumb("RESPONSE")
    }

    // ── generate ──

    /// A concrete response. Structured bodies get a JSON content type unless
    /// the contract declares one.
    ///
    /// # Errors
    ///
    /// Generation errors from headers or body.
    pub fn generate(&self, resolver: &Resolver) -> Result<HttpResponse, ContractError> {
        let mut headers: BTreeMap<String, String> = self.headers.generate(resolver)?;
        let body = match &self.exact_body {
            Some(body) => body.clone(),
            None => self.body.generate(resolver)?,
        };
        if matches!(body, Value::Object(_) | Value::Array(_)) {
            headers
                .entry(CONTENT_TYPE.to_string())
                .or_insert_with(|| "application/json".to_string());
        }
        Ok(HttpResponse {
            status: self.status.code(),
            headers,
            body,
        })
    }

    // ── new_based_on ──

    /// A whole-body example becomes the exact expected body. Otherwise row
    /// values pin matching body fields.
    ///
    /// # Errors
    ///
    /// Invalid examples.
    pub fn new_based_on(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Self>, ContractError> {
        let headers = self.headers.new_based_on(row, resolver)?;
        let (body, exact_body) = match row.get(RESPONSE_BODY) {
            Some(example) => {
                let example = match example {
                    Value::String(text) => Value::parse_body(text),
                    other => other.clone(),
                };
                let value = self.body.example_value(RESPONSE_BODY, &example, resolver)?;
                (self.body.clone(), Some(value))
            }
            None => {
                let body = self
                    .body
                    .new_based_on(row, resolver)?
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| self.body.clone());
                (body, self.exact_body.clone())
            }
        };
        Ok(headers
            .into_iter()
            .map(|headers| Self {
                status: self.status,
                headers,
                body: body.clone(),
                exact_body: exact_body.clone(),
            })
            .collect())
    }

    // ── encompasses ──

    /// Whether every response `other` can produce is one this side accepts.
    #[must_use]
    pub fn encompasses(&self, other: &Self, this_resolver: &Resolver, other_resolver: &Resolver) -> MatchResult {
        let status_ok = match (self.status, other.status) {
            (ExpectedStatus::ClientError, ExpectedStatus::ClientError) => true,
            (this, ExpectedStatus::Exact(code)) => this.accepts(code),
            (ExpectedStatus::Exact(_), ExpectedStatus::ClientError) => false,
        };
        if !status_ok {
            return MatchResult::Failure(
                Failure::new(
                    this_resolver
                        .messages()
                        .mismatch(&format!("status {}", self.status), &format!("status {}", other.status)),
                )
                .with_reason(FailureReason::StatusMismatch)
                .breadcrumb("STATUS")
                .breadcrumb("RESPONSE"),
            );
        }

        let mut visited = Visited::new();
        let relaxed = this_resolver
            .clone()
            .with_key_check(this_resolver.key_check().allowing_unexpected());
        let mut failures = Vec::new();
        failures.extend(
            self.headers
                .headers
                .encompasses(&other.headers.headers, &relaxed, other_resolver, &mut visited)
                .into_failure()
                .map(|f| f.breadcrumb("HEADERS")),
        );
        failures.extend(
            self.body
                .encompasses(&other.body, this_resolver, other_resolver, &mut visited)
                .into_failure()
                .map(|f| f.breadcrumb("BODY")),
        );
        MatchResult::from_failures(failures).breadcrumb("RESPONSE")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::pattern_from_json;
    use serde_json::json;

    fn product() -> HttpResponsePattern {
        HttpResponsePattern::new(200).with_body(pattern_from_json(&json!({"name": "(string)"})).unwrap())
    }

    #[test]
    fn status_mismatch_is_terminal() {
        let response = HttpResponse::new(500).with_body(Value::string("boom"));
        let result = product().matches(&response, &Resolver::default());
        assert_eq!(result.report(), ">> RESPONSE.STATUS\n\n   Expected status 200, actual was status 500");
        assert!(result.failure_ref().unwrap().has_reason(FailureReason::StatusMismatch));
    }

    #[test]
    fn negative_expectations_ignore_the_body() {
        let response = HttpResponse::new(422).with_body(Value::string("bad"));
        let resolver = Resolver::default().with_negative(true);
        assert!(HttpResponsePattern::client_error().matches(&response, &resolver).is_success());
        assert!(!HttpResponsePattern::client_error().matches(&HttpResponse::new(200), &resolver).is_success());
    }

    #[test]
    fn generated_response_matches_and_is_json() {
        let resolver = Resolver::default();
        let response = product().generate(&resolver).unwrap();
        assert_eq!(response.headers.get(CONTENT_TYPE).map(String::as_str), Some("application/json"));
        assert!(product().matches(&response, &resolver).is_success());
    }

    #[test]
    fn response_body_example_is_asserted_exactly() {
        let resolver = Resolver::default();
        let row = Row::default().with(RESPONSE_BODY, r#"{"name": "pen"}"#);
        let pinned = product().new_based_on(&row, &resolver).unwrap().remove(0);
        let other = HttpResponse::new(200).with_body(Value::from(json!({"name": "ink"})));
        assert_eq!(
            pinned.matches(&other, &resolver).report(),
            ">> RESPONSE.BODY\n\n   Expected {\"name\":\"pen\"}, actual was {\"name\":\"ink\"}"
        );
    }

    #[test]
    fn added_response_field_is_compatible_narrowed_type_is_not() {
        let resolver = Resolver::default();
        let older = HttpResponsePattern::new(200).with_body(pattern_from_json(&json!({"id": "(number)"})).unwrap());
        let wider = HttpResponsePattern::new(200)
            .with_body(pattern_from_json(&json!({"id": "(number)", "email": "(string)"})).unwrap());
        let narrowed = HttpResponsePattern::new(200).with_body(pattern_from_json(&json!({"id": "(string)"})).unwrap());
        let relaxed = resolver.clone().with_key_check(resolver.key_check().allowing_unexpected());
        assert!(older.encompasses(&wider, &relaxed, &resolver).is_success());
        assert!(!older.encompasses(&narrowed, &relaxed, &resolver).is_success());
    }
}
