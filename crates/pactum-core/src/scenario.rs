//! One contract case: a request/response pair (or an async message)
//!
//! A `Scenario` is built once from the manifest. Test generation specializes
//! it per example row into throwaway concrete scenarios.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::ContractError;
use crate::http::{HttpRequest, HttpRequestPattern, HttpResponse, HttpResponsePattern};
use crate::messages::StubMessages;
use crate::pattern::{Pattern, Visited};
use crate::resolver::Resolver;
use crate::result::{Bindings, Failure, FailureReason, MatchResult};
use crate::row::Row;
use crate::value::Value;

/// An async message: topic plus body schema.
#[derive(Debug, Clone, PartialEq)]
pub struct MessagePattern {
    pub topic: String,
    pub body: Pattern,
}

/// Where an output binding reads its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingSource {
    /// `response-body.<dotted path>` (empty path: the whole body)
    ResponseBody(String),
    /// `response-header.<Name>`
    ResponseHeader(String),
}

impl FromStr for BindingSource {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "response-body" {
            return Ok(Self::ResponseBody(String::new()));
        }
        if let Some(path) = s.strip_prefix("response-body.") {
            return Ok(Self::ResponseBody(path.to_string()));
        }
        if let Some(name) = s.strip_prefix("response-header.") {
            return Ok(Self::ResponseHeader(name.to_string()));
        }
        Err(ContractError::Definition(format!(
            "binding source \"{s}\" must start with response-body or response-header."
        )))
    }
}

impl fmt::Display for BindingSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResponseBody(path) if path.is_empty() => f.write_str("response-body"),
            Self::ResponseBody(path) => write!(f, "response-body.{path}"),
            Self::ResponseHeader(name) => write!(f, "response-header.{name}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Scenario {
    pub name: String,
    pub request: HttpRequestPattern,
    pub response: HttpResponsePattern,
    /// Server state the scenario expects, consulted as facts
    pub expected_facts: BTreeMap<String, Value>,
    pub examples: Vec<Row>,
    /// Named sub-patterns visible only to this scenario
    pub patterns: BTreeMap<String, Pattern>,
    /// Values available to `$(name)` references in example rows
    pub fixtures: BTreeMap<String, String>,
    pub message: Option<MessagePattern>,
    pub ignore_failure: bool,
    /// Scenarios whose output bindings this one consumes
    pub references: Vec<String>,
    pub bindings: BTreeMap<String, BindingSource>,
    pub is_negative: bool,
    /// Where the scenario was declared, for reports
    pub origin: Option<String>,
}

impl Scenario {
    #[must_use]
    pub fn new(name: impl Into<String>, request: HttpRequestPattern, response: HttpResponsePattern) -> Self {
        Self {
            name: name.into(),
            request,
            response,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_examples(mut self, examples: Vec<Row>) -> Self {
        self.examples = examples;
        self
    }

    #[must_use]
    pub fn with_expected_facts(mut self, facts: BTreeMap<String, Value>) -> Self {
        self.expected_facts = facts;
        self
    }

    #[must_use]
    pub fn with_bindings(mut self, bindings: BTreeMap<String, BindingSource>) -> Self {
        self.bindings = bindings;
        self
    }

    #[must_use]
    pub const fn is_message(&self) -> bool {
        self.message.is_some()
    }

    /// `GET /products/(id:number) -> 200`, or `MESSAGE topic`.
    #[must_use]
    pub fn api_description(&self) -> String {
        match &self.message {
            Some(message) => format!("MESSAGE {}", message.topic),
            None => format!(
                "{} {} -> {}",
                self.request.method,
                self.request.path.template(),
                self.response.status
            ),
        }
    }

    /// Header placed above this scenario's failures in aggregate reports.
    #[must_use]
    pub fn context(&self) -> String {
        format!("In scenario \"{}\"\nAPI: {}", self.name, self.api_description())
    }

    /// This scenario's view of `base`: its own named patterns, and its
    /// expected facts for keys the current server state does not set.
    #[must_use]
    pub fn resolver(&self, base: &Resolver) -> Resolver {
        let mut resolver = base.clone();
        if !self.patterns.is_empty() {
            resolver = resolver.with_patterns(self.patterns.clone());
        }
        if !self.expected_facts.is_empty() {
            resolver = resolver.with_default_facts(&self.expected_facts);
        }
        resolver
    }

    // ── matching ──

    #[must_use]
    pub fn matches_request(&self, request: &HttpRequest, resolver: &Resolver) -> MatchResult {
        self.request.matches(request, resolver)
    }

    /// Undeclared response body keys are tolerated; negative scenarios skip
    /// the body altogether.
    #[must_use]
    pub fn matches_response(&self, response: &HttpResponse, resolver: &Resolver) -> MatchResult {
        let resolver = resolver
            .clone()
            .with_key_check(resolver.key_check().allowing_unexpected())
            .with_negative(self.is_negative || resolver.is_negative());
        self.response.matches(response, &resolver)
    }

    #[must_use]
    pub fn matches_message(&self, topic: &str, body: &Value, resolver: &Resolver) -> MatchResult {
        let Some(message) = &self.message else {
            return MatchResult::failure(format!("Scenario \"{}\" does not describe a message", self.name));
        };
        if message.topic != topic {
            return resolver
                .mismatch(&format!("topic {}", message.topic), &Value::string(topic))
                .breadcrumb("TOPIC");
        }
        message.body.matches(body, resolver).breadcrumb("MESSAGE")
    }

    /// Validate a stub definition. Type tokens such as `"(number)"` are
    /// accepted in place of values. A request that fails while the status
    /// also differs is tagged as noise: the stub is most likely meant for a
    /// different scenario.
    #[must_use]
    pub fn match_stub(&self, request: &HttpRequest, response: &HttpResponse, resolver: &Resolver) -> MatchResult {
        let stub = resolver
            .clone()
            .with_mock_mode(true)
            .with_messages(Arc::new(StubMessages));
        let request_result = self.request.matches(request, &stub);
        if let MatchResult::Failure(failure) = request_result {
            if !self.response.status.accepts(response.status) {
                return MatchResult::Failure(
                    Failure::wrap(
                        format!(
                            "Request did not match and status {} differs from {}",
                            response.status, self.response.status
                        ),
                        failure,
                    )
                    .with_reason(FailureReason::RequestMismatchButStatusAlsoWrong),
                );
            }
            return MatchResult::Failure(failure);
        }
        self.response.matches(response, &stub)
    }

    // ── generation ──

    /// # Errors
    ///
    /// Generation errors.
    pub fn generate_request(&self, resolver: &Resolver) -> Result<HttpRequest, ContractError> {
        self.request.generate(resolver)
    }

    /// # Errors
    ///
    /// Generation errors.
    pub fn generate_response(&self, resolver: &Resolver) -> Result<HttpResponse, ContractError> {
        self.response.generate(resolver)
    }

    /// Concrete positive scenarios for one example row.
    ///
    /// # Errors
    ///
    /// Invalid examples and other contract errors.
    pub fn new_based_on(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Scenario>, ContractError> {
        let responses = self.response.new_based_on(row, resolver)?;
        let response = responses.into_iter().next().unwrap_or_else(|| self.response.clone());
        let requests = self.request.new_based_on(row, resolver)?;
        tracing::debug!(scenario = %self.name, row = %row.name, variants = requests.len(), "specialized scenario");
        Ok(requests
            .into_iter()
            .map(|request| Scenario {
                name: self.labelled(row, None),
                request,
                response: response.clone(),
                examples: Vec::new(),
                ..self.clone()
            })
            .collect())
    }

    /// Concrete negative scenarios: the body is invalid and any 4xx with any
    /// body is expected back.
    ///
    /// # Errors
    ///
    /// Invalid examples and other contract errors.
    pub fn negative_based_on(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Scenario>, ContractError> {
        let negative = resolver.clone().with_negative(true);
        let requests = self.request.negative_based_on(row, &negative)?;
        Ok(requests
            .into_iter()
            .map(|request| Scenario {
                name: self.labelled(row, Some("negative")),
                request,
                response: HttpResponsePattern::client_error(),
                examples: Vec::new(),
                is_negative: true,
                bindings: BTreeMap::new(),
                ..self.clone()
            })
            .collect())
    }

    fn labelled(&self, row: &Row, tag: Option<&str>) -> String {
        let mut name = self.name.clone();
        if !row.name.is_empty() {
            name = format!("{name} [{}]", row.name);
        }
        if let Some(tag) = tag {
            name = format!("{name} ({tag})");
        }
        name
    }

    // ── bindings ──

    /// Values named by the output bindings, read from `response`. Absent
    /// sources are skipped.
    #[must_use]
    pub fn capture_bindings(&self, response: &HttpResponse) -> Bindings {
        self.bindings
            .iter()
            .filter_map(|(name, source)| {
                let value = match source {
                    BindingSource::ResponseBody(path) => response.body.select(path)?.to_literal(),
                    BindingSource::ResponseHeader(header) => response.headers.get(header)?.clone(),
                };
                Some((name.clone(), value))
            })
            .collect()
    }

    // ── compatibility ──

    /// Message scenarios: this (older) body must encompass the other's.
    #[must_use]
    pub fn message_encompasses(&self, newer: &Scenario, this_resolver: &Resolver, other_resolver: &Resolver) -> MatchResult {
        match (&self.message, &newer.message) {
            (Some(older), Some(newer)) => older
                .body
                .encompasses(&newer.body, this_resolver, other_resolver, &mut Visited::new())
                .breadcrumb("MESSAGE"),
            _ => MatchResult::failure("Both scenarios must describe messages"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpPathPattern;
    use crate::pattern::pattern_from_json;
    use serde_json::json;

    fn get_product() -> Scenario {
        Scenario::new(
            "get product",
            HttpRequestPattern::new("GET", HttpPathPattern::parse("/products/(id:number)").unwrap()),
            HttpResponsePattern::new(200)
                .with_body(pattern_from_json(&json!({"id": "(number)", "name": "(string)"})).unwrap()),
        )
    }

    #[test]
    fn describes_its_api() {
        assert_eq!(get_product().api_description(), "GET /products/(id:number) -> 200");
        assert_eq!(
            get_product().context(),
            "In scenario \"get product\"\nAPI: GET /products/(id:number) -> 200"
        );
    }

    #[test]
    fn rows_fan_out_into_named_scenarios() {
        let scenario = get_product().with_examples(vec![Row::named("ten").with("id", "10")]);
        let resolver = Resolver::default();
        let concrete = scenario.new_based_on(&scenario.examples[0], &resolver).unwrap();
        assert_eq!(concrete.len(), 1);
        assert_eq!(concrete[0].name, "get product [ten]");
        assert_eq!(concrete[0].generate_request(&resolver).unwrap().path, "/products/10");
    }

    #[test]
    fn stub_with_wrong_request_and_status_is_noise() {
        let scenario = get_product();
        let resolver = Resolver::default();
        let request = HttpRequest::new("GET", "/products/abc");
        let response = HttpResponse::new(404);
        let result = scenario.match_stub(&request, &response, &resolver);
        assert!(
            result
                .failure_ref()
                .unwrap()
                .has_reason(FailureReason::RequestMismatchButStatusAlsoWrong)
        );
        assert!(result.is_fluffy());

        let ok_status = HttpResponse::new(200).with_body(Value::from(json!({"id": 1, "name": "pen"})));
        assert!(!scenario.match_stub(&request, &ok_status, &resolver).is_fluffy());
    }

    #[test]
    fn stubs_may_use_type_tokens() {
        let response = HttpResponse::new(200).with_body(Value::from(json!({"id": "(number)", "name": "pen"})));
        let request = HttpRequest::new("GET", "/products/(number)");
        assert!(get_product().match_stub(&request, &response, &Resolver::default()).is_success());
    }

    #[test]
    fn bindings_read_body_and_headers() {
        let scenario = get_product().with_bindings(BTreeMap::from([
            ("productId".to_string(), "response-body.id".parse().unwrap()),
            ("etag".to_string(), "response-header.ETag".parse().unwrap()),
        ]));
        let response = HttpResponse::new(200)
            .with_header("ETag", "v1")
            .with_body(Value::from(json!({"id": 7, "name": "pen"})));
        let bindings = scenario.capture_bindings(&response);
        assert_eq!(bindings.get("productId").map(String::as_str), Some("7"));
        assert_eq!(bindings.get("etag").map(String::as_str), Some("v1"));
    }

    #[test]
    fn unknown_binding_source_is_rejected() {
        assert!("request-body.id".parse::<BindingSource>().is_err());
    }
}
