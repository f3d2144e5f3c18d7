//! Stub responder
//!
//! Expectations are validated against the contract when registered. An
//! incoming request gets the first expectation it matches, else a response
//! synthesized from the contract, else a 400 explaining the mismatch.

use pactum_core::{Feature, HttpRequest, HttpResponse, NOT_RECOGNIZED};
use serde::{Deserialize, Serialize};

use crate::RunnerError;

/// A request/response pair a test registers with the stub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StubExpectation {
    pub request: HttpRequest,
    pub response: HttpResponse,
}

pub struct StubResponder {
    feature: Feature,
    expectations: Vec<StubExpectation>,
}

impl StubResponder {
    #[must_use]
    pub fn new(feature: Feature) -> Self {
        Self {
            feature,
            expectations: Vec::new(),
        }
    }

    /// Register an expectation the contract accepts.
    ///
    /// # Errors
    ///
    /// `StubRejected` with the fluff-filtered report when no scenario accepts
    /// both the request and the response.
    pub fn register(&mut self, expectation: StubExpectation) -> Result<(), RunnerError> {
        let results = self.feature.match_stub(&expectation.request, &expectation.response);
        if !results.has_success() {
            return Err(RunnerError::StubRejected(results.report(NOT_RECOGNIZED)));
        }
        tracing::debug!(
            method = %expectation.request.method,
            path = %expectation.request.path,
            "stub expectation registered"
        );
        self.expectations.push(expectation);
        Ok(())
    }

    #[must_use]
    pub fn expectations(&self) -> &[StubExpectation] {
        &self.expectations
    }

    pub fn respond(&mut self, request: &HttpRequest) -> HttpResponse {
        if let Some(expectation) = self.expectations.iter().find(|e| same_request(&e.request, request)) {
            return expectation.response.clone();
        }
        let response = self.feature.stub_response(request);
        if response.status == 400 {
            tracing::info!(method = %request.method, path = %request.path, "stub request not recognized");
        }
        response
    }
}

fn same_request(expected: &HttpRequest, actual: &HttpRequest) -> bool {
    expected.method.eq_ignore_ascii_case(&actual.method)
        && expected.path == actual.path
        && expected.query == actual.query
        && expected.form_fields == actual.form_fields
        && expected.body.same_as(&actual.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pactum_core::{ContractManifest, EngineConfig, Value};
    use serde_json::json;
    use std::path::Path;

    const PRODUCTS: &str = r#"
name: products
scenarios:
  - name: get product
    request: { path: "/products/(id:number)" }
    response: { body: { name: "(string)" } }
"#;

    fn responder() -> StubResponder {
        let feature = ContractManifest::parse(Path::new("c.yaml"), PRODUCTS)
            .unwrap()
            .to_feature(&EngineConfig::default())
            .unwrap();
        StubResponder::new(feature)
    }

    #[test]
    fn registered_expectation_is_replayed() {
        let mut stub = responder();
        let response = HttpResponse::new(200).with_body(Value::from(json!({"name": "pen"})));
        stub.register(StubExpectation {
            request: HttpRequest::new("GET", "/products/10"),
            response: response.clone(),
        })
        .unwrap();

        assert_eq!(stub.respond(&HttpRequest::new("GET", "/products/10")), response);
        assert_ne!(stub.respond(&HttpRequest::new("GET", "/products/11")), response);
    }

    #[test]
    fn expectation_outside_the_contract_is_rejected() {
        let mut stub = responder();
        let err = stub
            .register(StubExpectation {
                request: HttpRequest::new("GET", "/products/10"),
                response: HttpResponse::new(200).with_body(Value::from(json!({"name": 5}))),
            })
            .unwrap_err();
        assert!(matches!(err, RunnerError::StubRejected(ref report) if report.contains(">> RESPONSE.BODY.name")));
        assert!(stub.expectations().is_empty());
    }

    #[test]
    fn unknown_request_gets_400() {
        let mut stub = responder();
        let response = stub.respond(&HttpRequest::new("DELETE", "/nothing"));
        assert_eq!(response.status, 400);
        assert_eq!(response.body, Value::string(NOT_RECOGNIZED));
    }
}
