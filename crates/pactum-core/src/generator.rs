//! HTTP file generator - renders generated contract tests in .http format

use crate::error::ContractError;
use crate::feature::Feature;
use crate::http::headers::CONTENT_TYPE;
use crate::http::{ExpectedStatus, HttpRequest};
use crate::scenario::Scenario;

/// One generated test reduced to what a reproduction needs.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedRequest {
    pub scenario: String,
    pub request: HttpRequest,
    pub expected_status: ExpectedStatus,
}

impl GeneratedRequest {
    /// Generate the concrete request of a specialized scenario.
    ///
    /// # Errors
    ///
    /// Generation errors, e.g. a non-terminating type cycle.
    pub fn from_scenario(feature: &Feature, scenario: &Scenario) -> Result<Self, ContractError> {
        let resolver = scenario.resolver(&feature.resolver());
        Ok(Self {
            scenario: scenario.name.clone(),
            request: scenario.generate_request(&resolver)?,
            expected_status: scenario.response.status,
        })
    }
}

/// Generate .http file content from generated requests
#[must_use]
pub fn to_http_file(requests: &[GeneratedRequest], base_url_var: &str) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "# Generated contract tests ({} requests)",
        requests.len()
    ));
    lines.push(format!("# Base URL variable: {{{{{base_url_var}}}}}"));
    lines.push(String::new());

    for (idx, generated) in requests.iter().enumerate() {
        let request = &generated.request;
        lines.push(format!("### [{idx}] {}", generated.scenario));
        lines.push(format!("# Expect status {}", generated.expected_status));
        lines.push(format!(
            "{} {{{{{base_url_var}}}}}{}",
            request.method,
            request.path_and_query()
        ));

        for (key, value) in &request.headers {
            if !matches!(key.to_lowercase().as_str(), "host" | "content-length") {
                lines.push(format!("{key}: {value}"));
            }
        }

        if let Some((content_type, body)) = request.wire_body() {
            if !request.headers.keys().any(|k| k.eq_ignore_ascii_case(CONTENT_TYPE)) {
                lines.push(format!("{CONTENT_TYPE}: {content_type}"));
            }
            lines.push(String::new());
            lines.extend(body.split("\r\n").map(str::to_string));
        }

        lines.push(String::new());
    }

    lines.join("\n")
}
