//! Sending concrete requests to a live server

use std::collections::BTreeMap;
use std::time::Duration;

use pactum_core::{EngineConfig, HttpRequest, HttpResponse, Value};

use crate::RunnerError;

/// Executes one request and returns the server's response.
pub trait Transport {
    /// # Errors
    ///
    /// Connection failures and requests that cannot be encoded.
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, RunnerError>;
}

/// Blocking `reqwest` transport against a base URL.
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
    base_url: String,
    headers: BTreeMap<String, String>,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn from_config(config: &EngineConfig) -> Result<Self, RunnerError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RunnerError::Http(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            headers: config.headers.clone().into_iter().collect(),
        })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, RunnerError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|_| RunnerError::InvalidRequest(format!("invalid HTTP method '{}'", request.method)))?;
        let url = format!("{}{}", self.base_url, request.path);

        let mut req = self.client.request(method, &url);
        // Configured headers first so the contract's own headers win.
        for (k, v) in self.headers.iter().chain(&request.headers) {
            if reqwest::header::HeaderValue::from_str(v).is_ok() {
                req = req.header(k, v);
            }
        }
        for (k, v) in &request.query {
            req = req.query(&[(k, v)]);
        }
        if let Some((content_type, body)) = request.wire_body() {
            if !request.headers.keys().any(|k| k.eq_ignore_ascii_case("content-type")) {
                req = req.header("Content-Type", content_type);
            }
            req = req.body(body);
        }

        let resp = req.send().map_err(|e| RunnerError::Http(e.to_string()))?;

        let status = resp.status().as_u16();
        let headers: BTreeMap<String, String> = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
            .collect();
        let body_text = resp.text().map_err(|e| RunnerError::Http(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body: Value::parse_body(&body_text),
        })
    }
}
