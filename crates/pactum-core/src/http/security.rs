//! Security schemes
//!
//! A request must satisfy at least one declared scheme. The credential of
//! the scheme that matched is stripped before the remaining checks run, so
//! it never shows up as an unexpected header or query param.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use super::message::HttpRequest;
use crate::datagen;
use crate::resolver::Resolver;

pub const AUTHORIZATION: &str = "Authorization";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SecurityScheme {
    /// `Authorization: Bearer <token>`
    Bearer,
    /// `Authorization: Basic <base64(user:password)>`
    Basic,
    /// API key in a named header
    ApiKeyHeader { name: String },
    /// API key in a named query parameter
    ApiKeyQuery { name: String },
}

impl SecurityScheme {
    /// Header or query param carrying the credential.
    #[must_use]
    pub fn parameter(&self) -> &str {
        match self {
            Self::Bearer | Self::Basic => AUTHORIZATION,
            Self::ApiKeyHeader { name } | Self::ApiKeyQuery { name } => name,
        }
    }

    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Bearer => "a bearer token in the Authorization header".to_string(),
            Self::Basic => "basic credentials in the Authorization header".to_string(),
            Self::ApiKeyHeader { name } => format!("an api key in header \"{name}\""),
            Self::ApiKeyQuery { name } => format!("an api key in query param \"{name}\""),
        }
    }

    /// The request without this scheme's credential, if it carries a
    /// well-formed one.
    #[must_use]
    pub fn strip(&self, request: &HttpRequest) -> Option<HttpRequest> {
        let present = match self {
            Self::Bearer => request
                .headers
                .get(AUTHORIZATION)
                .and_then(|v| v.strip_prefix("Bearer "))
                .is_some_and(|token| !token.trim().is_empty()),
            Self::Basic => request
                .headers
                .get(AUTHORIZATION)
                .and_then(|v| v.strip_prefix("Basic "))
                .and_then(|encoded| STANDARD.decode(encoded.trim()).ok())
                .and_then(|bytes| String::from_utf8(bytes).ok())
                .is_some_and(|pair| pair.contains(':')),
            Self::ApiKeyHeader { name } => request.headers.get(name).is_some_and(|v| !v.is_empty()),
            Self::ApiKeyQuery { name } => request.query.get(name).is_some_and(|v| !v.is_empty()),
        };
        if !present {
            return None;
        }
        let mut stripped = request.clone();
        match self {
            Self::ApiKeyQuery { name } => {
                stripped.query.remove(name);
            }
            _ => {
                stripped.headers.remove(self.parameter());
            }
        }
        Some(stripped)
    }

    /// Add a credential to `request`: `credential` when given, else a stored
    /// fact for the parameter name, else a generated one.
    #[must_use]
    pub fn add_to(&self, mut request: HttpRequest, credential: Option<&str>, resolver: &Resolver) -> HttpRequest {
        let credential = credential
            .map(str::to_string)
            .or_else(|| resolver.fact(self.parameter()).map(|v| v.to_literal()))
            .unwrap_or_else(|| self.generate_credential());
        match self {
            Self::ApiKeyQuery { name } => {
                request.query.insert(name.clone(), credential);
            }
            _ => {
                request.headers.insert(self.parameter().to_string(), credential);
            }
        }
        request
    }

    fn generate_credential(&self) -> String {
        let mut rng = rand::thread_rng();
        match self {
            Self::Bearer => format!("Bearer {}", datagen::random_alnum(&mut rng, 32)),
            Self::Basic => {
                let pair = format!("user:{}", datagen::random_alnum(&mut rng, 12));
                format!("Basic {}", STANDARD.encode(pair))
            }
            Self::ApiKeyHeader { .. } | Self::ApiKeyQuery { .. } => datagen::random_alnum(&mut rng, 24),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_is_stripped() {
        let request = HttpRequest::new("GET", "/me").with_header(AUTHORIZATION, "Bearer abc");
        let stripped = SecurityScheme::Bearer.strip(&request).unwrap();
        assert!(stripped.headers.is_empty());
        assert!(SecurityScheme::Basic.strip(&request).is_none());
    }

    #[test]
    fn basic_requires_user_and_password() {
        let good = HttpRequest::new("GET", "/me")
            .with_header(AUTHORIZATION, format!("Basic {}", STANDARD.encode("ann:secret")));
        let bad = HttpRequest::new("GET", "/me")
            .with_header(AUTHORIZATION, format!("Basic {}", STANDARD.encode("ann")));
        assert!(SecurityScheme::Basic.strip(&good).is_some());
        assert!(SecurityScheme::Basic.strip(&bad).is_none());
    }

    #[test]
    fn api_key_in_query() {
        let scheme = SecurityScheme::ApiKeyQuery { name: "key".into() };
        let request = scheme.add_to(HttpRequest::new("GET", "/items"), None, &Resolver::default());
        assert!(request.query.contains_key("key"));
        assert!(scheme.strip(&request).is_some_and(|r| r.query.is_empty()));
    }

    #[test]
    fn generated_credentials_satisfy_their_scheme() {
        for scheme in [
            SecurityScheme::Bearer,
            SecurityScheme::Basic,
            SecurityScheme::ApiKeyHeader { name: "X-API-Key".into() },
        ] {
            let request = scheme.add_to(HttpRequest::new("GET", "/"), None, &Resolver::default());
            assert!(scheme.strip(&request).is_some(), "{scheme:?}");
        }
    }
}
