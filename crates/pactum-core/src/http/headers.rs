//! HTTP headers
//!
//! Header names are case-sensitive: `x-request-id` does not satisfy a
//! declared `X-Request-Id`. Callers holding wire headers in another case
//! rename them first. Undeclared headers are always tolerated.

use std::collections::{BTreeMap, BTreeSet};

use super::{generate_text_map, match_text_map, text_map_variants};
use crate::error::ContractError;
use crate::pattern::ObjectPattern;
use crate::resolver::Resolver;
use crate::result::{Failure, FailureReason, MatchResult};
use crate::row::Row;

pub const CONTENT_TYPE: &str = "Content-Type";
pub const SOAP_ACTION: &str = "SOAPAction";

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HttpHeadersPattern {
    pub headers: ObjectPattern,
    /// When set, only these names are considered: the headers the original
    /// contract declared, when checking a request generated from it.
    pub ancestor_headers: Option<BTreeSet<String>>,
}

impl HttpHeadersPattern {
    #[must_use]
    pub fn new(headers: ObjectPattern) -> Self {
        Self {
            headers,
            ancestor_headers: None,
        }
    }

    #[must_use]
    pub fn with_ancestor_headers(mut self, names: BTreeSet<String>) -> Self {
        self.ancestor_headers = Some(names);
        self
    }

    /// Names this pattern declares.
    #[must_use]
    pub fn declared_names(&self) -> BTreeSet<String> {
        self.headers.fields().iter().map(|f| f.name.clone()).collect()
    }

    /// Actual headers restricted to the ancestor's names when set. Names
    /// compare exactly.
    fn visible(&self, actual: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let Some(ancestors) = &self.ancestor_headers else {
            return actual.clone();
        };
        actual
            .iter()
            .filter(|(name, _)| ancestors.contains(*name))
            // a transport-injected default the contract never declared
            .filter(|(name, _)| name.as_str() != CONTENT_TYPE || self.headers.field(name).is_some())
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    #[must_use]
    pub fn matches(&self, actual: &BTreeMap<String, String>, resolver: &Resolver) -> MatchResult {
        let relaxed = resolver
            .clone()
            .with_key_check(resolver.key_check().allowing_unexpected());
        let visible = self.visible(actual);
        let soap_action_sent =
            self.headers.field(SOAP_ACTION).is_some() && visible.contains_key(SOAP_ACTION);
        let failures: Vec<Failure> =
            match_text_map(&self.headers, &visible, None, "header", &relaxed)
                .into_iter()
                .map(|failure| {
                    if soap_action_sent && is_about(&failure, SOAP_ACTION) {
                        failure.with_reason(FailureReason::SoapActionMismatch)
                    } else {
                        failure
                    }
                })
                .collect();
        MatchResult::from_failures(failures).breadcrumb("HEADERS")
    }

    /// # Errors
    ///
    /// Generation errors from header patterns.
    pub fn generate(&self, resolver: &Resolver) -> Result<BTreeMap<String, String>, ContractError> {
        generate_text_map(&self.headers, resolver)
    }

    /// # Errors
    ///
    /// Invalid examples.
    pub fn new_based_on(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Self>, ContractError> {
        if self.headers.fields().is_empty() {
            return Ok(vec![self.clone()]);
        }
        Ok(text_map_variants(&self.headers, row, resolver)?
            .into_iter()
            .map(|headers| Self {
                headers,
                ancestor_headers: self.ancestor_headers.clone(),
            })
            .collect())
    }
}

fn is_about(failure: &Failure, name: &str) -> bool {
    failure.chains().iter().all(|(path, _)| path == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::{Field, Pattern};

    fn pattern() -> HttpHeadersPattern {
        HttpHeadersPattern::new(
            ObjectPattern::new(vec![
                Field::required("X-Request-Id", Pattern::format(crate::pattern::FormatKind::Uuid)),
                Field::optional(SOAP_ACTION, Pattern::exact("\"getProduct\"")),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn undeclared_headers_are_tolerated() {
        let actual = BTreeMap::from([
            ("X-Request-Id".to_string(), "0b6f1f3e-5e1a-4a8e-9d2c-2f4b3c1d9e7a".to_string()),
            ("User-Agent".to_string(), "curl".to_string()),
        ]);
        assert!(pattern().matches(&actual, &Resolver::default()).is_success());
    }

    #[test]
    fn names_are_case_sensitive() {
        let lowercase = BTreeMap::from([(
            "x-request-id".to_string(),
            "0b6f1f3e-5e1a-4a8e-9d2c-2f4b3c1d9e7a".to_string(),
        )]);
        assert_eq!(
            pattern().matches(&lowercase, &Resolver::default()).report(),
            ">> HEADERS.X-Request-Id\n\n   Expected header named \"X-Request-Id\" was missing"
        );

        let wrong = BTreeMap::from([("X-Request-Id".to_string(), "nope".to_string())]);
        assert!(pattern().matches(&wrong, &Resolver::default()).report().starts_with(">> HEADERS.X-Request-Id"));
    }

    #[test]
    fn missing_header_is_reported() {
        assert_eq!(
            pattern().matches(&BTreeMap::new(), &Resolver::default()).report(),
            ">> HEADERS.X-Request-Id\n\n   Expected header named \"X-Request-Id\" was missing"
        );
    }

    #[test]
    fn soap_action_mismatch_is_categorized() {
        let actual = BTreeMap::from([
            ("X-Request-Id".to_string(), "0b6f1f3e-5e1a-4a8e-9d2c-2f4b3c1d9e7a".to_string()),
            (SOAP_ACTION.to_string(), "\"listProducts\"".to_string()),
        ]);
        let result = pattern().matches(&actual, &Resolver::default());
        assert!(result.is_fluffy());
    }

    #[test]
    fn ancestor_headers_filter_and_drop_default_content_type() {
        let declared = HttpHeadersPattern::new(ObjectPattern::default())
            .with_ancestor_headers(BTreeSet::from(["X-Trace".to_string(), CONTENT_TYPE.to_string()]));
        let actual = BTreeMap::from([
            ("X-Other".to_string(), "1".to_string()),
            (CONTENT_TYPE.to_string(), "application/json".to_string()),
        ]);
        assert!(declared.visible(&actual).is_empty());
    }
}
