//! Query parameters

use std::collections::BTreeMap;

use super::{generate_text_map, match_text_map, text_map_variants};
use crate::error::ContractError;
use crate::pattern::{ObjectPattern, Pattern};
use crate::resolver::Resolver;
use crate::result::MatchResult;
use crate::row::Row;

/// Independent name→pattern map. `additional`, when present, accepts
/// arbitrarily named extras.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HttpQueryParamPattern {
    pub params: ObjectPattern,
    pub additional: Option<Pattern>,
}

impl HttpQueryParamPattern {
    #[must_use]
    pub fn new(params: ObjectPattern) -> Self {
        Self {
            params,
            additional: None,
        }
    }

    #[must_use]
    pub fn with_additional(mut self, pattern: Pattern) -> Self {
        self.additional = Some(pattern);
        self
    }

    #[must_use]
    pub fn matches(&self, query: &BTreeMap<String, String>, resolver: &Resolver) -> MatchResult {
        MatchResult::from_failures(match_text_map(
            &self.params,
            query,
            self.additional.as_ref(),
            "query param",
            resolver,
        ))
        .breadcrumb("QUERY-PARAMS")
    }

    /// # Errors
    ///
    /// Generation errors from parameter patterns.
    pub fn generate(&self, resolver: &Resolver) -> Result<BTreeMap<String, String>, ContractError> {
        generate_text_map(&self.params, resolver)
    }

    /// # Errors
    ///
    /// Invalid examples.
    pub fn new_based_on(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Self>, ContractError> {
        if self.params.fields().is_empty() {
            return Ok(vec![self.clone()]);
        }
        Ok(text_map_variants(&self.params, row, resolver)?
            .into_iter()
            .map(|params| Self {
                params,
                additional: self.additional.clone(),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Field;

    fn pattern() -> HttpQueryParamPattern {
        HttpQueryParamPattern::new(
            ObjectPattern::new(vec![
                Field::required("limit", Pattern::integer()),
                Field::optional("sort", Pattern::string()),
            ])
            .unwrap(),
        )
    }

    #[test]
    fn typed_params_are_parsed() {
        let query = BTreeMap::from([("limit".to_string(), "ten".to_string())]);
        assert_eq!(
            pattern().matches(&query, &Resolver::default()).report(),
            ">> QUERY-PARAMS.limit\n\n   Expected integer, actual was \"ten\""
        );
    }

    #[test]
    fn additional_pattern_accepts_extras() {
        let query = BTreeMap::from([
            ("limit".to_string(), "10".to_string()),
            ("debug".to_string(), "true".to_string()),
        ]);
        let resolver = Resolver::default();
        assert!(!pattern().matches(&query, &resolver).is_success());
        assert!(
            pattern()
                .with_additional(Pattern::Boolean)
                .matches(&query, &resolver)
                .is_success()
        );
    }

    #[test]
    fn optional_params_vary() {
        let variants = pattern()
            .new_based_on(&Row::default(), &Resolver::default())
            .unwrap();
        assert_eq!(variants.len(), 2);
    }
}
