//! Full request contract
//!
//! Matching is an ordered list of named steps over a [`MatchState`]. A step
//! either appends failures and continues, or stops the pipeline: a wrong
//! path or method means this is a different endpoint, and nothing past that
//! point is worth reporting.

use std::ops::ControlFlow;

use super::headers::HttpHeadersPattern;
use super::message::HttpRequest;
use super::multipart::MultiPartFormPattern;
use super::path::HttpPathPattern;
use super::query::HttpQueryParamPattern;
use super::security::SecurityScheme;
use super::{generate_text_map, match_text_map, text_map_variants};
use crate::error::ContractError;
use crate::pattern::combinations::bounded_product;
use crate::pattern::{ObjectPattern, Pattern};
use crate::resolver::Resolver;
use crate::result::{Failure, FailureReason, MatchResult};
use crate::row::{REQUEST_BODY, Row};
use crate::value::Value;

/// Request being matched plus failures so far. Steps may rewrite the
/// request (security strips the credential).
#[derive(Debug)]
pub struct MatchState {
    pub request: HttpRequest,
    pub failures: Vec<Failure>,
}

type Step = fn(&HttpRequestPattern, MatchState, &Resolver) -> ControlFlow<Failure, MatchState>;

const STEPS: [(&str, Step); 8] = [
    ("path", HttpRequestPattern::match_path),
    ("method", HttpRequestPattern::match_method),
    ("security", HttpRequestPattern::match_security),
    ("query", HttpRequestPattern::match_query),
    ("headers", HttpRequestPattern::match_headers),
    ("form-fields", HttpRequestPattern::match_form_fields),
    ("multipart", HttpRequestPattern::match_multipart),
    ("body", HttpRequestPattern::match_body),
];

#[derive(Debug, Clone, PartialEq, Default)]
pub struct HttpRequestPattern {
    pub method: String,
    pub path: HttpPathPattern,
    pub query: HttpQueryParamPattern,
    pub headers: HttpHeadersPattern,
    pub body: Pattern,
    pub form_fields: ObjectPattern,
    pub multipart: MultiPartFormPattern,
    pub security: Vec<SecurityScheme>,
    /// Credential used when generating, taken from an example row
    pub credential: Option<String>,
}

impl HttpRequestPattern {
    #[must_use]
    pub fn new(method: &str, path: HttpPathPattern) -> Self {
        Self {
            method: method.to_uppercase(),
            path,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Pattern) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: HttpQueryParamPattern) -> Self {
        self.query = query;
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HttpHeadersPattern) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_form_fields(mut self, form_fields: ObjectPattern) -> Self {
        self.form_fields = form_fields;
        self
    }

    #[must_use]
    pub fn with_multipart(mut self, multipart: MultiPartFormPattern) -> Self {
        self.multipart = multipart;
        self
    }

    #[must_use]
    pub fn with_security(mut self, schemes: Vec<SecurityScheme>) -> Self {
        self.security = schemes;
        self
    }

    /// Same method and path arity: worth a full match attempt.
    #[must_use]
    pub fn is_candidate(&self, request: &HttpRequest) -> bool {
        self.method.eq_ignore_ascii_case(&request.method) && self.path.matches_arity(&request.path)
    }

    // ── matches ──

    #[must_use]
    pub fn matches(&self, request: &HttpRequest, resolver: &Resolver) -> MatchResult {
        let mut state = MatchState {
            request: request.clone(),
            failures: Vec::new(),
        };
        for (name, step) in STEPS {
            match step(self, state, resolver) {
                ControlFlow::Continue(next) => state = next,
                ControlFlow::Break(failure) => {
                    tracing::trace!(step = name, "request match stopped");
                    return MatchResult::Failure(failure.breadcrumb("REQUEST"));
                }
            }
        }
        MatchResult::from_failures(state.failures).breadcrumb("REQUEST")
    }

    fn match_path(&self, state: MatchState, resolver: &Resolver) -> ControlFlow<Failure, MatchState> {
        match self.path.matches(&state.request.path, resolver).into_failure() {
            Some(failure) => ControlFlow::Break(failure),
            None => ControlFlow::Continue(state),
        }
    }

    fn match_method(&self, state: MatchState, resolver: &Resolver) -> ControlFlow<Failure, MatchState> {
        if self.method.eq_ignore_ascii_case(&state.request.method) {
            return ControlFlow::Continue(state);
        }
        ControlFlow::Break(
            Failure::new(resolver.messages().mismatch(&self.method, &state.request.method))
                .with_reason(FailureReason::MethodMismatch)
                .breadcrumb("METHOD"),
        )
    }

    fn match_security(&self, mut state: MatchState, resolver: &Resolver) -> ControlFlow<Failure, MatchState> {
        if self.security.is_empty() {
            return ControlFlow::Continue(state);
        }
        match self.security.iter().find_map(|scheme| scheme.strip(&state.request)) {
            Some(stripped) => state.request = stripped,
            None => {
                let expected = self
                    .security
                    .iter()
                    .map(SecurityScheme::describe)
                    .collect::<Vec<_>>()
                    .join(" or ");
                state.failures.push(
                    Failure::new(resolver.messages().mismatch(&expected, "no credentials"))
                        .breadcrumb("SECURITY"),
                );
            }
        }
        ControlFlow::Continue(state)
    }

    fn match_query(&self, mut state: MatchState, resolver: &Resolver) -> ControlFlow<Failure, MatchState> {
        state
            .failures
            .extend(self.query.matches(&state.request.query, resolver).into_failure());
        ControlFlow::Continue(state)
    }

    fn match_headers(&self, mut state: MatchState, resolver: &Resolver) -> ControlFlow<Failure, MatchState> {
        state
            .failures
            .extend(self.headers.matches(&state.request.headers, resolver).into_failure());
        ControlFlow::Continue(state)
    }

    fn match_form_fields(&self, mut state: MatchState, resolver: &Resolver) -> ControlFlow<Failure, MatchState> {
        if self.form_fields.fields().is_empty() && state.request.form_fields.is_empty() {
            return ControlFlow::Continue(state);
        }
        let failures = match_text_map(
            &self.form_fields,
            &state.request.form_fields,
            None,
            "form field",
            resolver,
        );
        state.failures.extend(
            MatchResult::from_failures(failures)
                .breadcrumb("FORM-FIELDS")
                .into_failure(),
        );
        ControlFlow::Continue(state)
    }

    fn match_multipart(&self, mut state: MatchState, resolver: &Resolver) -> ControlFlow<Failure, MatchState> {
        if self.multipart.is_empty() && state.request.multipart.is_empty() {
            return ControlFlow::Continue(state);
        }
        state
            .failures
            .extend(self.multipart.matches(&state.request.multipart, resolver).into_failure());
        ControlFlow::Continue(state)
    }

    fn match_body(&self, mut state: MatchState, resolver: &Resolver) -> ControlFlow<Failure, MatchState> {
        state
            .failures
            .extend(match_body(&self.body, &state.request.body, resolver).into_failure());
        ControlFlow::Continue(state)
    }

    // ── generate ──

    /// A concrete request.
    ///
    /// # Errors
    ///
    /// Generation errors from any part of the pattern.
    pub fn generate(&self, resolver: &Resolver) -> Result<HttpRequest, ContractError> {
        let mut request = HttpRequest {
            method: self.method.clone(),
            path: self.path.generate(resolver)?,
            query: self.query.generate(resolver)?,
            headers: self.headers.generate(resolver)?,
            body: self.body.generate(resolver)?,
            form_fields: generate_text_map(&self.form_fields, resolver)?,
            multipart: self.multipart.generate(resolver)?,
        };
        if let Some(scheme) = self.security.first() {
            request = scheme.add_to(request, self.credential.as_deref(), resolver);
        }
        Ok(request)
    }

    // ── new_based_on ──

    /// Positive variants: a bounded product of every part's variants.
    ///
    /// # Errors
    ///
    /// Invalid examples and other contract errors.
    pub fn new_based_on(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Self>, ContractError> {
        let limit = resolver.max_combinations();
        let paths = self.path.new_based_on(row, resolver)?;
        let queries = self.query.new_based_on(row, resolver)?;
        let headers = self.headers.new_based_on(row, resolver)?;
        let forms = if self.form_fields.fields().is_empty() {
            vec![self.form_fields.clone()]
        } else {
            text_map_variants(&self.form_fields, row, resolver)?
        };
        let multiparts = self.multipart.new_based_on(row, resolver)?;
        let bodies = self.body_variants(row, resolver)?;
        let credential = self
            .security
            .iter()
            .find_map(|scheme| row.get(scheme.parameter()))
            .map(Value::to_literal)
            .or_else(|| self.credential.clone());

        let indices = bounded_product(
            &[
                (0..paths.len()).collect::<Vec<_>>(),
                (0..queries.len()).collect(),
                (0..headers.len()).collect(),
                (0..forms.len()).collect(),
                (0..multiparts.len()).collect(),
                (0..bodies.len()).collect(),
            ],
            limit,
        );
        Ok(indices
            .into_iter()
            .map(|pick| Self {
                method: self.method.clone(),
                path: paths[pick[0]].clone(),
                query: queries[pick[1]].clone(),
                headers: headers[pick[2]].clone(),
                form_fields: forms[pick[3]].clone(),
                multipart: multiparts[pick[4]].clone(),
                body: bodies[pick[5]].clone(),
                security: self.security.clone(),
                credential: credential.clone(),
            })
            .collect())
    }

    /// A whole-body example is validated and used as is; in generative mode
    /// machine-generated variants are folded in alongside it.
    fn body_variants(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Pattern>, ContractError> {
        match row.get(REQUEST_BODY) {
            Some(example) => {
                let example = match example {
                    Value::String(text) => Value::parse_body(text),
                    other => other.clone(),
                };
                let exact = Pattern::exact(self.body.example_value(REQUEST_BODY, &example, resolver)?);
                resolver
                    .strategy()
                    .positive_variants(vec![exact], || self.body.new_based_on(row, resolver), resolver)
            }
            None => self.body.new_based_on(row, resolver),
        }
    }

    // ── negative_based_on ──

    /// Variants whose body violates its schema in one place. Path, method,
    /// query, headers, form fields and multipart parts stay valid.
    ///
    /// # Errors
    ///
    /// Invalid examples and other contract errors.
    pub fn negative_based_on(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Self>, ContractError> {
        let Some(base) = self.new_based_on(row, resolver)?.into_iter().next() else {
            return Ok(Vec::new());
        };
        let body_row = match row.get(REQUEST_BODY) {
            Some(_) => Row {
                name: row.name.clone(),
                columns: row
                    .columns
                    .iter()
                    .filter(|(column, _)| column.as_str() != REQUEST_BODY)
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            },
            None => row.clone(),
        };
        Ok(self
            .body
            .negative_based_on(&body_row, resolver)?
            .into_iter()
            .map(|body| Self {
                body,
                ..base.clone()
            })
            .collect())
    }
}

/// Match a body, reading text bodies through the pattern's parser when the
/// raw value does not match.
pub(crate) fn match_body(pattern: &Pattern, body: &Value, resolver: &Resolver) -> MatchResult {
    let result = pattern.matches(body, resolver);
    if result.is_success() {
        return result;
    }
    if let Value::String(text) = body {
        if let Ok(parsed) = pattern.parse(text, resolver) {
            let reparsed = pattern.matches(&parsed, resolver);
            if reparsed.is_success() {
                return reparsed;
            }
        }
    }
    result.breadcrumb("BODY")
}
