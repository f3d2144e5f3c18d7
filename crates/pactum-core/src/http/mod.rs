//! HTTP contract patterns
//!
//! Sub-schema patterns (path, query, headers, multipart, security) and the
//! full request/response patterns composed from them.

pub mod headers;
pub mod message;
pub mod multipart;
pub mod path;
pub mod query;
pub mod request;
pub mod response;
pub mod security;

use std::collections::BTreeMap;

use crate::error::ContractError;
use crate::pattern::{Field, ObjectPattern, Pattern};
use crate::resolver::Resolver;
use crate::result::{Failure, MatchResult};
use crate::row::Row;
use crate::value::Value;

pub use headers::HttpHeadersPattern;
pub use message::{HttpRequest, HttpResponse, MultiPartValue};
pub use multipart::{MultiPartFormPattern, MultiPartPattern};
pub use path::HttpPathPattern;
pub use query::HttpQueryParamPattern;
pub use request::HttpRequestPattern;
pub use response::{ExpectedStatus, HttpResponsePattern};
pub use security::SecurityScheme;

/// Match one text value (header, query param, path segment, form field).
/// Text the pattern cannot parse is matched as a plain string, which keeps
/// stub type tokens such as `(number)` working.
pub(crate) fn match_text(key: &str, pattern: &Pattern, text: &str, resolver: &Resolver) -> MatchResult {
    let value = pattern
        .parse(text, resolver)
        .unwrap_or_else(|_| Value::String(text.to_string()));
    resolver.matches_pattern(key, pattern, &value)
}

/// Match a name→text map against declared keys. `kind` names the key kind
/// in messages ("header", "query param"). Undeclared keys go to
/// `additional` when present, else fail unless the resolver tolerates them.
pub(crate) fn match_text_map(
    declared: &ObjectPattern,
    actual: &BTreeMap<String, String>,
    additional: Option<&Pattern>,
    kind: &str,
    resolver: &Resolver,
) -> Vec<Failure> {
    let key_check = resolver.key_check();
    let mut failures = Vec::new();

    for field in declared.fields() {
        match actual.get(&field.name) {
            Some(text) => {
                if let Some(f) = match_text(&field.name, &field.pattern, text, resolver).into_failure() {
                    failures.push(f.breadcrumb(&field.name));
                }
            }
            None if !field.optional && key_check.check_missing => failures.push(
                Failure::new(resolver.messages().missing_key(kind, &field.name)).breadcrumb(&field.name),
            ),
            None => {}
        }
    }

    for (key, text) in actual.iter().filter(|(k, _)| declared.field(k).is_none()) {
        match additional {
            Some(pattern) => {
                if let Some(f) = match_text(key, pattern, text, resolver).into_failure() {
                    failures.push(f.breadcrumb(key));
                }
            }
            None if !key_check.allow_unexpected => failures.push(
                Failure::new(resolver.messages().unexpected_key(kind, key)).breadcrumb(key),
            ),
            None => {}
        }
    }
    failures
}

/// Generate text values for declared keys. Optional keys are included unless
/// a cycle is cut below them.
pub(crate) fn generate_text_map(
    declared: &ObjectPattern,
    resolver: &Resolver,
) -> Result<BTreeMap<String, String>, ContractError> {
    let mut out = BTreeMap::new();
    for field in declared.fields() {
        let value = if field.optional {
            resolver.through_nullable(|r| r.generate(&field.name, &field.pattern))?
        } else {
            Some(resolver.generate(&field.name, &field.pattern)?)
        };
        if let Some(value) = value {
            out.insert(field.name.clone(), value.to_literal());
        }
    }
    Ok(out)
}

/// Specialize declared keys with an example row, reusing object variants.
pub(crate) fn text_map_variants(
    declared: &ObjectPattern,
    row: &Row,
    resolver: &Resolver,
) -> Result<Vec<ObjectPattern>, ContractError> {
    Ok(declared
        .new_based_on(row, resolver)?
        .into_iter()
        .filter_map(|variant| match variant {
            Pattern::Object(object) => Some(object),
            _ => None,
        })
        .collect())
}

/// An object pattern from a name→shorthand map where names ending in `?`
/// are optional.
///
/// # Errors
///
/// Malformed shorthand or duplicate names.
pub fn keyed_patterns(map: &BTreeMap<String, String>) -> Result<ObjectPattern, ContractError> {
    let fields = map
        .iter()
        .map(|(key, text)| {
            let pattern = crate::pattern::parse_pattern(text)?;
            Ok(match key.strip_suffix('?') {
                Some(name) => Field::optional(name, pattern),
                None => Field::required(key.as_str(), pattern),
            })
        })
        .collect::<Result<Vec<_>, ContractError>>()?;
    ObjectPattern::new(fields)
}
