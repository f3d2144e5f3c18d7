//! URL path templates: `/products/(id:number)`

use super::match_text;
use crate::error::ContractError;
use crate::pattern::combinations::bounded_product;
use crate::pattern::{Pattern, parse_pattern};
use crate::resolver::Resolver;
use crate::result::{Failure, FailureReason, MatchResult};
use crate::row::Row;
use crate::value::Value;

/// One path segment: a literal, or a typed placeholder named by `key`.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub key: Option<String>,
    pub pattern: Pattern,
}

impl PathSegment {
    fn is_literal(&self) -> bool {
        self.key.is_none() && matches!(self.pattern, Pattern::Exact(_))
    }
}

/// A fixed-arity sequence of path segments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HttpPathPattern {
    template: String,
    segments: Vec<PathSegment>,
}

impl HttpPathPattern {
    /// Parse a template. `(name:type)` is a placeholder, anything else a literal.
    ///
    /// # Errors
    ///
    /// Malformed placeholder tokens.
    pub fn parse(template: &str) -> Result<Self, ContractError> {
        let path = template.split('?').next().unwrap_or_default();
        let segments = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|segment| {
                let token = segment
                    .strip_prefix('(')
                    .and_then(|rest| rest.strip_suffix(')'));
                Ok(match token {
                    Some(inner) => PathSegment {
                        key: inner.split_once(':').map(|(name, _)| name.trim().to_string()),
                        pattern: parse_pattern(segment)?,
                    },
                    None => PathSegment {
                        key: None,
                        pattern: Pattern::exact(segment),
                    },
                })
            })
            .collect::<Result<Vec<_>, ContractError>>()?;
        Ok(Self {
            template: format!("/{}", path.trim_matches('/')),
            segments,
        })
    }

    #[must_use]
    pub fn template(&self) -> &str {
        &self.template
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Cheap candidate filter: same number of segments.
    #[must_use]
    pub fn matches_arity(&self, path: &str) -> bool {
        split_path(path).len() == self.segments.len()
    }

    /// Check a concrete path. An arity or literal mismatch means a different
    /// endpoint and carries [`FailureReason::UrlPathMismatch`].
    #[must_use]
    pub fn matches(&self, path: &str, resolver: &Resolver) -> MatchResult {
        let actual = split_path(path);
        if actual.len() != self.segments.len() {
            return MatchResult::Failure(
                Failure::new(format!(
                    "Expected {} (having {} path segments), actual was {} (having {} path segments)",
                    self.template,
                    self.segments.len(),
                    path,
                    actual.len()
                ))
                .with_reason(FailureReason::UrlPathMismatch)
                .breadcrumb("PATH"),
            );
        }

        let mut failures = Vec::new();
        for (index, (segment, text)) in self.segments.iter().zip(&actual).enumerate() {
            let crumb = format!("[{index}]");
            if segment.is_literal() {
                if let Pattern::Exact(exact) = &segment.pattern {
                    if exact.value().as_str() != Some(*text) {
                        failures.push(
                            Failure::new(resolver.messages().mismatch(
                                &exact.value().display_value(),
                                &Value::string(*text).display_value(),
                            ))
                            .with_reason(FailureReason::UrlPathMismatch)
                            .breadcrumb(crumb),
                        );
                    }
                }
                continue;
            }
            let key = segment.key.as_deref().unwrap_or_default();
            if let Some(f) = match_text(key, &segment.pattern, text, resolver).into_failure() {
                failures.push(f.breadcrumb(key).breadcrumb(crumb));
            }
        }
        MatchResult::from_failures(failures).breadcrumb("PATH")
    }

    /// A concrete path, placeholders filled from facts or generated.
    ///
    /// # Errors
    ///
    /// Generation errors from placeholder patterns.
    pub fn generate(&self, resolver: &Resolver) -> Result<String, ContractError> {
        let mut path = String::new();
        for segment in &self.segments {
            let value = match &segment.key {
                Some(key) => resolver.generate(key, &segment.pattern)?,
                None => segment.pattern.generate(resolver)?,
            };
            path.push('/');
            path.push_str(&value.to_literal());
        }
        if path.is_empty() {
            path.push('/');
        }
        Ok(path)
    }

    /// Placeholders named in `row` become exact values; the others expand
    /// to their own variants.
    ///
    /// # Errors
    ///
    /// Invalid examples.
    pub fn new_based_on(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Self>, ContractError> {
        let mut options = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            let example = segment.key.as_deref().and_then(|key| Some((key, row.get(key)?)));
            options.push(match example {
                Some((key, example)) => vec![Pattern::exact(
                    segment.pattern.example_value(key, example, resolver)?,
                )],
                None => segment.pattern.new_based_on(row, resolver)?,
            });
        }
        Ok(bounded_product(&options, resolver.max_combinations())
            .into_iter()
            .map(|patterns| Self {
                template: self.template.clone(),
                segments: self
                    .segments
                    .iter()
                    .zip(patterns)
                    .map(|(segment, pattern)| PathSegment {
                        key: segment.key.clone(),
                        pattern,
                    })
                    .collect(),
            })
            .collect())
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('?')
        .next()
        .unwrap_or_default()
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_literals_and_placeholders() {
        let path = HttpPathPattern::parse("/products/(id:number)").unwrap();
        assert_eq!(path.template(), "/products/(id:number)");
        assert_eq!(path.segments().len(), 2);
        assert_eq!(path.segments()[1].key.as_deref(), Some("id"));
        assert_eq!(path.segments()[1].pattern, Pattern::number());
    }

    #[test]
    fn arity_mismatch_is_a_url_path_mismatch() {
        let path = HttpPathPattern::parse("/products/(id:number)").unwrap();
        let result = path.matches("/products", &Resolver::default());
        assert!(result.failure_ref().unwrap().has_reason(FailureReason::UrlPathMismatch));
        assert_eq!(
            result.report(),
            ">> PATH\n\n   Expected /products/(id:number) (having 2 path segments), actual was /products (having 1 path segments)"
        );
    }

    #[test]
    fn literal_mismatch_is_fluffy_but_placeholder_mismatch_is_not() {
        let path = HttpPathPattern::parse("/products/(id:number)").unwrap();
        let resolver = Resolver::default();

        let literal = path.matches("/orders/10", &resolver);
        assert!(literal.is_fluffy());

        let placeholder = path.matches("/products/abc", &resolver);
        assert!(!placeholder.is_fluffy());
        assert_eq!(
            placeholder.report(),
            ">> PATH[1].id\n\n   Expected number, actual was \"abc\""
        );

        assert!(path.matches("/products/10", &resolver).is_success());
    }

    #[test]
    fn generate_fills_placeholders() {
        let path = HttpPathPattern::parse("/users/(id:uuid)/posts").unwrap();
        let resolver = Resolver::default();
        let concrete = path.generate(&resolver).unwrap();
        assert!(concrete.starts_with("/users/"));
        assert!(path.matches(&concrete, &resolver).is_success());
    }

    #[test]
    fn row_values_pin_placeholders() {
        let path = HttpPathPattern::parse("/products/(id:number)").unwrap();
        let resolver = Resolver::default();
        let variants = path
            .new_based_on(&Row::default().with("id", "10"), &resolver)
            .unwrap();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].generate(&resolver).unwrap(), "/products/10");
    }
}
