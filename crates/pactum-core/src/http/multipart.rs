//! multipart/form-data bodies
//!
//! Parts are matched by name. Declared-but-absent and present-but-undeclared
//! names are computed separately and both reported. Multipart bodies never
//! contribute negative variants.

use std::collections::BTreeSet;

use super::match_text;
use super::message::MultiPartValue;
use crate::error::ContractError;
use crate::pattern::Pattern;
use crate::pattern::combinations::bounded_product;
use crate::resolver::Resolver;
use crate::result::{Failure, FailureReason, MatchResult};
use crate::row::Row;
use crate::value::Value;

/// One declared part.
#[derive(Debug, Clone, PartialEq)]
pub enum MultiPartPattern {
    Content {
        name: String,
        content: Pattern,
        content_type: Option<String>,
        optional: bool,
    },
    File {
        name: String,
        filename: Pattern,
        content_type: Option<String>,
        encoding: Option<String>,
        optional: bool,
    },
}

impl MultiPartPattern {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Content { name, .. } | Self::File { name, .. } => name,
        }
    }

    #[must_use]
    pub const fn is_optional(&self) -> bool {
        match self {
            Self::Content { optional, .. } | Self::File { optional, .. } => *optional,
        }
    }

    fn matches(&self, actual: &MultiPartValue, resolver: &Resolver) -> MatchResult {
        let mut failures = Vec::new();
        match (self, actual) {
            (
                Self::Content {
                    content,
                    content_type,
                    ..
                },
                MultiPartValue::Content {
                    content: value,
                    content_type: actual_type,
                    ..
                },
            ) => {
                let result = match value {
                    Value::String(text) => match_text(self.name(), content, text, resolver),
                    other => resolver.matches_pattern(self.name(), content, other),
                };
                failures.extend(result.into_failure().map(|f| f.breadcrumb("content")));
                failures.extend(attribute("content-type", content_type.as_deref(), actual_type.as_deref(), resolver));
            }
            (
                Self::File {
                    filename,
                    content_type,
                    encoding,
                    ..
                },
                MultiPartValue::File {
                    filename: actual_name,
                    content_type: actual_type,
                    encoding: actual_encoding,
                    ..
                },
            ) => {
                failures.extend(
                    match_text("filename", filename, actual_name, resolver)
                        .into_failure()
                        .map(|f| f.breadcrumb("filename")),
                );
                failures.extend(attribute("content-type", content_type.as_deref(), actual_type.as_deref(), resolver));
                failures.extend(attribute("encoding", encoding.as_deref(), actual_encoding.as_deref(), resolver));
            }
            (Self::Content { .. }, MultiPartValue::File { .. }) => {
                failures.push(Failure::new(resolver.messages().mismatch("content part", "file part")));
            }
            (Self::File { .. }, MultiPartValue::Content { .. }) => {
                failures.push(Failure::new(resolver.messages().mismatch("file part", "content part")));
            }
        }
        MatchResult::from_failures(failures)
    }

    fn generate(&self, resolver: &Resolver) -> Result<MultiPartValue, ContractError> {
        Ok(match self {
            Self::Content {
                name,
                content,
                content_type,
                ..
            } => MultiPartValue::Content {
                name: name.clone(),
                content: resolver.generate(name, content)?,
                content_type: content_type.clone(),
            },
            Self::File {
                name,
                filename,
                content_type,
                encoding,
                ..
            } => MultiPartValue::File {
                name: name.clone(),
                filename: filename.generate(resolver)?.to_literal(),
                content_type: content_type.clone(),
                encoding: encoding.clone(),
            },
        })
    }

    fn new_based_on(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Self>, ContractError> {
        let Self::Content {
            name,
            content,
            content_type,
            optional,
        } = self
        else {
            return Ok(vec![self.clone()]);
        };
        let contents = match row.get(name) {
            Some(example) => vec![Pattern::exact(content.example_value(name, example, resolver)?)],
            None => content.new_based_on(row, resolver)?,
        };
        Ok(contents
            .into_iter()
            .map(|content| Self::Content {
                name: name.clone(),
                content,
                content_type: content_type.clone(),
                optional: *optional,
            })
            .collect())
    }
}

/// Declared attribute (content type, encoding) must equal the sent one.
fn attribute(label: &str, expected: Option<&str>, actual: Option<&str>, resolver: &Resolver) -> Option<Failure> {
    let expected = expected?;
    if actual == Some(expected) {
        return None;
    }
    let actual = actual.map_or_else(|| "nothing".to_string(), |a| format!("\"{a}\""));
    Some(Failure::new(resolver.messages().mismatch(&format!("\"{expected}\""), &actual)).breadcrumb(label))
}

/// The declared parts of a multipart body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MultiPartFormPattern {
    pub parts: Vec<MultiPartPattern>,
}

impl MultiPartFormPattern {
    #[must_use]
    pub fn new(parts: Vec<MultiPartPattern>) -> Self {
        Self { parts }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    #[must_use]
    pub fn matches(&self, actual: &[MultiPartValue], resolver: &Resolver) -> MatchResult {
        let declared: BTreeSet<&str> = self.parts.iter().map(MultiPartPattern::name).collect();
        let sent: BTreeSet<&str> = actual.iter().map(MultiPartValue::name).collect();
        let messages = resolver.messages();

        let absent: Vec<Failure> = self
            .parts
            .iter()
            .filter(|p| !p.is_optional() && !sent.contains(p.name()))
            .map(|p| {
                Failure::new(messages.missing_key("part", p.name()))
                    .with_reason(FailureReason::PartNameMismatch)
                    .breadcrumb(p.name())
            })
            .collect();
        let undeclared: Vec<Failure> = sent
            .iter()
            .filter(|name| !declared.contains(*name))
            .map(|name| {
                Failure::new(messages.unexpected_key("part", name))
                    .with_reason(FailureReason::PartNameMismatch)
                    .breadcrumb(*name)
            })
            .collect();
        if !absent.is_empty() || !undeclared.is_empty() {
            return MatchResult::from_failures(absent.into_iter().chain(undeclared).collect())
                .breadcrumb("MULTIPART-FORMDATA");
        }

        let failures = self
            .parts
            .iter()
            .filter_map(|part| {
                let value = actual.iter().find(|v| v.name() == part.name())?;
                part.matches(value, resolver)
                    .into_failure()
                    .map(|f| f.breadcrumb(part.name()))
            })
            .collect();
        MatchResult::from_failures(failures).breadcrumb("MULTIPART-FORMDATA")
    }

    /// # Errors
    ///
    /// Generation errors from part patterns.
    pub fn generate(&self, resolver: &Resolver) -> Result<Vec<MultiPartValue>, ContractError> {
        self.parts.iter().map(|p| p.generate(resolver)).collect()
    }

    /// # Errors
    ///
    /// Invalid examples.
    pub fn new_based_on(&self, row: &Row, resolver: &Resolver) -> Result<Vec<Self>, ContractError> {
        let options = self
            .parts
            .iter()
            .map(|p| p.new_based_on(row, resolver))
            .collect::<Result<Vec<_>, _>>()?;
        if options.is_empty() {
            return Ok(vec![self.clone()]);
        }
        Ok(bounded_product(&options, resolver.max_combinations())
            .into_iter()
            .map(Self::new)
            .collect())
    }
}
