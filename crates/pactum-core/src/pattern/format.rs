//! Formatted strings: date, date-time, UUID, base64, email

use std::sync::LazyLock;

use base64::Engine;
use rand::Rng;
use regex::Regex;

use super::Pattern;
use crate::datagen;
use crate::resolver::Resolver;
use crate::result::MatchResult;
use crate::value::Value;

static EMAIL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    Date,
    DateTime,
    Uuid,
    Base64,
    Email,
}

impl FormatKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Uuid => "uuid",
            Self::Base64 => "base64",
            Self::Email => "email",
        }
    }

    fn accepts(self, text: &str) -> bool {
        match self {
            Self::Date => chrono::NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok(),
            Self::DateTime => chrono::DateTime::parse_from_rfc3339(text).is_ok(),
            Self::Uuid => uuid::Uuid::parse_str(text).is_ok(),
            Self::Base64 => base64::engine::general_purpose::STANDARD.decode(text).is_ok(),
            Self::Email => EMAIL.as_ref().is_some_and(|re| re.is_match(text)),
        }
    }

    /// A string of the right type but the wrong shape.
    const fn malformed(self) -> &'static str {
        match self {
            Self::Date => "not-a-date",
            Self::DateTime => "not-a-datetime",
            Self::Uuid => "not-a-uuid",
            Self::Base64 => "!!not-base64!!",
            Self::Email => "not-an-email",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatPattern {
    kind: FormatKind,
}

impl FormatPattern {
    #[must_use]
    pub const fn new(kind: FormatKind) -> Self {
        Self { kind }
    }

    #[must_use]
    pub const fn kind(&self) -> FormatKind {
        self.kind
    }

    pub(crate) fn matches(&self, value: &Value, resolver: &Resolver) -> MatchResult {
        match value {
            Value::String(s) if self.kind.accepts(s) => MatchResult::success(),
            other => resolver.mismatch(self.kind.name(), other),
        }
    }

    pub(crate) fn generate(&self, rng: &mut impl Rng) -> Value {
        Value::String(match self.kind {
            FormatKind::Date => datagen::random_date(rng),
            FormatKind::DateTime => datagen::random_datetime(rng),
            FormatKind::Uuid => datagen::random_uuid(),
            FormatKind::Base64 => datagen::random_base64(rng),
            FormatKind::Email => datagen::random_email(rng),
        })
    }

    pub(crate) fn negative_based_on(&self) -> Vec<Pattern> {
        vec![
            Pattern::Null,
            Pattern::number(),
            Pattern::Boolean,
            Pattern::exact(self.kind.malformed()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_values_match_their_format() {
        let resolver = Resolver::default();
        let mut rng = rand::thread_rng();
        for kind in [
            FormatKind::Date,
            FormatKind::DateTime,
            FormatKind::Uuid,
            FormatKind::Base64,
            FormatKind::Email,
        ] {
            let pattern = FormatPattern::new(kind);
            let value = pattern.generate(&mut rng);
            assert!(pattern.matches(&value, &resolver).is_success(), "{kind:?}: {value}");
        }
    }

    #[test]
    fn malformed_negatives_do_not_match() {
        let resolver = Resolver::default();
        for kind in [FormatKind::Date, FormatKind::Uuid, FormatKind::Email] {
            let pattern = FormatPattern::new(kind);
            assert!(!pattern.matches(&Value::string(kind.malformed()), &resolver).is_success());
        }
    }
}
