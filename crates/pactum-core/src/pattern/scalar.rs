//! String and number patterns

use rand::Rng;

use super::Pattern;
use crate::datagen::{self, MAX_STRING_LEN};
use crate::error::ContractError;
use crate::resolver::Resolver;
use crate::result::MatchResult;
use crate::value::Value;

/// Attempts at sampling a string for a regex the generator cannot expand.
const REGEX_SAMPLES: usize = 500;

// ── String ──

/// A string, optionally bounded in length and constrained by a regex.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringPattern {
    min_length: Option<usize>,
    max_length: Option<usize>,
    regex: Option<String>,
}

impl StringPattern {
    #[must_use]
    pub fn with_min_length(mut self, min: usize) -> Self {
        self.min_length = Some(min);
        self
    }

    #[must_use]
    pub fn with_max_length(mut self, max: usize) -> Self {
        self.max_length = Some(max);
        self
    }

    /// Constrain by a regex. The regex must match the whole string.
    ///
    /// # Errors
    ///
    /// `Definition` when the regex does not compile.
    pub fn with_regex(mut self, regex: impl Into<String>) -> Result<Self, ContractError> {
        let regex = regex.into();
        compile(&regex)?;
        self.regex = Some(regex);
        Ok(self)
    }

    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.min_length.is_none() && self.max_length.is_none() && self.regex.is_none()
    }

    pub(crate) fn matches(&self, value: &Value, resolver: &Resolver) -> MatchResult {
        let Value::String(s) = value else {
            return resolver.mismatch("string", value);
        };
        let len = s.chars().count();
        if let Some(min) = self.min_length {
            if len < min {
                return resolver.mismatch(&format!("string with minimum length {min}"), value);
            }
        }
        if let Some(max) = self.max_length {
            if len > max {
                return resolver.mismatch(&format!("string with maximum length {max}"), value);
            }
        }
        if let Some(regex) = &self.regex {
            match compile(regex) {
                Ok(re) if re.is_match(s) => {}
                Ok(_) => {
                    return resolver.mismatch(&format!("string matching regex {regex}"), value);
                }
                Err(e) => return MatchResult::failure(e.to_string()),
            }
        }
        MatchResult::success()
    }

    pub(crate) fn generate(&self, rng: &mut impl Rng) -> Result<Value, ContractError> {
        let Some(regex) = &self.regex else {
            let min = self.min_length.unwrap_or(1).min(MAX_STRING_LEN);
            let max = self.max_length.unwrap_or(min.max(20)).min(MAX_STRING_LEN).max(min);
            let len = rng.gen_range(min..=max);
            return Ok(Value::String(datagen::random_alnum(rng, len)));
        };
        let re = compile(regex)?;
        let fits = |candidate: &str| {
            let len = candidate.chars().count();
            re.is_match(candidate)
                && self.min_length.is_none_or(|min| len >= min)
                && self.max_length.is_none_or(|max| len <= max)
        };
        for _ in 0..REGEX_SAMPLES {
            let candidate = datagen::from_regex(regex, rng)
                .unwrap_or_else(|| {
                    let len = rng.gen_range(1..=12);
                    datagen::random_alnum(rng, len)
                });
            if fits(&candidate) {
                return Ok(Value::String(candidate));
            }
        }
        Err(ContractError::Definition(format!(
            "cannot generate a string matching regex {regex}"
        )))
    }

    /// Null, number and boolean, plus strings just outside the length bounds.
    pub(crate) fn negative_based_on(&self) -> Vec<Pattern> {
        let mut negatives = vec![Pattern::Null, Pattern::number(), Pattern::Boolean];
        if let Some(min) = self.min_length.filter(|min| *min > 0) {
            negatives.push(Pattern::exact("a".repeat(min - 1).as_str()));
        }
        if let Some(max) = self.max_length {
            negatives.push(Pattern::exact("a".repeat(max + 1).as_str()));
        }
        negatives
    }

    pub(crate) fn encompasses(&self, other: &StringPattern, resolver: &Resolver) -> MatchResult {
        let min_ok = self
            .min_length
            .is_none_or(|min| other.min_length.is_some_and(|o| o >= min));
        let max_ok = self
            .max_length
            .is_none_or(|max| other.max_length.is_some_and(|o| o <= max));
        let regex_ok = self.regex.is_none() || self.regex == other.regex;
        if min_ok && max_ok && regex_ok {
            MatchResult::success()
        } else {
            MatchResult::failure(
                resolver
                    .messages()
                    .mismatch(&self.describe(), &other.describe()),
            )
        }
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(min) = self.min_length {
            parts.push(format!("minLength {min}"));
        }
        if let Some(max) = self.max_length {
            parts.push(format!("maxLength {max}"));
        }
        if let Some(regex) = &self.regex {
            parts.push(format!("regex {regex}"));
        }
        if parts.is_empty() {
            "string".to_string()
        } else {
            format!("string ({})", parts.join(", "))
        }
    }
}

fn compile(regex: &str) -> Result<regex::Regex, ContractError> {
    regex::Regex::new(&format!("^(?:{regex})$"))
        .map_err(|e| ContractError::Definition(format!("invalid regex {regex}: {e}")))
}

// ── Number ──

/// A number, optionally integral and bounded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumberPattern {
    integer: bool,
    minimum: Option<f64>,
    maximum: Option<f64>,
    exclusive_minimum: bool,
    exclusive_maximum: bool,
}

impl NumberPattern {
    #[must_use]
    pub fn integer() -> Self {
        Self {
            integer: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_minimum(mut self, minimum: f64) -> Self {
        self.minimum = Some(minimum);
        self
    }

    #[must_use]
    pub fn with_maximum(mut self, maximum: f64) -> Self {
        self.maximum = Some(maximum);
        self
    }

    #[must_use]
    pub fn with_exclusive_bounds(mut self, minimum: bool, maximum: bool) -> Self {
        self.exclusive_minimum = minimum;
        self.exclusive_maximum = maximum;
        self
    }

    pub(crate) const fn type_name(&self) -> &'static str {
        if self.integer { "integer" } else { "number" }
    }

    fn in_range(&self, n: f64) -> bool {
        let above = self.minimum.is_none_or(|min| {
            if self.exclusive_minimum { n > min } else { n >= min }
        });
        let below = self.maximum.is_none_or(|max| {
            if self.exclusive_maximum { n < max } else { n <= max }
        });
        above && below
    }

    fn describe(&self) -> String {
        let lower = self.minimum.map(|min| {
            let op = if self.exclusive_minimum { ">" } else { ">=" };
            format!("{op} {min}")
        });
        let upper = self.maximum.map(|max| {
            let op = if self.exclusive_maximum { "<" } else { "<=" };
            format!("{op} {max}")
        });
        let bounds: Vec<String> = lower.into_iter().chain(upper).collect();
        if bounds.is_empty() {
            self.type_name().to_string()
        } else {
            format!("{} {}", self.type_name(), bounds.join(" and "))
        }
    }

    pub(crate) fn matches(&self, value: &Value, resolver: &Resolver) -> MatchResult {
        let Some(n) = value.as_f64() else {
            return resolver.mismatch(self.type_name(), value);
        };
        if self.integer && n.fract() != 0.0 {
            return resolver.mismatch("integer", value);
        }
        if !self.in_range(n) {
            return resolver.mismatch(&self.describe(), value);
        }
        MatchResult::success()
    }

    pub(crate) fn generate(&self, rng: &mut impl Rng) -> Value {
        let step = if self.integer { 1.0 } else { 0.5 };
        let lo = self.minimum.map_or_else(
            || self.maximum.map_or(1.0, |max| max - 1000.0),
            |min| if self.exclusive_minimum { min + step } else { min },
        );
        let hi = self.maximum.map_or(lo + 1000.0, |max| {
            if self.exclusive_maximum { max - step } else { max }
        });
        let hi = hi.max(lo);
        if self.integer {
            #[allow(clippy::cast_possible_truncation)]
            let (lo, hi) = (lo.ceil() as i64, hi.floor() as i64);
            Value::from(rng.gen_range(lo..=hi.max(lo)))
        } else if lo < hi {
            Value::number(rng.gen_range(lo..hi))
        } else {
            Value::number(lo)
        }
    }

    pub(crate) fn parse(&self, text: &str) -> Result<Value, ContractError> {
        let trimmed = text.trim();
        if let Ok(n) = trimmed.parse::<i64>() {
            return Ok(Value::from(n));
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() && !self.integer => Ok(Value::number(n)),
            Ok(n) if n.is_finite() && n.fract() == 0.0 => Ok(Value::number(n)),
            _ => Err(ContractError::unparsable(self.type_name(), text)),
        }
    }

    /// One value just below the minimum and one just above the maximum,
    /// then null, string and boolean.
    pub(crate) fn negative_based_on(&self) -> Vec<Pattern> {
        let step = if self.integer { 1.0 } else { 0.5 };
        let mut negatives = Vec::new();
        if let Some(min) = self.minimum {
            let below = if self.exclusive_minimum { min } else { min - step };
            negatives.push(Pattern::exact(Value::number(below)));
        }
        if let Some(max) = self.maximum {
            let above = if self.exclusive_maximum { max } else { max + step };
            negatives.push(Pattern::exact(Value::number(above)));
        }
        negatives.extend([Pattern::Null, Pattern::string(), Pattern::Boolean]);
        negatives
    }

    pub(crate) fn encompasses(&self, other: &NumberPattern, resolver: &Resolver) -> MatchResult {
        let integral_ok = !self.integer || other.integer;
        let min_ok = self.minimum.is_none_or(|min| {
            other
                .minimum
                .is_some_and(|o| o > min || (o == min && (!self.exclusive_minimum || other.exclusive_minimum)))
        });
        let max_ok = self.maximum.is_none_or(|max| {
            other
                .maximum
                .is_some_and(|o| o < max || (o == max && (!self.exclusive_maximum || other.exclusive_maximum)))
        });
        if integral_ok && min_ok && max_ok {
            MatchResult::success()
        } else {
            MatchResult::failure(
                resolver
                    .messages()
                    .mismatch(&self.describe(), &other.describe()),
            )
        }
    }
}
