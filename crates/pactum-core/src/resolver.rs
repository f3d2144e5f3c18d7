//! Execution context for pattern operations
//!
//! A `Resolver` is passed by value (cheap clone: shared tables sit behind
//! `Arc`). Recursive calls receive a derived copy, so the cycle-prevention
//! stack is a persistent list private to one call tree. Two generations on
//! different threads never observe each other's stack.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ContractError;
use crate::messages::{DefaultMessages, MismatchMessages};
use crate::pattern::Pattern;
use crate::result::{Failure, MatchResult};
use crate::strategy::GenerationStrategy;
use crate::value::Value;

/// Whether missing or unexpected keys fail a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyCheck {
    pub check_missing: bool,
    pub allow_unexpected: bool,
}

impl Default for KeyCheck {
    fn default() -> Self {
        Self {
            check_missing: true,
            allow_unexpected: false,
        }
    }
}

impl KeyCheck {
    /// Tolerate undeclared keys (extensible schemas, stub headers).
    #[must_use]
    pub const fn allowing_unexpected(self) -> Self {
        Self {
            allow_unexpected: true,
            ..self
        }
    }

    /// Ignore absent mandatory keys (partial stub expectations).
    #[must_use]
    pub const fn ignoring_missing(self) -> Self {
        Self {
            check_missing: false,
            ..self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Entry {
    Alias(String),
    /// A nullable edge: recursion below it may be cut.
    Nullable,
}

#[derive(Debug)]
struct Node {
    entry: Entry,
    parent: Option<Arc<Node>>,
}

/// Persistent stack of in-progress type aliases.
#[derive(Debug, Clone, Default)]
struct CycleStack {
    top: Option<Arc<Node>>,
}

impl CycleStack {
    fn push(&self, entry: Entry) -> Self {
        Self {
            top: Some(Arc::new(Node {
                entry,
                parent: self.top.clone(),
            })),
        }
    }

    fn iter(&self) -> impl Iterator<Item = &Entry> {
        std::iter::successors(self.top.as_deref(), |node| node.parent.as_deref())
            .map(|node| &node.entry)
    }

    fn top_alias(&self) -> Option<&str> {
        match self.top.as_deref().map(|node| &node.entry) {
            Some(Entry::Alias(alias)) => Some(alias),
            _ => None,
        }
    }

    /// `None` if `alias` is not in progress, otherwise whether a nullable
    /// edge sits between the top and its latest occurrence.
    fn repeat_of(&self, alias: &str) -> Option<bool> {
        let mut nullable_between = false;
        for entry in self.iter() {
            match entry {
                Entry::Nullable => nullable_between = true,
                Entry::Alias(a) if a == alias => return Some(nullable_between),
                Entry::Alias(_) => {}
            }
        }
        None
    }
}

/// Facts, type table, key policy, wording, flags and cycle guard.
#[derive(Debug, Clone)]
pub struct Resolver {
    facts: Arc<BTreeMap<String, Value>>,
    patterns: Arc<BTreeMap<String, Pattern>>,
    key_check: KeyCheck,
    messages: Arc<dyn MismatchMessages>,
    negative: bool,
    mock_mode: bool,
    strategy: GenerationStrategy,
    max_combinations: usize,
    stack: CycleStack,
}

impl Default for Resolver {
    fn default() -> Self {
        Self {
            facts: Arc::default(),
            patterns: Arc::default(),
            key_check: KeyCheck::default(),
            messages: Arc::new(DefaultMessages),
            negative: false,
            mock_mode: false,
            strategy: GenerationStrategy::default(),
            max_combinations: crate::config::DEFAULT_MAX_COMBINATIONS,
            stack: CycleStack::default(),
        }
    }
}

impl Resolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ── Derivation ──

    /// Extend the type table. Each registered pattern carries its name as
    /// its type alias. The table is replaced, never mutated.
    #[must_use]
    pub fn with_patterns<I>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = (String, Pattern)>,
    {
        let mut table = (*self.patterns).clone();
        for (name, pattern) in patterns {
            let aliased = pattern.with_type_alias(&name);
            table.insert(name, aliased);
        }
        self.patterns = Arc::new(table);
        self
    }

    #[must_use]
    pub fn with_facts(mut self, facts: BTreeMap<String, Value>) -> Self {
        self.facts = Arc::new(facts);
        self
    }

    /// Add facts for keys not already known.
    #[must_use]
    pub fn with_default_facts(mut self, defaults: &BTreeMap<String, Value>) -> Self {
        let mut facts = (*self.facts).clone();
        for (key, value) in defaults {
            facts.entry(key.clone()).or_insert_with(|| value.clone());
        }
        self.facts = Arc::new(facts);
        self
    }

    #[must_use]
    pub fn with_key_check(mut self, key_check: KeyCheck) -> Self {
        self.key_check = key_check;
        self
    }

    #[must_use]
    pub fn with_messages(mut self, messages: Arc<dyn MismatchMessages>) -> Self {
        self.messages = messages;
        self
    }

    #[must_use]
    pub fn with_negative(mut self, negative: bool) -> Self {
        self.negative = negative;
        self
    }

    #[must_use]
    pub fn with_mock_mode(mut self, mock_mode: bool) -> Self {
        self.mock_mode = mock_mode;
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: GenerationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_max_combinations(mut self, max: usize) -> Self {
        self.max_combinations = max.max(1);
        self
    }

    // ── Accessors ──

    #[must_use]
    pub fn key_check(&self) -> KeyCheck {
        self.key_check
    }

    #[must_use]
    pub fn messages(&self) -> &dyn MismatchMessages {
        self.messages.as_ref()
    }

    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    #[must_use]
    pub fn is_mock_mode(&self) -> bool {
        self.mock_mode
    }

    #[must_use]
    pub fn strategy(&self) -> GenerationStrategy {
        self.strategy
    }

    #[must_use]
    pub fn max_combinations(&self) -> usize {
        self.max_combinations
    }

    #[must_use]
    pub fn fact(&self, key: &str) -> Option<&Value> {
        self.facts.get(key)
    }

    #[must_use]
    pub fn patterns(&self) -> &BTreeMap<String, Pattern> {
        &self.patterns
    }

    /// Look up a named pattern.
    ///
    /// # Errors
    ///
    /// `UnknownType` when the name is not in the table.
    pub fn resolve(&self, name: &str) -> Result<&Pattern, ContractError> {
        self.patterns
            .get(name)
            .ok_or_else(|| ContractError::UnknownType(name.to_string()))
    }

    // ── Failures ──

    /// A leaf failure worded by this resolver.
    #[must_use]
    pub fn mismatch(&self, expected: &str, actual: &Value) -> MatchResult {
        MatchResult::Failure(Failure::new(
            self.messages.mismatch(expected, &actual.display_value()),
        ))
    }

    // ── Cycle guard ──

    /// Whether `alias` is currently being expanded.
    #[must_use]
    pub fn on_stack(&self, alias: &str) -> bool {
        self.stack.repeat_of(alias).is_some()
    }

    /// A copy with `alias` pushed, for specialization which records aliases
    /// without failing on repeats.
    #[must_use]
    pub fn pushing(&self, alias: &str) -> Self {
        let mut derived = self.clone();
        derived.stack = self.stack.push(Entry::Alias(alias.to_string()));
        derived
    }

    /// Run `f` with `alias` in progress.
    ///
    /// A repeat of an alias already in progress is cut (`CycleBreak`) when a
    /// nullable edge lies between the two occurrences, and is a contract
    /// error (`Cycle`) otherwise.
    ///
    /// # Errors
    ///
    /// `Cycle`, `CycleBreak`, or whatever `f` returns.
    pub fn guarded<T>(
        &self,
        alias: &str,
        f: impl FnOnce(&Resolver) -> Result<T, ContractError>,
    ) -> Result<T, ContractError> {
        match self.stack.repeat_of(alias) {
            Some(true) => Err(ContractError::CycleBreak(alias.to_string())),
            Some(false) => Err(ContractError::Cycle(alias.to_string())),
            None => f(&self.pushing(alias)),
        }
    }

    /// Like [`guarded`](Self::guarded), but a composite whose alias is
    /// already on top (a named reference handing over to its own
    /// definition) does not push twice.
    ///
    /// # Errors
    ///
    /// As for `guarded`.
    pub fn entering<T>(
        &self,
        alias: &str,
        f: impl FnOnce(&Resolver) -> Result<T, ContractError>,
    ) -> Result<T, ContractError> {
        if self.stack.top_alias() == Some(alias) {
            f(self)
        } else {
            self.guarded(alias, f)
        }
    }

    /// Run `f` below a nullable edge. A cycle cut at this edge yields `None`.
    ///
    /// # Errors
    ///
    /// Anything `f` returns other than a cycle cut.
    pub fn through_nullable<T>(
        &self,
        f: impl FnOnce(&Resolver) -> Result<T, ContractError>,
    ) -> Result<Option<T>, ContractError> {
        let mut derived = self.clone();
        derived.stack = self.stack.push(Entry::Nullable);
        match f(&derived) {
            Ok(value) => Ok(Some(value)),
            Err(ContractError::CycleBreak(alias)) => {
                tracing::trace!(alias = %alias, "cycle cut at nullable edge");
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }

    // ── Facts ──

    /// Generate a value for `key`, preferring a stored fact.
    ///
    /// # Errors
    ///
    /// `InvalidFact` when the fact does not fit `pattern`, or any generation
    /// error.
    pub fn generate(&self, key: &str, pattern: &Pattern) -> Result<Value, ContractError> {
        match self.fact(key) {
            Some(fact) => self.fact_as(key, fact, pattern),
            None => pattern.generate(self),
        }
    }

    fn fact_as(&self, key: &str, fact: &Value, pattern: &Pattern) -> Result<Value, ContractError> {
        if pattern.matches(fact, self).is_success() {
            return Ok(fact.clone());
        }
        let invalid = |report: String| ContractError::InvalidFact {
            key: key.to_string(),
            report,
        };
        let Value::String(text) = fact else {
            return Err(invalid(pattern.matches(fact, self).report()));
        };
        let parsed = pattern.parse(text, self).map_err(|e| invalid(e.to_string()))?;
        match pattern.matches(&parsed, self) {
            MatchResult::Success(_) => Ok(parsed),
            failure => Err(invalid(failure.report())),
        }
    }

    /// Match `value`, then cross-check it against the fact stored for `key`.
    #[must_use]
    pub fn matches_pattern(&self, key: &str, pattern: &Pattern, value: &Value) -> MatchResult {
        let result = pattern.matches(value, self);
        if !result.is_success() {
            return result;
        }
        let Some(fact) = self.fact(key) else {
            return result;
        };
        let expected = match self.fact_as(key, fact, pattern) {
            Ok(expected) => expected,
            Err(e) => return MatchResult::failure(e.to_string()),
        };
        if expected.same_as(value) {
            result
        } else {
            self.mismatch(&format!("{} (from server state)", expected.display_value()), value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_without_nullable_is_a_cycle() {
        let resolver = Resolver::new();
        let result = resolver.guarded("Person", |r| {
            r.guarded("Address", |r| r.guarded("Person", |_| Ok(())))
        });
        assert_eq!(result, Err(ContractError::Cycle("Person".into())));
    }

    #[test]
    fn repeat_below_nullable_is_cut() {
        let resolver = Resolver::new();
        let result = resolver.guarded("Person", |r| {
            r.through_nullable(|r| r.guarded("Person", |_| Ok(1)))
        });
        assert_eq!(result, Ok(None));
    }

    #[test]
    fn entering_top_alias_does_not_count_as_repeat() {
        let resolver = Resolver::new();
        let result = resolver.guarded("Person", |r| r.entering("Person", |_| Ok(7)));
        assert_eq!(result, Ok(7));
        let strict = resolver.guarded("Person", |r| r.guarded("Person", |_| Ok(7)));
        assert_eq!(strict, Err(ContractError::Cycle("Person".into())));
    }

    #[test]
    fn derived_stacks_are_independent() {
        let base = Resolver::new();
        let pushed = base.pushing("Person");
        assert!(pushed.on_stack("Person"));
        assert!(!base.on_stack("Person"));
    }

    #[test]
    fn generate_prefers_facts() {
        let resolver = Resolver::new()
            .with_facts(BTreeMap::from([("id".to_string(), Value::string("10"))]));
        assert_eq!(resolver.generate("id", &Pattern::number()), Ok(Value::from(10)));
    }

    #[test]
    fn invalid_fact_is_an_error() {
        let resolver = Resolver::new()
            .with_facts(BTreeMap::from([("id".to_string(), Value::string("abc"))]));
        assert!(matches!(
            resolver.generate("id", &Pattern::number()),
            Err(ContractError::InvalidFact { .. })
        ));
    }

    #[test]
    fn matches_pattern_cross_checks_facts() {
        let resolver = Resolver::new()
            .with_facts(BTreeMap::from([("id".to_string(), Value::from(10))]));
        assert!(resolver.matches_pattern("id", &Pattern::number(), &Value::from(10)).is_success());
        assert!(!resolver.matches_pattern("id", &Pattern::number(), &Value::from(11)).is_success());
        assert!(resolver.matches_pattern("other", &Pattern::number(), &Value::from(11)).is_success());
    }

    #[test]
    fn unknown_type_is_an_error() {
        assert_eq!(
            Resolver::new().resolve("Missing").unwrap_err(),
            ContractError::UnknownType("Missing".into())
        );
    }
}
