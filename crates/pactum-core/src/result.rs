//! Match results: success with captured bindings, or breadcrumbed failures
//!
//! Failures are built bottom-up as an immutable chain: a leaf carries the
//! concrete mismatch, each enclosing level adds a breadcrumb (and optionally a
//! message). Sibling failures fan in under one node, so a single report can
//! show every mismatch at a level.
//!
//! Report shape (kept stable for downstream tooling):
//!
//! ```text
//! >> REQUEST.BODY.id
//!
//!    Expected number, actual was "abc"
//!
//! >> REQUEST.BODY.height
//!
//!    Expected number, actual was "5 feet"
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

/// Values captured from a successful match (output bindings).
pub type Bindings = BTreeMap<String, String>;

/// Categorical failure reasons used to filter noise and improve wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    /// Multipart part names do not line up with the contract
    PartNameMismatch,
    /// A literal URL path segment differs: a different endpoint entirely
    UrlPathMismatch,
    /// SOAPAction header names a different operation
    SoapActionMismatch,
    /// HTTP method differs
    MethodMismatch,
    /// Response status differs
    StatusMismatch,
    /// Stub request failed to match and its status is wrong too
    RequestMismatchButStatusAlsoWrong,
}

impl FailureReason {
    /// Fluffy failures are likely noise when many scenarios share a contract.
    #[must_use]
    pub const fn is_fluffy(self) -> bool {
        match self {
            Self::UrlPathMismatch
            | Self::SoapActionMismatch
            | Self::MethodMismatch
            | Self::RequestMismatchButStatusAlsoWrong => true,
            Self::PartNameMismatch | Self::StatusMismatch => false,
        }
    }
}

/// One link of a failure chain.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Failure {
    message: String,
    breadcrumb: String,
    reason: Option<FailureReason>,
    causes: Vec<Failure>,
}

impl Failure {
    /// A leaf failure with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    /// A link that explains `cause` one level up.
    #[must_use]
    pub fn wrap(message: impl Into<String>, cause: Failure) -> Self {
        Self {
            message: message.into(),
            causes: vec![cause],
            ..Self::default()
        }
    }

    /// Fan sibling failures into one node. A single failure is returned as is.
    #[must_use]
    pub fn aggregate(mut failures: Vec<Failure>) -> Self {
        if failures.len() == 1 {
            return failures.remove(0);
        }
        Self {
            causes: failures,
            ..Self::default()
        }
    }

    /// Annotate with a breadcrumb, wrapping if this link already has one.
    #[must_use]
    pub fn breadcrumb(self, crumb: impl Into<String>) -> Self {
        let crumb = crumb.into();
        if crumb.is_empty() {
            return self;
        }
        if self.breadcrumb.is_empty() {
            return Self {
                breadcrumb: crumb,
                ..self
            };
        }
        Self {
            breadcrumb: crumb,
            causes: vec![self],
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_reason(mut self, reason: FailureReason) -> Self {
        self.reason = Some(reason);
        self
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn causes(&self) -> &[Failure] {
        &self.causes
    }

    #[must_use]
    pub fn reason(&self) -> Option<FailureReason> {
        self.reason
    }

    /// True if this link or any link below carries the given reason.
    #[must_use]
    pub fn has_reason(&self, reason: FailureReason) -> bool {
        self.reason == Some(reason) || self.causes.iter().any(|c| c.has_reason(reason))
    }

    #[must_use]
    pub fn is_fluffy(&self) -> bool {
        self.reason.is_some_and(FailureReason::is_fluffy)
            || self.causes.iter().any(Failure::is_fluffy)
    }

    /// Number of independent leaf mismatches under this failure.
    #[must_use]
    pub fn leaf_count(&self) -> usize {
        if self.causes.is_empty() {
            1
        } else {
            self.causes.iter().map(Failure::leaf_count).sum()
        }
    }

    /// Every chain from this node to a leaf, as (breadcrumb path, messages).
    #[must_use]
    pub fn chains(&self) -> Vec<(String, Vec<String>)> {
        let mut out = Vec::new();
        self.collect_chains(&mut Vec::new(), &mut Vec::new(), &mut out);
        out
    }

    fn collect_chains<'a>(
        &'a self,
        crumbs: &mut Vec<&'a str>,
        messages: &mut Vec<&'a str>,
        out: &mut Vec<(String, Vec<String>)>,
    ) {
        let pushed_crumb = !self.breadcrumb.is_empty();
        let pushed_message = !self.message.is_empty();
        if pushed_crumb {
            crumbs.push(&self.breadcrumb);
        }
        if pushed_message {
            messages.push(&self.message);
        }

        if self.causes.is_empty() {
            out.push((
                render_path(crumbs),
                messages.iter().map(|m| (*m).to_string()).collect(),
            ));
        } else {
            for cause in &self.causes {
                cause.collect_chains(crumbs, messages, out);
            }
        }

        if pushed_crumb {
            crumbs.pop();
        }
        if pushed_message {
            messages.pop();
        }
    }

    /// Render the failure report text.
    #[must_use]
    pub fn report(&self) -> String {
        self.chains()
            .iter()
            .map(|(path, messages)| render_chain(path, messages))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

fn render_path(crumbs: &[&str]) -> String {
    let mut path = String::new();
    for crumb in crumbs {
        if !path.is_empty() && !crumb.starts_with('[') {
            path.push('.');
        }
        path.push_str(crumb);
    }
    path
}

fn render_chain(path: &str, messages: &[String]) -> String {
    if path.is_empty() {
        return messages.join("\n");
    }
    let body = messages
        .iter()
        .map(|m| format!("   {m}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(">> {path}\n\n{body}")
}

/// Outcome of `matches` / `encompasses`.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchResult {
    Success(Bindings),
    Failure(Failure),
}

impl MatchResult {
    #[must_use]
    pub fn success() -> Self {
        Self::Success(Bindings::new())
    }

    #[must_use]
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure(Failure::new(message))
    }

    /// Success when `failures` is empty, otherwise all of them fanned in.
    #[must_use]
    pub fn from_failures(failures: Vec<Failure>) -> Self {
        if failures.is_empty() {
            Self::success()
        } else {
            Self::Failure(Failure::aggregate(failures))
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub fn breadcrumb(self, crumb: impl Into<String>) -> Self {
        match self {
            Self::Failure(f) => Self::Failure(f.breadcrumb(crumb)),
            success => success,
        }
    }

    #[must_use]
    pub fn with_reason(self, reason: FailureReason) -> Self {
        match self {
            Self::Failure(f) => Self::Failure(f.with_reason(reason)),
            success => success,
        }
    }

    /// Wrap a failure in an explanatory link; successes pass through.
    #[must_use]
    pub fn explain(self, message: impl Into<String>) -> Self {
        match self {
            Self::Failure(f) => Self::Failure(Failure::wrap(message, f)),
            success => success,
        }
    }

    #[must_use]
    pub fn failure_ref(&self) -> Option<&Failure> {
        match self {
            Self::Failure(f) => Some(f),
            Self::Success(_) => None,
        }
    }

    #[must_use]
    pub fn into_failure(self) -> Option<Failure> {
        match self {
            Self::Failure(f) => Some(f),
            Self::Success(_) => None,
        }
    }

    #[must_use]
    pub fn is_fluffy(&self) -> bool {
        self.failure_ref().is_some_and(Failure::is_fluffy)
    }

    /// Report text; empty for successes.
    #[must_use]
    pub fn report(&self) -> String {
        self.failure_ref().map(Failure::report).unwrap_or_default()
    }
}

/// One scenario's result inside an aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultEntry {
    /// `In scenario "..."` / `API: ...` header, when the result belongs to a scenario
    pub context: Option<String>,
    pub result: MatchResult,
}

/// Results of trying one input against many scenarios.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Results {
    entries: Vec<ResultEntry>,
}

impl Results {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, context: Option<String>, result: MatchResult) {
        self.entries.push(ResultEntry { context, result });
    }

    #[must_use]
    pub fn entries(&self) -> &[ResultEntry] {
        &self.entries
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn has_success(&self) -> bool {
        self.entries.iter().any(|e| e.result.is_success())
    }

    /// Drop failures categorized as noise; successes are kept.
    #[must_use]
    pub fn without_fluff(&self) -> Self {
        Self {
            entries: self
                .entries
                .iter()
                .filter(|e| !e.result.is_fluffy())
                .cloned()
                .collect(),
        }
    }

    /// Render the fluff-filtered report. When every failure was fluffy the
    /// generic `not_recognized` message stands in for them.
    #[must_use]
    pub fn report(&self, not_recognized: &str) -> String {
        let filtered = self.without_fluff();
        let reports: Vec<String> = filtered
            .entries
            .iter()
            .filter_map(|e| {
                let failure = e.result.failure_ref()?;
                Some(match &e.context {
                    Some(context) => format!("{context}\n\n{}", failure.report()),
                    None => failure.report(),
                })
            })
            .collect();
        if reports.is_empty() {
            not_recognized.to_string()
        } else {
            reports.join("\n\n")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breadcrumbs_render_top_down_with_index_segments() {
        let leaf = Failure::new("Expected number, actual was \"abc\"")
            .breadcrumb("flat")
            .breadcrumb("[0]")
            .breadcrumb("address")
            .breadcrumb("BODY")
            .breadcrumb("RESPONSE");
        assert_eq!(
            leaf.report(),
            ">> RESPONSE.BODY.address[0].flat\n\n   Expected number, actual was \"abc\""
        );
    }

    #[test]
    fn aggregate_fans_siblings_into_separate_chains() {
        let failure = Failure::aggregate(vec![
            Failure::new("first").breadcrumb("a"),
            Failure::new("second").breadcrumb("b"),
        ])
        .breadcrumb("BODY");
        assert_eq!(failure.leaf_count(), 2);
        assert_eq!(
            failure.report(),
            ">> BODY.a\n\n   first\n\n>> BODY.b\n\n   second"
        );
    }

    #[test]
    fn wrap_adds_one_message_per_link() {
        let failure = Failure::wrap("Path parameter id did not match", Failure::new("inner"))
            .breadcrumb("id")
            .breadcrumb("PATH");
        assert_eq!(
            failure.report(),
            ">> PATH.id\n\n   Path parameter id did not match\n   inner"
        );
    }

    #[test]
    fn fluffiness_propagates_from_causes() {
        let failure = Failure::aggregate(vec![
            Failure::new("wrong action").with_reason(FailureReason::SoapActionMismatch),
            Failure::new("body"),
        ]);
        assert!(failure.is_fluffy());
        assert!(!Failure::new("body").is_fluffy());
    }

    #[test]
    fn results_report_falls_back_when_all_fluffy() {
        let mut results = Results::new();
        results.push(
            None,
            MatchResult::Failure(Failure::new("path").with_reason(FailureReason::UrlPathMismatch)),
        );
        assert_eq!(results.report("not recognized"), "not recognized");

        results.push(Some("In scenario \"s\"".into()), MatchResult::failure("body"));
        assert_eq!(results.report("not recognized"), "In scenario \"s\"\n\nbody");
    }

    #[test]
    fn from_failures_is_success_when_empty() {
        assert!(MatchResult::from_failures(vec![]).is_success());
        assert!(!MatchResult::from_failures(vec![Failure::new("x")]).is_success());
    }
}
