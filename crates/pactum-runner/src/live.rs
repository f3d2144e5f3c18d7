//! Live contract test runs
//!
//! Tests are generated scenario by scenario in dependency order, so a
//! scenario's example rows see the values bound by the scenarios it
//! references.

use std::collections::BTreeSet;
use std::time::Instant;

use pactum_core::{Feature, HttpResponse, MatchResult, Scenario};
use serde::Serialize;

use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    /// Failed, but the scenario is declared `ignore_failure`
    Ignored,
    /// The test could not be generated or sent
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestOutcome {
    pub name: String,
    pub status: TestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestRunSummary {
    pub outcomes: Vec<TestOutcome>,
}

impl TestRunSummary {
    #[must_use]
    pub fn count(&self, status: TestStatus) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.count(TestStatus::Failed) == 0 && self.count(TestStatus::Error) == 0
    }

    /// Process exit code: 0 when every test passed, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.is_success())
    }

    #[must_use]
    pub fn to_text(&self) -> String {
        let mut lines = Vec::new();
        for outcome in &self.outcomes {
            let mark = match outcome.status {
                TestStatus::Passed => "PASS",
                TestStatus::Failed => "FAIL",
                TestStatus::Ignored => "IGNORED",
                TestStatus::Error => "ERROR",
            };
            lines.push(format!("[{mark}] {} ({}ms)", outcome.name, outcome.elapsed_ms));
            if outcome.status != TestStatus::Passed {
                if let Some(report) = &outcome.report {
                    lines.extend(report.lines().map(|l| format!("    {l}")));
                }
            }
        }
        lines.push(String::new());
        lines.push(format!(
            "Tests run: {}, passed: {}, failed: {}, errors: {}, ignored: {}",
            self.outcomes.len(),
            self.count(TestStatus::Passed),
            self.count(TestStatus::Failed),
            self.count(TestStatus::Error),
            self.count(TestStatus::Ignored)
        ));
        lines.join("\n")
    }
}

/// Runs a feature's contract tests against a server.
pub struct ContractTestRunner<T: Transport> {
    feature: Feature,
    transport: T,
}

impl<T: Transport> ContractTestRunner<T> {
    #[must_use]
    pub fn new(feature: Feature, transport: T) -> Self {
        Self { feature, transport }
    }

    /// The feature, with the test variables bound during the run.
    #[must_use]
    pub fn feature(&self) -> &Feature {
        &self.feature
    }

    pub fn run(&mut self) -> TestRunSummary {
        let scenarios: Vec<Scenario> = self
            .feature
            .ordered_scenarios()
            .into_iter()
            .filter(|s| !s.is_message())
            .cloned()
            .collect();
        tracing::info!(feature = %self.feature.name, scenarios = scenarios.len(), "contract test run started");

        let mut summary = TestRunSummary::default();
        for scenario in &scenarios {
            match self.feature.contract_tests_for(scenario) {
                Ok(tests) => {
                    for test in &tests {
                        summary.outcomes.push(self.run_one(test));
                    }
                }
                Err(e) => {
                    tracing::warn!(scenario = %scenario.name, error = %e, "test generation failed");
                    summary.outcomes.push(TestOutcome {
                        name: scenario.name.clone(),
                        status: TestStatus::Error,
                        report: Some(e.to_string()),
                        elapsed_ms: 0,
                    });
                }
            }
        }

        tracing::info!(
            tests = summary.outcomes.len(),
            failed = summary.count(TestStatus::Failed),
            errors = summary.count(TestStatus::Error),
            "contract test run finished"
        );
        summary
    }

    fn run_one(&mut self, test: &Scenario) -> TestOutcome {
        let start = Instant::now();
        let (status, report) = self.execute(test);
        let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::debug!(test = %test.name, ?status, elapsed_ms, "test finished");
        TestOutcome {
            name: test.name.clone(),
            status,
            report,
            elapsed_ms,
        }
    }

    fn execute(&mut self, test: &Scenario) -> (TestStatus, Option<String>) {
        let resolver = test.resolver(&self.feature.resolver());
        let request = match test.generate_request(&resolver) {
            Ok(request) => request,
            Err(e) => return (TestStatus::Error, Some(e.to_string())),
        };
        let response = match self.transport.send(&request) {
            Ok(response) => with_declared_names(response, &test.response.headers.declared_names()),
            Err(e) => return (TestStatus::Error, Some(e.to_string())),
        };

        match test.matches_response(&response, &resolver) {
            MatchResult::Success(_) => {
                self.feature.bind_variables(test.capture_bindings(&response));
                (TestStatus::Passed, None)
            }
            failure => {
                let report = format!(
                    "{}\n\nRequest: {} {}\n\n{}",
                    test.context(),
                    request.method,
                    request.path_and_query(),
                    failure.report()
                );
                let status = if test.ignore_failure {
                    TestStatus::Ignored
                } else {
                    TestStatus::Failed
                };
                (status, Some(report))
            }
        }
    }
}

/// Wire header names carry no reliable case; rename them to the spelling
/// the contract declares.
fn with_declared_names(mut response: HttpResponse, declared: &BTreeSet<String>) -> HttpResponse {
    response.headers = std::mem::take(&mut response.headers)
        .into_iter()
        .map(|(name, value)| {
            let name = declared
                .iter()
                .find(|d| d.eq_ignore_ascii_case(&name))
                .cloned()
                .unwrap_or(name);
            (name, value)
        })
        .collect();
    response
}
