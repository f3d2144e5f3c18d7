//! Backward-compatibility driver
//!
//! Every scenario of the older contract is checked against the newer one
//! independently, on a pool of scoped worker threads shared for one run.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use pactum_core::compatibility::check_scenario;
use pactum_core::{EngineConfig, Feature, Scenario};
use serde::Serialize;

/// Worker stack size; deep self-referential schemas recurse far.
const WORKER_STACK_BYTES: usize = 16 * 1024 * 1024;

/// Outcome of one older scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioOutcome {
    pub scenario: String,
    pub api: String,
    pub compatible: bool,
    /// Declared `ignore_failure`: reported, never fails the run
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub ignored: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompatibilityReport {
    pub older: String,
    pub newer: String,
    pub outcomes: Vec<ScenarioOutcome>,
}

impl CompatibilityReport {
    /// True when every scenario that counts is compatible.
    #[must_use]
    pub fn is_compatible(&self) -> bool {
        self.outcomes.iter().all(|o| o.compatible || o.ignored)
    }

    #[must_use]
    pub fn incompatible(&self) -> Vec<&ScenarioOutcome> {
        self.outcomes.iter().filter(|o| !o.compatible && !o.ignored).collect()
    }

    /// Human-readable report: one line per scenario, then each failure report.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut lines = vec![format!("Compatibility of {} against {}", self.newer, self.older), String::new()];
        for outcome in &self.outcomes {
            let mark = match (outcome.compatible, outcome.ignored) {
                (true, _) => "ok",
                (false, true) => "ignored",
                (false, false) => "INCOMPATIBLE",
            };
            lines.push(format!("  [{mark}] {} ({})", outcome.scenario, outcome.api));
        }
        for outcome in self.outcomes.iter().filter(|o| !o.compatible) {
            if let Some(report) = &outcome.report {
                lines.push(String::new());
                lines.push(format!("In scenario \"{}\"", outcome.scenario));
                lines.push(format!("API: {}", outcome.api));
                lines.push(String::new());
                lines.push(report.clone());
            }
        }
        lines.push(String::new());
        let broken = self.incompatible().len();
        lines.push(if broken == 0 {
            "The newer contract is backward compatible".to_string()
        } else {
            format!("The newer contract is NOT backward compatible: {broken} incompatible scenario(s)")
        });
        lines.join("\n")
    }

    /// JSON rendering of the report.
    ///
    /// # Errors
    ///
    /// Serialization errors.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Runs compatibility checks across a bounded pool of workers.
#[derive(Debug, Clone, Copy)]
pub struct CompatibilityChecker {
    workers: usize,
}

impl CompatibilityChecker {
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            workers: config.workers(),
        }
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    #[must_use]
    pub fn check(&self, older: &Feature, newer: &Feature) -> CompatibilityReport {
        let scenarios = older.scenarios();
        let workers = self.workers.clamp(1, scenarios.len().max(1));
        tracing::info!(
            older = %older.name,
            newer = %newer.name,
            scenarios = scenarios.len(),
            workers,
            "compatibility check started"
        );

        let next = AtomicUsize::new(0);
        let mut slots: Vec<Option<ScenarioOutcome>> = vec![None; scenarios.len()];

        thread::scope(|scope| {
            let mut handles = Vec::with_capacity(workers);
            for id in 0..workers {
                let next = &next;
                let spawned = thread::Builder::new()
                    .name(format!("pactum-compat-{id}"))
                    .stack_size(WORKER_STACK_BYTES)
                    .spawn_scoped(scope, move || {
                        let mut done = Vec::new();
                        loop {
                            let index = next.fetch_add(1, Ordering::Relaxed);
                            let Some(scenario) = scenarios.get(index) else {
                                break;
                            };
                            done.push((index, check_isolated(older, scenario, newer)));
                        }
                        done
                    });
                match spawned {
                    Ok(handle) => handles.push(handle),
                    Err(e) => tracing::warn!(worker = id, error = %e, "failed to spawn compatibility worker"),
                }
            }
            for handle in handles {
                if let Ok(done) = handle.join() {
                    for (index, outcome) in done {
                        slots[index] = Some(outcome);
                    }
                }
            }
        });

        // Anything a missing worker left behind runs here.
        let outcomes: Vec<ScenarioOutcome> = slots
            .into_iter()
            .zip(scenarios)
            .map(|(slot, scenario)| slot.unwrap_or_else(|| check_isolated(older, scenario, newer)))
            .collect();

        let report = CompatibilityReport {
            older: older.name.clone(),
            newer: newer.name.clone(),
            outcomes,
        };
        tracing::info!(
            incompatible = report.incompatible().len(),
            compatible = report.is_compatible(),
            "compatibility check finished"
        );
        report
    }
}

/// One scenario's check; a panic becomes that scenario's failure.
fn check_isolated(older: &Feature, scenario: &Scenario, newer: &Feature) -> ScenarioOutcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| check_scenario(older, scenario, newer)));
    let (compatible, report) = match result {
        Ok(result) if result.is_success() => (true, None),
        Ok(result) => (false, Some(result.report())),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::warn!(scenario = %scenario.name, panic = %message, "compatibility check panicked");
            (false, Some(format!("Compatibility check aborted: {message}")))
        }
    };
    ScenarioOutcome {
        scenario: scenario.name.clone(),
        api: scenario.api_description(),
        compatible,
        ignored: scenario.ignore_failure,
        report,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pactum_core::ContractManifest;
    use std::path::Path;

    fn feature(yaml: &str) -> Feature {
        ContractManifest::parse(Path::new("c.yaml"), yaml)
            .unwrap()
            .to_feature(&EngineConfig::default())
            .unwrap()
    }

    const OLDER: &str = r#"
name: v1
scenarios:
  - name: get user
    request: { path: "/users/(id:number)" }
    response: { body: { id: "(number)" } }
  - name: list users
    request: { path: /users }
    response: { body: [{ id: "(number)" }] }
  - name: get avatar
    request: { path: "/users/(id:number)/avatar" }
    response: { body: "(string)" }
    ignore_failure: true
"#;

    const NEWER: &str = r#"
name: v2
scenarios:
  - name: get user
    request: { path: "/users/(id:number)" }
    response: { body: { id: "(string)" } }
  - name: list users
    request: { path: /users }
    response: { body: [{ id: "(number)", "email?": "(email)" }] }
"#;

    #[test]
    fn outcomes_keep_scenario_order_across_workers() {
        let report = CompatibilityChecker { workers: 3 }.check(&feature(OLDER), &feature(NEWER));
        let names: Vec<&str> = report.outcomes.iter().map(|o| o.scenario.as_str()).collect();
        assert_eq!(names, vec!["get user", "list users", "get avatar"]);
    }

    #[test]
    fn narrowed_type_fails_and_ignored_scenarios_do_not() {
        let report = CompatibilityChecker { workers: 2 }.check(&feature(OLDER), &feature(NEWER));
        assert!(!report.is_compatible());
        let broken: Vec<&str> = report.incompatible().iter().map(|o| o.scenario.as_str()).collect();
        assert_eq!(broken, vec!["get user"]);
        assert!(report.outcomes[2].ignored);
        assert!(!report.outcomes[2].compatible);
    }

    #[test]
    fn identical_contracts_are_compatible() {
        let report = CompatibilityChecker { workers: 1 }.check(&feature(NEWER), &feature(NEWER));
        assert!(report.is_compatible(), "{}", report.to_text());
        insta::assert_snapshot!(report.to_text(), @r###"
        Compatibility of v2 against v2

          [ok] get user (GET /users/(id:number) -> 200)
          [ok] list users (GET /users -> 200)

        The newer contract is backward compatible
        "###);
    }

    #[test]
    fn json_report_omits_empty_fields() {
        let report = CompatibilityChecker { workers: 1 }.check(&feature(NEWER), &feature(NEWER));
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["outcomes"][0]["compatible"], serde_json::json!(true));
        assert!(json["outcomes"][0].get("report").is_none());
        assert!(json["outcomes"][0].get("ignored").is_none());
    }
}
