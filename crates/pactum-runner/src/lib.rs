//! pactum-runner: Drivers around the contract engine
//!
//! Backward-compatibility checks across a worker pool, live contract test
//! runs over a [`Transport`], and a stub responder.

pub mod compat;
pub mod live;
pub mod stub;
pub mod transport;

pub use compat::{CompatibilityChecker, CompatibilityReport, ScenarioOutcome};
pub use live::{ContractTestRunner, TestOutcome, TestRunSummary, TestStatus};
pub use stub::{StubExpectation, StubResponder};
pub use transport::{ReqwestTransport, Transport};

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Stub rejected by the contract:\n{0}")]
    StubRejected(String),
}
