//! Contract definition errors
//!
//! Ordinary mismatches are never errors: they are `MatchResult::Failure`.
//! These variants are reserved for contracts that cannot be used at all.

/// A contract that cannot be matched, generated from, or specialized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractError {
    #[error("Unknown type \"{0}\" is not defined in the contract")]
    UnknownType(String),

    #[error("Invalid pattern cycle: type \"{0}\" refers to itself with no nullable or optional reference to stop generation")]
    Cycle(String),

    /// Raised when a repeated type can be cut at a nullable edge. Always caught
    /// by the nearest nullable or optional pattern above it.
    #[error("Cycle at \"{0}\" stopped at a nullable reference")]
    CycleBreak(String),

    #[error("\"{value}\" is not a valid {expected}")]
    Unparsable { expected: String, value: String },

    #[error("Example value {value} for \"{key}\" does not match the contract\n{report}")]
    InvalidExample {
        key: String,
        value: String,
        report: String,
    },

    #[error("Fact \"{key}\" does not match the contract\n{report}")]
    InvalidFact { key: String, report: String },

    #[error("Test variable \"{0}\" is referenced but was never bound")]
    UnboundReference(String),

    #[error("Invalid contract: {0}")]
    Definition(String),
}

impl ContractError {
    pub(crate) fn unparsable(expected: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Unparsable {
            expected: expected.into(),
            value: value.into(),
        }
    }
}
