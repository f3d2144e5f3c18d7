//! Mismatch wording
//!
//! The same structural checks serve tests, stubs and compatibility checks;
//! only the sentences differ. A `Resolver` carries one of these formatters.

use std::fmt;

/// Produces the text of mismatch failures.
pub trait MismatchMessages: Send + Sync + fmt::Debug {
    /// `expected` is a type or value description, `actual` a rendered value.
    fn mismatch(&self, expected: &str, actual: &str) -> String;

    /// A key present in the value but not declared. `kind` is e.g. "key", "header".
    fn unexpected_key(&self, kind: &str, key: &str) -> String;

    /// A declared mandatory key absent from the value.
    fn missing_key(&self, kind: &str, key: &str) -> String;
}

fn capitalized(kind: &str) -> String {
    let mut chars = kind.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Wording for live tests and plain request matching.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultMessages;

impl MismatchMessages for DefaultMessages {
    fn mismatch(&self, expected: &str, actual: &str) -> String {
        format!("Expected {expected}, actual was {actual}")
    }

    fn unexpected_key(&self, kind: &str, key: &str) -> String {
        format!("{} named \"{key}\" was unexpected", capitalized(kind))
    }

    fn missing_key(&self, kind: &str, key: &str) -> String {
        format!("Expected {kind} named \"{key}\" was missing")
    }
}

/// Wording for validating stub definitions against the contract.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubMessages;

impl MismatchMessages for StubMessages {
    fn mismatch(&self, expected: &str, actual: &str) -> String {
        format!("Contract expected {expected} but stub contained {actual}")
    }

    fn unexpected_key(&self, kind: &str, key: &str) -> String {
        format!("{} named \"{key}\" in the stub was not in the contract", capitalized(kind))
    }

    fn missing_key(&self, kind: &str, key: &str) -> String {
        format!("{} named \"{key}\" in the contract was not found in the stub", capitalized(kind))
    }
}

/// Wording for older-vs-newer contract comparison. "Expected" is the older
/// contract, "actual" the newer one.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompatibilityMessages;

impl MismatchMessages for CompatibilityMessages {
    fn mismatch(&self, expected: &str, actual: &str) -> String {
        format!("This is {expected} in the older contract, {actual} in the newer contract")
    }

    fn unexpected_key(&self, kind: &str, key: &str) -> String {
        format!("New {kind} \"{key}\" in the newer contract is not in the older contract")
    }

    fn missing_key(&self, kind: &str, key: &str) -> String {
        format!(
            "{} \"{key}\" is mandatory in the older contract but optional or missing in the newer contract",
            capitalized(kind)
        )
    }
}
