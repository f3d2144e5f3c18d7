//! pactum-core: Contract matching, generation and compatibility engine
//!
//! This crate provides the pattern model for API contracts, the resolver that
//! matches and generates values against it, and the scenario/feature layer
//! that resolves requests, synthesizes stub responses, generates contract
//! tests and checks backward compatibility between contract versions.

pub mod compatibility;
pub mod config;
mod datagen;
pub mod error;
pub mod feature;
pub mod generator;
pub mod http;
pub mod manifest;
pub mod messages;
pub mod pattern;
pub mod resolver;
pub mod result;
pub mod row;
pub mod scenario;
pub mod strategy;
pub mod value;

pub use compatibility::check_scenario;
pub use config::{ConfigError, EngineConfig};
pub use error::ContractError;
pub use feature::{ContractTest, Feature, NOT_RECOGNIZED};
pub use generator::{GeneratedRequest, to_http_file};
pub use http::{
    ExpectedStatus, HttpRequest, HttpRequestPattern, HttpResponse, HttpResponsePattern, SecurityScheme,
};
pub use manifest::{ContractManifest, ManifestError, generate_schema};
pub use pattern::{Pattern, parse_pattern, pattern_from_json};
pub use resolver::{KeyCheck, Resolver};
pub use result::{Bindings, Failure, FailureReason, MatchResult, Results};
pub use row::Row;
pub use scenario::{BindingSource, Scenario};
pub use strategy::GenerationStrategy;
pub use value::Value;
