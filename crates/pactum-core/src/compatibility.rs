//! Backward compatibility of one older scenario against a newer contract
//!
//! Sample requests generated from the older scenario must be accepted by
//! the newer contract, and the older response must encompass the newer
//! response of at least one scenario that accepted them. Pure: running
//! scenarios in parallel is the runner's business.

use std::sync::Arc;

use crate::error::ContractError;
use crate::feature::Feature;
use crate::http::HttpRequest;
use crate::messages::CompatibilityMessages;
use crate::resolver::Resolver;
use crate::result::{Failure, MatchResult, Results};
use crate::row::Row;
use crate::scenario::Scenario;

/// Check `scenario` (from `older`) against `newer`.
#[must_use]
pub fn check_scenario(older: &Feature, scenario: &Scenario, newer: &Feature) -> MatchResult {
    let older_resolver = scenario.resolver(&older.resolver());
    let this_resolver = older_resolver
        .clone()
        .with_key_check(older_resolver.key_check().allowing_unexpected())
        .with_messages(Arc::new(CompatibilityMessages));
    let newer_base = newer.resolver();

    if scenario.is_message() {
        return check_message(scenario, newer, &this_resolver, &newer_base);
    }

    let samples = match sample_requests(scenario, &older_resolver) {
        Ok(samples) => samples,
        Err(e) => return MatchResult::failure(e.to_string()),
    };
    let mut failures = Vec::new();
    for request in samples {
        let result = check_request(scenario, &request, newer, &this_resolver, &newer_base);
        failures.extend(result.into_failure());
    }
    MatchResult::from_failures(failures)
}

/// One concrete request per specialized variant of each example row.
fn sample_requests(scenario: &Scenario, resolver: &Resolver) -> Result<Vec<HttpRequest>, ContractError> {
    let rows = if scenario.examples.is_empty() {
        vec![Row::default()]
    } else {
        scenario.examples.clone()
    };
    let mut samples = Vec::new();
    for row in rows {
        for variant in scenario.new_based_on(&row, resolver)? {
            samples.push(variant.generate_request(resolver)?);
            if samples.len() >= resolver.max_combinations() {
                return Ok(samples);
            }
        }
    }
    Ok(samples)
}

fn check_request(
    scenario: &Scenario,
    request: &HttpRequest,
    newer: &Feature,
    this_resolver: &Resolver,
    newer_base: &Resolver,
) -> MatchResult {
    let ancestors = scenario.request.headers.declared_names();
    let mut rejected = Results::new();
    let mut incompatible = Vec::new();

    for candidate in newer.scenarios().iter().filter(|s| !s.is_message()) {
        let newer_resolver = candidate.resolver(newer_base);
        let mut request_pattern = candidate.request.clone();
        request_pattern.headers = request_pattern.headers.with_ancestor_headers(ancestors.clone());

        let accepted = request_pattern.matches(request, &newer_resolver);
        if !accepted.is_success() {
            rejected.push(Some(candidate.context()), accepted);
            continue;
        }
        match scenario
            .response
            .encompasses(&candidate.response, this_resolver, &newer_resolver)
        {
            MatchResult::Success(bindings) => return MatchResult::Success(bindings),
            MatchResult::Failure(failure) => incompatible.push(failure),
        }
    }

    if !incompatible.is_empty() {
        return MatchResult::Failure(Failure::aggregate(incompatible));
    }
    let not_found = format!("{} is missing in the newer contract", scenario.api_description());
    let report = rejected.report(&not_found);
    if report == not_found {
        return MatchResult::failure(not_found);
    }
    MatchResult::Failure(Failure::wrap(
        format!(
            "The newer contract does not accept this request: {} {}",
            request.method,
            request.path_and_query()
        ),
        Failure::new(report),
    ))
}

fn check_message(scenario: &Scenario, newer: &Feature, this_resolver: &Resolver, newer_base: &Resolver) -> MatchResult {
    let topic = scenario.message.as_ref().map(|m| m.topic.as_str()).unwrap_or_default();
    let mut failures = Vec::new();
    for candidate in newer
        .scenarios()
        .iter()
        .filter(|s| s.message.as_ref().is_some_and(|m| m.topic == topic))
    {
        match scenario.message_encompasses(candidate, this_resolver, &candidate.resolver(newer_base)) {
            MatchResult::Success(bindings) => return MatchResult::Success(bindings),
            MatchResult::Failure(failure) => failures.push(failure),
        }
    }
    if failures.is_empty() {
        return MatchResult::failure(format!("Message topic \"{topic}\" is missing in the newer contract"));
    }
    MatchResult::Failure(Failure::aggregate(failures))
}
