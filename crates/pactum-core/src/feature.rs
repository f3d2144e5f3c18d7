//! A whole contract: an ordered list of scenarios
//!
//! Lookups walk the scenarios in declaration order. The first full match
//! wins; otherwise the failures are aggregated, noise is dropped and the
//! rest is reported.
//!
//! Server state is transient: set it right before a lookup, and it is gone
//! after. A `Feature` with server state must not be shared across
//! concurrent lookups; clone it per caller instead.

use std::collections::{BTreeMap, BTreeSet};

use crate::config::EngineConfig;
use crate::error::ContractError;
use crate::http::{HttpRequest, HttpResponse};
use crate::pattern::Pattern;
use crate::resolver::Resolver;
use crate::result::{Bindings, MatchResult, Results};
use crate::row::Row;
use crate::scenario::Scenario;
use crate::strategy::GenerationStrategy;
use crate::value::Value;

/// Shown when every failure was noise: no scenario even came close.
pub const NOT_RECOGNIZED: &str =
    "No matching API was found: the request was not recognized by any scenario in the contract";

/// One generated test, or the contract error that prevented generating it.
#[derive(Debug, Clone, PartialEq)]
pub enum ContractTest {
    Ready(Scenario),
    Invalid { scenario: String, error: ContractError },
}

impl ContractTest {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Ready(scenario) => &scenario.name,
            Self::Invalid { scenario, .. } => scenario,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Feature {
    pub name: String,
    scenarios: Vec<Scenario>,
    types: BTreeMap<String, Pattern>,
    test_variables: BTreeMap<String, String>,
    base_url: Option<String>,
    server_state: BTreeMap<String, Value>,
    strategy: GenerationStrategy,
    max_combinations: usize,
}

impl Feature {
    /// Build and validate a feature. Every referenced type must be declared
    /// (feature-wide or by the scenario itself), and every scenario reference
    /// must name a scenario.
    ///
    /// # Errors
    ///
    /// `UnknownType` or `Definition`.
    pub fn new(
        name: impl Into<String>,
        scenarios: Vec<Scenario>,
        types: BTreeMap<String, Pattern>,
        config: &EngineConfig,
    ) -> Result<Self, ContractError> {
        let feature = Self {
            name: name.into(),
            scenarios,
            types,
            test_variables: BTreeMap::new(),
            base_url: None,
            server_state: BTreeMap::new(),
            strategy: GenerationStrategy::from_config(config),
            max_combinations: config.max_combinations,
        };
        feature.validate()?;
        Ok(feature)
    }

    fn validate(&self) -> Result<(), ContractError> {
        let scenario_names: BTreeSet<&str> = self.scenarios.iter().map(|s| s.name.as_str()).collect();
        let type_references: BTreeSet<String> = self.types.values().flat_map(Pattern::references).collect();
        if let Some(unknown) = type_references.iter().find(|n| !self.types.contains_key(*n)) {
            return Err(ContractError::UnknownType(unknown.clone()));
        }
        for scenario in &self.scenarios {
            for name in scenario_references(scenario) {
                if !self.types.contains_key(&name) && !scenario.patterns.contains_key(&name) {
                    return Err(ContractError::UnknownType(name));
                }
            }
            if let Some(missing) = scenario
                .references
                .iter()
                .find(|r| !scenario_names.contains(r.as_str()))
            {
                return Err(ContractError::Definition(format!(
                    "scenario \"{}\" refers to unknown scenario \"{missing}\"",
                    scenario.name
                )));
            }
        }
        Ok(())
    }

    // ── Builders ──

    #[must_use]
    pub fn with_test_variables(mut self, variables: BTreeMap<String, String>) -> Self {
        self.test_variables = variables;
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    // ── Accessors ──

    #[must_use]
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    #[must_use]
    pub fn scenario(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    #[must_use]
    pub fn types(&self) -> &BTreeMap<String, Pattern> {
        &self.types
    }

    #[must_use]
    pub const fn strategy(&self) -> GenerationStrategy {
        self.strategy
    }

    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    #[must_use]
    pub fn test_variables(&self) -> &BTreeMap<String, String> {
        &self.test_variables
    }

    /// Record values captured by output bindings for later `$(name)` rows.
    pub fn bind_variables(&mut self, bindings: Bindings) {
        self.test_variables.extend(bindings);
    }

    /// Facts for the next lookup only.
    pub fn set_server_state(&mut self, state: BTreeMap<String, Value>) {
        self.server_state = state;
    }

    /// The feature-wide resolver over `facts`.
    #[must_use]
    pub fn resolver_with(&self, facts: BTreeMap<String, Value>) -> Resolver {
        Resolver::new()
            .with_patterns(self.types.clone())
            .with_facts(facts)
            .with_strategy(self.strategy)
            .with_max_combinations(self.max_combinations)
    }

    #[must_use]
    pub fn resolver(&self) -> Resolver {
        self.resolver_with(BTreeMap::new())
    }

    fn http_scenarios(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.iter().filter(|s| !s.is_message())
    }

    // ── Request resolution ──

    /// Try `request` against every scenario. The server state is consumed.
    pub fn match_result(&mut self, request: &HttpRequest) -> Results {
        let state = std::mem::take(&mut self.server_state);
        let (_, results) = self.match_with(request, &self.resolver_with(state));
        results
    }

    /// Candidates (method and path arity agree) get a full match attempt in
    /// order; the first success wins. The rest fail fast on path or method,
    /// which marks them as noise.
    fn match_with<'a>(&'a self, request: &HttpRequest, base: &Resolver) -> (Option<&'a Scenario>, Results) {
        let (candidates, others): (Vec<&Scenario>, Vec<&Scenario>) =
            self.http_scenarios().partition(|s| s.request.is_candidate(request));
        tracing::debug!(
            method = %request.method,
            path = %request.path,
            candidates = candidates.len(),
            "resolving request"
        );

        let mut results = Results::new();
        for scenario in candidates {
            let result = scenario.matches_request(request, &scenario.resolver(base));
            let matched = result.is_success();
            results.push(Some(scenario.context()), result);
            if matched {
                tracing::debug!(scenario = %scenario.name, "request matched");
                return (Some(scenario), results);
            }
        }
        for scenario in others {
            results.push(
                Some(scenario.context()),
                scenario.matches_request(request, &scenario.resolver(base)),
            );
        }
        (None, results)
    }

    /// The generated response of the first matching scenario.
    ///
    /// # Errors
    ///
    /// Every scenario's failure when nothing matched. A contract error while
    /// generating the response is reported as that scenario's failure.
    pub fn lookup_response(&mut self, request: &HttpRequest) -> Result<HttpResponse, Results> {
        let state = std::mem::take(&mut self.server_state);
        let base = self.resolver_with(state);
        let (matched, results) = self.match_with(request, &base);
        let Some(scenario) = matched else {
            return Err(results);
        };
        scenario
            .generate_response(&scenario.resolver(&base))
            .map_err(|e| {
                tracing::warn!(scenario = %scenario.name, error = %e, "response generation failed");
                let mut failed = Results::new();
                failed.push(Some(scenario.context()), MatchResult::failure(e.to_string()));
                failed
            })
    }

    /// What a stub server sends: the matching scenario's response, or a 400
    /// carrying the fluff-filtered report.
    pub fn stub_response(&mut self, request: &HttpRequest) -> HttpResponse {
        match self.lookup_response(request) {
            Ok(response) => response,
            Err(results) => HttpResponse::bad_request(results.report(NOT_RECOGNIZED)),
        }
    }

    /// Validate a stub definition against every scenario; the first scenario
    /// that accepts both sides wins.
    #[must_use]
    pub fn match_stub(&self, request: &HttpRequest, response: &HttpResponse) -> Results {
        let base = self.resolver();
        let mut results = Results::new();
        for scenario in self.http_scenarios() {
            let result = scenario.match_stub(request, response, &scenario.resolver(&base));
            let matched = result.is_success();
            results.push(Some(scenario.context()), result);
            if matched {
                break;
            }
        }
        results
    }

    // ── Test generation ──

    /// Scenarios ordered so that those whose bindings another consumes come
    /// first; otherwise declaration order.
    #[must_use]
    pub fn ordered_scenarios(&self) -> Vec<&Scenario> {
        let mut placed = BTreeSet::new();
        let mut ordered = Vec::with_capacity(self.scenarios.len());
        for scenario in &self.scenarios {
            self.place(scenario, &mut placed, &mut ordered, &mut BTreeSet::new());
        }
        ordered
    }

    fn place<'a>(
        &'a self,
        scenario: &'a Scenario,
        placed: &mut BTreeSet<&'a str>,
        ordered: &mut Vec<&'a Scenario>,
        visiting: &mut BTreeSet<&'a str>,
    ) {
        if placed.contains(scenario.name.as_str()) || !visiting.insert(&scenario.name) {
            return;
        }
        for reference in &scenario.references {
            if let Some(dependency) = self.scenario(reference) {
                self.place(dependency, placed, ordered, visiting);
            }
        }
        placed.insert(&scenario.name);
        ordered.push(scenario);
    }

    /// Every test this contract yields: each scenario × example row ×
    /// pattern variant, plus negative tests when the strategy enables them.
    /// A contract error fails that scenario's tests only.
    #[must_use]
    pub fn generate_contract_tests(&self) -> Vec<ContractTest> {
        let mut tests = Vec::new();
        for scenario in self.ordered_scenarios() {
            if scenario.is_message() {
                continue;
            }
            match self.contract_tests_for(scenario) {
                Ok(generated) => tests.extend(generated.into_iter().map(ContractTest::Ready)),
                Err(error) => {
                    tracing::warn!(scenario = %scenario.name, error = %error, "test generation failed");
                    tests.push(ContractTest::Invalid {
                        scenario: scenario.name.clone(),
                        error,
                    });
                }
            }
        }
        tracing::info!(feature = %self.name, tests = tests.len(), "generated contract tests");
        tests
    }

    /// The tests of one scenario, with example rows substituted against the
    /// test variables bound so far.
    ///
    /// # Errors
    ///
    /// Unbound references, invalid examples and other contract errors.
    pub fn contract_tests_for(&self, scenario: &Scenario) -> Result<Vec<Scenario>, ContractError> {
        let resolver = scenario.resolver(&self.resolver());
        let mut variables = scenario.fixtures.clone();
        variables.extend(self.test_variables.clone());

        let rows = if scenario.examples.is_empty() {
            vec![Row::default()]
        } else {
            scenario.examples.clone()
        };
        let mut tests = Vec::new();
        for row in rows {
            let row = row.substitute(&variables)?;
            tests.extend(scenario.new_based_on(&row, &resolver)?);
            if self.strategy.negative_tests_enabled() {
                tests.extend(scenario.negative_based_on(&row, &resolver)?);
            }
        }
        Ok(tests)
    }
}

/// Type names referenced anywhere in a scenario's patterns.
fn scenario_references(scenario: &Scenario) -> BTreeSet<String> {
    let request = &scenario.request;
    let mut patterns: Vec<&Pattern> = vec![&request.body, &scenario.response.body];
    patterns.extend(request.path.segments().iter().map(|s| &s.pattern));
    patterns.extend(request.query.params.fields().iter().map(|f| &f.pattern));
    patterns.extend(request.headers.headers.fields().iter().map(|f| &f.pattern));
    patterns.extend(request.form_fields.fields().iter().map(|f| &f.pattern));
    patterns.extend(scenario.response.headers.headers.fields().iter().map(|f| &f.pattern));
    patterns.extend(scenario.patterns.values());
    if let Some(message) = &scenario.message {
        patterns.push(&message.body);
    }
    patterns.into_iter().flat_map(Pattern::references).collect()
}
