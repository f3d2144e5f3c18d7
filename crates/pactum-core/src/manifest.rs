//! Contract manifest: the on-disk format (YAML or JSON)
//!
//! The manifest is plain data with pattern shorthand embedded in strings.
//! [`ContractManifest::to_feature`] turns it into a validated [`Feature`].
//!
//! ```yaml
//! name: products
//! types:
//!   Product: { id: "(number)", name: "(string)", "tags?": ["(string)"] }
//! scenarios:
//!   - name: get product
//!     request: { method: GET, path: "/products/(id:number)" }
//!     response: { status: 200, body: "(Product)" }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::ContractError;
use crate::feature::Feature;
use crate::http::{
    HttpHeadersPattern, HttpPathPattern, HttpQueryParamPattern, HttpRequestPattern, HttpResponsePattern,
    MultiPartFormPattern, MultiPartPattern, SecurityScheme, keyed_patterns,
};
use crate::pattern::{Pattern, parse_pattern, pattern_from_json};
use crate::row::Row;
use crate::scenario::{BindingSource, MessagePattern, Scenario};
use crate::value::Value;

/// A whole contract document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ContractManifest {
    /// Feature name
    pub name: String,
    /// Named types: JSON example documents with embedded shorthand
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub types: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub scenarios: Vec<ScenarioSpec>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ScenarioSpec {
    pub name: String,
    /// Required unless the scenario is an async `message`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<RequestSpec>,
    #[serde(default)]
    pub response: ResponseSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<ExampleRow>,
    /// Server state this scenario expects
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub facts: BTreeMap<String, serde_json::Value>,
    /// Output bindings: `name: response-body.path` or `name: response-header.Name`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub bindings: BTreeMap<String, String>,
    /// Values for `$(name)` references in example rows
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fixtures: BTreeMap<String, String>,
    /// Scenarios whose bindings this one consumes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
    /// Scenario-local named types
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub patterns: BTreeMap<String, serde_json::Value>,
    /// Failures of this scenario do not fail a run
    #[serde(default)]
    pub ignore_failure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RequestSpec {
    #[serde(default = "default_method")]
    pub method: String,
    /// Path template: `/products/(id:number)`
    pub path: String,
    /// Query params: name (suffix `?` for optional) to shorthand
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub query: BTreeMap<String, String>,
    /// Pattern accepting query params the contract does not declare
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_query: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub form_fields: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub multipart: Vec<PartSpec>,
    /// Accepted security schemes; any one of them satisfies the request
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<SecurityScheme>,
}

fn default_method() -> String {
    "GET".to_string()
}

const fn default_status() -> u16 {
    200
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ResponseSpec {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl Default for ResponseSpec {
    fn default() -> Self {
        Self {
            status: default_status(),
            headers: BTreeMap::new(),
            body: None,
        }
    }
}

/// One multipart part. A part with `filename` is a file part.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PartSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default)]
    pub optional: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct MessageSpec {
    pub topic: String,
    pub body: serde_json::Value,
}

/// Example row: column name to literal value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ExampleRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub values: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Invalid YAML in {path}: {message}")]
    Yaml { path: PathBuf, message: String },

    #[error("Invalid JSON in {path} at line {line}, column {column}: {message}")]
    Json {
        path: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("{origin}: {source}")]
    Contract { origin: String, source: ContractError },
}

impl ContractManifest {
    /// Read a manifest. `.json` files are JSON, `.yaml`/`.yml` are YAML, and
    /// anything else is sniffed: a leading `{` means JSON.
    ///
    /// # Errors
    ///
    /// I/O errors and syntax errors with their location.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = std::fs::read_to_string(path).map_err(|e| ManifestError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(path, &content)
    }

    /// Parse manifest text; `path` only selects the format and labels errors.
    ///
    /// # Errors
    ///
    /// Syntax errors with their location.
    pub fn parse(path: &Path, content: &str) -> Result<Self, ManifestError> {
        let is_json = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => true,
            Some("yaml" | "yml") => false,
            _ => content.trim_start().starts_with('{'),
        };
        if is_json {
            serde_json::from_str(content).map_err(|e| ManifestError::Json {
                path: path.to_path_buf(),
                line: e.line(),
                column: e.column(),
                message: e.to_string(),
            })
        } else {
            serde_yml::from_str(content).map_err(|e| ManifestError::Yaml {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
    }

    /// Load a manifest and build its feature in one step.
    ///
    /// # Errors
    ///
    /// Any [`ManifestError`]; contract errors are labelled with the file
    /// and scenario.
    pub fn load_feature(path: &Path, config: &EngineConfig) -> Result<Feature, ManifestError> {
        Self::load(path)?.build(&path.display().to_string(), config)
    }

    /// Build and validate the feature this manifest describes.
    ///
    /// # Errors
    ///
    /// `ManifestError::Contract` naming the offending scenario.
    pub fn to_feature(&self, config: &EngineConfig) -> Result<Feature, ManifestError> {
        self.build(&self.name, config)
    }

    fn build(&self, origin: &str, config: &EngineConfig) -> Result<Feature, ManifestError> {
        let contract_error = |context: String| move |source: ContractError| ManifestError::Contract { origin: context, source };

        let types = named_patterns(&self.types).map_err(contract_error(origin.to_string()))?;
        let scenarios = self
            .scenarios
            .iter()
            .map(|spec| {
                spec.to_scenario(origin)
                    .map_err(contract_error(format!("{origin}, scenario \"{}\"", spec.name)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let feature = Feature::new(self.name.clone(), scenarios, types, config)
            .map_err(contract_error(origin.to_string()))?;
        Ok(feature.with_base_url(config.base_url.clone()))
    }

    /// A starter manifest for `pactum init`.
    #[must_use]
    pub fn example() -> &'static str {
        r#"# pactum contract
name: products

types:
  Product:
    id: "(number)"
    name: "(string)"
    status: { $enum: [available, discontinued] }
    "tags?": ["(string)"]

scenarios:
  - name: get product
    request:
      method: GET
      path: "/products/(id:number)"
    response:
      status: 200
      body: "(Product)"
    examples:
      - name: pen
        values:
          id: 10

  - name: create product
    request:
      method: POST
      path: /products
      headers:
        "X-Request-Id?": "(uuid)"
      body:
        name: "(string)"
        price: { $number: { minimum: 0 } }
        "tags?": ["(string)"]
      security:
        - type: bearer
    response:
      status: 201
      body:
        id: "(number)"
    bindings:
      product_id: response-body.id
"#
    }
}

impl ScenarioSpec {
    fn to_scenario(&self, origin: &str) -> Result<Scenario, ContractError> {
        let (request, message) = match (&self.request, &self.message) {
            (Some(request), None) => (request.to_pattern()?, None),
            (None, Some(message)) => (
                HttpRequestPattern::default(),
                Some(MessagePattern {
                    topic: message.topic.clone(),
                    body: pattern_from_json(&message.body)?,
                }),
            ),
            (Some(_), Some(_)) => {
                return Err(ContractError::Definition(
                    "a scenario declares either a request or a message, not both".into(),
                ));
            }
            (None, None) => {
                return Err(ContractError::Definition(
                    "a scenario must declare a request or a message".into(),
                ));
            }
        };

        let bindings = self
            .bindings
            .iter()
            .map(|(name, source)| Ok((name.clone(), source.parse::<BindingSource>()?)))
            .collect::<Result<BTreeMap<_, _>, ContractError>>()?;
        let examples = self.examples.iter().map(ExampleRow::to_row).collect();
        let facts = self
            .facts
            .iter()
            .map(|(key, value)| (key.clone(), Value::from(value.clone())))
            .collect();

        let mut scenario = Scenario::new(self.name.clone(), request, self.response.to_pattern()?)
            .with_examples(examples)
            .with_expected_facts(facts)
            .with_bindings(bindings);
        scenario.message = message;
        scenario.patterns = named_patterns(&self.patterns)?;
        scenario.fixtures = self.fixtures.clone();
        scenario.references = self.references.clone();
        scenario.ignore_failure = self.ignore_failure;
        scenario.origin = Some(origin.to_string());
        Ok(scenario)
    }
}

impl RequestSpec {
    fn to_pattern(&self) -> Result<HttpRequestPattern, ContractError> {
        let mut query = HttpQueryParamPattern::new(keyed_patterns(&self.query)?);
        if let Some(additional) = &self.additional_query {
            query = query.with_additional(parse_pattern(additional)?);
        }
        let parts = self.multipart.iter().map(PartSpec::to_pattern).collect::<Result<Vec<_>, _>>()?;

        Ok(
            HttpRequestPattern::new(&self.method.to_uppercase(), HttpPathPattern::parse(&self.path)?)
                .with_query(query)
                .with_headers(HttpHeadersPattern::new(keyed_patterns(&self.headers)?))
                .with_body(body_pattern(self.body.as_ref())?)
                .with_form_fields(keyed_patterns(&self.form_fields)?)
                .with_multipart(MultiPartFormPattern::new(parts))
                .with_security(self.security.clone()),
        )
    }
}

impl ResponseSpec {
    fn to_pattern(&self) -> Result<HttpResponsePattern, ContractError> {
        Ok(HttpResponsePattern::new(self.status)
            .with_headers(HttpHeadersPattern::new(keyed_patterns(&self.headers)?))
            .with_body(body_pattern(self.body.as_ref())?))
    }
}

impl PartSpec {
    fn to_pattern(&self) -> Result<MultiPartPattern, ContractError> {
        Ok(match &self.filename {
            Some(filename) => MultiPartPattern::File {
                name: self.name.clone(),
                filename: parse_pattern(filename)?,
                content_type: self.content_type.clone(),
                encoding: self.encoding.clone(),
                optional: self.optional,
            },
            None => MultiPartPattern::Content {
                name: self.name.clone(),
                content: body_pattern(self.content.as_ref())?,
                content_type: self.content_type.clone(),
                optional: self.optional,
            },
        })
    }
}

impl ExampleRow {
    fn to_row(&self) -> Row {
        Row {
            name: self.name.clone().unwrap_or_default(),
            columns: self
                .values
                .iter()
                .map(|(column, value)| (column.clone(), Value::from(value.clone())))
                .collect(),
        }
    }
}

fn body_pattern(body: Option<&serde_json::Value>) -> Result<Pattern, ContractError> {
    body.map_or(Ok(Pattern::NoBody), pattern_from_json)
}

fn named_patterns(docs: &BTreeMap<String, serde_json::Value>) -> Result<BTreeMap<String, Pattern>, ContractError> {
    docs.iter()
        .map(|(name, doc)| Ok((name.clone(), pattern_from_json(doc)?.with_type_alias(name))))
        .collect()
}

/// JSON Schema of the manifest format.
#[must_use]
pub fn generate_schema() -> String {
    let schema = schemars::schema_for!(ContractManifest);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::ContractTest;
    use crate::http::HttpRequest;
    use crate::pattern::INVALID_ENUM_VALUE;
    use std::io::Write;

    #[test]
    fn example_manifest_builds_a_feature() {
        let manifest = ContractManifest::parse(Path::new("contract.yaml"), ContractManifest::example()).unwrap();
        let feature = manifest.to_feature(&EngineConfig::default()).unwrap();
        assert_eq!(feature.name, "products");
        assert_eq!(feature.scenarios().len(), 2);
        assert!(feature.types().contains_key("Product"));

        let create = feature.scenario("create product").unwrap();
        assert_eq!(
            create.bindings.get("product_id"),
            Some(&BindingSource::ResponseBody("id".into()))
        );
        assert_eq!(create.request.security, vec![SecurityScheme::Bearer]);
    }

    #[test]
    fn loaded_feature_matches_requests() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("contract.yaml");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(ContractManifest::example().as_bytes())
            .unwrap();

        let mut feature = ContractManifest::load_feature(&path, &EngineConfig::default()).unwrap();
        let response = feature.lookup_response(&HttpRequest::new("GET", "/products/10")).unwrap();
        assert_eq!(response.status, 200);
        assert!(feature.lookup_response(&HttpRequest::new("GET", "/orders/10")).is_err());
    }

    #[test]
    fn json_errors_carry_line_and_column() {
        let err = ContractManifest::parse(Path::new("contract.json"), "{\n  \"name\": \"x\",\n  \"scenarios\": [,]\n}")
            .unwrap_err();
        match err {
            ManifestError::Json { line, column, .. } => {
                assert_eq!(line, 3);
                assert!(column > 0);
            }
            other => panic!("expected a JSON error, got {other}"),
        }
    }

    #[test]
    fn yaml_errors_name_the_file() {
        let err = ContractManifest::parse(Path::new("broken.yaml"), "name: [unclosed").unwrap_err();
        assert!(matches!(err, ManifestError::Yaml { .. }));
        assert!(err.to_string().starts_with("Invalid YAML in broken.yaml"));
    }

    #[test]
    fn unknown_extension_is_sniffed() {
        let manifest = ContractManifest::parse(Path::new("contract"), r#"{"name": "sniffed"}"#).unwrap();
        assert_eq!(manifest.name, "sniffed");
    }

    #[test]
    fn contract_errors_name_the_scenario() {
        let yaml = r#"
name: broken
scenarios:
  - name: get thing
    request: { path: /things }
    response: { body: "(Thing)" }
"#;
        let err = ContractManifest::parse(Path::new("c.yaml"), yaml)
            .unwrap()
            .to_feature(&EngineConfig::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "broken: Unknown type \"Thing\" is not defined in the contract"
        );
    }

    #[test]
    fn scenario_needs_request_or_message() {
        let yaml = "name: x\nscenarios:\n  - name: nothing\n";
        let err = ContractManifest::parse(Path::new("c.yaml"), yaml)
            .unwrap()
            .to_feature(&EngineConfig::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "x, scenario \"nothing\": Invalid contract: a scenario must declare a request or a message"
        );
    }

    #[test]
    fn message_scenarios_load() {
        let yaml = r#"
name: events
scenarios:
  - name: product created
    message:
      topic: product-created
      body: { id: "(number)" }
"#;
        let feature = ContractManifest::parse(Path::new("c.yaml"), yaml)
            .unwrap()
            .to_feature(&EngineConfig::default())
            .unwrap();
        assert!(feature.scenarios()[0].is_message());
    }

    #[test]
    fn schema_is_titled_after_the_manifest() {
        let parsed: serde_json::Value = serde_json::from_str(&generate_schema()).unwrap();
        assert_eq!(parsed.get("title").and_then(|v| v.as_str()), Some("ContractManifest"));
    }

    #[test]
    fn constrained_fields_drive_negative_tests() {
        let manifest = ContractManifest::parse(
            Path::new("orders.yaml"),
            r#"
name: orders
scenarios:
  - name: create order
    request:
      method: POST
      path: /orders
      body:
        status: { "$enum": [pending, shipped] }
        quantity: { "$integer": { minimum: 1, maximum: 99 } }
        sku: { "$string": { min_length: 3, max_length: 8 } }
    response:
      status: 201
"#,
        )
        .unwrap();
        let config = EngineConfig {
            generative: true,
            ..EngineConfig::default()
        };
        let feature = manifest.to_feature(&config).unwrap();

        let bodies: Vec<Value> = feature
            .generate_contract_tests()
            .into_iter()
            .filter_map(|test| match test {
                ContractTest::Ready(scenario) if scenario.is_negative => Some(scenario),
                _ => None,
            })
            .map(|scenario| {
                let resolver = scenario.resolver(&feature.resolver());
                scenario.generate_request(&resolver).unwrap().body
            })
            .collect();

        let has = |key: &str, expected: &Value| bodies.iter().any(|b| b.select(key).is_some_and(|v| v.same_as(expected)));
        assert!(has("status", &Value::from(INVALID_ENUM_VALUE)));
        assert!(has("quantity", &Value::from(0_i64)));
        assert!(has("quantity", &Value::from(100_i64)));
        assert!(has("sku", &Value::from("aa")));
        assert!(has("sku", &Value::from("aaaaaaaaa")));

        let positive = feature.scenario("create order").unwrap();
        let request = HttpRequest::new("POST", "/orders")
            .with_body(Value::from(serde_json::json!({"status": "cancelled", "quantity": 0, "sku": "ab"})));
        let report = positive.matches_request(&request, &feature.resolver()).report();
        assert!(report.contains(">> REQUEST.BODY.status"), "{report}");
        assert!(report.contains(">> REQUEST.BODY.quantity"), "{report}");
        assert!(report.contains(">> REQUEST.BODY.sku"), "{report}");
    }
}
