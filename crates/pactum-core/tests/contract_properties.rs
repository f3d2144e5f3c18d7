//! End-to-end behaviour of the engine through its public API

use std::collections::BTreeMap;
use std::io::Write;

use pactum_core::compatibility::check_scenario;
use pactum_core::{
    ContractManifest, EngineConfig, Feature, HttpRequest, NOT_RECOGNIZED, Pattern, Resolver, Value,
    pattern_from_json,
};
use proptest::prelude::*;
use serde_json::json;

const PRODUCTS: &str = r#"
name: products
scenarios:
  - name: get product
    request:
      method: GET
      path: "/products/(id:number)"
    response:
      status: 200
      body:
        name: "(string)"
"#;

fn load(yaml: &str) -> Feature {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("contract.yaml");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(yaml.as_bytes())
        .unwrap();
    ContractManifest::load_feature(&path, &EngineConfig::default()).unwrap()
}

fn round_trip_patterns() -> Vec<Pattern> {
    [
        json!("(string)"),
        json!("(number)"),
        json!("(integer)"),
        json!("(boolean)"),
        json!("(date)"),
        json!("(datetime)"),
        json!("(uuid)"),
        json!("(email)"),
        json!("(base64)"),
        json!("(string?)"),
        json!(["(number)"]),
        json!({"id": "(number)", "name": "(string)", "tags?": ["(string)"]}),
    ]
    .iter()
    .map(|doc| pattern_from_json(doc).unwrap())
    .collect()
}

proptest! {
    #[test]
    fn generated_values_survive_stringify_and_parse(index in 0usize..12) {
        let resolver = Resolver::default();
        let pattern = &round_trip_patterns()[index];
        let generated = pattern.generate(&resolver).unwrap();
        let parsed = pattern.parse(&generated.to_literal(), &resolver).unwrap();
        let result = pattern.matches(&parsed, &resolver);
        prop_assert!(result.is_success(), "{:?}: {}", pattern, result.report());
    }

    #[test]
    fn parsed_integers_match_numbers(n in any::<i64>()) {
        let resolver = Resolver::default();
        let pattern = Pattern::number();
        let parsed = pattern.parse(&n.to_string(), &resolver).unwrap();
        prop_assert!(pattern.matches(&parsed, &resolver).is_success());
    }
}

#[test]
fn every_leaf_mismatch_is_reported() {
    let pattern = pattern_from_json(&json!({"id": "(number)", "height": "(number)"})).unwrap();
    let value = Value::from(json!({"id": "abc", "height": "5 feet"}));
    let result = pattern.matches(&value, &Resolver::default());

    assert_eq!(result.failure_ref().unwrap().leaf_count(), 2);
    insta::assert_snapshot!(result.report(), @r###"
    >> height

       Expected number, actual was "5 feet"

    >> id

       Expected number, actual was "abc"
    "###);
}

#[test]
fn bad_path_parameter_is_reported_against_the_path() {
    let mut feature = load(PRODUCTS);
    let report = feature.match_result(&HttpRequest::new("GET", "/products/abc")).report(NOT_RECOGNIZED);

    assert!(report.contains("In scenario \"get product\""), "{report}");
    assert!(report.contains(">> REQUEST.PATH[1].id"), "{report}");
    assert!(report.contains("Expected number, actual was \"abc\""), "{report}");
}

#[test]
fn stubbed_product_has_a_string_name() {
    let mut feature = load(PRODUCTS);
    let response = feature.stub_response(&HttpRequest::new("GET", "/products/10"));

    assert_eq!(response.status, 200);
    let name = response.body.as_object().and_then(|body| body.get("name"));
    assert!(matches!(name, Some(Value::String(_))), "{response:?}");
}

#[test]
fn unmatched_stub_request_gets_a_400_with_the_report() {
    let mut feature = load(PRODUCTS);
    let response = feature.stub_response(&HttpRequest::new("GET", "/orders/10"));

    assert_eq!(response.status, 400);
    assert_eq!(response.body, Value::string(NOT_RECOGNIZED));
}

#[test]
fn only_the_body_mismatch_survives_fluff_filtering() {
    let mut feature = load(
        r#"
name: orders
scenarios:
  - name: list customers
    request: { method: GET, path: /customers }
    response: { status: 200 }
  - name: create order
    request:
      method: POST
      path: /orders
      body: { quantity: "(number)" }
    response: { status: 201 }
"#,
    );
    let request = HttpRequest::new("POST", "/orders").with_body(Value::from(json!({"quantity": "two"})));
    let report = feature.match_result(&request).report(NOT_RECOGNIZED);

    insta::assert_snapshot!(report, @r###"
    In scenario "create order"
    API: POST /orders -> 201

    >> REQUEST.BODY.quantity

       Expected number, actual was "two"
    "###);
}

#[test]
fn compatibility_of_response_changes() {
    let older = load(
        r#"
name: users
scenarios:
  - name: get user
    request: { path: "/users/(id:number)" }
    response: { body: { id: "(number)" } }
"#,
    );
    let widened = load(
        r#"
name: users
scenarios:
  - name: get user
    request: { path: "/users/(id:number)" }
    response: { body: { id: "(number)", email: "(string)" } }
"#,
    );
    let narrowed = load(
        r#"
name: users
scenarios:
  - name: get user
    request: { path: "/users/(id:number)" }
    response: { body: { id: "(string)" } }
"#,
    );

    let scenario = &older.scenarios()[0];
    assert!(check_scenario(&older, scenario, &widened).is_success());
    insta::assert_snapshot!(check_scenario(&older, scenario, &narrowed).report(), @r###"
    >> RESPONSE.BODY.id

       This is number in the older contract, string in the newer contract
    "###);
}

#[test]
fn nullable_self_reference_generates_but_plain_one_is_a_cycle() {
    let nullable = Resolver::default().with_patterns(BTreeMap::from([(
        "Node".to_string(),
        pattern_from_json(&json!({"value": "(number)", "next": "(Node?)"})).unwrap(),
    )]));
    assert!(Pattern::deferred("Node").generate(&nullable).is_ok());

    let endless = Resolver::default().with_patterns(BTreeMap::from([(
        "Node".to_string(),
        pattern_from_json(&json!({"value": "(number)", "next": "(Node)"})).unwrap(),
    )]));
    assert!(matches!(
        Pattern::deferred("Node").generate(&endless),
        Err(pactum_core::ContractError::Cycle(_))
    ));
}
