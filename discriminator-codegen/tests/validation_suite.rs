/// Integration test: runs every case in tests/fixtures/discriminator.json
/// through the in-process validator.
use discriminator_codegen::{CompileOptions, Validator};
use pretty_assertions::assert_eq;
use serde_json::Value;

type ErrorKey = (String, String, String);

fn load_suite() -> Vec<Value> {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/discriminator.json");
    let data = std::fs::read_to_string(path).expect("read discriminator.json");
    serde_json::from_str(&data).expect("parse discriminator.json")
}

fn options(group: &Value) -> CompileOptions {
    group
        .get("options")
        .map(|o| serde_json::from_value(o.clone()).expect("parse options"))
        .unwrap_or_default()
}

fn expected_errors(case: &Value) -> Vec<ErrorKey> {
    let mut keys: Vec<ErrorKey> = case["errors"]
        .as_array()
        .expect("errors must be array")
        .iter()
        .map(|e| {
            let s = |i: usize| e[i].as_str().unwrap().to_string();
            (s(0), s(1), s(2))
        })
        .collect();
    keys.sort();
    keys
}

fn actual_errors(validator: &Validator, instance: &Value) -> Vec<ErrorKey> {
    let mut keys: Vec<ErrorKey> = match validator.validate(instance) {
        Ok(()) => Vec::new(),
        Err(errors) => errors
            .into_iter()
            .map(|e| (e.instance_path.clone(), e.schema_path.clone(), e.keyword().to_string()))
            .collect(),
    };
    keys.sort();
    keys
}

#[test]
fn test_validation_suite() {
    let mut passed = 0u32;
    for group in load_suite() {
        let name = group["description"].as_str().unwrap();
        let validator = Validator::with_options(&group["schema"], &options(&group))
            .unwrap_or_else(|e| panic!("{name}: schema must compile: {e}"));
        for case in group["tests"].as_array().unwrap() {
            let label = format!("{name} / {}", case["description"].as_str().unwrap());
            let actual = actual_errors(&validator, &case["instance"]);
            assert_eq!(actual, expected_errors(case), "{label}");
            assert_eq!(validator.is_valid(&case["instance"]), actual.is_empty(), "{label}");
            passed += 1;
        }
    }
    eprintln!("=== Discriminator Suite (validator) ===");
    eprintln!("Passed: {passed}");
}

#[test]
fn test_errors_serialize_like_ajv() {
    let group = &load_suite()[0];
    let validator = Validator::new(&group["schema"]).unwrap();
    let errors = validator
        .validate(&serde_json::json!({"foo": "w"}))
        .unwrap_err();
    let json = serde_json::to_value(&errors).unwrap();
    assert_eq!(
        json,
        serde_json::json!([{
            "instancePath": "",
            "schemaPath": "#/discriminator",
            "keyword": "discriminator",
            "params": {"error": "mapping", "tag": "foo", "tagValue": "w"},
            "message": "value of property \"foo\" must be in oneOf"
        }])
    );
}
