use std::sync::OnceLock;

use discriminator_codegen::{ValidationError, Validator};
use serde_json::Value;
use wasm_bindgen::prelude::*;

/// schema.json, already checked by build.rs.
const SCHEMA: &str = include_str!(concat!(env!("OUT_DIR"), "/schema.json"));

fn validator() -> Result<&'static Validator, String> {
    static VALIDATOR: OnceLock<Result<Validator, String>> = OnceLock::new();
    VALIDATOR
        .get_or_init(|| {
            let schema: Value = serde_json::from_str(SCHEMA).map_err(|e| e.to_string())?;
            Validator::new(&schema).map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(Clone::clone)
}

/// Errors for one parsed instance; empty when it is valid.
pub fn errors_for(instance: &Value) -> Result<Vec<ValidationError>, String> {
    Ok(match validator()?.validate(instance) {
        Ok(()) => Vec::new(),
        Err(errors) => errors,
    })
}

/// Validate a JSON string against the compiled schema.
/// Returns an array of `{instancePath, schemaPath, keyword, params, message}`
/// objects; empty when the instance is valid.
#[wasm_bindgen]
pub fn validate(instance_json: &str) -> Result<JsValue, JsError> {
    let instance: Value = serde_json::from_str(instance_json)
        .map_err(|e| JsError::new(&format!("Invalid JSON: {e}")))?;
    let errors = errors_for(&instance).map_err(|e| JsError::new(&e))?;

    let arr = js_sys::Array::new();
    for err in errors {
        let obj = js_sys::Object::new();
        set(&obj, "instancePath", &err.instance_path)?;
        set(&obj, "schemaPath", &err.schema_path)?;
        set(&obj, "keyword", err.keyword())?;
        let params = serde_json::to_string(&err.kind.params())
            .map_err(|e| JsError::new(&e.to_string()))?;
        let params = js_sys::JSON::parse(&params).map_err(|_| JsError::new("cannot parse params"))?;
        js_sys::Reflect::set(&obj, &"params".into(), &params)
            .map_err(|_| JsError::new("cannot set params"))?;
        set(&obj, "message", &err.kind.to_string())?;
        arr.push(&obj);
    }
    Ok(arr.into())
}

fn set(obj: &js_sys::Object, key: &str, value: &str) -> Result<(), JsError> {
    js_sys::Reflect::set(obj, &key.into(), &value.into())
        .map(|_| ())
        .map_err(|_| JsError::new(&format!("cannot set {key}")))
}
