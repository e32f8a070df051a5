/// Per-keyword emit functions for the keywords without subschemas. Each
/// writes one JS fragment that checks `ctx.val` and records failures.
///
/// `at` is always the schema location of the keyword being emitted.
use serde_json::Value;

use super::context::EmitContext;
use super::types::type_condition;
use super::writer::{quote, CodeWriter};
use crate::ast::InstanceType;

/// `false`: every value fails.
pub fn emit_false(w: &mut CodeWriter, ctx: &EmitContext) {
    w.line(&ctx.push_error(&ctx.sp, "false schema", "{}"));
}

pub fn emit_type(w: &mut CodeWriter, ctx: &EmitContext, at: &str, types: &[InstanceType]) {
    let cond = type_condition(types, &ctx.val);
    let names: Vec<&str> = types.iter().map(InstanceType::as_str).collect();
    let params = format!("{{type: {}}}", quote(&names.join(",")));
    w.line(&format!("if ({cond}) {}", ctx.push_error(at, "type", &params)));
}

pub fn emit_const(w: &mut CodeWriter, ctx: &EmitContext, at: &str, value: &Value) {
    w.line(&format!(
        "if (!_eq({}, {value})) {}",
        ctx.val,
        ctx.push_error(at, "const", "{}")
    ));
}

pub fn emit_enum(w: &mut CodeWriter, ctx: &EmitContext, at: &str, values: &[Value]) {
    let arr = Value::Array(values.to_vec());
    w.line(&format!(
        "if (!{arr}.some((x) => _eq({}, x))) {}",
        ctx.val,
        ctx.push_error(at, "enum", "{}")
    ));
}

/// `minLength` / `maxLength`, counted in code points.
pub fn emit_length(w: &mut CodeWriter, ctx: &EmitContext, at: &str, keyword: &str, limit: u64) {
    let op = if keyword == "minLength" { "<" } else { ">" };
    w.line(&format!(
        "if (typeof {val} === \"string\" && _len({val}) {op} {limit}) {}",
        ctx.push_error(at, keyword, &format!("{{limit: {limit}}}")),
        val = ctx.val,
    ));
}

/// `minimum` / `maximum`.
pub fn emit_bound(w: &mut CodeWriter, ctx: &EmitContext, at: &str, keyword: &str, limit: f64) {
    let op = if keyword == "minimum" { "<" } else { ">" };
    w.line(&format!(
        "if (typeof {val} === \"number\" && {val} {op} {limit}) {}",
        ctx.push_error(at, keyword, &format!("{{limit: {limit}}}")),
        val = ctx.val,
    ));
}

pub fn emit_required(w: &mut CodeWriter, ctx: &EmitContext, at: &str, names: &[String]) {
    w.open(&format!("if (_obj({}))", ctx.val));
    for name in names {
        let quoted = quote(name);
        let params = format!("{{missingProperty: {quoted}}}");
        w.line(&format!(
            "if (!_has({}, {quoted})) {}",
            ctx.val,
            ctx.push_error(at, "required", &params)
        ));
    }
    w.close();
}

/// Call the function generated for a `$ref` target. Coverage is shared
/// with the caller.
pub fn emit_ref(w: &mut CodeWriter, ctx: &EmitContext, fn_name: &str) {
    w.line(&format!("{fn_name}({}, e, {}, {});", ctx.val, ctx.ip, ctx.ev));
}

/// A JS function name for definition number `index` with key `key`.
pub fn def_fn_name(key: &str, index: usize) -> String {
    let words: Vec<&str> = key
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() {
        format!("validate_{index}")
    } else {
        format!("validate_{}_{index}", words.join("_"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn emitted(f: impl FnOnce(&mut CodeWriter, &EmitContext)) -> String {
        let mut w = CodeWriter::new();
        f(&mut w, &EmitContext::definition("#"));
        w.finish()
    }

    #[test]
    fn test_emit_false() {
        let code = emitted(emit_false);
        assert_eq!(
            code,
            "e.push({instancePath: p, schemaPath: \"#\", keyword: \"false schema\", params: {}});\n"
        );
    }

    #[test]
    fn test_emit_type_union() {
        let code = emitted(|w, ctx| {
            emit_type(w, ctx, "#/type", &[InstanceType::String, InstanceType::Null])
        });
        assert!(code.starts_with("if (!(typeof v === \"string\" || v === null)) "));
        assert!(code.contains("params: {type: \"string,null\"}"));
    }

    #[test]
    fn test_emit_const_and_enum() {
        let code = emitted(|w, ctx| emit_const(w, ctx, "#/const", &json!({"a": [1]})));
        assert!(code.starts_with("if (!_eq(v, {\"a\":[1]})) "));
        let code = emitted(|w, ctx| emit_enum(w, ctx, "#/enum", &[json!("x"), json!(2)]));
        assert!(code.starts_with("if (![\"x\",2].some((x) => _eq(v, x))) "));
    }

    #[test]
    fn test_emit_length_and_bound() {
        let code = emitted(|w, ctx| emit_length(w, ctx, "#/maxLength", "maxLength", 3));
        assert!(code.starts_with("if (typeof v === \"string\" && _len(v) > 3) "));
        let code = emitted(|w, ctx| emit_bound(w, ctx, "#/minimum", "minimum", 0.5));
        assert!(code.starts_with("if (typeof v === \"number\" && v < 0.5) "));
        assert!(code.contains("params: {limit: 0.5}"));
    }

    #[test]
    fn test_emit_required() {
        let code = emitted(|w, ctx| emit_required(w, ctx, "#/required", &["kind".to_string()]));
        assert!(code.starts_with("if (_obj(v)) {\n"));
        assert!(code.contains("if (!_has(v, \"kind\")) e.push("));
        assert!(code.contains("params: {missingProperty: \"kind\"}"));
    }

    #[test]
    fn test_emit_ref() {
        let code = emitted(|w, ctx| emit_ref(w, ctx, "validate_defs_a_0"));
        assert_eq!(code, "validate_defs_a_0(v, e, p, ev);\n");
    }

    #[test]
    fn test_def_fn_name() {
        assert_eq!(def_fn_name("#/$defs/pet", 0), "validate_defs_pet_0");
        assert_eq!(def_fn_name("#", 3), "validate_3");
        assert_eq!(
            def_fn_name("https://x.io/a.json#/b", 1),
            "validate_https_x_io_a_json_b_1"
        );
    }
}
