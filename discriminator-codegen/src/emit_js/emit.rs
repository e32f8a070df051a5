/// Top-level composition: walks a CompiledSchema AST and produces a
/// complete ES module by dispatching to the per-keyword emitters.
///
/// The generated `validate(instance)` reports the same errors as
/// `Validator::validate`: validity of a subschema is "no errors were pushed
/// while it ran", and branch errors are truncated away when the enclosing
/// `anyOf`/`oneOf` succeeds.
use std::collections::BTreeMap;

use super::context::EmitContext;
use super::nodes::*;
use super::prelude::PRELUDE;
use super::writer::{quote, CodeWriter};
use crate::ast::{CompiledSchema, Discriminator, Keyword, Node};

/// Emit a complete ES2020 module from a compiled schema.
pub fn emit(schema: &CompiledSchema) -> String {
    let names = schema
        .definitions
        .keys()
        .enumerate()
        .map(|(i, key)| (key.as_str(), def_fn_name(key, i)))
        .collect();
    let mut em = Emitter {
        w: CodeWriter::new(),
        names,
    };

    em.w.lines(PRELUDE);
    em.w.line("");

    // One function per definition
    for (key, node) in &schema.definitions {
        let fn_name = em.names.get(key.as_str()).cloned().unwrap_or_default();
        em.w.open(&format!("function {fn_name}(v, e, p, ev)"));
        em.node(&EmitContext::definition(key), node);
        em.w.close();
        em.w.line("");
    }

    em.w.open("export function validate(instance)");
    em.w.line("const e = [];");
    em.w.line("const ev = _ev();");
    em.node(&EmitContext::root(), &schema.root);
    em.w.line("return e;");
    em.w.close();

    em.w.finish()
}

struct Emitter<'a> {
    w: CodeWriter,
    /// Definition key -> generated function name.
    names: BTreeMap<&'a str, String>,
}

impl Emitter<'_> {
    fn node(&mut self, ctx: &EmitContext, node: &Node) {
        match node {
            Node::Any => {}
            Node::Never => emit_false(&mut self.w, ctx),
            Node::Ref { target } => self.reference(ctx, target),
            Node::Keywords(keywords) => {
                for keyword in keywords {
                    self.keyword(ctx, keyword);
                }
            }
        }
    }

    fn reference(&mut self, ctx: &EmitContext, target: &str) {
        if let Some(fn_name) = self.names.get(target) {
            emit_ref(&mut self.w, ctx, fn_name);
        }
    }

    fn keyword(&mut self, ctx: &EmitContext, keyword: &Keyword) {
        let at = ctx.at(keyword.name());
        let w = &mut self.w;
        match keyword {
            Keyword::Ref(target) => self.reference(ctx, target),
            Keyword::Type(types) => emit_type(w, ctx, &at, types),
            Keyword::Const(value) => emit_const(w, ctx, &at, value),
            Keyword::Enum(values) => emit_enum(w, ctx, &at, values),
            Keyword::MinLength(limit) => emit_length(w, ctx, &at, "minLength", *limit),
            Keyword::MaxLength(limit) => emit_length(w, ctx, &at, "maxLength", *limit),
            Keyword::Minimum(limit) => emit_bound(w, ctx, &at, "minimum", *limit),
            Keyword::Maximum(limit) => emit_bound(w, ctx, &at, "maximum", *limit),
            Keyword::Required(names) => emit_required(w, ctx, &at, names),
            Keyword::Properties(props) => self.properties(ctx, &at, props),
            Keyword::AdditionalProperties { declared, schema } => {
                self.additional_properties(ctx, &at, declared, schema)
            }
            Keyword::Items(schema) => self.items(ctx, &at, schema),
            Keyword::AllOf(nodes) => {
                for (i, node) in nodes.iter().enumerate() {
                    self.node(&ctx.branch(format!("{at}/{i}"), &ctx.ev), node);
                }
            }
            Keyword::AnyOf(nodes) => self.any_of(ctx, &at, nodes),
            Keyword::OneOf(nodes) => self.one_of(ctx, &at, nodes),
            Keyword::Discriminator(d) => self.discriminator(ctx, &at, d),
            Keyword::UnevaluatedProperties(schema) => self.unevaluated_properties(ctx, &at, schema),
            Keyword::UnevaluatedItems(schema) => self.unevaluated_items(ctx, &at, schema),
        }
    }

    /// Declare a fresh coverage record and return its name.
    fn fresh_ev(&mut self) -> String {
        let ev = self.w.fresh("ev");
        self.w.line(&format!("const {ev} = _ev();"));
        ev
    }

    fn properties(&mut self, ctx: &EmitContext, at: &str, props: &BTreeMap<String, Node>) {
        self.w.open(&format!("if (_obj({}))", ctx.val));
        for name in props.keys() {
            self.w.line(&format!("{}.p.add({});", ctx.ev, quote(name)));
        }
        for (name, node) in props {
            if *node == Node::Any {
                continue;
            }
            self.w
                .open(&format!("if (_has({}, {}))", ctx.val, quote(name)));
            let ev = self.fresh_ev();
            self.node(&ctx.property(name, at, &ev), node);
            self.w.close();
        }
        self.w.close();
    }

    /// A property left over for `additionalProperties` or
    /// `unevaluatedProperties`, named by the loop variable `key`.
    fn extra_property(&mut self, ctx: &EmitContext, at: &str, key: &str, schema: &Node, keyword: &str) {
        if *schema == Node::Never {
            let param = match keyword {
                "additionalProperties" => "additionalProperty",
                _ => "unevaluatedProperty",
            };
            self.w
                .line(&ctx.push_error(at, keyword, &format!("{{{param}: {key}}}")));
        } else {
            let ev = self.fresh_ev();
            self.node(&ctx.entry(key, at, &ev), schema);
        }
    }

    fn additional_properties(&mut self, ctx: &EmitContext, at: &str, declared: &[String], schema: &Node) {
        self.w.open(&format!("if (_obj({}))", ctx.val));
        let k = self.w.fresh("k");
        self.w.open(&format!("for (const {k} in {})", ctx.val));
        if declared.is_empty() {
            self.extra_property(ctx, at, &k, schema, "additionalProperties");
        } else {
            let conds: Vec<String> = declared
                .iter()
                .map(|name| format!("{k} !== {}", quote(name)))
                .collect();
            self.w.open(&format!("if ({})", conds.join(" && ")));
            self.extra_property(ctx, at, &k, schema, "additionalProperties");
            self.w.close();
        }
        self.w.close(); // for
        self.w.line(&format!("{}.a = true;", ctx.ev));
        self.w.close();
    }

    fn items(&mut self, ctx: &EmitContext, at: &str, schema: &Node) {
        self.w.open(&format!("if (Array.isArray({}))", ctx.val));
        self.each_item(ctx, at, schema);
        self.w.line(&format!("{}.i = true;", ctx.ev));
        self.w.close();
    }

    fn each_item(&mut self, ctx: &EmitContext, at: &str, schema: &Node) {
        let i = self.w.fresh("i");
        self.w.open(&format!(
            "for (let {i} = 0; {i} < {}.length; {i}++)",
            ctx.val
        ));
        let ev = self.fresh_ev();
        self.node(&ctx.element(&i, at, &ev), schema);
        self.w.close();
    }

    /// Open a block that validates one branch against a fresh coverage
    /// record. Returns `(error count before, coverage)`; the caller closes
    /// the block after testing `e.length === before`.
    fn branch(&mut self, ctx: &EmitContext, sp: String, node: &Node) -> (String, String) {
        self.w.block();
        let before = self.w.fresh("n");
        self.w.line(&format!("const {before} = e.length;"));
        let ev = self.fresh_ev();
        self.node(&ctx.branch(sp, &ev), node);
        (before, ev)
    }

    fn any_of(&mut self, ctx: &EmitContext, at: &str, nodes: &[Node]) {
        let start = self.w.fresh("n");
        let ok = self.w.fresh("ok");
        self.w.line(&format!("const {start} = e.length;"));
        self.w.line(&format!("let {ok} = false;"));
        for (i, node) in nodes.iter().enumerate() {
            let (before, ev) = self.branch(ctx, format!("{at}/{i}"), node);
            self.w.open(&format!("if (e.length === {before})"));
            self.w.line(&format!("{ok} = true;"));
            self.w.line(&format!("_merge({}, {ev});", ctx.ev));
            self.w.close();
            self.w.close(); // branch
        }
        self.w.open(&format!("if ({ok})"));
        self.w.line(&format!("e.length = {start};"));
        self.w.close_open("else");
        self.w.line(&ctx.push_error(at, "anyOf", "{}"));
        self.w.close();
    }

    fn one_of(&mut self, ctx: &EmitContext, at: &str, nodes: &[Node]) {
        let start = self.w.fresh("n");
        let pass = self.w.fresh("pass");
        let chosen = self.w.fresh("ev");
        self.w.line(&format!("const {start} = e.length;"));
        self.w.line(&format!("const {pass} = [];"));
        self.w.line(&format!("let {chosen} = null;"));
        for (i, node) in nodes.iter().enumerate() {
            let (before, ev) = self.branch(ctx, format!("{at}/{i}"), node);
            self.w.open(&format!("if (e.length === {before})"));
            self.w.line(&format!("{pass}.push({i});"));
            self.w.line(&format!("{chosen} = {ev};"));
            self.w.close();
            self.w.close(); // branch
        }
        self.w.open(&format!("if ({pass}.length === 1)"));
        self.w.line(&format!("e.length = {start};"));
        self.w.line(&format!("_merge({}, {chosen});", ctx.ev));
        self.w.close_open("else");
        self.w.line(&format!("if ({pass}.length > 0) e.length = {start};"));
        self.w.line(&ctx.push_error(
            at,
            "oneOf",
            &format!("{{passingSchemas: {pass}}}"),
        ));
        self.w.close();
    }

    /// Read the tag once, then an `if`/`else if` chain with one arm per
    /// alternative; only the selected alternative's code runs.
    fn discriminator(&mut self, ctx: &EmitContext, at: &str, d: &Discriminator) {
        let tag = quote(&d.tag_name);
        self.w.open(&format!("if (_obj({}))", ctx.val));
        let t = self.w.fresh("t");
        self.w.line(&format!(
            "const {t} = _has({val}, {tag}) ? {val}[{tag}] : undefined;",
            val = ctx.val
        ));
        self.w.open(&format!("if (typeof {t} !== \"string\")"));
        let params = format!(
            "{{error: \"tag\", tag: {tag}, tagValue: {t} === undefined ? null : {t}}}"
        );
        self.w.line(&ctx.push_error(at, "discriminator", &params));

        for (index, values) in d.mapping.by_alternative() {
            let Some(node) = d.alternatives.get(index) else {
                continue;
            };
            let conds: Vec<String> = values
                .iter()
                .map(|value| format!("{t} === {}", quote(value)))
                .collect();
            self.w.close_open(&format!("else if ({})", conds.join(" || ")));
            // Coverage is merged whether or not the alternative passes.
            let ev = self.fresh_ev();
            self.node(&ctx.branch(format!("{}/oneOf/{index}", ctx.sp), &ev), node);
            self.w.line(&format!("_merge({}, {ev});", ctx.ev));
        }

        self.w.close_open("else");
        let params = format!("{{error: \"mapping\", tag: {tag}, tagValue: {t}}}");
        self.w.line(&ctx.push_error(at, "discriminator", &params));
        self.w.close();
        self.w.close();
    }

    fn unevaluated_properties(&mut self, ctx: &EmitContext, at: &str, schema: &Node) {
        self.w.open(&format!("if (_obj({}))", ctx.val));
        let k = self.w.fresh("k");
        self.w.open(&format!("for (const {k} in {})", ctx.val));
        self.w.open(&format!("if (!_seen({}, {k}))", ctx.ev));
        self.extra_property(ctx, at, &k, schema, "unevaluatedProperties");
        self.w.close();
        self.w.close(); // for
        self.w.line(&format!("{}.a = true;", ctx.ev));
        self.w.close();
    }

    fn unevaluated_items(&mut self, ctx: &EmitContext, at: &str, schema: &Node) {
        self.w.open(&format!("if (Array.isArray({}))", ctx.val));
        self.w.open(&format!("if (!{}.i)", ctx.ev));
        if *schema == Node::Never {
            self.w.line(&format!(
                "if ({}.length > 0) {}",
                ctx.val,
                ctx.push_error(at, "unevaluatedItems", "{}")
            ));
        } else {
            self.each_item(ctx, at, schema);
        }
        self.w.close();
        self.w.line(&format!("{}.i = true;", ctx.ev));
        self.w.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler;
    use serde_json::json;

    #[test]
    fn test_emit_empty_schema() {
        let compiled = compiler::compile(&json!({})).unwrap();
        let code = emit(&compiled);
        assert!(code.starts_with("function _obj(v) {"));
        assert!(code.contains("export function validate(instance)"));
        assert!(code.contains("const e = [];"));
        assert!(code.ends_with("  return e;\n}\n"));
        assert!(!code.contains("e.push"));
    }

    #[test]
    fn test_emit_type_string() {
        let compiled = compiler::compile(&json!({"type": "string"})).unwrap();
        let code = emit(&compiled);
        assert!(code.contains("if (typeof instance !== \"string\") e.push("));
        assert!(code.contains("schemaPath: \"#/type\""));
    }

    #[test]
    fn test_emit_ref_generates_definition_function() {
        let compiled = compiler::compile(&json!({
            "$defs": {"name": {"type": "string"}},
            "properties": {"first": {"$ref": "#/$defs/name"}}
        }))
        .unwrap();
        let code = emit(&compiled);
        assert!(code.contains("function validate_defs_name_0(v, e, p, ev) {"));
        assert!(code.contains("schemaPath: \"#/$defs/name/type\""));
        assert!(code.contains("validate_defs_name_0(instance[\"first\"], e, \"\" + \"/first\", ev"));
    }

    #[test]
    fn test_emit_discriminator_chain() {
        let compiled = compiler::compile(&json!({
            "discriminator": {"propertyName": "kind"},
            "required": ["kind"],
            "oneOf": [
                {"properties": {"kind": {"const": "cat"}}},
                {"properties": {"kind": {"enum": ["dog", "puppy"]}}}
            ]
        }))
        .unwrap();
        let code = emit(&compiled);
        assert!(code.contains("_has(instance, \"kind\") ? instance[\"kind\"] : undefined;"));
        assert!(code.contains("} else if (t1 === \"cat\") {"));
        assert!(code.contains("} else if (t1 === \"dog\" || t1 === \"puppy\") {"));
        assert!(code.contains("schemaPath: \"#/oneOf/1/properties/kind/enum\""));
        assert!(code.contains("error: \"mapping\""));
        assert!(code.contains("  _merge(ev, ev2);\n"));
        // No plain oneOf bookkeeping.
        assert!(!code.contains("pass"));
    }

    #[test]
    fn test_emit_additional_properties_false() {
        let compiled = compiler::compile(&json!({
            "properties": {"a": {}},
            "additionalProperties": false
        }))
        .unwrap();
        let code = emit(&compiled);
        assert!(code.contains("for (const k1 in instance) {"));
        assert!(code.contains("if (k1 !== \"a\") {"));
        assert!(code.contains("params: {additionalProperty: k1}"));
    }
}
