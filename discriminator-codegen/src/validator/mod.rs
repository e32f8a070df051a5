/// In-process validator: walks the compiled AST against a JSON instance and
/// collects every failing keyword, ajv `allErrors` style.
mod error;
mod evaluated;

pub use error::{ErrorKind, ValidationError};
pub use evaluated::Evaluated;

use serde_json::Value;

use crate::ast::{CompiledSchema, Discriminator, Keyword, Node};
use crate::compiler::{compile_with, CompileError};
use crate::discriminator::{dispatch, AlternativeOutcome, AlternativeValidator, Dispatch};
use crate::options::CompileOptions;
use crate::resolver::escape_pointer;

#[derive(Debug, Clone)]
pub struct Validator {
    schema: CompiledSchema,
}

impl Validator {
    pub fn new(schema: &Value) -> Result<Self, CompileError> {
        Self::with_options(schema, &CompileOptions::default())
    }

    pub fn with_options(schema: &Value, options: &CompileOptions) -> Result<Self, CompileError> {
        Ok(Self::from_compiled(compile_with(schema, options)?))
    }

    pub fn from_compiled(schema: CompiledSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &CompiledSchema {
        &self.schema
    }

    pub fn validate(&self, instance: &Value) -> Result<(), Vec<ValidationError>> {
        let walker = Walker {
            schema: &self.schema,
        };
        let mut errors = Vec::new();
        let mut evaluated = Evaluated::default();
        walker.node(&self.schema.root, instance, "", "#", &mut errors, &mut evaluated);
        tracing::trace!(errors = errors.len(), "validated instance");
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validate(instance).is_ok()
    }
}

struct Walker<'s> {
    schema: &'s CompiledSchema,
}

impl<'s> Walker<'s> {
    fn node(
        &self,
        node: &'s Node,
        instance: &Value,
        ip: &str,
        sp: &str,
        errors: &mut Vec<ValidationError>,
        evaluated: &mut Evaluated,
    ) {
        match node {
            Node::Any => {}
            Node::Never => errors.push(error(ip, sp.to_string(), ErrorKind::FalseSchema)),
            Node::Ref { target } => self.reference(target, instance, ip, errors, evaluated),
            Node::Keywords(keywords) => {
                for keyword in keywords {
                    self.keyword(keyword, instance, ip, sp, errors, evaluated);
                }
            }
        }
    }

    fn reference(
        &self,
        target: &str,
        instance: &Value,
        ip: &str,
        errors: &mut Vec<ValidationError>,
        evaluated: &mut Evaluated,
    ) {
        if let Some((key, node)) = self.schema.definitions.get_key_value(target) {
            self.node(node, instance, ip, key, errors, evaluated);
        }
    }

    fn keyword(
        &self,
        keyword: &'s Keyword,
        instance: &Value,
        ip: &str,
        sp: &str,
        errors: &mut Vec<ValidationError>,
        evaluated: &mut Evaluated,
    ) {
        let at = format!("{sp}/{}", keyword.name());
        match keyword {
            Keyword::Ref(target) => self.reference(target, instance, ip, errors, evaluated),
            Keyword::Type(types) => {
                if !types.iter().any(|t| t.matches(instance)) {
                    let expected = types.iter().map(|t| t.as_str()).collect::<Vec<_>>().join(",");
                    errors.push(error(ip, at, ErrorKind::Type { expected }));
                }
            }
            Keyword::Const(value) => {
                if !json_equal(instance, value) {
                    errors.push(error(ip, at, ErrorKind::Const));
                }
            }
            Keyword::Enum(values) => {
                if !values.iter().any(|v| json_equal(instance, v)) {
                    errors.push(error(ip, at, ErrorKind::Enum));
                }
            }
            Keyword::MinLength(limit) => {
                if let Some(s) = instance.as_str() {
                    if (s.chars().count() as u64) < *limit {
                        errors.push(error(ip, at, ErrorKind::MinLength { limit: *limit }));
                    }
                }
            }
            Keyword::MaxLength(limit) => {
                if let Some(s) = instance.as_str() {
                    if (s.chars().count() as u64) > *limit {
                        errors.push(error(ip, at, ErrorKind::MaxLength { limit: *limit }));
                    }
                }
            }
            Keyword::Minimum(limit) => {
                if instance.as_f64().is_some_and(|n| n < *limit) {
                    errors.push(error(ip, at, ErrorKind::Minimum { limit: *limit }));
                }
            }
            Keyword::Maximum(limit) => {
                if instance.as_f64().is_some_and(|n| n > *limit) {
                    errors.push(error(ip, at, ErrorKind::Maximum { limit: *limit }));
                }
            }
            Keyword::Required(names) => {
                if let Some(obj) = instance.as_object() {
                    for name in names.iter().filter(|name| !obj.contains_key(name.as_str())) {
                        let kind = ErrorKind::Required {
                            missing: name.clone(),
                        };
                        errors.push(error(ip, at.clone(), kind));
                    }
                }
            }
            Keyword::Properties(props) => {
                let Some(obj) = instance.as_object() else {
                    return;
                };
                for (name, node) in props {
                    evaluated.mark_property(name);
                    if let Some(value) = obj.get(name) {
                        let child_sp = format!("{at}/{}", escape_pointer(name));
                        let child_ip = child_path(ip, name);
                        self.node(node, value, &child_ip, &child_sp, errors, &mut Evaluated::default());
                    }
                }
            }
            Keyword::AdditionalProperties { declared, schema } => {
                let Some(obj) = instance.as_object() else {
                    return;
                };
                for (name, value) in obj.iter().filter(|(name, _)| !declared.contains(*name)) {
                    self.extra_property(schema, name, value, ip, &at, errors, || {
                        ErrorKind::AdditionalProperties {
                            property: name.clone(),
                        }
                    });
                }
                evaluated.mark_all_properties();
            }
            Keyword::Items(schema) => {
                let Some(items) = instance.as_array() else {
                    return;
                };
                for (i, item) in items.iter().enumerate() {
                    let child_ip = child_path(ip, &i.to_string());
                    self.node(schema, item, &child_ip, &at, errors, &mut Evaluated::default());
                }
                evaluated.mark_all_items();
            }
            Keyword::AllOf(nodes) => {
                for (i, node) in nodes.iter().enumerate() {
                    self.node(node, instance, ip, &format!("{at}/{i}"), errors, evaluated);
                }
            }
            Keyword::AnyOf(nodes) => {
                let start = errors.len();
                let passed = self.branches(nodes, instance, ip, &at, errors);
                if passed.is_empty() {
                    errors.push(error(ip, at, ErrorKind::AnyOf));
                } else {
                    errors.truncate(start);
                    for (_, branch) in passed {
                        evaluated.merge(branch);
                    }
                }
            }
            Keyword::OneOf(nodes) => {
                let start = errors.len();
                let mut passed = self.branches(nodes, instance, ip, &at, errors);
                if passed.len() == 1 {
                    errors.truncate(start);
                    if let Some((_, branch)) = passed.pop() {
                        evaluated.merge(branch);
                    }
                } else {
                    if !passed.is_empty() {
                        errors.truncate(start);
                    }
                    let passing = passed.into_iter().map(|(i, _)| i).collect();
                    errors.push(error(ip, at, ErrorKind::OneOf { passing }));
                }
            }
            Keyword::Discriminator(d) => {
                // Applies to objects only; anything else passes this keyword.
                if instance.is_object() {
                    self.discriminate(d, instance, ip, sp, at, errors, evaluated);
                }
            }
            Keyword::UnevaluatedProperties(schema) => {
                let Some(obj) = instance.as_object() else {
                    return;
                };
                for (name, value) in obj.iter().filter(|(name, _)| !evaluated.is_property_evaluated(name)) {
                    self.extra_property(schema, name, value, ip, &at, errors, || {
                        ErrorKind::UnevaluatedProperties {
                            property: name.clone(),
                        }
                    });
                }
                evaluated.mark_all_properties();
            }
            Keyword::UnevaluatedItems(schema) => {
                let Some(items) = instance.as_array() else {
                    return;
                };
                if !evaluated.items_evaluated() {
                    if **schema == Node::Never {
                        if !items.is_empty() {
                            errors.push(error(ip, at, ErrorKind::UnevaluatedItems));
                        }
                    } else {
                        for (i, item) in items.iter().enumerate() {
                            let child_ip = child_path(ip, &i.to_string());
                            self.node(schema, item, &child_ip, &at, errors, &mut Evaluated::default());
                        }
                    }
                }
                evaluated.mark_all_items();
            }
        }
    }

    /// A property left over for `additionalProperties` or
    /// `unevaluatedProperties`. `false` reports the property by name on the
    /// object; any other schema validates the value.
    #[allow(clippy::too_many_arguments)]
    fn extra_property(
        &self,
        schema: &'s Node,
        name: &str,
        value: &Value,
        ip: &str,
        at: &str,
        errors: &mut Vec<ValidationError>,
        kind: impl FnOnce() -> ErrorKind,
    ) {
        if *schema == Node::Never {
            errors.push(error(ip, at.to_string(), kind()));
        } else {
            let child_ip = child_path(ip, name);
            self.node(schema, value, &child_ip, at, errors, &mut Evaluated::default());
        }
    }

    /// Validate every branch; returns the passing ones with their coverage.
    fn branches(
        &self,
        nodes: &'s [Node],
        instance: &Value,
        ip: &str,
        at: &str,
        errors: &mut Vec<ValidationError>,
    ) -> Vec<(usize, Evaluated)> {
        let mut passed = Vec::new();
        for (i, node) in nodes.iter().enumerate() {
            let before = errors.len();
            let mut branch = Evaluated::default();
            self.node(node, instance, ip, &format!("{at}/{i}"), errors, &mut branch);
            if errors.len() == before {
                passed.push((i, branch));
            }
        }
        passed
    }

    #[allow(clippy::too_many_arguments)]
    fn discriminate(
        &self,
        d: &'s Discriminator,
        instance: &Value,
        ip: &str,
        sp: &str,
        at: String,
        errors: &mut Vec<ValidationError>,
        evaluated: &mut Evaluated,
    ) {
        let mut alternatives = Alternatives {
            walker: self,
            alternatives: &d.alternatives,
            ip,
            sp,
        };
        match dispatch(&d.tag_name, &d.mapping, instance, &mut alternatives, evaluated) {
            Dispatch::Valid { .. } => {}
            Dispatch::Invalid { errors: failed, .. } => errors.extend(failed),
            Dispatch::Rejected(err) => errors.push(error(ip, at, ErrorKind::Discriminator(err))),
        }
    }
}

/// The alternatives of one discriminated `oneOf`, as seen by `dispatch`.
struct Alternatives<'w, 's> {
    walker: &'w Walker<'s>,
    alternatives: &'s [Node],
    ip: &'w str,
    sp: &'w str,
}

impl AlternativeValidator for Alternatives<'_, '_> {
    type Error = ValidationError;

    fn validate(&mut self, index: usize, instance: &Value) -> AlternativeOutcome<ValidationError> {
        let mut errors = Vec::new();
        let mut evaluated = Evaluated::default();
        if let Some(node) = self.alternatives.get(index) {
            let sp = format!("{}/oneOf/{index}", self.sp);
            self.walker
                .node(node, instance, self.ip, &sp, &mut errors, &mut evaluated);
        }
        AlternativeOutcome { errors, evaluated }
    }
}

fn error(ip: &str, schema_path: String, kind: ErrorKind) -> ValidationError {
    ValidationError {
        instance_path: ip.to_string(),
        schema_path,
        kind,
    }
}

fn child_path(ip: &str, segment: &str) -> String {
    format!("{ip}/{}", escape_pointer(segment))
}

/// JSON equality with numbers compared by value (`1` equals `1.0`).
fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|w| json_equal(v, w)))
        }
        _ => a == b,
    }
}
