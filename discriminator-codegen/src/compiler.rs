/// Schema compiler: parses a JSON Schema document into the intermediate AST.
///
/// Every `$ref` target is compiled once into `CompiledSchema::definitions`,
/// keyed by its canonical reference, so recursive schemas terminate. Every
/// `oneOf` guarded by `discriminator` gets its tag mapping built here; an
/// authoring error anywhere fails the whole document.
use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Value};
use tracing::debug;

use crate::ast::{CompiledSchema, Discriminator, InstanceType, Keyword, Node};
use crate::discriminator::{
    build_mapping, is_rule_keyword, DiscriminatorConfig, DiscriminatorError, SchemaNode,
};
use crate::options::CompileOptions;
use crate::resolver::{escape_pointer, rebase, LocalResolver, RefResolver, ResolveError};

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("{location}: schema must be an object or a boolean")]
    NotASchema { location: String },
    #[error("{location}: '{keyword}' {reason}")]
    InvalidKeyword {
        location: String,
        keyword: &'static str,
        reason: &'static str,
    },
    #[error("{location}: unknown type '{name}'")]
    UnknownType { location: String, name: String },
    #[error("{location}: unsupported keyword '{keyword}'")]
    UnsupportedKeyword { location: String, keyword: String },
    #[error("{location}: cannot resolve reference: {source}")]
    Unresolved {
        location: String,
        source: ResolveError,
    },
    #[error("{location}: {source}")]
    Discriminator {
        location: String,
        source: DiscriminatorError,
    },
}

impl CompileError {
    /// Schema location (`#/...`) of the offending subschema.
    pub fn location(&self) -> &str {
        match self {
            CompileError::NotASchema { location }
            | CompileError::InvalidKeyword { location, .. }
            | CompileError::UnknownType { location, .. }
            | CompileError::UnsupportedKeyword { location, .. }
            | CompileError::Unresolved { location, .. }
            | CompileError::Discriminator { location, .. } => location,
        }
    }
}

/// Compile a schema with default options.
pub fn compile(schema: &Value) -> Result<CompiledSchema, CompileError> {
    compile_with(schema, &CompileOptions::default())
}

/// Compile a self-contained schema document.
pub fn compile_with(schema: &Value, options: &CompileOptions) -> Result<CompiledSchema, CompileError> {
    let resolver = LocalResolver::new(schema.clone());
    compile_with_resolver(&resolver, options)
}

/// Compile the resolver's root document. References may point into any
/// document the resolver knows about.
pub fn compile_with_resolver<R: RefResolver + ?Sized>(
    resolver: &R,
    options: &CompileOptions,
) -> Result<CompiledSchema, CompileError> {
    let mut compiler = Compiler {
        resolver,
        options: options.clone(),
        queued: HashSet::new(),
        pending: Vec::new(),
    };
    let root = compiler.compile_node(resolver.root(), resolver.root_id(), "#")?;

    // Drain the worklist; compiling a definition may queue further targets.
    let mut definitions = BTreeMap::new();
    while let Some(Pending { key, schema, base_id }) = compiler.pending.pop() {
        let node = compiler.compile_node(schema, &base_id, &key)?;
        debug!(reference = key.as_str(), "compiled definition");
        definitions.insert(key, node);
    }

    Ok(CompiledSchema { root, definitions })
}

/// Keywords `compile_object` understands. Annotations pass through
/// untouched.
const SUPPORTED_KEYWORDS: &[&str] = &[
    "$ref",
    "$id",
    "$anchor",
    "$defs",
    "definitions",
    "type",
    "const",
    "enum",
    "minLength",
    "maxLength",
    "minimum",
    "maximum",
    "required",
    "properties",
    "additionalProperties",
    "items",
    "allOf",
    "anyOf",
    "oneOf",
    "discriminator",
    "unevaluatedProperties",
    "unevaluatedItems",
];

struct Pending<'r> {
    key: String,
    schema: &'r Value,
    base_id: String,
}

struct Compiler<'r, R: ?Sized> {
    resolver: &'r R,
    options: CompileOptions,
    queued: HashSet<String>,
    pending: Vec<Pending<'r>>,
}

impl<'r, R: RefResolver + ?Sized> Compiler<'r, R> {
    fn compile_node(&mut self, schema: &'r Value, base: &str, location: &str) -> Result<Node, CompileError> {
        match SchemaNode::new(schema) {
            SchemaNode::Bool(true) => Ok(Node::Any),
            SchemaNode::Bool(false) => Ok(Node::Never),
            SchemaNode::Ref(reference) => Ok(Node::Ref {
                target: self.reference(reference, base, location)?,
            }),
            SchemaNode::Object(obj) => self.compile_object(obj.raw(), base, location),
            SchemaNode::Invalid(_) => Err(CompileError::NotASchema {
                location: location.to_string(),
            }),
        }
    }

    fn compile_object(
        &mut self,
        obj: &'r Map<String, Value>,
        base: &str,
        location: &str,
    ) -> Result<Node, CompileError> {
        let base = match obj.get("$id") {
            None => base.to_string(),
            Some(Value::String(id)) => rebase(base, id),
            Some(_) => return Err(invalid(location, "$id", "must be a string")),
        };
        let base = base.as_str();
        for keyword in ["$defs", "definitions"] {
            if obj.get(keyword).is_some_and(|defs| !defs.is_object()) {
                return Err(invalid(location, keyword, "must be an object"));
            }
        }
        // A rule keyword that is not compiled would silently accept anything.
        if let Some(keyword) = obj
            .keys()
            .find(|k| is_rule_keyword(k) && !SUPPORTED_KEYWORDS.contains(&k.as_str()))
        {
            return Err(CompileError::UnsupportedKeyword {
                location: location.to_string(),
                keyword: keyword.clone(),
            });
        }

        let mut keywords = Vec::new();

        if let Some(value) = obj.get("$ref") {
            let reference = value
                .as_str()
                .ok_or_else(|| invalid(location, "$ref", "must be a string"))?;
            keywords.push(Keyword::Ref(self.reference(reference, base, location)?));
        }
        if let Some(value) = obj.get("type") {
            keywords.push(Keyword::Type(parse_types(value, location)?));
        }
        if let Some(value) = obj.get("const") {
            keywords.push(Keyword::Const(value.clone()));
        }
        if let Some(value) = obj.get("enum") {
            let values = value
                .as_array()
                .filter(|values| !values.is_empty())
                .ok_or_else(|| invalid(location, "enum", "must be a non-empty array"))?;
            keywords.push(Keyword::Enum(values.clone()));
        }
        if let Some(value) = obj.get("minLength") {
            keywords.push(Keyword::MinLength(length(value, location, "minLength")?));
        }
        if let Some(value) = obj.get("maxLength") {
            keywords.push(Keyword::MaxLength(length(value, location, "maxLength")?));
        }
        if let Some(value) = obj.get("minimum") {
            keywords.push(Keyword::Minimum(number(value, location, "minimum")?));
        }
        if let Some(value) = obj.get("maximum") {
            keywords.push(Keyword::Maximum(number(value, location, "maximum")?));
        }
        if let Some(value) = obj.get("required") {
            keywords.push(Keyword::Required(string_array(value, location, "required")?));
        }

        let mut declared = Vec::new();
        if let Some(value) = obj.get("properties") {
            let props = value
                .as_object()
                .ok_or_else(|| invalid(location, "properties", "must be an object"))?;
            let mut compiled = BTreeMap::new();
            for (name, schema) in props {
                let at = format!("{location}/properties/{}", escape_pointer(name));
                compiled.insert(name.clone(), self.compile_node(schema, base, &at)?);
                declared.push(name.clone());
            }
            keywords.push(Keyword::Properties(compiled));
        }
        if let Some(schema) = self.subschema(obj, "additionalProperties", base, location)? {
            keywords.push(Keyword::AdditionalProperties { declared, schema });
        }
        if let Some(schema) = self.subschema(obj, "items", base, location)? {
            keywords.push(Keyword::Items(schema));
        }

        if let Some(nodes) = self.subschemas(obj, "allOf", base, location)? {
            keywords.push(Keyword::AllOf(nodes));
        }
        if let Some(nodes) = self.subschemas(obj, "anyOf", base, location)? {
            keywords.push(Keyword::AnyOf(nodes));
        }
        if self.options.discriminator.is_enabled() && obj.contains_key("discriminator") {
            keywords.push(Keyword::Discriminator(self.discriminator(obj, base, location)?));
        } else if let Some(nodes) = self.subschemas(obj, "oneOf", base, location)? {
            keywords.push(Keyword::OneOf(nodes));
        }

        // Must run after every keyword that can mark coverage.
        if let Some(schema) = self.subschema(obj, "unevaluatedProperties", base, location)? {
            keywords.push(Keyword::UnevaluatedProperties(schema));
        }
        if let Some(schema) = self.subschema(obj, "unevaluatedItems", base, location)? {
            keywords.push(Keyword::UnevaluatedItems(schema));
        }

        if keywords.is_empty() {
            Ok(Node::Any)
        } else {
            Ok(Node::Keywords(keywords))
        }
    }

    fn discriminator(
        &mut self,
        obj: &'r Map<String, Value>,
        base: &str,
        location: &str,
    ) -> Result<Discriminator, CompileError> {
        let fail = |source: DiscriminatorError| CompileError::Discriminator {
            location: location.to_string(),
            source,
        };
        let strict = self.options.discriminator.strict_mapping();
        let config = DiscriminatorConfig::from_schema(obj, strict).map_err(fail)?;
        let mapping = build_mapping(&config, base, self.resolver).map_err(fail)?;

        let mut alternatives = Vec::with_capacity(config.alternatives.len());
        for (i, alternative) in config.alternatives.iter().enumerate() {
            let at = format!("{location}/oneOf/{i}");
            alternatives.push(self.compile_node(alternative, base, &at)?);
        }

        debug!(
            location,
            tag = config.tag_name,
            values = mapping.len(),
            "built discriminator mapping"
        );
        Ok(Discriminator {
            tag_name: config.tag_name.to_string(),
            mapping,
            alternatives,
            location: location.to_string(),
        })
    }

    fn subschema(
        &mut self,
        obj: &'r Map<String, Value>,
        keyword: &str,
        base: &str,
        location: &str,
    ) -> Result<Option<Box<Node>>, CompileError> {
        match obj.get(keyword) {
            Some(schema) => {
                let at = format!("{location}/{keyword}");
                Ok(Some(Box::new(self.compile_node(schema, base, &at)?)))
            }
            None => Ok(None),
        }
    }

    fn subschemas(
        &mut self,
        obj: &'r Map<String, Value>,
        keyword: &'static str,
        base: &str,
        location: &str,
    ) -> Result<Option<Vec<Node>>, CompileError> {
        let Some(value) = obj.get(keyword) else {
            return Ok(None);
        };
        let schemas = value
            .as_array()
            .filter(|schemas| !schemas.is_empty())
            .ok_or_else(|| invalid(location, keyword, "must be a non-empty array of schemas"))?;
        let mut nodes = Vec::with_capacity(schemas.len());
        for (i, schema) in schemas.iter().enumerate() {
            let at = format!("{location}/{keyword}/{i}");
            nodes.push(self.compile_node(schema, base, &at)?);
        }
        Ok(Some(nodes))
    }

    /// Resolve `reference`, queue its target for compilation, and return
    /// the definition key.
    fn reference(&mut self, reference: &str, base: &str, location: &str) -> Result<String, CompileError> {
        let resolver = self.resolver;
        let resolved = resolver
            .resolve(base, reference)
            .map_err(|source| CompileError::Unresolved {
                location: location.to_string(),
                source,
            })?;

        // Targets inside the root document are keyed by fragment alone.
        let root_id = resolver.root_id();
        let key = match resolved.key.strip_prefix(root_id) {
            Some(fragment) if !root_id.is_empty() && fragment.starts_with('#') => fragment.to_string(),
            _ => resolved.key.clone(),
        };

        if self.queued.insert(key.clone()) {
            self.pending.push(Pending {
                key: key.clone(),
                schema: resolved.schema,
                base_id: resolved.base_id,
            });
        }
        Ok(key)
    }
}

fn invalid(location: &str, keyword: &'static str, reason: &'static str) -> CompileError {
    CompileError::InvalidKeyword {
        location: location.to_string(),
        keyword,
        reason,
    }
}

fn parse_types(value: &Value, location: &str) -> Result<Vec<InstanceType>, CompileError> {
    let names: Vec<&Value> = match value {
        Value::Array(names) => names.iter().collect(),
        single => vec![single],
    };
    names
        .into_iter()
        .map(|name| {
            let name = name
                .as_str()
                .ok_or_else(|| invalid(location, "type", "must be a string or an array of strings"))?;
            InstanceType::parse(name).ok_or_else(|| CompileError::UnknownType {
                location: location.to_string(),
                name: name.to_string(),
            })
        })
        .collect()
}

fn length(value: &Value, location: &str, keyword: &'static str) -> Result<u64, CompileError> {
    value
        .as_u64()
        .ok_or_else(|| invalid(location, keyword, "must be a non-negative integer"))
}

fn number(value: &Value, location: &str, keyword: &'static str) -> Result<f64, CompileError> {
    value
        .as_f64()
        .ok_or_else(|| invalid(location, keyword, "must be a number"))
}

fn string_array(value: &Value, location: &str, keyword: &'static str) -> Result<Vec<String>, CompileError> {
    value
        .as_array()
        .and_then(|items| {
            items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
        })
        .ok_or_else(|| invalid(location, keyword, "must be an array of strings"))
}
