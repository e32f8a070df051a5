/// Compiled schema AST.
///
/// Immutable once `compiler::compile` returns. Shared read-only by the
/// runtime validator and the JavaScript emitter.
use std::collections::BTreeMap;

use serde_json::Value;

use crate::discriminator::TagMapping;

/// The seven JSON Schema instance types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceType {
    Null,
    Boolean,
    Object,
    Array,
    Number,
    Integer,
    String,
}

impl InstanceType {
    pub fn parse(s: &str) -> Option<InstanceType> {
        match s {
            "null" => Some(InstanceType::Null),
            "boolean" => Some(InstanceType::Boolean),
            "object" => Some(InstanceType::Object),
            "array" => Some(InstanceType::Array),
            "number" => Some(InstanceType::Number),
            "integer" => Some(InstanceType::Integer),
            "string" => Some(InstanceType::String),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceType::Null => "null",
            InstanceType::Boolean => "boolean",
            InstanceType::Object => "object",
            InstanceType::Array => "array",
            InstanceType::Number => "number",
            InstanceType::Integer => "integer",
            InstanceType::String => "string",
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            InstanceType::Null => value.is_null(),
            InstanceType::Boolean => value.is_boolean(),
            InstanceType::Object => value.is_object(),
            InstanceType::Array => value.is_array(),
            InstanceType::Number => value.is_number(),
            InstanceType::Integer => value.as_f64().is_some_and(|n| n.fract() == 0.0),
            InstanceType::String => value.is_string(),
        }
    }
}

/// One compiled schema.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `true` or a schema without validation keywords
    Any,
    /// `false`
    Never,
    /// `{"$ref": "..."}` -- `target` is a key of `CompiledSchema::definitions`
    Ref { target: String },
    /// Keywords applied in order; `unevaluated*` always come last.
    Keywords(Vec<Keyword>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Keyword {
    Ref(String),
    Type(Vec<InstanceType>),
    Const(Value),
    Enum(Vec<Value>),
    MinLength(u64),
    MaxLength(u64),
    Minimum(f64),
    Maximum(f64),
    Required(Vec<String>),
    Properties(BTreeMap<String, Node>),
    /// `declared` holds the sibling `properties` names the schema skips.
    AdditionalProperties { declared: Vec<String>, schema: Box<Node> },
    Items(Box<Node>),
    AllOf(Vec<Node>),
    AnyOf(Vec<Node>),
    OneOf(Vec<Node>),
    /// `oneOf` + `discriminator`, replacing the plain `OneOf` keyword.
    Discriminator(Discriminator),
    UnevaluatedProperties(Box<Node>),
    UnevaluatedItems(Box<Node>),
}

impl Keyword {
    /// The schema keyword this was compiled from.
    pub fn name(&self) -> &'static str {
        match self {
            Keyword::Ref(_) => "$ref",
            Keyword::Type(_) => "type",
            Keyword::Const(_) => "const",
            Keyword::Enum(_) => "enum",
            Keyword::MinLength(_) => "minLength",
            Keyword::MaxLength(_) => "maxLength",
            Keyword::Minimum(_) => "minimum",
            Keyword::Maximum(_) => "maximum",
            Keyword::Required(_) => "required",
            Keyword::Properties(_) => "properties",
            Keyword::AdditionalProperties { .. } => "additionalProperties",
            Keyword::Items(_) => "items",
            Keyword::AllOf(_) => "allOf",
            Keyword::AnyOf(_) => "anyOf",
            Keyword::OneOf(_) => "oneOf",
            Keyword::Discriminator(_) => "discriminator",
            Keyword::UnevaluatedProperties(_) => "unevaluatedProperties",
            Keyword::UnevaluatedItems(_) => "unevaluatedItems",
        }
    }
}

/// A discriminated `oneOf`.
#[derive(Debug, Clone, PartialEq)]
pub struct Discriminator {
    pub tag_name: String,
    pub mapping: TagMapping,
    pub alternatives: Vec<Node>,
    /// Schema location of the object carrying the keyword.
    pub location: String,
}

impl Node {
    /// Direct subschemas, in keyword order. References are not followed.
    pub fn children(&self) -> Vec<&Node> {
        let Node::Keywords(keywords) = self else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for keyword in keywords {
            match keyword {
                Keyword::Properties(props) => out.extend(props.values()),
                Keyword::AdditionalProperties { schema, .. }
                | Keyword::Items(schema)
                | Keyword::UnevaluatedProperties(schema)
                | Keyword::UnevaluatedItems(schema) => out.push(schema.as_ref()),
                Keyword::AllOf(nodes) | Keyword::AnyOf(nodes) | Keyword::OneOf(nodes) => {
                    out.extend(nodes)
                }
                Keyword::Discriminator(d) => out.extend(&d.alternatives),
                Keyword::Ref(_)
                | Keyword::Type(_)
                | Keyword::Const(_)
                | Keyword::Enum(_)
                | Keyword::MinLength(_)
                | Keyword::MaxLength(_)
                | Keyword::Minimum(_)
                | Keyword::Maximum(_)
                | Keyword::Required(_) => {}
            }
        }
        out
    }
}

/// A compiled schema document: root node + every schema reached by `$ref`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSchema {
    pub root: Node,
    /// Canonical reference (`<uri>#<fragment>`) -> compiled target.
    pub definitions: BTreeMap<String, Node>,
}

impl CompiledSchema {
    /// Every discriminator in the document, root first, then definitions in
    /// key order.
    pub fn discriminators(&self) -> Vec<&Discriminator> {
        let mut found = Vec::new();
        let mut stack: Vec<&Node> = self.definitions.values().rev().collect();
        stack.push(&self.root);
        while let Some(node) = stack.pop() {
            if let Node::Keywords(keywords) = node {
                for keyword in keywords {
                    if let Keyword::Discriminator(d) = keyword {
                        found.push(d);
                    }
                }
            }
            stack.extend(node.children().into_iter().rev());
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_instance_type_roundtrip_names() {
        for name in ["null", "boolean", "object", "array", "number", "integer", "string"] {
            assert_eq!(InstanceType::parse(name).unwrap().as_str(), name);
        }
        assert_eq!(InstanceType::parse("int32"), None);
    }

    #[test]
    fn test_integer_matches_whole_floats() {
        assert!(InstanceType::Integer.matches(&json!(3)));
        assert!(InstanceType::Integer.matches(&json!(3.0)));
        assert!(!InstanceType::Integer.matches(&json!(3.5)));
        assert!(InstanceType::Number.matches(&json!(3.5)));
    }

    #[test]
    fn test_children_skip_leaves() {
        let node = Node::Keywords(vec![
            Keyword::Type(vec![InstanceType::Object]),
            Keyword::AllOf(vec![Node::Any, Node::Never]),
        ]);
        assert_eq!(node.children(), vec![&Node::Any, &Node::Never]);
        assert!(Node::Ref { target: "#".into() }.children().is_empty());
    }
}
