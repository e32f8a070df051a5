/// Read-only typed view over a raw schema value.
///
/// The mapping builder never walks `serde_json::Value` directly; it matches
/// on `SchemaNode` so every shape a subschema can take is handled explicitly.
use serde_json::{Map, Value};

/// Keywords that carry validation rules. A schema whose only rule keyword is
/// `$ref` is a bare reference and gets unwrapped during mapping analysis.
const RULE_KEYWORDS: &[&str] = &[
    "$defs",
    "$id",
    "$anchor",
    "definitions",
    "type",
    "const",
    "enum",
    "properties",
    "required",
    "additionalProperties",
    "unevaluatedProperties",
    "patternProperties",
    "propertyNames",
    "minProperties",
    "maxProperties",
    "dependentRequired",
    "dependentSchemas",
    "items",
    "prefixItems",
    "unevaluatedItems",
    "contains",
    "minItems",
    "maxItems",
    "uniqueItems",
    "allOf",
    "anyOf",
    "oneOf",
    "not",
    "if",
    "then",
    "else",
    "discriminator",
    "minLength",
    "maxLength",
    "pattern",
    "format",
    "minimum",
    "maximum",
    "exclusiveMinimum",
    "exclusiveMaximum",
    "multipleOf",
];

/// Whether `key` is a keyword that carries validation rules, as opposed to
/// an annotation (`title`, `description`, ...) or an unknown key.
pub fn is_rule_keyword(key: &str) -> bool {
    RULE_KEYWORDS.contains(&key)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SchemaNode<'a> {
    /// `true` / `false`
    Bool(bool),
    /// `{"$ref": "..."}` with nothing else that validates.
    Ref(&'a str),
    /// Any other object schema.
    Object(ObjectNode<'a>),
    /// Not a schema at all (a string, number, array or null in schema position).
    Invalid(&'a Value),
}

impl<'a> SchemaNode<'a> {
    pub fn new(value: &'a Value) -> Self {
        match value {
            Value::Bool(b) => SchemaNode::Bool(*b),
            Value::Object(obj) => {
                let node = ObjectNode { raw: obj };
                match node.reference() {
                    Some(reference) if !node.has_rules_besides_ref() => SchemaNode::Ref(reference),
                    _ => SchemaNode::Object(node),
                }
            }
            other => SchemaNode::Invalid(other),
        }
    }

    pub fn as_object(&self) -> Option<ObjectNode<'a>> {
        match self {
            SchemaNode::Object(obj) => Some(*obj),
            SchemaNode::Ref(_) | SchemaNode::Bool(_) | SchemaNode::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectNode<'a> {
    raw: &'a Map<String, Value>,
}

impl<'a> ObjectNode<'a> {
    pub fn from_map(raw: &'a Map<String, Value>) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &'a Map<String, Value> {
        self.raw
    }

    pub fn get(&self, keyword: &str) -> Option<&'a Value> {
        self.raw.get(keyword)
    }

    pub fn reference(&self) -> Option<&'a str> {
        self.raw.get("$ref").and_then(Value::as_str)
    }

    fn has_rules_besides_ref(&self) -> bool {
        self.raw
            .keys()
            .any(|k| k != "$ref" && is_rule_keyword(k))
    }

    /// `properties` as a map, if the schema declares one.
    pub fn properties(&self) -> Option<&'a Map<String, Value>> {
        self.raw.get("properties").and_then(Value::as_object)
    }

    pub fn property(&self, name: &str) -> Option<&'a Value> {
        self.properties()?.get(name)
    }

    pub fn all_of(&self) -> &'a [Value] {
        self.raw
            .get("allOf")
            .and_then(Value::as_array)
            .map_or(&[][..], Vec::as_slice)
    }

    /// Whether `required` lists `name`.
    pub fn requires(&self, name: &str) -> bool {
        self.raw
            .get("required")
            .and_then(Value::as_array)
            .is_some_and(|req| req.iter().any(|r| r.as_str() == Some(name)))
    }

    /// The value constraint on this schema, if it uses `const` or `enum`.
    ///
    /// A falsy `const` (`""`, `0`, `false`, `null`) does not count as a
    /// constraint, and `enum` is only consulted when no usable `const` is
    /// present.
    pub fn value_constraint(&self) -> Option<ValueConstraint<'a>> {
        if let Some(c) = self.raw.get("const").filter(|c| is_truthy(c)) {
            return Some(ValueConstraint::Const(c));
        }
        self.raw
            .get("enum")
            .and_then(Value::as_array)
            .map(|values| ValueConstraint::Enum(values.as_slice()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueConstraint<'a> {
    Const(&'a Value),
    Enum(&'a [Value]),
}

impl<'a> ValueConstraint<'a> {
    pub fn candidates(&self) -> &'a [Value] {
        match *self {
            ValueConstraint::Const(value) => std::slice::from_ref(value),
            ValueConstraint::Enum(values) => values,
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bare_ref() {
        let v = json!({"$ref": "#/$defs/a", "description": "docs only"});
        assert_eq!(SchemaNode::new(&v), SchemaNode::Ref("#/$defs/a"));
    }

    #[test]
    fn test_ref_with_rules_is_object() {
        let v = json!({"$ref": "#/$defs/a", "required": ["kind"]});
        assert!(matches!(SchemaNode::new(&v), SchemaNode::Object(_)));
    }

    #[test]
    fn test_bool_and_invalid() {
        assert_eq!(SchemaNode::new(&json!(true)), SchemaNode::Bool(true));
        assert!(matches!(SchemaNode::new(&json!("x")), SchemaNode::Invalid(_)));
    }

    #[test]
    fn test_value_constraint() {
        let v = json!({"const": "a"});
        let obj = SchemaNode::new(&v).as_object().unwrap();
        assert_eq!(obj.value_constraint().unwrap().candidates(), &[json!("a")]);

        let v = json!({"enum": ["b", "c"]});
        let obj = SchemaNode::new(&v).as_object().unwrap();
        assert_eq!(obj.value_constraint().unwrap().candidates().len(), 2);

        let v = json!({"const": ""});
        let obj = SchemaNode::new(&v).as_object().unwrap();
        assert_eq!(obj.value_constraint(), None);
    }

    #[test]
    fn test_requires() {
        let v = json!({"required": ["kind", "a"]});
        let obj = SchemaNode::new(&v).as_object().unwrap();
        assert!(obj.requires("kind"));
        assert!(!obj.requires("b"));
    }
}
