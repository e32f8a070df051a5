/// Mapping builder: derives the tag value -> alternative index table for a
/// `oneOf` guarded by `discriminator`, proving along the way that every
/// alternative declares the tag, that the tag is required on every branch,
/// and that tag values are unique strings.
use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use super::view::{ObjectNode, SchemaNode};
use crate::resolver::{RefResolver, ResolveError};

/// Schema authoring errors. All of them are fatal for the schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscriminatorError {
    #[error("discriminator: requires propertyName")]
    MissingPropertyName,
    #[error("discriminator: mapping is not supported")]
    MappingNotSupported,
    #[error("discriminator: requires oneOf keyword")]
    MissingOneOf,
    #[error("discriminator: oneOf subschemas (or referenced schemas) must have \"properties/{0}\"")]
    MissingTagProperty(String),
    #[error("discriminator: \"properties/{0}\" must have \"const\" or \"enum\"")]
    MissingConstOrEnum(String),
    #[error("discriminator: \"{0}\" values must be unique strings")]
    NonUniqueTagValue(String),
    #[error("discriminator: \"{0}\" must be required")]
    TagNotRequired(String),
    #[error("discriminator: {0}")]
    Unresolved(#[from] ResolveError),
}

/// Tag value -> index into the `oneOf` alternatives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TagMapping {
    entries: BTreeMap<String, usize>,
}

impl TagMapping {
    pub fn get(&self, tag_value: &str) -> Option<usize> {
        self.entries.get(tag_value).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Tag values grouped by the alternative they select, in alternative order.
    pub fn by_alternative(&self) -> BTreeMap<usize, Vec<&str>> {
        let mut grouped: BTreeMap<usize, Vec<&str>> = BTreeMap::new();
        for (value, index) in self.iter() {
            grouped.entry(index).or_default().push(value);
        }
        grouped
    }

    fn insert(&mut self, tag_name: &str, value: &Value, index: usize) -> Result<(), DiscriminatorError> {
        match value.as_str() {
            Some(s) if !s.is_empty() && !self.entries.contains_key(s) => {
                self.entries.insert(s.to_string(), index);
                Ok(())
            }
            _ => Err(DiscriminatorError::NonUniqueTagValue(tag_name.to_string())),
        }
    }
}

/// The inputs of the mapping builder, taken from the schema that carries
/// the `discriminator` keyword.
#[derive(Debug, Clone, Copy)]
pub struct DiscriminatorConfig<'a> {
    pub tag_name: &'a str,
    pub alternatives: &'a [Value],
    pub strict_mapping: bool,
    parent: ObjectNode<'a>,
}

impl<'a> DiscriminatorConfig<'a> {
    /// Checks, in order: `propertyName` is a non-empty string, no author
    /// `mapping` under strict mode, and a non-empty `oneOf` is present.
    pub fn from_schema(
        schema: &'a Map<String, Value>,
        strict_mapping: bool,
    ) -> Result<Self, DiscriminatorError> {
        let parent = ObjectNode::from_map(schema);
        let keyword = parent.get("discriminator");

        let tag_name = keyword
            .and_then(|d| d.get("propertyName"))
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .ok_or(DiscriminatorError::MissingPropertyName)?;

        if strict_mapping && keyword.and_then(|d| d.get("mapping")).is_some() {
            return Err(DiscriminatorError::MappingNotSupported);
        }

        let alternatives = parent
            .get("oneOf")
            .and_then(Value::as_array)
            .filter(|alts| !alts.is_empty())
            .ok_or(DiscriminatorError::MissingOneOf)?;

        Ok(Self {
            tag_name,
            alternatives,
            strict_mapping,
            parent,
        })
    }
}

/// Where the tag property schema was found for one alternative.
struct TagProperty<'a> {
    schema: &'a Value,
    /// `required` of the schema that declared the property lists the tag.
    required: bool,
}

/// Build the tag mapping. `base_id` is the base URI in effect for the
/// schema carrying the discriminator.
pub fn build_mapping<'a, R: RefResolver + ?Sized>(
    config: &DiscriminatorConfig<'a>,
    base_id: &str,
    resolver: &'a R,
) -> Result<TagMapping, DiscriminatorError> {
    let tag = config.tag_name;
    let top_required = config.parent.requires(tag);
    let mut mapping = TagMapping::default();
    let mut tag_required = true;

    for (index, alternative) in config.alternatives.iter().enumerate() {
        let (node, base) = match SchemaNode::new(alternative) {
            SchemaNode::Ref(reference) => {
                let resolved = resolver.resolve(base_id, reference)?;
                (SchemaNode::new(resolved.schema), resolved.base_id)
            }
            other => (other, base_id.to_string()),
        };

        let property = find_tag_property(tag, node, &base, resolver)?
            .ok_or_else(|| DiscriminatorError::MissingTagProperty(tag.to_string()))?;
        let property_schema = property
            .schema
            .as_object()
            .map(ObjectNode::from_map)
            .ok_or_else(|| DiscriminatorError::MissingTagProperty(tag.to_string()))?;

        let alternative_required = node.as_object().is_some_and(|obj| obj.requires(tag));
        tag_required = tag_required && (top_required || alternative_required || property.required);

        let constraint = property_schema
            .value_constraint()
            .ok_or_else(|| DiscriminatorError::MissingConstOrEnum(tag.to_string()))?;
        for value in constraint.candidates() {
            mapping.insert(tag, value, index)?;
        }
    }

    if !tag_required {
        return Err(DiscriminatorError::TagNotRequired(tag.to_string()));
    }
    Ok(mapping)
}

/// `properties/<tag>` on the alternative itself, or on the first `allOf`
/// member that supplies it. Members are searched one level deep; a member
/// that is a `$ref` is resolved once.
fn find_tag_property<'a, R: RefResolver + ?Sized>(
    tag: &str,
    node: SchemaNode<'a>,
    base_id: &str,
    resolver: &'a R,
) -> Result<Option<TagProperty<'a>>, DiscriminatorError> {
    let Some(alternative) = node.as_object() else {
        return Ok(None);
    };
    if let Some(schema) = alternative.property(tag) {
        return Ok(Some(TagProperty {
            schema,
            required: false,
        }));
    }

    for member in alternative.all_of() {
        let source = match SchemaNode::new(member) {
            SchemaNode::Object(obj) if obj.properties().is_some() => Some(obj),
            SchemaNode::Ref(reference) => resolve_object(reference, base_id, resolver)?,
            SchemaNode::Object(obj) => match obj.reference() {
                Some(reference) => resolve_object(reference, base_id, resolver)?,
                None => None,
            },
            SchemaNode::Bool(_) | SchemaNode::Invalid(_) => None,
        };
        let found = source.and_then(|obj| obj.property(tag).map(|schema| (obj, schema)));
        if let Some((obj, schema)) = found {
            return Ok(Some(TagProperty {
                schema,
                required: obj.requires(tag),
            }));
        }
    }
    Ok(None)
}

fn resolve_object<'a, R: RefResolver + ?Sized>(
    reference: &str,
    base_id: &str,
    resolver: &'a R,
) -> Result<Option<ObjectNode<'a>>, DiscriminatorError> {
    let resolved = resolver.resolve(base_id, reference)?;
    Ok(resolved.schema.as_object().map(ObjectNode::from_map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::LocalResolver;
    use serde_json::json;

    fn build(schema: Value) -> Result<TagMapping, DiscriminatorError> {
        build_with(schema, true)
    }

    fn build_with(schema: Value, strict: bool) -> Result<TagMapping, DiscriminatorError> {
        let resolver = LocalResolver::new(schema);
        let root = resolver.root().as_object().unwrap();
        let config = DiscriminatorConfig::from_schema(root, strict)?;
        build_mapping(&config, "", &resolver)
    }

    fn pairs(mapping: &TagMapping) -> Vec<(&str, usize)> {
        mapping.iter().collect()
    }

    #[test]
    fn test_const_and_enum() {
        let mapping = build(json!({
            "type": "object",
            "discriminator": {"propertyName": "foo"},
            "oneOf": [
                {"properties": {"foo": {"const": "x"}, "a": {"type": "string"}}, "required": ["foo", "a"]},
                {"properties": {"foo": {"enum": ["y", "z"]}, "b": {"type": "string"}}, "required": ["foo", "b"]}
            ]
        }))
        .unwrap();
        assert_eq!(pairs(&mapping), vec![("x", 0), ("y", 1), ("z", 1)]);
    }

    #[test]
    fn test_deterministic() {
        let schema = json!({
            "discriminator": {"propertyName": "kind"},
            "required": ["kind"],
            "oneOf": [
                {"properties": {"kind": {"enum": ["b", "a"]}}},
                {"properties": {"kind": {"const": "c"}}}
            ]
        });
        assert_eq!(build(schema.clone()).unwrap(), build(schema).unwrap());
    }

    #[test]
    fn test_top_level_required() {
        let mapping = build(json!({
            "discriminator": {"propertyName": "kind"},
            "required": ["kind"],
            "oneOf": [
                {"properties": {"kind": {"const": "a"}}},
                {"properties": {"kind": {"const": "b"}}}
            ]
        }))
        .unwrap();
        assert_eq!(mapping.get("b"), Some(1));
    }

    #[test]
    fn test_ref_alternatives_unwrapped() {
        let mapping = build(json!({
            "discriminator": {"propertyName": "kind"},
            "oneOf": [{"$ref": "#/$defs/cat"}, {"$ref": "#/$defs/dog"}],
            "$defs": {
                "cat": {"properties": {"kind": {"const": "cat"}}, "required": ["kind"]},
                "dog": {"properties": {"kind": {"const": "dog"}}, "required": ["kind"]}
            }
        }))
        .unwrap();
        assert_eq!(pairs(&mapping), vec![("cat", 0), ("dog", 1)]);
    }

    #[test]
    fn test_tag_from_all_of_member() {
        let mapping = build(json!({
            "discriminator": {"propertyName": "kind"},
            "oneOf": [
                {"allOf": [
                    {"$ref": "#/$defs/base"},
                    {"properties": {"kind": {"const": "a"}}, "required": ["kind"]}
                ]},
                {"allOf": [{"$ref": "#/$defs/b"}]}
            ],
            "$defs": {
                "base": {"properties": {"id": {"type": "string"}}},
                "b": {"properties": {"kind": {"const": "b"}}, "required": ["kind"]}
            }
        }))
        .unwrap();
        assert_eq!(pairs(&mapping), vec![("a", 0), ("b", 1)]);
    }

    #[test]
    fn test_all_of_member_with_properties_shadows_ref() {
        // The first member declares `properties` without the tag, so it is
        // skipped; the tag comes from the second member's reference.
        let mapping = build(json!({
            "discriminator": {"propertyName": "kind"},
            "required": ["kind"],
            "oneOf": [
                {"allOf": [
                    {"properties": {"x": {}}},
                    {"$ref": "#/$defs/a"}
                ]}
            ],
            "$defs": {"a": {"properties": {"kind": {"const": "a"}}}}
        }))
        .unwrap();
        assert_eq!(mapping.get("a"), Some(0));
    }

    #[test]
    fn test_nested_all_of_not_searched() {
        let err = build(json!({
            "discriminator": {"propertyName": "kind"},
            "required": ["kind"],
            "oneOf": [
                {"allOf": [{"allOf": [{"properties": {"kind": {"const": "a"}}}]}]}
            ]
        }))
        .unwrap_err();
        assert_eq!(err, DiscriminatorError::MissingTagProperty("kind".into()));
    }

    #[test]
    fn test_ref_to_ref_not_followed() {
        let err = build(json!({
            "discriminator": {"propertyName": "kind"},
            "required": ["kind"],
            "oneOf": [{"$ref": "#/$defs/alias"}],
            "$defs": {
                "alias": {"$ref": "#/$defs/real"},
                "real": {"properties": {"kind": {"const": "a"}}}
            }
        }))
        .unwrap_err();
        assert_eq!(err, DiscriminatorError::MissingTagProperty("kind".into()));
    }

    #[test]
    fn test_missing_property_name() {
        let err = build(json!({"discriminator": {}, "oneOf": [{}]})).unwrap_err();
        assert_eq!(err, DiscriminatorError::MissingPropertyName);
        assert_eq!(err.to_string(), "discriminator: requires propertyName");
    }

    #[test]
    fn test_missing_one_of() {
        let err = build(json!({"discriminator": {"propertyName": "kind"}})).unwrap_err();
        assert_eq!(err, DiscriminatorError::MissingOneOf);
    }

    #[test]
    fn test_mapping_rejected_when_strict() {
        let schema = json!({
            "discriminator": {"propertyName": "kind", "mapping": {"a": "#/$defs/a"}},
            "required": ["kind"],
            "oneOf": [{"properties": {"kind": {"const": "a"}}}]
        });
        assert_eq!(
            build(schema.clone()).unwrap_err(),
            DiscriminatorError::MappingNotSupported
        );
        assert_eq!(build_with(schema, false).unwrap().get("a"), Some(0));
    }

    #[test]
    fn test_missing_tag_property() {
        let err = build(json!({
            "discriminator": {"propertyName": "kind"},
            "required": ["kind"],
            "oneOf": [
                {"properties": {"kind": {"const": "a"}}},
                {"properties": {"other": {"const": "b"}}}
            ]
        }))
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "discriminator: oneOf subschemas (or referenced schemas) must have \"properties/kind\""
        );
    }

    #[test]
    fn test_missing_const_or_enum() {
        let err = build(json!({
            "discriminator": {"propertyName": "kind"},
            "required": ["kind"],
            "oneOf": [{"properties": {"kind": {"type": "string"}}}]
        }))
        .unwrap_err();
        assert_eq!(err, DiscriminatorError::MissingConstOrEnum("kind".into()));
    }

    #[test]
    fn test_duplicate_values() {
        let err = build(json!({
            "discriminator": {"propertyName": "kind"},
            "required": ["kind"],
            "oneOf": [
                {"properties": {"kind": {"const": "x"}}},
                {"properties": {"kind": {"enum": ["y", "x"]}}}
            ]
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "discriminator: \"kind\" values must be unique strings");
    }

    #[test]
    fn test_non_string_values() {
        let err = build(json!({
            "discriminator": {"propertyName": "kind"},
            "required": ["kind"],
            "oneOf": [{"properties": {"kind": {"const": 1}}}]
        }))
        .unwrap_err();
        assert_eq!(err, DiscriminatorError::NonUniqueTagValue("kind".into()));
    }

    #[test]
    fn test_empty_enum_value() {
        let err = build(json!({
            "discriminator": {"propertyName": "kind"},
            "required": ["kind"],
            "oneOf": [
                {"properties": {"kind": {"const": "a"}}},
                {"properties": {"kind": {"enum": [""]}}}
            ]
        }))
        .unwrap_err();
        assert_eq!(err, DiscriminatorError::NonUniqueTagValue("kind".into()));
    }

    #[test]
    fn test_tag_optional_on_one_branch() {
        let err = build(json!({
            "discriminator": {"propertyName": "kind"},
            "oneOf": [
                {"properties": {"kind": {"const": "a"}}, "required": ["kind"]},
                {"properties": {"kind": {"const": "b"}}}
            ]
        }))
        .unwrap_err();
        assert_eq!(err, DiscriminatorError::TagNotRequired("kind".into()));
        assert_eq!(err.to_string(), "discriminator: \"kind\" must be required");
    }

    #[test]
    fn test_unresolvable_ref() {
        let err = build(json!({
            "discriminator": {"propertyName": "kind"},
            "oneOf": [{"$ref": "#/$defs/missing"}]
        }))
        .unwrap_err();
        assert!(matches!(err, DiscriminatorError::Unresolved(_)));
    }
}
