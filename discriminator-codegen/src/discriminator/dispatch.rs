/// Dispatch validator: reads the tag of an instance, looks it up in the
/// tag mapping, and validates against exactly the selected alternative.
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::TagMapping;
use crate::validator::Evaluated;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TagErrorKind {
    TagNotString,
    TagNotInMapping,
}

/// Per-instance failure to select an alternative.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagError {
    pub kind: TagErrorKind,
    pub tag_name: String,
    /// The value read at the tag property; `None` when the property is absent.
    pub tag_value: Option<Value>,
}

impl fmt::Display for TagError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TagErrorKind::TagNotString => write!(f, "property \"{}\" must be string", self.tag_name),
            TagErrorKind::TagNotInMapping => {
                write!(f, "value of property \"{}\" must be in oneOf", self.tag_name)
            }
        }
    }
}

impl std::error::Error for TagError {}

/// Result of validating against one alternative.
#[derive(Debug, Clone, PartialEq)]
pub struct AlternativeOutcome<E> {
    pub errors: Vec<E>,
    pub evaluated: Evaluated,
}

impl<E> AlternativeOutcome<E> {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Supplied by the surrounding engine: validates an instance against the
/// alternative at `index`.
pub trait AlternativeValidator {
    type Error;

    fn validate(&mut self, index: usize, instance: &Value) -> AlternativeOutcome<Self::Error>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch<E> {
    Valid { alternative: usize },
    /// The selected alternative rejected the instance; its errors are
    /// passed through untouched.
    Invalid { alternative: usize, errors: Vec<E> },
    Rejected(TagError),
}

impl<E> Dispatch<E> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Dispatch::Valid { .. })
    }
}

impl TagMapping {
    /// Read the tag and find the alternative it selects.
    pub fn select(&self, tag_name: &str, instance: &Value) -> Result<usize, TagError> {
        let tag = instance.get(tag_name);
        let Some(tag_value) = tag.and_then(Value::as_str) else {
            return Err(TagError {
                kind: TagErrorKind::TagNotString,
                tag_name: tag_name.to_string(),
                tag_value: tag.cloned(),
            });
        };
        self.get(tag_value).ok_or_else(|| TagError {
            kind: TagErrorKind::TagNotInMapping,
            tag_name: tag_name.to_string(),
            tag_value: Some(Value::String(tag_value.to_string())),
        })
    }
}

/// Validate `instance` against the one alternative its tag selects. The
/// selected alternative's coverage is merged into `evaluated` whether or
/// not it passes; no other alternative is touched.
pub fn dispatch<V: AlternativeValidator + ?Sized>(
    tag_name: &str,
    mapping: &TagMapping,
    instance: &Value,
    alternatives: &mut V,
    evaluated: &mut Evaluated,
) -> Dispatch<V::Error> {
    let alternative = match mapping.select(tag_name, instance) {
        Ok(index) => index,
        Err(err) => return Dispatch::Rejected(err),
    };
    tracing::trace!(tag = tag_name, alternative, "dispatching on discriminator");

    let outcome = alternatives.validate(alternative, instance);
    let valid = outcome.is_valid();
    evaluated.merge(outcome.evaluated);
    if valid {
        Dispatch::Valid { alternative }
    } else {
        Dispatch::Invalid {
            alternative,
            errors: outcome.errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Counts calls per alternative; alternative 0 demands `a` be a string,
    /// alternative 1 demands `b` be a string.
    #[derive(Default)]
    struct Counting {
        calls: Vec<usize>,
    }

    impl AlternativeValidator for Counting {
        type Error = String;

        fn validate(&mut self, index: usize, instance: &Value) -> AlternativeOutcome<String> {
            self.calls.push(index);
            let field = if index == 0 { "a" } else { "b" };
            let mut evaluated = Evaluated::default();
            evaluated.mark_property("kind");
            evaluated.mark_property(field);
            let errors = if instance.get(field).is_some_and(Value::is_string) {
                vec![]
            } else {
                vec![format!("alt{index}: {field} must be string")]
            };
            AlternativeOutcome { errors, evaluated }
        }
    }

    fn mapping() -> TagMapping {
        use crate::discriminator::{build_mapping, DiscriminatorConfig};
        use crate::resolver::{LocalResolver, RefResolver};
        let resolver = LocalResolver::new(json!({
            "discriminator": {"propertyName": "kind"},
            "required": ["kind"],
            "oneOf": [
                {"properties": {"kind": {"const": "a"}}},
                {"properties": {"kind": {"const": "b"}}}
            ]
        }));
        let root = resolver.root().as_object().unwrap();
        let config = DiscriminatorConfig::from_schema(root, true).unwrap();
        build_mapping(&config, "", &resolver).unwrap()
    }

    fn run(instance: Value) -> (Dispatch<String>, Vec<usize>, Evaluated) {
        let mut alts = Counting::default();
        let mut evaluated = Evaluated::default();
        let result = dispatch("kind", &mapping(), &instance, &mut alts, &mut evaluated);
        (result, alts.calls, evaluated)
    }

    #[test]
    fn test_valid_dispatch_only_selected_alternative() {
        // Also satisfies alternative 1's field, which must not matter.
        let (result, calls, evaluated) = run(json!({"kind": "a", "a": "x", "b": "y"}));
        assert_eq!(result, Dispatch::Valid { alternative: 0 });
        assert_eq!(calls, vec![0]);
        assert!(evaluated.is_property_evaluated("a"));
        assert!(!evaluated.is_property_evaluated("b"));
    }

    #[test]
    fn test_alternative_errors_propagate() {
        let (result, calls, evaluated) = run(json!({"kind": "a", "a": 1}));
        assert_eq!(
            result,
            Dispatch::Invalid {
                alternative: 0,
                errors: vec!["alt0: a must be string".to_string()]
            }
        );
        assert_eq!(calls, vec![0]);
        // Coverage of the dispatched alternative is kept even on failure.
        assert!(evaluated.is_property_evaluated("kind"));
        assert!(evaluated.is_property_evaluated("a"));
        assert!(!evaluated.is_property_evaluated("b"));
    }

    #[test]
    fn test_tag_not_in_mapping() {
        let (result, calls, _) = run(json!({"kind": "c"}));
        let Dispatch::Rejected(err) = result else {
            panic!("expected rejection");
        };
        assert_eq!(err.kind, TagErrorKind::TagNotInMapping);
        assert_eq!(err.tag_value, Some(json!("c")));
        assert_eq!(err.to_string(), "value of property \"kind\" must be in oneOf");
        assert!(calls.is_empty());
    }

    #[test]
    fn test_tag_not_string() {
        let (result, calls, _) = run(json!({"kind": 5}));
        let Dispatch::Rejected(err) = result else {
            panic!("expected rejection");
        };
        assert_eq!(err.kind, TagErrorKind::TagNotString);
        assert_eq!(err.tag_value, Some(json!(5)));
        assert_eq!(err.to_string(), "property \"kind\" must be string");
        assert!(calls.is_empty());
    }

    #[test]
    fn test_tag_missing() {
        let (result, calls, _) = run(json!({}));
        assert_eq!(
            result,
            Dispatch::Rejected(TagError {
                kind: TagErrorKind::TagNotString,
                tag_name: "kind".into(),
                tag_value: None,
            })
        );
        assert!(calls.is_empty());
    }
}
