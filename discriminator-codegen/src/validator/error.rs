/// Validation errors, shaped like ajv's error objects.
use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::discriminator::{TagError, TagErrorKind};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ErrorKind {
    #[error("must be {expected}")]
    Type { expected: String },
    #[error("must be equal to constant")]
    Const,
    #[error("must be equal to one of the allowed values")]
    Enum,
    #[error("must NOT have fewer than {limit} characters")]
    MinLength { limit: u64 },
    #[error("must NOT have more than {limit} characters")]
    MaxLength { limit: u64 },
    #[error("must be >= {limit}")]
    Minimum { limit: f64 },
    #[error("must be <= {limit}")]
    Maximum { limit: f64 },
    #[error("must have required property '{missing}'")]
    Required { missing: String },
    #[error("must NOT have additional properties")]
    AdditionalProperties { property: String },
    #[error("must NOT have unevaluated properties")]
    UnevaluatedProperties { property: String },
    #[error("must NOT have unevaluated items")]
    UnevaluatedItems,
    #[error("must match a schema in anyOf")]
    AnyOf,
    #[error("must match exactly one schema in oneOf")]
    OneOf { passing: Vec<usize> },
    #[error("{0}")]
    Discriminator(TagError),
    #[error("boolean schema is false")]
    FalseSchema,
}

impl ErrorKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            ErrorKind::Type { .. } => "type",
            ErrorKind::Const => "const",
            ErrorKind::Enum => "enum",
            ErrorKind::MinLength { .. } => "minLength",
            ErrorKind::MaxLength { .. } => "maxLength",
            ErrorKind::Minimum { .. } => "minimum",
            ErrorKind::Maximum { .. } => "maximum",
            ErrorKind::Required { .. } => "required",
            ErrorKind::AdditionalProperties { .. } => "additionalProperties",
            ErrorKind::UnevaluatedProperties { .. } => "unevaluatedProperties",
            ErrorKind::UnevaluatedItems => "unevaluatedItems",
            ErrorKind::AnyOf => "anyOf",
            ErrorKind::OneOf { .. } => "oneOf",
            ErrorKind::Discriminator(_) => "discriminator",
            ErrorKind::FalseSchema => "false schema",
        }
    }

    /// Keyword-specific details, matching the generated JavaScript's
    /// `params` field.
    pub fn params(&self) -> Value {
        match self {
            ErrorKind::Type { expected } => json!({ "type": expected }),
            ErrorKind::MinLength { limit } | ErrorKind::MaxLength { limit } => json!({ "limit": limit }),
            ErrorKind::Minimum { limit } | ErrorKind::Maximum { limit } => json!({ "limit": limit }),
            ErrorKind::Required { missing } => json!({ "missingProperty": missing }),
            ErrorKind::AdditionalProperties { property } => json!({ "additionalProperty": property }),
            ErrorKind::UnevaluatedProperties { property } => {
                json!({ "unevaluatedProperty": property })
            }
            ErrorKind::OneOf { passing } => json!({ "passingSchemas": passing }),
            ErrorKind::Discriminator(err) => {
                let error = match err.kind {
                    TagErrorKind::TagNotString => "tag",
                    TagErrorKind::TagNotInMapping => "mapping",
                };
                json!({ "error": error, "tag": err.tag_name, "tagValue": err.tag_value })
            }
            ErrorKind::Const
            | ErrorKind::Enum
            | ErrorKind::UnevaluatedItems
            | ErrorKind::AnyOf
            | ErrorKind::FalseSchema => json!({}),
        }
    }
}

/// One failed keyword.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// JSON pointer into the instance; empty for the root.
    pub instance_path: String,
    /// `#`-rooted pointer to the failing keyword.
    pub schema_path: String,
    pub kind: ErrorKind,
}

impl ValidationError {
    pub fn keyword(&self) -> &'static str {
        self.kind.keyword()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data{} {}", self.instance_path, self.kind)
    }
}

impl std::error::Error for ValidationError {}

impl Serialize for ValidationError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ValidationError", 5)?;
        state.serialize_field("instancePath", &self.instance_path)?;
        state.serialize_field("schemaPath", &self.schema_path)?;
        state.serialize_field("keyword", self.keyword())?;
        state.serialize_field("params", &self.kind.params())?;
        state.serialize_field("message", &self.kind.to_string())?;
        state.end()
    }
}
