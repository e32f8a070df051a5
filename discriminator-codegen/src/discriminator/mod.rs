/// The discriminator keyword: tag mapping construction at compile time and
/// O(1) dispatch at validation time.
mod dispatch;
mod mapping;
mod view;

pub use dispatch::{
    dispatch, AlternativeOutcome, AlternativeValidator, Dispatch, TagError, TagErrorKind,
};
pub use mapping::{build_mapping, DiscriminatorConfig, DiscriminatorError, TagMapping};
pub use view::{is_rule_keyword, ObjectNode, SchemaNode, ValueConstraint};
