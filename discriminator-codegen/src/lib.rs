/// Discriminated-union compiler for JSON Schema.
///
/// `compiler` turns a schema document into the immutable AST in `ast`,
/// building a tag mapping for every `oneOf` + `discriminator` pair on the
/// way. The AST is consumed either by the in-process `validator` or by the
/// `emit_js` code generator.
pub mod ast;
pub mod compiler;
pub mod discriminator;
pub mod emit_js;
pub mod options;
pub mod resolver;
pub mod validator;

pub use ast::CompiledSchema;
pub use compiler::{compile, compile_with, compile_with_resolver, CompileError};
pub use discriminator::{DiscriminatorError, TagError, TagErrorKind, TagMapping};
pub use options::{CompileOptions, DiscriminatorOption};
pub use resolver::{LocalResolver, RefResolver, ResolveError};
pub use validator::{ErrorKind, ValidationError, Validator};
