/// JavaScript ESM2020 emitter.
mod context;
mod emit;
mod nodes;
mod prelude;
mod types;
mod writer;

pub use context::EmitContext;
pub use emit::emit;
pub use nodes::{
    def_fn_name, emit_bound, emit_const, emit_enum, emit_false, emit_length, emit_ref, emit_required,
    emit_type,
};
pub use prelude::PRELUDE;
pub use types::{type_check, type_condition};
pub use writer::{quote, CodeWriter};
