//! Public API surface: the evaluation context and decision types.

mod context;
mod decision;

pub use context::{CheckState, EvaluationContext, Ident, IDENT_MAX_LEN};
pub use decision::Decision;
