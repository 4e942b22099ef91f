//! Core evaluation machinery: lifecycle driving and the rule evaluator.

mod evaluator;
mod lifecycle;

pub use evaluator::{Evaluator, Progress, RuleEvaluator};
pub use lifecycle::{check_fast, NonBlockingCheck};
