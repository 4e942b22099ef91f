//! Decision types produced by rule evaluation.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The outcome of evaluating a rule set against a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// The request is permitted.
    Allow,
    /// The request is refused.
    Deny,
    /// Evaluation could not reach a verdict: the rule set disappeared,
    /// or a pending sub-decision could not be delivered.
    Undetermined,
}

impl Decision {
    /// Whether the request may proceed.
    pub fn allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Decision::Allow => "allow",
            Decision::Deny => "deny",
            Decision::Undetermined => "undetermined",
        };
        f.write_str(s)
    }
}
