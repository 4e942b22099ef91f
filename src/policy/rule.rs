//! Rule definitions.

use super::Condition;
use crate::api::Decision;
use serde::{Deserialize, Serialize};

/// The action an access rule takes when all of its conditions match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleAction {
    /// Permit the request.
    Allow,
    /// Refuse the request.
    Deny,
}

impl From<RuleAction> for Decision {
    fn from(action: RuleAction) -> Self {
        match action {
            RuleAction::Allow => Decision::Allow,
            RuleAction::Deny => Decision::Deny,
        }
    }
}

/// A single access rule: an action guarded by conditions.
///
/// A rule with no conditions always matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Name of the rule, used in logs.
    pub name: String,
    /// The action taken when every condition matches.
    pub action: RuleAction,
    /// Conditions, all of which must match.
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl Rule {
    /// Create an unconditional rule.
    pub fn new(name: impl Into<String>, action: RuleAction) -> Self {
        Self {
            name: name.into(),
            action,
            conditions: Vec::new(),
        }
    }

    /// Add a condition, builder style.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Check that the rule is well formed.
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.is_empty() {
            return Err(crate::Error::validation_field(
                "rule name cannot be empty",
                "name",
            ));
        }

        for condition in &self.conditions {
            condition.validate()?;
        }

        Ok(())
    }
}
