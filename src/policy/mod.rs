//! Rule-set data structures and representations.
//!
//! This module defines the ordered access-control structures evaluation
//! walks: rule sets, rules, and conditions, plus the document format they
//! are loaded from.

mod condition;
mod document;
mod rule;

pub use condition::Condition;
pub use document::RuleSetDocument;
pub use rule::{Rule, RuleAction};

use serde::{Deserialize, Serialize};

/// An ordered access-control list evaluated first-match-wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSet {
    /// Name of the rule set (e.g. the directive it guards).
    pub name: String,
    /// Rules in evaluation order.
    #[serde(default)]
    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// Create an empty rule set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    /// Append a rule.
    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Append a rule, builder style.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Check that the rule set is well formed.
    pub fn validate(&self) -> crate::Result<()> {
        if self.name.is_empty() {
            return Err(crate::Error::validation_field(
                "rule set name cannot be empty",
                "name",
            ));
        }

        for (i, rule) in self.rules.iter().enumerate() {
            rule.validate().map_err(|e| {
                crate::Error::validation(format!("rule {} validation failed: {}", i, e))
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_set_creation() {
        let set = RuleSet::new("http_access")
            .with_rule(Rule::new("allow-local", RuleAction::Allow))
            .with_rule(Rule::new("deny-all", RuleAction::Deny));
        assert_eq!(set.name, "http_access");
        assert_eq!(set.rules.len(), 2);
        assert!(set.validate().is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        let set = RuleSet::new("");
        assert!(matches!(
            set.validate(),
            Err(crate::Error::Validation { .. })
        ));
    }
}
