//! Rule-set document parsing and management.

use super::RuleSet;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A document holding the named rule sets of one configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSetDocument {
    /// Version of the document format.
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Rule sets defined in this document.
    #[serde(default)]
    pub rule_sets: Vec<RuleSet>,
}

fn default_api_version() -> String {
    "access-policy/v1".to_string()
}

impl RuleSetDocument {
    /// Create an empty document.
    pub fn new() -> Self {
        Self {
            api_version: default_api_version(),
            rule_sets: Vec::new(),
        }
    }

    /// Create a document with the given rule sets.
    pub fn with_rule_sets(rule_sets: Vec<RuleSet>) -> Self {
        Self {
            api_version: default_api_version(),
            rule_sets,
        }
    }

    /// Parse a document from YAML.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        serde_yaml::from_str(yaml).map_err(crate::Error::from)
    }

    /// Parse a document from JSON.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(crate::Error::from)
    }

    /// Load a document from a file, dispatching on the extension.
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match extension.to_lowercase().as_str() {
            "yaml" | "yml" => Self::from_yaml(&content),
            "json" => Self::from_json(&content),
            _ => Self::from_yaml(&content).or_else(|_| Self::from_json(&content)),
        }
    }

    /// Convert the document to YAML.
    pub fn to_yaml(&self) -> crate::Result<String> {
        serde_yaml::to_string(self).map_err(crate::Error::from)
    }

    /// Validate all rule sets in the document.
    pub fn validate(&self) -> crate::Result<()> {
        for rule_set in &self.rule_sets {
            rule_set.validate()?;
        }
        Ok(())
    }

    /// Find a rule set by name.
    pub fn get(&self, name: &str) -> Option<&RuleSet> {
        self.rule_sets.iter().find(|s| s.name == name)
    }
}

impl Default for RuleSetDocument {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{Condition, Rule, RuleAction};

    fn sample_set() -> RuleSet {
        RuleSet::new("http_access")
            .with_rule(
                Rule::new("deny-ads", RuleAction::Deny)
                    .with_condition(Condition::DstDomain(".ads.example".into())),
            )
            .with_rule(Rule::new("allow-all", RuleAction::Allow))
    }

    #[test]
    fn test_yaml_round_trip() {
        let doc = RuleSetDocument::with_rule_sets(vec![sample_set()]);
        let yaml = doc.to_yaml().unwrap();
        let parsed = RuleSetDocument::from_yaml(&yaml).unwrap();
        assert_eq!(parsed.rule_sets.len(), 1);
        assert_eq!(parsed.rule_sets[0].name, "http_access");
        assert_eq!(parsed.rule_sets[0].rules.len(), 2);
    }

    #[test]
    fn test_from_yaml_literal() {
        let yaml = r#"
rule_sets:
  - name: http_access
    rules:
      - name: deny-bad
        action: deny
        conditions:
          - dst_domain: .bad.example
      - name: allow-all
        action: allow
"#;
        let doc = RuleSetDocument::from_yaml(yaml).unwrap();
        doc.validate().unwrap();
        let set = doc.get("http_access").unwrap();
        assert_eq!(set.rules[0].action, RuleAction::Deny);
        assert_eq!(
            set.rules[0].conditions[0],
            Condition::DstDomain(".bad.example".into())
        );
    }

    #[test]
    fn test_validation_failure_surfaces() {
        let yaml = r#"
rule_sets:
  - name: http_access
    rules:
      - name: broken
        action: deny
        conditions:
          - dst_domain_regex: "("
"#;
        let doc = RuleSetDocument::from_yaml(yaml).unwrap();
        assert!(matches!(
            doc.validate(),
            Err(crate::Error::Validation { .. })
        ));
    }

    #[test]
    fn test_get_missing() {
        let doc = RuleSetDocument::new();
        assert!(doc.get("nope").is_none());
    }
}
