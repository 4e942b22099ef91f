//! Rule condition definitions.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// A condition consulted against the evaluation context.
///
/// Conditions whose subject is absent from the context (no request, no
/// source address, a dead helper entry) are treated as not applicable and
/// simply fail to match; they are never an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// Exact source address match.
    SrcIp(IpAddr),
    /// Destination host match; a leading dot matches subdomains.
    DstDomain(String),
    /// Destination host regular expression.
    DstDomainRegex(String),
    /// Reverse-DNS name of the client; a leading dot matches subdomains.
    /// Suspends evaluation until the host supplies the name.
    SrcDomain(String),
    /// Exact identity match.
    Ident(String),
    /// Verdict of the external helper entry attached to the context.
    /// Suspends evaluation until the lookup completes.
    ExternalHelper,
}

impl Condition {
    /// Check that the condition is well formed.
    pub fn validate(&self) -> crate::Result<()> {
        match self {
            Condition::DstDomain(pattern) | Condition::SrcDomain(pattern) => {
                if pattern.is_empty() {
                    return Err(crate::Error::validation_field(
                        "domain pattern cannot be empty",
                        "conditions",
                    ));
                }
            }
            Condition::DstDomainRegex(pattern) => {
                regex::Regex::new(pattern).map_err(|e| {
                    crate::Error::validation_field(
                        format!("invalid domain regex: {}", e),
                        "conditions",
                    )
                })?;
            }
            Condition::Ident(user) => {
                if user.is_empty() {
                    return Err(crate::Error::validation_field(
                        "identity cannot be empty",
                        "conditions",
                    ));
                }
            }
            Condition::SrcIp(_) | Condition::ExternalHelper => {}
        }
        Ok(())
    }

    /// Whether this condition can suspend evaluation while an external
    /// collaborator is consulted.
    pub fn may_suspend(&self) -> bool {
        matches!(self, Condition::SrcDomain(_) | Condition::ExternalHelper)
    }
}
