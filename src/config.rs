//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Tunables consulted when evaluation contexts are constructed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Prefer the forwarded (indirect) client address over the directly
    /// connected peer when populating a context's source address.
    #[serde(default)]
    pub use_indirect_client: bool,
}

impl Config {
    /// Parse a configuration from YAML.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        serde_yaml::from_str(yaml).map_err(crate::Error::from)
    }
}
