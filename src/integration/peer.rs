//! Upstream peer boundary.

use std::net::IpAddr;

/// An upstream peer selected by evaluation.
///
/// Owned by the evaluation result; the context carries a shared reference
/// and never mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    /// Configured peer name.
    pub name: String,
    /// Peer address, when resolved.
    pub addr: Option<IpAddr>,
}

impl Peer {
    /// Create a named peer.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            addr: None,
        }
    }
}
