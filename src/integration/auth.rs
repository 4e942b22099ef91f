//! Authentication request boundary.

/// An in-flight authentication round trip.
///
/// Owned by the authentication subsystem, which may tear it down at any time
/// (a reconfiguration does exactly that). The evaluation core never drives
/// the protocol; its only contractual action is dropping its references at
/// completion.
#[derive(Debug, Default)]
pub struct AuthRequest {
    /// Credentials presented so far, if any.
    pub username: Option<String>,
}

impl AuthRequest {
    /// Create an authentication request with known credentials.
    pub fn with_username(username: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
        }
    }
}
