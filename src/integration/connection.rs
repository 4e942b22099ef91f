//! Client connection boundary.

use crate::handle::Handle;
use crate::integration::AuthRequest;

/// State of one accepted client connection.
///
/// Owned by the connection manager; evaluations reach it through a handle
/// that goes dead when the connection closes.
#[derive(Debug, Default)]
pub struct Connection {
    /// Live socket descriptor, absent once the socket is gone.
    pub descriptor: Option<i32>,
    /// Pending authentication state mirrored from in-flight evaluations.
    /// Cleared by the evaluation core only at completion.
    pub auth: Option<Handle<AuthRequest>>,
}

impl Connection {
    /// Create a connection over an open descriptor.
    pub fn new(descriptor: i32) -> Self {
        Self {
            descriptor: Some(descriptor),
            auth: None,
        }
    }

    /// Mark the socket as closed while the connection object lingers.
    pub fn close(&mut self) {
        self.descriptor = None;
    }
}
