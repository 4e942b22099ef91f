//! HTTP message representations and shared-ownership locks.
//!
//! Messages are owned jointly by the request pipeline and any in-flight
//! evaluations. [`MsgLock`] is the reference-count lock an evaluation holds
//! on a message: acquiring clones the shared pointer, releasing happens
//! exactly once when the lock is dropped, and the message is destroyed when
//! the last holder releases. The evaluation core never mutates message
//! contents.

use std::net::IpAddr;
use std::ops::Deref;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

/// An HTTP request as seen by access control.
///
/// Only the fields evaluation consults are modeled; parsing and the full
/// header surface live outside this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpRequest {
    /// Request method.
    pub method: String,
    /// Destination host from the request line or Host header.
    pub host: String,
    /// Address of the directly connected client.
    pub client_addr: IpAddr,
    /// Client address reported by a trusted forwarding proxy, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indirect_client_addr: Option<IpAddr>,
    /// Local address the request arrived on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_addr: Option<IpAddr>,
}

impl HttpRequest {
    /// Create a request with the fields evaluation needs.
    pub fn new(method: impl Into<String>, host: impl Into<String>, client_addr: IpAddr) -> Self {
        Self {
            method: method.into(),
            host: host.into(),
            client_addr,
            indirect_client_addr: None,
            local_addr: None,
        }
    }

    /// Set the forwarded (indirect) client address.
    pub fn with_indirect_client(mut self, addr: IpAddr) -> Self {
        self.indirect_client_addr = Some(addr);
        self
    }

    /// Set the local address the request arrived on.
    pub fn with_local_addr(mut self, addr: IpAddr) -> Self {
        self.local_addr = Some(addr);
        self
    }
}

/// An HTTP reply as seen by access control.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpReply {
    /// Status code of the reply.
    pub status: u16,
}

impl HttpReply {
    /// Create a reply with the given status code.
    pub fn new(status: u16) -> Self {
        Self { status }
    }
}

/// Reference-count lock on a shared message.
///
/// One acquire pairs with exactly one release; the release is the `Drop`
/// and cannot be repeated or forgotten.
#[derive(Debug)]
pub struct MsgLock<T> {
    msg: Rc<T>,
}

impl<T> MsgLock<T> {
    /// Lock the message, keeping it alive until this lock is dropped.
    pub fn acquire(msg: &Rc<T>) -> Self {
        Self {
            msg: Rc::clone(msg),
        }
    }

    /// Number of holders currently keeping the message alive.
    pub fn holders(&self) -> usize {
        Rc::strong_count(&self.msg)
    }
}

impl<T> Deref for MsgLock<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.msg
    }
}
