//! Control endpoint session contracts
//!
//! The dispatch engine writes decoded values to named points over a
//! persistent session. Session establishment, security negotiation, and
//! the wire protocol belong to the concrete implementation; the engine
//! depends only on the traits defined here.
//!
//! A session handle is owned by exactly one dispatch cycle: opened at
//! cycle start, closed at cycle end. The scheduler serializes cycles, so
//! no session is ever shared between concurrent cycles.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::value::TypedValue;

/// Errors surfaced by the control endpoint collaborators.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session could not be established.
    #[error("session open failed: {0}")]
    Open(String),
    /// The underlying transport failed mid-session.
    #[error("transport fault: {0}")]
    Transport(String),
}

/// Handle to an addressable point resolved within a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointHandle {
    /// Point name as addressed by job orders.
    pub name: String,
    /// Opaque node identifier within the session.
    pub node_id: String,
}

/// Classification of a point, carried by its descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointClass {
    /// A readable/writable variable.
    Variable,
    /// Anything else (folders, methods, views).
    Other,
}

/// Current state of a point, read before a write so attribute metadata is
/// preserved across the update.
#[derive(Debug, Clone)]
pub struct ValueDescriptor {
    /// The point's class.
    pub class: PointClass,
    /// The point's current value, if one has been published.
    pub current: Option<TypedValue>,
}

/// Status code returned by a point write. Zero means the endpoint accepted
/// the value; any other code carries endpoint-defined text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteStatus {
    /// Endpoint status code, `0` on success.
    pub code: u32,
    /// Endpoint status text, empty on success.
    pub text: String,
}

impl WriteStatus {
    /// A successful write status.
    #[must_use]
    pub const fn good() -> Self {
        Self {
            code: 0,
            text: String::new(),
        }
    }

    /// Whether the endpoint accepted the write.
    #[must_use]
    pub const fn is_good(&self) -> bool {
        self.code == 0
    }
}

impl fmt::Display for WriteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.text.is_empty() {
            write!(f, "status {}", self.code)
        } else {
            write!(f, "status {} ({})", self.code, self.text)
        }
    }
}

/// A stateful connection to the control endpoint.
///
/// Methods take `&mut self`: the handle is exclusively owned by the running
/// cycle, so implementations need no internal locking. Every call is
/// expected to be bounded by the implementation's own timeout; a timeout
/// surfaces as `SessionError::Transport` like any other call failure.
#[async_trait]
pub trait ControlSession: Send {
    /// Resolve a point by name. `Ok(None)` means the endpoint does not
    /// know the point; `Err` means the transport failed.
    async fn find_point(&mut self, name: &str) -> Result<Option<PointHandle>, SessionError>;

    /// Read the point's current descriptor.
    async fn read_current(&mut self, point: &PointHandle) -> Result<ValueDescriptor, SessionError>;

    /// Write a value to the point, returning the endpoint's status code.
    async fn write(
        &mut self,
        point: &PointHandle,
        value: TypedValue,
    ) -> Result<WriteStatus, SessionError>;

    /// Re-establish the underlying transport after a fault.
    async fn reconnect(&mut self) -> Result<(), SessionError>;

    /// Release the session. Implementations cancel any keep-alive
    /// subscription before disposing of the transport. Never fails.
    async fn close(&mut self);
}

/// Opens control sessions for dispatch cycles.
#[async_trait]
pub trait ControlSessionFactory: Send + Sync {
    /// Open a new session against the configured endpoint.
    async fn open(&self) -> Result<Box<dyn ControlSession>, SessionError>;
}
