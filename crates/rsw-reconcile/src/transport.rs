//! Transport boundary consumed by the engine.
//!
//! The engine never builds requests itself. Implementations own the wire
//! format, authentication, and retry of idempotent reads. Apply calls must not
//! be retried transparently: a retried apply could land twice under a stale
//! revision.

use std::fmt;

use async_trait::async_trait;

use crate::types::{RouterCandidate, RouterPatch, RouterState};

/// Errors a [`RouterTransport`] implementation may return.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// Network failure, timeout, or manager unavailable after retries.
    Unreachable(String),
    /// No router exists at the path.
    NotFound(String),
    /// The revision in the patch no longer matches the router.
    RevisionConflict(String),
    /// The manager refused the request.
    Rejected { status: u16, message: String },
    /// A response payload could not be decoded.
    Decode(String),
}

impl TransportError {
    pub fn is_revision_conflict(&self) -> bool {
        matches!(self, TransportError::RevisionConflict(_))
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Unreachable(msg) => write!(f, "manager unreachable: {msg}"),
            TransportError::NotFound(path) => write!(f, "router not found: {path}"),
            TransportError::RevisionConflict(msg) => write!(f, "revision conflict: {msg}"),
            TransportError::Rejected { status, message } => {
                write!(f, "manager rejected request status={status}: {message}")
            }
            TransportError::Decode(msg) => write!(f, "decode error: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

/// Router operations the engine needs from the manager.
///
/// Object-safe so callers can hold a `Box<dyn RouterTransport>`; `Send + Sync`
/// so the two verification fetches can be joined on any runtime.
#[async_trait]
pub trait RouterTransport: Send + Sync {
    /// Every router the manager knows about.
    async fn list_routers(&self) -> Result<Vec<RouterCandidate>, TransportError>;

    async fn fetch_router(&self, path: &str) -> Result<RouterState, TransportError>;

    /// Apply `patch` to the router at `path`, returning its post-apply state.
    async fn apply_router(
        &self,
        path: &str,
        patch: &RouterPatch,
    ) -> Result<RouterState, TransportError>;
}
