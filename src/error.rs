//! Typed failure taxonomy for the control plane.
//!
//! Handlers convert these into user-facing notices at the router boundary;
//! raw variants never reach the transport layer. Conditions that map
//! one-to-one onto a localized notice (permission denial, record not
//! found) are reported directly by the handlers and need no variant here.

use thiserror::Error;

/// Failures the core distinguishes when handling an update.
#[derive(Debug, Error)]
pub enum BotError {
    /// The persistence layer is unreachable or rejected the operation.
    ///
    /// Callers must surface a generic "try again" notice and must never
    /// fall back to default settings silently.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] tokio_rusqlite::Error),

    /// Malformed command argument, reported with a usage hint.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
