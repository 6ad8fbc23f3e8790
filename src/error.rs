//! Error types for the adapter.
//!
//! The adapter introduces almost no failure modes of its own. Transport
//! failures pass through unchanged; the only construction-time error is an
//! unresolvable transport factory.

use thiserror::Error;

/// Convenience type alias for Results using SocketError.
pub type SocketResult<T> = Result<T, SocketError>;

/// Errors surfaced through the adapter.
#[derive(Error, Debug)]
pub enum SocketError {
    /// The transport module exposed no invocable connection factory,
    /// neither as a direct export nor under its `default` slot.
    #[error("transport factory is not callable")]
    FactoryNotCallable,

    /// Failure reported by the underlying transport, forwarded as-is.
    #[error("transport error: {0}")]
    Transport(String),
}
