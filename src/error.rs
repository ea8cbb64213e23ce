//! Error taxonomy for channel operations.
//!
//! Mirrors the shape of [`crate::request`]'s terminal states: every pending
//! request resolves to success or to exactly one of [`ChannelError`]'s
//! variants. `Retired` is expected end-of-stream, not a fault; `Fatal`
//! signals a protocol violation inside the engine itself and should never be
//! observed by correct callers.

use thiserror::Error;

/// Terminal failure of a (possibly suspended) `Read`/`Write`/choice operation.
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    /// The channel was retired, or retirement was observed while pending.
    #[error("channel retired")]
    Retired,
    /// The request's deadline elapsed before it could complete.
    #[error("operation timed out")]
    Timeout,
    /// The request's cancellation token fired before it could complete.
    #[error("operation cancelled")]
    Cancelled,
    /// The request was evicted from a full pending queue (Reject/LIFO/FIFO).
    #[error("pending queue overflow")]
    Overflow,
    /// A composite request (external choice) contained incompatible siblings.
    #[error("invalid composite operation: {0}")]
    InvalidOperation(String),
    /// A protocol invariant was violated (e.g. a double-commit of an offer).
    #[error("fatal protocol violation: {0}")]
    Fatal(String),
}

/// Error returned by [`crate::channel::Channel::try_write`].
///
/// `Retired` is split out from `Full` because retirement is a distinct,
/// expected condition rather than a buffer-pressure failure.
#[derive(Debug)]
pub enum TrySendError<T> {
    /// No waiting reader and no free buffer slot; the value is returned.
    Full(T),
    /// The channel is retired; the value is returned.
    Retired(T),
}

impl<T> TrySendError<T> {
    /// Discards the returned value, keeping only the error kind.
    pub fn into_channel_error(self) -> ChannelError {
        match self {
            TrySendError::Full(_) => ChannelError::Overflow,
            TrySendError::Retired(_) => ChannelError::Retired,
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Display for TrySendError<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrySendError::Full(_) => write!(f, "channel full"),
            TrySendError::Retired(_) => write!(f, "channel retired"),
        }
    }
}

impl<T: std::fmt::Debug> std::error::Error for TrySendError<T> {}

/// Error returned by [`crate::channel::Channel::try_read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TryRecvError {
    /// No buffered item and no waiting writer.
    #[error("channel empty")]
    Empty,
    /// The channel is retired and drained.
    #[error("channel retired")]
    Retired,
}
