//! Error types for SUDEP monitor.

use thiserror::Error;

/// Errors raised while reading from the remote JSON store.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Remote network error: {0}")]
    Network(String),

    #[error("Remote server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Remote payload could not be decoded: {0}")]
    Decode(String),

    #[error("Remote runtime error: {0}")]
    Runtime(String),
}

/// A date token that is not exactly 12 ASCII digits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateKeyError {
    #[error("Malformed date token '{0}': expected 12 digits ddMMyyhhmmss")]
    Malformed(String),
}

/// Errors raised by the windowed statistics engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatsError {
    #[error("Insufficient samples: {len} samples for a window of {window}")]
    InsufficientSamples { len: usize, window: usize },

    #[error("Window size {window} is below the minimum of {min}")]
    InvalidWindow { window: usize, min: usize },

    #[error("Degenerate distribution: {0}")]
    Degenerate(String),
}

/// Errors raised while assembling a user record from the remote store.
///
/// Assembly is all-or-nothing: any variant aborts the whole record.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Invalid session date: {0}")]
    Date(#[from] DateKeyError),

    #[error("Channel '{channel}' has mismatched lengths: {detail}")]
    ChannelLength {
        channel: &'static str,
        detail: String,
    },

    #[error("Field '{field}' has an unexpected value: {detail}")]
    Field { field: String, detail: String },
}

/// Errors raised by the local cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid user id '{0}': not usable as a cache entry name")]
    InvalidUserId(String),

    #[error("Cache entry for '{user_id}' is corrupt: {reason}")]
    Corrupt { user_id: String, reason: String },

    #[error(transparent)]
    Assembly(#[from] AssemblyError),
}
