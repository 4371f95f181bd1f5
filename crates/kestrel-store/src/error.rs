//! Error types for key-value store operations.

/// Errors that can occur when talking to the shared key-value store.
///
/// Every variant is non-fatal from the point of view of a business
/// operation: cache reads degrade to a miss, invalidations are logged and
/// skipped, and the rate limiter admits the request.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be reached.
    #[error("store unavailable: {reason}")]
    Unavailable { reason: String },

    /// A round trip exceeded the configured operation timeout.
    #[error("store operation timed out after {millis}ms")]
    Timeout { millis: u64 },

    /// The key holds a value of another kind (plain value vs hash).
    #[error("wrong kind of value stored at '{key}'")]
    WrongType { key: String },

    /// `increment` hit a value that does not parse as an integer.
    #[error("value at '{key}' is not an integer")]
    NotAnInteger { key: String },

    /// A key pattern could not be compiled.
    #[error("invalid key pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// The store rejected a command.
    #[error("store command failed: {0}")]
    Command(String),

    /// Invalid store configuration.
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),
}

impl StoreError {
    /// Creates a new unavailable error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Creates a new wrong-type error.
    pub fn wrong_type(key: impl Into<String>) -> Self {
        Self::WrongType { key: key.into() }
    }

    /// Creates a new invalid pattern error.
    pub fn invalid_pattern(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this is a transient error that might succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable { .. } | Self::Timeout { .. })
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            Self::Timeout { millis: 0 }
        } else if err.is_io_error() || err.is_connection_refusal() || err.is_connection_dropped()
        {
            Self::unavailable(err.to_string())
        } else if err.code() == Some("WRONGTYPE") {
            Self::WrongType {
                key: String::new(),
            }
        } else {
            Self::Command(err.to_string())
        }
    }
}
