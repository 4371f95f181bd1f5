//! Error types for Kestrel record operations.
//!
//! This module defines the error hierarchy returned by the record store
//! and the business services built on top of it. All errors implement the
//! standard `std::error::Error` trait via `thiserror`.
//!
//! # Error Handling Philosophy
//!
//! - Functions that can fail return `Result<T, KestrelError>`
//! - Record store errors propagate unchanged to the caller
//! - Cache and key-value store failures never appear here: they are absorbed
//!   at the cache and rate-limit boundary
//!
//! # Example
//!
//! ```
//! use kestrel_core::{KestrelError, Result};
//!
//! fn load_todo(id: i64) -> Result<String> {
//!     if id <= 0 {
//!         return Err(KestrelError::todo_not_found(id));
//!     }
//!     Ok(format!("todo {}", id))
//! }
//!
//! assert!(load_todo(0).unwrap_err().is_not_found());
//! ```

use thiserror::Error;

/// Main error type for Kestrel record operations.
#[derive(Debug, Error)]
pub enum KestrelError {
    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record that was requested ("user", "todo")
        entity: &'static str,
        /// Identifier that was requested
        id: i64,
    },

    /// A uniqueness constraint would be violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller may not access a record owned by another user.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Input rejected before reaching the record store.
    #[error("validation error for field '{field}': {message}")]
    Validation {
        /// Field that failed validation
        field: String,
        /// Description of the failure
        message: String,
    },

    /// The record store could not be reached.
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl KestrelError {
    /// Creates a NotFound error for a user.
    pub fn user_not_found(id: i64) -> Self {
        Self::NotFound { entity: "user", id }
    }

    /// Creates a NotFound error for a todo.
    pub fn todo_not_found(id: i64) -> Self {
        Self::NotFound { entity: "todo", id }
    }

    /// Creates a Conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Creates a Forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// Creates a Validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates an Unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Creates an Internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if the referenced record was absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true for uniqueness violations.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns true for cross-tenant access denials.
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden(_))
    }
}

/// Type alias for Results with KestrelError.
pub type Result<T> = std::result::Result<T, KestrelError>;
