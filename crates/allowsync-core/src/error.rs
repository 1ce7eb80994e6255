//! Error types for allowsync
//!
//! This module defines all error types used throughout the workspace.
//! The taxonomy mirrors how far a failure reaches:
//!
//! - [`Error::Resolution`] ends the whole run (no IP, nothing to reconcile)
//! - [`Error::BackendUnavailable`] fails every account of one backend kind
//! - [`Error::BackendQuery`] / [`Error::BackendMutation`] fail one account

use thiserror::Error;

/// Result type alias for allowsync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for allowsync
#[derive(Error, Debug)]
pub enum Error {
    /// Every public IP lookup source failed
    #[error("IP resolution failed: {0}")]
    Resolution(String),

    /// Backend CLI missing, not authenticated, or no adapter registered
    #[error("Backend unavailable ({backend}): {message}")]
    BackendUnavailable {
        /// Backend name
        backend: String,
        /// Error message
        message: String,
    },

    /// Listing entries failed or returned output of an unexpected shape
    #[error("Backend query failed ({backend}): {message}")]
    BackendQuery {
        /// Backend name
        backend: String,
        /// Error message
        message: String,
    },

    /// Creating or deleting an entry failed
    #[error("Backend mutation failed ({backend}): {message}")]
    BackendMutation {
        /// Backend name
        backend: String,
        /// Error message
        message: String,
    },

    /// Registry store errors
    #[error("Registry store error: {0}")]
    RegistryStore(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a backend-unavailable error
    pub fn backend_unavailable(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendUnavailable {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a backend query error
    pub fn backend_query(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendQuery {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a backend mutation error
    pub fn backend_mutation(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendMutation {
            backend: backend.into(),
            message: message.into(),
        }
    }

    /// Create a registry store error
    pub fn registry_store(msg: impl Into<String>) -> Self {
        Self::RegistryStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error means the backend tool could not be used at all
    pub fn is_backend_unavailable(&self) -> bool {
        matches!(self, Self::BackendUnavailable { .. })
    }
}
