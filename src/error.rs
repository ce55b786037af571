//! Error types for cache operations
//!
//! Errors fall into three groups: formal argument errors (always returned),
//! resolution errors (no backend or serializer registered for a lookup), and
//! execution errors raised by a backend, a serializer, or cancellation. Only the
//! last two are subject to the `throw_on_error` policy of the cache service.

use crate::cache::types::{BufferKind, CacheTier, SerializationFormat};
use thiserror::Error;

/// Main error type for cache operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CacheError {
    /// A required argument was empty, blank or otherwise malformed
    #[error("Invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    /// No backend registered for the requested tier and buffer kind
    #[error("No cache backend registered for tier `{tier}` with buffer kind `{kind}`")]
    BackendNotFound { tier: CacheTier, kind: BufferKind },

    /// No serializer registered for the requested format and buffer kind
    #[error("No serializer registered for format `{format}` with buffer kind `{kind}`")]
    SerializerNotFound {
        format: SerializationFormat,
        kind: BufferKind,
    },

    /// Failure reported by a storage backend
    #[error("Backend error: {0}")]
    Backend(String),

    /// Serialization/Deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The operation was cancelled before or during dispatch
    #[error("Operation `{operation}` was cancelled")]
    Cancelled { operation: &'static str },

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

impl CacheError {
    /// Build an `InvalidArgument` error
    pub fn invalid_argument(name: &'static str, reason: impl Into<String>) -> Self {
        CacheError::InvalidArgument {
            name,
            reason: reason.into(),
        }
    }

    /// Formal errors are raised regardless of the error policy
    pub fn is_validation(&self) -> bool {
        matches!(self, CacheError::InvalidArgument { .. })
    }

    /// Whether the error comes from registry lookup
    pub fn is_resolution(&self) -> bool {
        matches!(
            self,
            CacheError::BackendNotFound { .. } | CacheError::SerializerNotFound { .. }
        )
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}

impl From<erased_serde::Error> for CacheError {
    fn from(e: erased_serde::Error) -> Self {
        CacheError::Serialization(e.to_string())
    }
}

impl From<String> for CacheError {
    fn from(s: String) -> Self {
        CacheError::Other(s)
    }
}

impl From<&str> for CacheError {
    fn from(s: &str) -> Self {
        CacheError::Other(s.to_string())
    }
}
