//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every caller-facing failure of the configuration and user services is one
/// of these variants. The message is kept so the HTTP layer can surface it
/// verbatim.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed input (bad environment literal, blank name, ...).
    /// Raised before any store access.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A referenced group, item, user or token does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Uniqueness violation (group name, item key/environment/group triple,
    /// username, email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The caller could not be authenticated.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The caller is authenticated but lacks a permission.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Underlying persistence failure. The mutation was rolled back.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Stable machine-readable code, used in error response bodies.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Validation(_) => "validation_error",
            DomainError::NotFound(_) => "not_found",
            DomainError::Conflict(_) => "conflict",
            DomainError::Unauthorized(_) => "unauthorized",
            DomainError::Forbidden(_) => "forbidden",
            DomainError::Storage(_) => "storage_error",
        }
    }

    /// The message without the variant prefix.
    pub fn message(&self) -> &str {
        match self {
            DomainError::Validation(m)
            | DomainError::NotFound(m)
            | DomainError::Conflict(m)
            | DomainError::Unauthorized(m)
            | DomainError::Forbidden(m)
            | DomainError::Storage(m) => m,
        }
    }
}
