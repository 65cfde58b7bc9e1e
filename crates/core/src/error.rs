//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Coarse error classification for callers that translate failures into
/// user-facing responses.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    InsufficientStock,
    InvalidStateTransition,
    Conflict,
}

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, state transitions). Storage concerns belong to the infra crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. non-positive quantity, empty name).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A transaction type string outside the fixed set.
    #[error("invalid transaction type: {0}")]
    InvalidType(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Applying the change would drive on-hand quantity below zero.
    #[error("insufficient stock for product {product_id} (available: {available}, requested: {requested})")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// The return already reached `completed`.
    #[error("return already completed")]
    AlreadyCompleted,

    /// The return was rejected; rejected returns cannot be processed.
    #[error("cannot process rejected return")]
    AlreadyRejected,

    /// Only pending returns can be deleted.
    #[error("can only delete pending returns (status: {status})")]
    NotPending { status: String },

    /// A uniqueness or concurrent-write conflict.
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation(_) | DomainError::InvalidType(_) | DomainError::InvalidId(_) => {
                ErrorKind::InvalidInput
            }
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            DomainError::AlreadyCompleted
            | DomainError::AlreadyRejected
            | DomainError::NotPending { .. } => ErrorKind::InvalidStateTransition,
            DomainError::Conflict(_) => ErrorKind::Conflict,
        }
    }
}
