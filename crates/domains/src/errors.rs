//! # DomainError
//!
//! Centralized error handling for the store.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for every service and repository operation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Malformed or out-of-range input (e.g. negative id, id mismatch)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A genre string that does not name a member of the genre set
    #[error("unknown genre: {0:?}")]
    InvalidGenre(String),

    /// Resource not found (e.g. Game, Purchase)
    #[error("{entity} not found with ID {id}")]
    NotFound { entity: &'static str, id: i32 },

    /// A replace touched no row although the record still exists.
    #[error("concurrent modification of {entity} {id}")]
    ConcurrencyConflict { entity: &'static str, id: i32 },

    /// The write violates a relational constraint (e.g. deleting a purchased game)
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Infrastructure failure (e.g. DB down, broken row)
    #[error("storage error: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: i32) -> Self {
        DomainError::NotFound { entity, id }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        DomainError::InvalidRequest(msg.into())
    }

    pub fn storage(msg: impl std::fmt::Display) -> Self {
        DomainError::Storage(msg.to_string())
    }
}

/// A specialized Result type for store logic.
pub type Result<T> = std::result::Result<T, DomainError>;
