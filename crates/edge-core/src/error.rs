//! Core error types.

use thiserror::Error;

/// Errors from core domain validation and parsing.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid amount: {0} (must be a positive decimal)")]
    InvalidAmount(String),

    #[error("invalid symbol: {0:?}")]
    InvalidSymbol(String),

    #[error("invalid agent identity: {0}")]
    InvalidIdentity(String),

    #[error("unknown venue: {0}")]
    UnknownVenue(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
