use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("{kind} must not be empty")]
    EmptyId { kind: &'static str },

    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}
