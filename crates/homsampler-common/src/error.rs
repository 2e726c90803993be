//! Error types shared across homolog-sampler crates

use thiserror::Error;

/// Result type alias for shared operations
pub type Result<T> = std::result::Result<T, HsError>;

/// Leaf error type for I/O and parsing shared by every crate
#[derive(Error, Debug)]
pub enum HsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid sequence: {0}")]
    InvalidSequence(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl HsError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn invalid_sequence(msg: impl Into<String>) -> Self {
        Self::InvalidSequence(msg.into())
    }
}
