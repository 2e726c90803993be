//! Error types for the homolog_sampler CLI
//!
//! Every variant renders as a user-facing message with a hint on how to fix
//! the problem.

use homsampler_core::batch::BatchError;
use homsampler_core::{ConfigError, StoreError};
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    /// Credentials, connection, species or release problems
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}. Check the host is reachable and the release is complete.")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Batch(#[from] BatchError),

    /// Flag combinations that cannot work together
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Cannot read '{}': {reason}", .path.display())]
    InputFile { path: PathBuf, reason: String },

    #[error("Log file '{}' already exists. Use --force_overwrite to replace it or pick another --logfile_name.", .path.display())]
    LogExists { path: PathBuf },

    #[error("File operation failed: {0}. Check file permissions and disk space.")]
    Io(#[from] std::io::Error),

    #[error("Failed to write TSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CliError {
    pub fn invalid_args(msg: impl Into<String>) -> Self {
        Self::InvalidArgs(msg.into())
    }

    pub fn input_file(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InputFile {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_hints() {
        let err = CliError::from(ConfigError::MissingCredentials);
        assert!(err.to_string().contains("host user password"));

        let err = CliError::LogExists {
            path: PathBuf::from("out/one2one.log"),
        };
        assert!(err.to_string().contains("--force_overwrite"));

        let err = CliError::input_file("genes.txt", "missing 'stableid' column");
        assert_eq!(err.to_string(), "Cannot read 'genes.txt': missing 'stableid' column");
    }
}
