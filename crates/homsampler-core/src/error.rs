//! Error taxonomy for the sampling pipeline
//!
//! Configuration errors are fatal and stop a run before any gene is touched.
//! Resolution and sampling errors are per gene: the batch runner records them
//! and moves on.

use std::path::PathBuf;
use thiserror::Error;

/// Fatal setup errors: credentials, connection, species and release lookup
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("ENSEMBL_ACCOUNT is not set. Export it as 'host user password [port]'.")]
    MissingCredentials,

    #[error("Malformed ENSEMBL_ACCOUNT: {0}. Expected 'host user password [port]'.")]
    MalformedCredentials(String),

    #[error("Unknown species '{name}' in release {release}.{}", format_suggestions(.suggestions))]
    UnknownSpecies {
        name: String,
        release: u32,
        suggestions: Vec<String>,
    },

    #[error("Release {0} has no Ensembl core or compara databases on this host. Use 'show_available_species' to list releases.")]
    UnknownRelease(u32),

    #[error("Release {0} has no compara database on this host")]
    MissingCompara(u32),

    #[error("Cannot connect to database: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Cannot read database catalog: {0}")]
    Catalog(#[from] StoreError),
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" Did you mean: {}?", suggestions.join(", "))
    }
}

/// Errors raised by the storage layer
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Invalid schema name '{0}'")]
    InvalidSchemaName(String),

    #[error("Inconsistent database content: {0}")]
    Inconsistent(String),
}

impl StoreError {
    pub fn inconsistent(msg: impl Into<String>) -> Self {
        Self::Inconsistent(msg.into())
    }

    /// Network and pool errors worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            StoreError::Sqlx(sqlx::Error::Io(_))
                | StoreError::Sqlx(sqlx::Error::PoolTimedOut)
                | StoreError::Sqlx(sqlx::Error::WorkerCrashed)
        )
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Failure to assemble a usable ortholog group for a reference gene
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("gene '{gene_id}' not found in {species}")]
    GeneNotFound { species: String, gene_id: String },

    #[error("gene '{gene_id}' has biotype '{biotype}', not protein_coding")]
    NotProteinCoding { gene_id: String, biotype: String },

    #[error("gene '{gene_id}' has no one-to-one ortholog in {species}")]
    NoOrtholog { gene_id: String, species: String },

    #[error("gene '{gene_id}' has {count} one-to-one orthologs in {species}")]
    DuplicateOrtholog {
        gene_id: String,
        species: String,
        count: usize,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure to build sequences for a resolved group
#[derive(Error, Debug)]
pub enum SamplingError {
    #[error("gene '{gene_id}' ({species}) has no canonical coding transcript")]
    NoCanonicalTranscript { gene_id: String, species: String },

    #[error("gene '{gene_id}' ({species}) produced an empty coding sequence")]
    EmptySequence { gene_id: String, species: String },

    #[error("gene '{gene_id}' has no alignment coverage for method {method_clade_id}")]
    NoAlignmentCoverage {
        gene_id: String,
        method_clade_id: i64,
    },

    #[error("alignment block {block_id} is inconsistent: {reason}")]
    BlockStitch { block_id: i64, reason: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why a single reference gene did not produce output
#[derive(Error, Debug)]
pub enum GeneFailure {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Sampling(#[from] SamplingError),

    #[error("cannot write '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

impl GeneFailure {
    /// Short label used to tally failures in the run summary
    pub fn kind(&self) -> &'static str {
        match self {
            GeneFailure::Resolution(ResolutionError::GeneNotFound { .. }) => "gene_not_found",
            GeneFailure::Resolution(ResolutionError::NotProteinCoding { .. }) => {
                "not_protein_coding"
            },
            GeneFailure::Resolution(ResolutionError::NoOrtholog { .. }) => "no_one2one_ortholog",
            GeneFailure::Resolution(ResolutionError::DuplicateOrtholog { .. }) => {
                "duplicate_one2one_ortholog"
            },
            GeneFailure::Sampling(SamplingError::NoCanonicalTranscript { .. }) => {
                "no_canonical_transcript"
            },
            GeneFailure::Sampling(SamplingError::EmptySequence { .. }) => "empty_sequence",
            GeneFailure::Sampling(SamplingError::NoAlignmentCoverage { .. }) => {
                "no_alignment_coverage"
            },
            GeneFailure::Sampling(SamplingError::BlockStitch { .. }) => "block_stitch",
            GeneFailure::Resolution(ResolutionError::Store(_))
            | GeneFailure::Sampling(SamplingError::Store(_)) => "database",
            GeneFailure::Write { .. } => "write",
            GeneFailure::Timeout { .. } => "timeout",
        }
    }

    pub fn is_transient(&self) -> bool {
        match self {
            GeneFailure::Resolution(ResolutionError::Store(e))
            | GeneFailure::Sampling(SamplingError::Store(e)) => e.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_species_message_lists_suggestions() {
        let err = ConfigError::UnknownSpecies {
            name: "huamn".to_string(),
            release: 81,
            suggestions: vec!["human".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Unknown species 'huamn' in release 81. Did you mean: human?"
        );

        let bare = ConfigError::UnknownSpecies {
            name: "dragon".to_string(),
            release: 81,
            suggestions: vec![],
        };
        assert_eq!(bare.to_string(), "Unknown species 'dragon' in release 81.");
    }

    #[test]
    fn test_failure_kinds_and_transience() {
        let failure = GeneFailure::from(ResolutionError::NoOrtholog {
            gene_id: "ENSG1".to_string(),
            species: "opossum".to_string(),
        });
        assert_eq!(failure.kind(), "no_one2one_ortholog");
        assert!(!failure.is_transient());

        let flaky = GeneFailure::from(SamplingError::Store(StoreError::Sqlx(
            sqlx::Error::PoolTimedOut,
        )));
        assert_eq!(flaky.kind(), "database");
        assert!(flaky.is_transient());
    }
}
