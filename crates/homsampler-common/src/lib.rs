//! homolog-sampler common library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error type, logging setup and nucleotide sequence helpers used by
//! the sampler core and the command-line tool.
//!
//! # Overview
//!
//! - **Error Handling**: [`HsError`] and the [`Result`] alias
//! - **Logging**: tracing subscriber configuration ([`logging`])
//! - **Sequences**: reverse complement, codon trimming and FASTA records ([`seq`])
//!
//! # Example
//!
//! ```no_run
//! use homsampler_common::seq::{reverse_complement, FastaRecord};
//!
//! let record = FastaRecord::new("Human", reverse_complement(b"ATGC"));
//! print!("{}", record.to_fasta(60));
//! ```

pub mod error;
pub mod logging;
pub mod seq;

// Re-export commonly used types
pub use error::{HsError, Result};
