//! homolog-sampler core
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Resolves one-to-one orthologs across species of one Ensembl release and
//! samples either their canonical coding sequences or whole-gene
//! alignments from compara, writing one gzip FASTA file per reference gene.
//!
//! # Overview
//!
//! - **Access**: [`account::Account`], [`db::MysqlEnsembl`] and the
//!   [`store::GenomeStore`] / [`store::ComparaStore`] seam
//! - **Resolution**: [`species::SpeciesResolver`], [`homology::resolve_orthologs`]
//! - **Sampling**: [`cds::sample_cds`], [`alignment::sample_alignment`] with
//!   [`mask`] and a swappable [`cache::BlockCache`]
//! - **Batch**: [`batch::BatchRunner`] and the [`output`] writers
//!
//! # Example
//!
//! ```no_run
//! use homsampler_core::account::Account;
//! use homsampler_core::db::{create_pool, list_schemas, DbConfig};
//! use homsampler_core::species::SpeciesResolver;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let account = Account::from_env()?;
//! let pool = create_pool(&account, &DbConfig::from_env()).await?;
//! let resolver = SpeciesResolver::new(list_schemas(&pool).await?);
//! let species = resolver.resolve(&["human", "mouse"], 81)?;
//! println!("{}", species[0].core_db);
//! # Ok(())
//! # }
//! ```

pub mod account;
pub mod alignment;
pub mod batch;
pub mod cache;
pub mod cds;
pub mod db;
pub mod error;
pub mod homology;
pub mod mask;
pub mod model;
pub mod output;
pub mod species;
pub mod store;

#[cfg(test)]
mod fixtures;

pub use error::{ConfigError, GeneFailure, ResolutionError, SamplingError, StoreError};
