//! Storage seam between the sampling pipeline and the database
//!
//! Samplers and resolvers only see these traits. `db::MysqlEnsembl`
//! implements them against a live Ensembl MySQL host.

use async_trait::async_trait;

use crate::error::StoreResult;
use crate::model::{
    AlignMethod, AlignmentBlock, Gene, GeneSummary, GenomicRegion, HomologyRecord, Interval,
    Species,
};

/// Reads from per-species core schemas
#[async_trait]
pub trait GenomeStore: Send + Sync {
    /// Gene with all transcripts, exons and translations, by stable id
    async fn gene(&self, species: &Species, stable_id: &str) -> StoreResult<Option<Gene>>;

    /// Forward-strand genomic sequence; unknown stretches are `N`
    async fn region_sequence(
        &self,
        species: &Species,
        region: &GenomicRegion,
    ) -> StoreResult<Vec<u8>>;

    /// Repeat feature intervals overlapping a region
    async fn repeat_intervals(
        &self,
        species: &Species,
        region: &GenomicRegion,
    ) -> StoreResult<Vec<Interval>>;

    /// Genes of one biotype, optionally restricted to named seq regions
    async fn genes_matching(
        &self,
        species: &Species,
        biotype: &str,
        seq_regions: Option<&[String]>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<GeneSummary>>;

    /// `species.taxonomy_id` from a core schema's meta table
    async fn taxon_id(&self, core_db: &str) -> StoreResult<Option<u32>>;
}

/// Reads from the release's compara schema
#[async_trait]
pub trait ComparaStore: Send + Sync {
    /// Homology rows linking `gene_stable_id` to genes of `target`
    async fn homologies(
        &self,
        gene_stable_id: &str,
        target: &Species,
    ) -> StoreResult<Vec<HomologyRecord>>;

    /// Blocks of one method/species set overlapping a reference region
    async fn alignment_blocks(
        &self,
        method_clade_id: i64,
        reference: &Species,
        region: &GenomicRegion,
    ) -> StoreResult<Vec<AlignmentBlock>>;

    /// Genomic alignment methods whose species set includes every given species
    async fn align_methods(&self, species: &[Species]) -> StoreResult<Vec<AlignMethod>>;
}
