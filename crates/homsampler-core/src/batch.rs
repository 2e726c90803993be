//! Batch runner: one output file per reference gene
//!
//! Genes are resolved and sampled concurrently (`jobs` in flight) while a
//! single consumer writes results, so every gene's file and the shared
//! `metadata.tsv` are written from one place. Per-gene failures are counted
//! and logged; only output directory trouble stops a run.

use futures::stream::{self, StreamExt};
use homsampler_common::seq::to_fasta;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::alignment::{sample_alignment, AlignOptions};
use crate::cache::BlockCache;
use crate::cds::sample_cds;
use crate::error::GeneFailure;
use crate::homology::resolve_orthologs;
use crate::model::Species;
use crate::output::{
    append_metadata, compact_metadata, gene_output_path, write_gene_fasta, SampledGene, METADATA_FILE,
};
use crate::store::{ComparaStore, GenomeStore};

/// Consecutive write failures treated as an unwritable output directory
pub const MAX_CONSECUTIVE_WRITE_FAILURES: usize = 3;

/// Genes sampled by a dry run when no count is given
pub const DEFAULT_TEST_GENES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingMode {
    Cds,
    Alignment(AlignOptions),
}

#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub outdir: PathBuf,
    pub force_overwrite: bool,
    /// Dry run over at most this many genes; nothing is written
    pub test_limit: Option<usize>,
    pub jobs: usize,
    pub gene_timeout: Option<Duration>,
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl BatchConfig {
    pub fn new(outdir: impl Into<PathBuf>) -> Self {
        Self {
            outdir: outdir.into(),
            force_overwrite: false,
            test_limit: None,
            jobs: 1,
            gene_timeout: None,
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.test_limit.is_some()
    }
}

/// What happened to one reference gene
#[derive(Debug)]
pub enum GeneOutcome {
    Written(PathBuf),
    Skipped,
    /// Dry run result, not written
    Sampled(SampledGene),
    Failed(GeneFailure),
}

impl GeneOutcome {
    /// FASTA text of a dry-run result
    pub fn fasta(&self) -> Option<String> {
        match self {
            GeneOutcome::Sampled(sampled) => Some(to_fasta(&sampled.records)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub written: usize,
    pub skipped: usize,
    pub sampled: usize,
    pub failed: usize,
    /// Failure counts by [`GeneFailure::kind`]
    pub failures: BTreeMap<&'static str, usize>,
}

impl BatchReport {
    fn record(&mut self, outcome: &GeneOutcome) {
        match outcome {
            GeneOutcome::Written(_) => self.written += 1,
            GeneOutcome::Skipped => self.skipped += 1,
            GeneOutcome::Sampled(_) => self.sampled += 1,
            GeneOutcome::Failed(failure) => {
                self.failed += 1;
                *self.failures.entry(failure.kind()).or_default() += 1;
            },
        }
    }

    pub fn total(&self) -> usize {
        self.written + self.skipped + self.sampled + self.failed
    }
}

/// Errors that end a run
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Cannot create output directory '{}': {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Output directory '{}' looks unwritable after {count} consecutive write failures: {last}", .path.display())]
    RepeatedWriteFailures {
        path: PathBuf,
        count: usize,
        last: GeneFailure,
    },

    #[error("Cannot rewrite '{}': {source}", .path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct BatchRunner<'a> {
    genomes: &'a dyn GenomeStore,
    compara: &'a dyn ComparaStore,
    cache: &'a dyn BlockCache,
    reference: &'a Species,
    targets: &'a [Species],
    mode: SamplingMode,
    config: BatchConfig,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        genomes: &'a dyn GenomeStore,
        compara: &'a dyn ComparaStore,
        cache: &'a dyn BlockCache,
        reference: &'a Species,
        targets: &'a [Species],
        mode: SamplingMode,
        config: BatchConfig,
    ) -> Self {
        Self {
            genomes,
            compara,
            cache,
            reference,
            targets,
            mode,
            config,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Resolve and sample one reference gene
    pub async fn sample_gene(&self, gene_id: &str) -> Result<SampledGene, GeneFailure> {
        let group =
            resolve_orthologs(self.genomes, self.compara, self.reference, self.targets, gene_id)
                .await?;

        let sampled = match self.mode {
            SamplingMode::Cds => sample_cds(self.genomes, &group).await?,
            SamplingMode::Alignment(options) => {
                sample_alignment(self.genomes, self.compara, self.cache, &group, options).await?
            },
        };
        Ok(sampled)
    }

    async fn sample_with_timeout(&self, gene_id: &str) -> Result<SampledGene, GeneFailure> {
        match self.config.gene_timeout {
            Some(limit) => tokio::time::timeout(limit, self.sample_gene(gene_id))
                .await
                .unwrap_or(Err(GeneFailure::Timeout {
                    seconds: limit.as_secs(),
                })),
            None => self.sample_gene(gene_id).await,
        }
    }

    /// Sample with bounded retries of transient database errors
    async fn sample_with_retry(&self, gene_id: &str) -> Result<SampledGene, GeneFailure> {
        let mut attempt = 0u32;
        loop {
            match self.sample_with_timeout(gene_id).await {
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    let backoff = self.config.retry_backoff * 2u32.saturating_pow(attempt - 1);
                    warn!(
                        gene_id,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                },
                result => return result,
            }
        }
    }

    /// `Ok(None)` when the gene already has output and is skipped
    async fn process_gene(&self, gene_id: String) -> (String, Result<Option<SampledGene>, GeneFailure>) {
        if !self.config.is_dry_run() && !self.config.force_overwrite {
            let path = gene_output_path(&self.config.outdir, &gene_id);
            if path.exists() {
                debug!(gene_id = %gene_id, "Output exists, skipping");
                return (gene_id, Ok(None));
            }
        }

        let result = self.sample_with_retry(&gene_id).await.map(Some);
        (gene_id, result)
    }

    fn write(&self, sampled: &SampledGene) -> Result<PathBuf, GeneFailure> {
        let outdir = &self.config.outdir;
        let path = write_gene_fasta(outdir, &sampled.gene_id, &sampled.records).map_err(|source| {
            GeneFailure::Write {
                path: gene_output_path(outdir, &sampled.gene_id),
                source,
            }
        })?;
        // a FASTA without metadata rows would be skipped by the next run
        if let Err(source) = append_metadata(outdir, &sampled.metadata) {
            if let Err(e) = std::fs::remove_file(&path) {
                warn!(path = %path.display(), error = %e, "Cannot remove FASTA after metadata failure");
            }
            return Err(GeneFailure::Write {
                path: outdir.join(METADATA_FILE),
                source,
            });
        }
        Ok(path)
    }

    /// Drop metadata rows superseded by genes rewritten in this run
    fn compact_metadata(&self) -> Result<(), BatchError> {
        let dropped = compact_metadata(&self.config.outdir).map_err(|source| BatchError::Metadata {
            path: self.config.outdir.join(METADATA_FILE),
            source,
        })?;
        if dropped > 0 {
            info!(dropped, "Replaced metadata of rewritten genes");
        }
        Ok(())
    }

    /// Run over `gene_ids`, reporting each outcome through `on_outcome`
    pub async fn run<F>(&self, mut gene_ids: Vec<String>, mut on_outcome: F) -> Result<BatchReport, BatchError>
    where
        F: FnMut(&str, &GeneOutcome),
    {
        if let Some(limit) = self.config.test_limit {
            gene_ids.truncate(limit);
        } else {
            ensure_outdir(&self.config.outdir)?;
        }

        info!(
            genes = gene_ids.len(),
            reference = %self.reference.name,
            targets = self.targets.len(),
            jobs = self.config.jobs,
            dry_run = self.config.is_dry_run(),
            "Starting batch"
        );

        let mut report = BatchReport::default();
        let mut consecutive_write_failures = 0usize;
        let mut results = stream::iter(gene_ids)
            .map(|gene_id| self.process_gene(gene_id))
            .buffer_unordered(self.config.jobs.max(1));

        while let Some((gene_id, result)) = results.next().await {
            let outcome = match result {
                Ok(None) => GeneOutcome::Skipped,
                Ok(Some(sampled)) if self.config.is_dry_run() => GeneOutcome::Sampled(sampled),
                Ok(Some(sampled)) => match self.write(&sampled) {
                    Ok(path) => {
                        consecutive_write_failures = 0;
                        info!(gene_id = %gene_id, path = %path.display(), "Wrote gene");
                        GeneOutcome::Written(path)
                    },
                    Err(failure) => {
                        consecutive_write_failures += 1;
                        if consecutive_write_failures >= MAX_CONSECUTIVE_WRITE_FAILURES {
                            if report.written > 0 {
                                if let Err(e) = self.compact_metadata() {
                                    warn!(error = %e, "Metadata left uncompacted");
                                }
                            }
                            return Err(BatchError::RepeatedWriteFailures {
                                path: self.config.outdir.clone(),
                                count: consecutive_write_failures,
                                last: failure,
                            });
                        }
                        GeneOutcome::Failed(failure)
                    },
                },
                Err(failure) => GeneOutcome::Failed(failure),
            };

            if let GeneOutcome::Failed(failure) = &outcome {
                warn!(gene_id = %gene_id, kind = failure.kind(), reason = %failure, "Gene failed");
            }

            report.record(&outcome);
            on_outcome(&gene_id, &outcome);
        }

        if report.written > 0 {
            self.compact_metadata()?;
        }

        info!(
            written = report.written,
            skipped = report.skipped,
            sampled = report.sampled,
            failed = report.failed,
            "Batch complete"
        );

        Ok(report)
    }
}

/// Create the output directory once, before any gene is processed
pub fn ensure_outdir(path: &Path) -> Result<(), BatchError> {
    std::fs::create_dir_all(path).map_err(|source| BatchError::OutputDir {
        path: path.to_path_buf(),
        source,
    })
}
