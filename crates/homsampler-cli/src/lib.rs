//! homolog_sampler CLI library
//!
//! Command-line interface for sampling one-to-one orthologs from an Ensembl
//! MySQL host.
//!
//! # Overview
//!
//! - **Sampling**: coding sequences or compara alignments per reference gene
//!   (`homolog_sampler one2one`)
//! - **Catalog**: releases and species on the host (`show_available_species`)
//! - **Alignments**: methods covering a species set (`show_align_methods`)
//! - **Gene lists**: protein-coding genes of one species (`dump_genes`)

pub mod commands;
pub mod error;
pub mod inputs;
pub mod progress;

pub use error::{CliError, Result};

use clap::{Args, Parser, Subcommand, ValueEnum};
use homsampler_core::alignment::{AlignMode, AlignOptions};
use homsampler_core::batch::{BatchConfig, SamplingMode, DEFAULT_TEST_GENES};
use std::path::PathBuf;
use std::time::Duration;

/// Sample one-to-one orthologs from Ensembl
#[derive(Parser, Debug)]
#[command(name = "homolog_sampler")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Ensembl account as 'host user password [port]'
    #[arg(
        long = "ensembl_account",
        env = "ENSEMBL_ACCOUNT",
        hide_env_values = true,
        global = true
    )]
    pub ensembl_account: Option<String>,

    /// Print help as markdown
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write one gzip FASTA file of one-to-one orthologs per reference gene
    #[command(name = "one2one")]
    One2One(One2OneArgs),

    /// List the releases and species available on the host
    #[command(name = "show_available_species")]
    ShowAvailableSpecies {
        /// Only this release
        #[arg(long)]
        release: Option<u32>,

        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// List genomic alignment methods that include all given species
    #[command(name = "show_align_methods")]
    ShowAlignMethods {
        /// Comma separated species names
        #[arg(long, value_delimiter = ',', required = true)]
        species: Vec<String>,

        #[arg(long)]
        release: u32,

        #[arg(long, value_enum, default_value = "table")]
        format: OutputFormat,
    },

    /// Write the protein-coding genes of one species as TSV
    #[command(name = "dump_genes")]
    DumpGenes(DumpGenesArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct One2OneArgs {
    /// Ensembl release
    #[arg(long)]
    pub release: u32,

    /// Reference species, one of --species
    #[arg(long = "ref")]
    pub ref_species: String,

    /// Comma separated species names, output records follow this order
    #[arg(long, value_delimiter = ',', required = true)]
    pub species: Vec<String>,

    /// Directory for <stableid>.fa.gz files, metadata.tsv and the run log
    #[arg(long)]
    pub outdir: PathBuf,

    /// Sample intronic alignment columns instead of coding sequence
    #[arg(long)]
    pub introns: bool,

    /// Compara method_link_species_set id; switches to alignment mode
    #[arg(long = "method_clade_id")]
    pub method_clade_id: Option<i64>,

    /// Also mask repeat features (requires --introns)
    #[arg(long = "mask_features")]
    pub mask_features: bool,

    /// Rewrite existing gene files and the run log
    #[arg(long = "force_overwrite")]
    pub force_overwrite: bool,

    /// Dry run over N genes (2 when N is omitted), printing FASTA instead of writing
    #[arg(long, value_name = "N")]
    pub test: Option<Option<usize>>,

    /// Maximum number of reference genes
    #[arg(long)]
    pub limit: Option<usize>,

    /// CSV/TSV with a 'stableid' column listing the reference genes
    #[arg(long = "ref_genes_file")]
    pub ref_genes_file: Option<PathBuf>,

    /// File of seq region names, one per line, restricting reference genes
    #[arg(long = "coord_names")]
    pub coord_names: Option<PathBuf>,

    /// Genes sampled concurrently
    #[arg(long, default_value_t = 1)]
    pub jobs: usize,

    /// Give up on a gene after this many seconds
    #[arg(long = "gene_timeout")]
    pub gene_timeout: Option<u64>,

    /// Run log file name, written inside --outdir
    #[arg(long = "logfile_name", default_value = "one2one.log")]
    pub logfile_name: String,
}

impl One2OneArgs {
    /// Reject flag combinations before touching credentials or the network
    pub fn validate(&self) -> Result<()> {
        if self.reference_index().is_none() {
            return Err(CliError::invalid_args(format!(
                "--ref '{}' must be one of --species ({})",
                self.ref_species,
                self.species.join(",")
            )));
        }
        if self.introns && self.method_clade_id.is_none() {
            return Err(CliError::invalid_args(
                "--introns requires --method_clade_id",
            ));
        }
        if self.mask_features && !self.introns {
            return Err(CliError::invalid_args("--mask_features requires --introns"));
        }
        if self.jobs == 0 {
            return Err(CliError::invalid_args("--jobs must be at least 1"));
        }
        if self.test_limit() == Some(0) || self.limit == Some(0) {
            return Err(CliError::invalid_args("--test and --limit must be at least 1"));
        }
        Ok(())
    }

    /// Position of --ref in --species, ignoring case
    pub fn reference_index(&self) -> Option<usize> {
        let wanted = self.ref_species.trim().to_lowercase();
        self.species
            .iter()
            .position(|s| s.trim().to_lowercase() == wanted)
    }

    /// Species names with the reference first, the rest in request order
    pub fn ordered_species(&self) -> Vec<String> {
        let mut names: Vec<String> = self.species.iter().map(|s| s.trim().to_string()).collect();
        if let Some(idx) = self.reference_index() {
            let reference = names.remove(idx);
            names.insert(0, reference);
        }
        names
    }

    pub fn sampling_mode(&self) -> SamplingMode {
        match self.method_clade_id {
            None => SamplingMode::Cds,
            Some(method_clade_id) => SamplingMode::Alignment(AlignOptions {
                method_clade_id,
                mode: if self.introns {
                    AlignMode::IntronsOnly
                } else {
                    AlignMode::FullGene
                },
                mask_repeats: self.mask_features,
            }),
        }
    }

    pub fn batch_config(&self) -> BatchConfig {
        BatchConfig {
            force_overwrite: self.force_overwrite,
            test_limit: self.test_limit(),
            jobs: self.jobs,
            gene_timeout: self.gene_timeout.map(Duration::from_secs),
            ..BatchConfig::new(&self.outdir)
        }
    }

    /// Gene limit of a dry run; a bare `--test` samples [`DEFAULT_TEST_GENES`]
    pub fn test_limit(&self) -> Option<usize> {
        self.test.map(|n| n.unwrap_or(DEFAULT_TEST_GENES))
    }

    pub fn is_dry_run(&self) -> bool {
        self.test.is_some()
    }

    pub fn log_path(&self) -> PathBuf {
        self.outdir.join(&self.logfile_name)
    }
}

#[derive(Args, Debug, Clone)]
pub struct DumpGenesArgs {
    /// Species name
    #[arg(long)]
    pub species: String,

    #[arg(long)]
    pub release: u32,

    /// TSV file to write
    #[arg(long)]
    pub outpath: PathBuf,

    /// File of seq region names, one per line
    #[arg(long = "coord_names")]
    pub coord_names: Option<PathBuf>,

    /// Maximum number of genes
    #[arg(long)]
    pub limit: Option<usize>,
}
