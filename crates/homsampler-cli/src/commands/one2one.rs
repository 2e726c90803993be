//! `one2one`: sample one-to-one orthologs for every reference gene
//!
//! Setup failures (arguments, credentials, connection, species) exit non-zero
//! before any gene is processed. Once the batch starts, per-gene failures are
//! counted and summarised and the command still succeeds.

use colored::Colorize;
use homsampler_core::batch::{ensure_outdir, BatchReport, BatchRunner, GeneOutcome};
use homsampler_core::cache::MemoryBlockCache;
use homsampler_core::model::{Species, PROTEIN_CODING};
use homsampler_core::species::fill_taxon_ids;
use homsampler_core::store::GenomeStore;
use std::path::PathBuf;
use tracing::info;

use crate::commands::connect;
use crate::error::{CliError, Result};
use crate::inputs::{read_coord_names, read_ref_genes};
use crate::progress::{create_gene_progress, hidden};
use crate::One2OneArgs;

/// Validate arguments and claim the run log path
///
/// Called before logging is initialised so that the log file can live in the
/// output directory. Dry runs write nothing and get no log file.
pub fn prepare_run_log(args: &One2OneArgs) -> Result<Option<PathBuf>> {
    args.validate()?;
    if args.is_dry_run() {
        return Ok(None);
    }

    ensure_outdir(&args.outdir)?;
    let path = args.log_path();
    if path.exists() {
        if !args.force_overwrite {
            return Err(CliError::LogExists { path });
        }
        std::fs::remove_file(&path)?;
    }
    Ok(Some(path))
}

pub async fn run(account: Option<&str>, args: &One2OneArgs) -> Result<()> {
    args.validate()?;

    let catalog = connect(account, args.jobs).await?;
    let store = catalog.release_store(args.release)?;
    let mut species = catalog
        .resolver
        .resolve(&args.ordered_species(), args.release)?;
    fill_taxon_ids(&store, &mut species).await;

    let Some((reference, targets)) = species.split_first() else {
        return Err(CliError::invalid_args("--species is empty"));
    };

    info!(
        release = args.release,
        reference = %reference.name,
        targets = ?targets.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        mode = ?args.sampling_mode(),
        outdir = %args.outdir.display(),
        "Starting one2one"
    );

    let gene_ids = reference_genes(args, &store, reference).await?;
    if gene_ids.is_empty() {
        println!("No {} reference genes to sample.", reference.common_name);
        store.close().await;
        return Ok(());
    }

    let cache = MemoryBlockCache::default();
    let runner = BatchRunner::new(
        &store,
        &store,
        &cache,
        reference,
        targets,
        args.sampling_mode(),
        args.batch_config(),
    );

    let total = args.test_limit().map_or(gene_ids.len(), |n| n.min(gene_ids.len()));
    let pb = if args.is_dry_run() {
        hidden()
    } else {
        create_gene_progress(total as u64, &format!("Sampling {} genes", reference.common_name))
    };

    let result = runner
        .run(gene_ids, |gene_id, outcome| {
            if let Some(fasta) = outcome.fasta() {
                print!("{}", fasta);
            }
            if let GeneOutcome::Failed(failure) = outcome {
                pb.set_message(format!("{}: {}", gene_id, failure.kind()));
            }
            pb.inc(1);
        })
        .await;
    pb.finish_and_clear();
    store.close().await;

    let report = result?;
    print_summary(args, &report);
    Ok(())
}

/// Reference gene ids from --ref_genes_file, or every protein-coding gene
async fn reference_genes(
    args: &One2OneArgs,
    store: &dyn GenomeStore,
    reference: &Species,
) -> Result<Vec<String>> {
    let limit = match (args.limit, args.test_limit()) {
        (Some(limit), Some(test)) => Some(limit.min(test)),
        (limit, test) => limit.or(test),
    };

    if let Some(path) = &args.ref_genes_file {
        let mut ids = read_ref_genes(path)?;
        if let Some(limit) = limit {
            ids.truncate(limit);
        }
        info!(genes = ids.len(), path = %path.display(), "Read reference genes");
        return Ok(ids);
    }

    let coord_names = args.coord_names.as_deref().map(read_coord_names).transpose()?;
    let genes = store
        .genes_matching(reference, PROTEIN_CODING, coord_names.as_deref(), limit)
        .await?;
    info!(genes = genes.len(), species = %reference.name, "Listed reference genes");
    Ok(genes.into_iter().map(|g| g.stable_id).collect())
}

fn print_summary(args: &One2OneArgs, report: &BatchReport) {
    println!();
    println!("{}", "Summary:".cyan().bold());
    if args.is_dry_run() {
        println!("  Sampled (dry run): {}", report.sampled);
    } else {
        println!(
            "  {} Written: {} to {}",
            "✓".green(),
            report.written,
            args.outdir.display()
        );
        if report.skipped > 0 {
            println!("  Skipped (already present): {}", report.skipped);
        }
    }

    if report.failed > 0 {
        println!("  {} Failed: {}", "✗".red(), report.failed);
        for (kind, count) in &report.failures {
            println!("    {:<28} {}", kind, count);
        }
    }

    if !args.is_dry_run() {
        println!("  Log: {}", args.log_path().display());
    }
}
