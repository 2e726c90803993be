//! `dump_genes`: protein-coding genes of one species as TSV
//!
//! The output has a `stableid` column, so it can be edited and passed back to
//! `one2one --ref_genes_file`.

use colored::Colorize;
use homsampler_core::model::{GeneSummary, PROTEIN_CODING};
use homsampler_core::store::GenomeStore;
use serde::Serialize;
use std::io::Write;

use crate::commands::connect;
use crate::error::Result;
use crate::inputs::read_coord_names;
use crate::DumpGenesArgs;

#[derive(Debug, Serialize)]
struct GeneRow<'a> {
    stableid: &'a str,
    biotype: &'a str,
    location: String,
    description: &'a str,
}

impl<'a> From<&'a GeneSummary> for GeneRow<'a> {
    fn from(gene: &'a GeneSummary) -> Self {
        Self {
            stableid: &gene.stable_id,
            biotype: &gene.biotype,
            location: gene.location.to_string(),
            description: gene.description.as_deref().unwrap_or(""),
        }
    }
}

pub async fn run(account: Option<&str>, args: &DumpGenesArgs) -> Result<()> {
    let coord_names = args.coord_names.as_deref().map(read_coord_names).transpose()?;

    let catalog = connect(account, 1).await?;
    let store = catalog.release_store(args.release)?;
    let species = catalog.resolver.resolve_one(&args.species, args.release)?;

    let genes = store
        .genes_matching(&species, PROTEIN_CODING, coord_names.as_deref(), args.limit)
        .await?;
    store.close().await;

    let file = std::fs::File::create(&args.outpath)?;
    write_genes(file, &genes)?;

    tracing::info!(
        species = %species.name,
        genes = genes.len(),
        path = %args.outpath.display(),
        "Dumped genes"
    );
    println!(
        "{} Wrote {} {} genes to {}",
        "✓".green(),
        genes.len(),
        species.common_name,
        args.outpath.display().to_string().cyan()
    );
    Ok(())
}

fn write_genes<W: Write>(writer: W, genes: &[GeneSummary]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(writer);
    for gene in genes {
        writer.serialize(GeneRow::from(gene))?;
    }
    writer.flush()?;
    Ok(())
}
