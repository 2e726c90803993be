//! Per-gene output: gzip FASTA files and the run's `metadata.tsv`

use flate2::write::GzEncoder;
use flate2::Compression;
use homsampler_common::seq::{FastaRecord, FASTA_LINE_WIDTH};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::homology::OrthologGroup;

pub const METADATA_FILE: &str = "metadata.tsv";

/// One line of `metadata.tsv`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRow {
    pub refid: String,
    pub species: String,
    pub stableid: String,
    pub location: String,
    pub description: String,
}

/// Sequences and metadata sampled for one reference gene
#[derive(Debug, Clone)]
pub struct SampledGene {
    pub gene_id: String,
    pub records: Vec<FastaRecord>,
    pub metadata: Vec<MetadataRow>,
}

impl SampledGene {
    /// Pair records (member order) with metadata rows for every group member
    pub fn new(group: &OrthologGroup, records: Vec<FastaRecord>) -> Self {
        let refid = group.reference_gene().stable_id.clone();
        let metadata = group
            .members()
            .map(|(species, gene)| MetadataRow {
                refid: refid.clone(),
                species: species.common_name.clone(),
                stableid: gene.stable_id.clone(),
                location: gene.location.to_string(),
                description: gene.description.clone().unwrap_or_default(),
            })
            .collect();
        Self {
            gene_id: refid,
            records,
            metadata,
        }
    }
}

/// `<outdir>/<gene_id>.fa.gz`
pub fn gene_output_path(outdir: &Path, gene_id: &str) -> PathBuf {
    outdir.join(format!("{}.fa.gz", gene_id))
}

/// Write records as gzip FASTA; the final name only appears once complete
pub fn write_gene_fasta(outdir: &Path, gene_id: &str, records: &[FastaRecord]) -> io::Result<PathBuf> {
    let path = gene_output_path(outdir, gene_id);
    let tmp = NamedTempFile::new_in(outdir)?;

    let mut encoder = GzEncoder::new(tmp, Compression::default());
    for record in records {
        encoder.write_all(record.to_fasta(FASTA_LINE_WIDTH).as_bytes())?;
    }
    let tmp = encoder.finish()?;
    tmp.as_file().sync_all()?;
    tmp.persist(&path).map_err(|e| e.error)?;

    Ok(path)
}

/// Append rows to `<outdir>/metadata.tsv`, writing the header for a new file
pub fn append_metadata(outdir: &Path, rows: &[MetadataRow]) -> io::Result<()> {
    let path = outdir.join(METADATA_FILE);
    let is_new = !path.exists() || path.metadata()?.len() == 0;

    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(is_new)
        .from_writer(file);

    for row in rows {
        writer.serialize(row).map_err(io::Error::other)?;
    }
    writer.flush()?;
    Ok(())
}

/// Keep only the newest block of rows for each reference gene
///
/// A block starts at the reference's own row, so a gene written again by a
/// forced run supersedes its earlier rows. The file is replaced atomically.
/// Returns the number of rows dropped.
pub fn compact_metadata(outdir: &Path) -> io::Result<usize> {
    let path = outdir.join(METADATA_FILE);
    if !path.exists() {
        return Ok(0);
    }

    let rows: Vec<MetadataRow> = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(&path)
        .map_err(io::Error::other)?
        .deserialize()
        .collect::<Result<_, _>>()
        .map_err(io::Error::other)?;

    let mut block_starts = Vec::with_capacity(rows.len());
    let mut newest: HashMap<&str, usize> = HashMap::new();
    for (i, row) in rows.iter().enumerate() {
        let starts_block = i == 0 || row.stableid == row.refid || rows[i - 1].refid != row.refid;
        let start = if starts_block { i } else { block_starts[i - 1] };
        block_starts.push(start);
        newest.insert(row.refid.as_str(), start);
    }

    let kept: Vec<&MetadataRow> = rows
        .iter()
        .zip(&block_starts)
        .filter(|(row, start)| newest.get(row.refid.as_str()) == Some(*start))
        .map(|(row, _)| row)
        .collect();
    let dropped = rows.len() - kept.len();
    if dropped == 0 {
        return Ok(0);
    }

    let tmp = NamedTempFile::new_in(outdir)?;
    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(tmp.as_file());
        for row in kept {
            writer.serialize(row).map_err(io::Error::other)?;
        }
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(&path).map_err(|e| e.error)?;

    Ok(dropped)
}
