//! Whole-gene multiple alignments from compara genomic align blocks
//!
//! Blocks overlapping the reference gene are expanded into per-species rows,
//! oriented so the reference runs forward, trimmed to the gene span and
//! stitched in reference order. Each column carries, per row, the genomic
//! position of its base on that member gene's seq region (`None` for gaps,
//! fillers and bases from other seq regions); masks are decided from those
//! positions.

pub mod cigar;

use homsampler_common::seq::{reverse_complement_in_place, FastaRecord, GAP_CHAR, UNKNOWN_BASE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use self::cigar::{parse_cigar, CigarOp};
use crate::cache::BlockCache;
use crate::error::{SamplingError, StoreResult};
use crate::homology::OrthologGroup;
use crate::mask::{apply_mask, coding_columns, intronic_columns, IntervalSet, IntronMask};
use crate::model::{AlignmentBlock, Gene, GenomicAlign, GenomicRegion, Interval, Species, Strand};
use crate::output::SampledGene;
use crate::store::{ComparaStore, GenomeStore};

/// Which columns survive masking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignMode {
    /// Coding columns of the reference gene
    FullGene,
    /// Columns intronic in every species
    IntronsOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlignOptions {
    pub method_clade_id: i64,
    pub mode: AlignMode,
    /// Also mask repeat features (intron mode)
    pub mask_repeats: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignedRow {
    /// Production name
    pub species: String,
    pub seq: Vec<u8>,
    pub coords: Vec<Option<u64>>,
}

impl AlignedRow {
    fn gaps(species: &str, width: usize) -> Self {
        Self {
            species: species.to_string(),
            seq: vec![GAP_CHAR; width],
            coords: vec![None; width],
        }
    }

    fn reverse_complement(&mut self) {
        reverse_complement_in_place(&mut self.seq);
        self.coords.reverse();
    }

    fn keep_columns(&mut self, from: usize, to: usize) {
        self.seq.truncate(to);
        self.seq.drain(..from);
        self.coords.truncate(to);
        self.coords.drain(..from);
    }
}

/// Rows in ortholog group member order, reference first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    pub rows: Vec<AlignedRow>,
}

impl Alignment {
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, |r| r.seq.len())
    }

    pub fn reverse_complement(&mut self) {
        for row in &mut self.rows {
            row.reverse_complement();
        }
    }

    fn reference_coords(&self) -> &[Option<u64>] {
        self.rows.first().map(|r| r.coords.as_slice()).unwrap_or_default()
    }

    fn push_filler(&mut self) {
        for row in &mut self.rows {
            row.seq.push(UNKNOWN_BASE);
            row.coords.push(None);
        }
    }

    fn append(&mut self, other: Alignment) {
        for (row, extra) in self.rows.iter_mut().zip(other.rows) {
            row.seq.extend(extra.seq);
            row.coords.extend(extra.coords);
        }
    }
}

/// A block trimmed to the gene span, with its reference extent
#[derive(Debug)]
struct TrimmedBlock {
    id: i64,
    first_ref: u64,
    last_ref: u64,
    columns: Alignment,
}

fn stitch_error(block_id: i64, reason: impl Into<String>) -> SamplingError {
    SamplingError::BlockStitch {
        block_id,
        reason: reason.into(),
    }
}

/// Blocks for a method over a reference region, through the cache
pub async fn fetch_blocks(
    compara: &dyn ComparaStore,
    cache: &dyn BlockCache,
    method_clade_id: i64,
    reference: &Species,
    region: &GenomicRegion,
) -> StoreResult<Arc<Vec<AlignmentBlock>>> {
    let key = (method_clade_id, region.clone());
    if let Some(blocks) = cache.get(&key) {
        tracing::trace!(region = %region, "Block cache hit");
        return Ok(blocks);
    }

    let blocks = Arc::new(
        compara
            .alignment_blocks(method_clade_id, reference, region)
            .await?,
    );
    cache.insert(key, Arc::clone(&blocks));
    Ok(blocks)
}

/// Expand one genomic align row into columns
async fn expand_row(
    genomes: &dyn GenomeStore,
    species: &Species,
    gene: &Gene,
    block_id: i64,
    ga: &GenomicAlign,
) -> Result<AlignedRow, SamplingError> {
    let ops = parse_cigar(&ga.cigar_line).map_err(|e| stitch_error(block_id, e.to_string()))?;

    let mut bases = genomes.region_sequence(species, &ga.region).await?;
    if ga.strand == Strand::Reverse {
        reverse_complement_in_place(&mut bases);
    }
    let on_gene_region = ga.region.same_seq_region(&gene.location.region);

    let width = cigar::aligned_width(&ops);
    let mut seq = Vec::with_capacity(width);
    let mut coords = Vec::with_capacity(width);
    let mut offset = 0usize;

    for op in ops {
        match op {
            CigarOp::Match(n) => {
                let piece = bases.get(offset..offset + n).ok_or_else(|| {
                    stitch_error(
                        block_id,
                        format!(
                            "CIGAR of {} row needs more than its {} bases",
                            species.name,
                            bases.len()
                        ),
                    )
                })?;
                seq.extend_from_slice(piece);
                coords.extend((offset..offset + n).map(|i| {
                    on_gene_region.then(|| match ga.strand {
                        Strand::Forward => ga.region.start + i as u64,
                        Strand::Reverse => ga.region.end - i as u64,
                    })
                }));
                offset += n;
            },
            CigarOp::Gap(n) => {
                seq.extend(std::iter::repeat(GAP_CHAR).take(n));
                coords.extend(std::iter::repeat(None).take(n));
            },
            CigarOp::Skip(n) => offset += n,
        }
    }

    Ok(AlignedRow {
        species: species.name.clone(),
        seq,
        coords,
    })
}

/// Expand, orient and trim one block; `None` when it has nothing to offer
async fn trim_block(
    genomes: &dyn GenomeStore,
    group: &OrthologGroup,
    block: &AlignmentBlock,
    span: Interval,
) -> Result<Option<TrimmedBlock>, SamplingError> {
    let mut member_rows = Vec::new();
    for (species, gene) in group.members() {
        let mut matching = block.rows.iter().filter(|ga| ga.species == species.name);
        let (first, extra) = (matching.next(), matching.next());
        if extra.is_some() {
            tracing::debug!(block_id = block.id, species = %species.name, "Skipping block with duplicated species");
            return Ok(None);
        }
        member_rows.push((species, gene, first));
    }

    let Some((_, _, Some(_))) = member_rows.first() else {
        return Ok(None);
    };

    let mut rows: Vec<Option<AlignedRow>> = Vec::with_capacity(member_rows.len());
    let mut width: Option<usize> = None;
    for (species, gene, ga) in &member_rows {
        let Some(ga) = ga else {
            rows.push(None);
            continue;
        };
        let row = expand_row(genomes, species, gene, block.id, ga).await?;
        match width {
            Some(w) if w != row.seq.len() => {
                return Err(stitch_error(
                    block.id,
                    format!("{} row is {} columns wide, expected {}", species.name, row.seq.len(), w),
                ));
            },
            _ => width = Some(row.seq.len()),
        }
        rows.push(Some(row));
    }

    let width = width.unwrap_or(0);
    let mut columns = Alignment {
        rows: rows
            .into_iter()
            .zip(&member_rows)
            .map(|(row, (species, _, _))| row.unwrap_or_else(|| AlignedRow::gaps(&species.name, width)))
            .collect(),
    };

    // reference row must run forward
    if member_rows[0].2.is_some_and(|ga| ga.strand == Strand::Reverse) {
        columns.reverse_complement();
    }

    let reference = columns.reference_coords();
    let first = reference
        .iter()
        .position(|c| c.is_some_and(|p| p >= span.start));
    let last = reference
        .iter()
        .rposition(|c| c.is_some_and(|p| p <= span.end));
    let (Some(first), Some(last)) = (first, last) else {
        return Ok(None);
    };
    if first > last {
        return Ok(None);
    }

    for row in &mut columns.rows {
        row.keep_columns(first, last + 1);
    }
    let reference = columns.reference_coords();
    let (Some(Some(first_ref)), Some(Some(last_ref))) = (reference.first(), reference.last()) else {
        return Ok(None);
    };
    let (first_ref, last_ref) = (*first_ref, *last_ref);

    Ok(Some(TrimmedBlock {
        id: block.id,
        first_ref,
        last_ref,
        columns,
    }))
}

/// Join trimmed blocks in reference order with one `N` column between them
fn stitch(mut blocks: Vec<TrimmedBlock>) -> Option<Alignment> {
    blocks.sort_by_key(|b| (b.first_ref, b.id));

    let mut stitched: Option<Alignment> = None;
    let mut prev_end = 0u64;

    for mut block in blocks {
        if stitched.is_some() {
            if block.last_ref <= prev_end {
                tracing::trace!(block_id = block.id, "Block fully overlapped, dropped");
                continue;
            }
            if block.first_ref <= prev_end {
                let cut = block
                    .columns
                    .reference_coords()
                    .iter()
                    .rposition(|c| c.is_some_and(|p| p <= prev_end))
                    .map_or(0, |i| i + 1);
                let width = block.columns.width();
                for row in &mut block.columns.rows {
                    row.keep_columns(cut, width);
                }
            }
        }

        prev_end = prev_end.max(block.last_ref);
        match stitched.as_mut() {
            Some(alignment) => {
                alignment.push_filler();
                alignment.append(block.columns);
            },
            None => stitched = Some(block.columns),
        }
    }

    stitched
}

/// Unmasked alignment over the reference gene span, reference forward
pub async fn stitched_alignment(
    genomes: &dyn GenomeStore,
    compara: &dyn ComparaStore,
    cache: &dyn BlockCache,
    group: &OrthologGroup,
    method_clade_id: i64,
) -> Result<Alignment, SamplingError> {
    let ref_gene = group.reference_gene();
    let region = &ref_gene.location.region;
    let blocks = fetch_blocks(compara, cache, method_clade_id, group.reference_species(), region).await?;

    let mut trimmed = Vec::with_capacity(blocks.len());
    for block in blocks.iter() {
        if let Some(t) = trim_block(genomes, group, block, region.interval()).await? {
            trimmed.push(t);
        }
    }

    tracing::debug!(
        gene_id = %ref_gene.stable_id,
        blocks = blocks.len(),
        usable = trimmed.len(),
        "Stitching alignment blocks"
    );

    stitch(trimmed).ok_or_else(|| SamplingError::NoAlignmentCoverage {
        gene_id: ref_gene.stable_id.clone(),
        method_clade_id,
    })
}

/// Masked whole-gene alignment, one record per member
pub async fn sample_alignment(
    genomes: &dyn GenomeStore,
    compara: &dyn ComparaStore,
    cache: &dyn BlockCache,
    group: &OrthologGroup,
    options: AlignOptions,
) -> Result<SampledGene, SamplingError> {
    let mut alignment =
        stitched_alignment(genomes, compara, cache, group, options.method_clade_id).await?;
    let ref_gene = group.reference_gene();

    let visible = match options.mode {
        AlignMode::FullGene => {
            coding_columns(&alignment, &IntervalSet::new(ref_gene.coding_intervals()))
        },
        AlignMode::IntronsOnly => {
            let mut masks = Vec::new();
            for (species, gene) in group.members() {
                let mut mask = IntronMask::for_gene(gene);
                if options.mask_repeats {
                    let repeats = genomes
                        .repeat_intervals(species, &gene.location.region)
                        .await?;
                    mask = mask.with_repeats(repeats);
                }
                masks.push(mask);
            }
            intronic_columns(&alignment, &masks)
        },
    };
    apply_mask(&mut alignment, &visible);

    if ref_gene.location.strand == Strand::Reverse {
        alignment.reverse_complement();
    }

    tracing::debug!(
        gene_id = %ref_gene.stable_id,
        width = alignment.width(),
        visible = visible.iter().filter(|v| **v).count(),
        "Sampled alignment"
    );

    let records = group
        .members()
        .zip(alignment.rows)
        .map(|((species, _), row)| FastaRecord::new(species.common_name.clone(), row.seq))
        .collect();
    Ok(SampledGene::new(group, records))
}
