//! Canonical coding sequences for an ortholog group

use homsampler_common::seq::{reverse_complement_in_place, trim_to_complete_codons, FastaRecord};

use crate::error::SamplingError;
use crate::homology::OrthologGroup;
use crate::model::{Gene, Species, Strand};
use crate::output::SampledGene;
use crate::store::GenomeStore;

/// Spliced CDS of a gene's canonical transcript, in transcript orientation
pub async fn canonical_cds(
    genomes: &dyn GenomeStore,
    species: &Species,
    gene: &Gene,
) -> Result<Vec<u8>, SamplingError> {
    let transcript = gene
        .canonical_transcript()
        .filter(|t| t.translation.is_some())
        .ok_or_else(|| SamplingError::NoCanonicalTranscript {
            gene_id: gene.stable_id.clone(),
            species: species.common_name.clone(),
        })?;

    let mut cds = Vec::new();
    for segment in transcript.coding_segments() {
        let region = gene.location.region.with_bounds(segment.start, segment.end);
        let mut piece = genomes.region_sequence(species, &region).await?;
        if transcript.strand == Strand::Reverse {
            reverse_complement_in_place(&mut piece);
        }
        cds.extend_from_slice(&piece);
    }

    trim_to_complete_codons(&mut cds);
    if cds.is_empty() {
        return Err(SamplingError::EmptySequence {
            gene_id: gene.stable_id.clone(),
            species: species.common_name.clone(),
        });
    }
    Ok(cds)
}

/// One CDS record per member, reference first
pub async fn sample_cds(
    genomes: &dyn GenomeStore,
    group: &OrthologGroup,
) -> Result<SampledGene, SamplingError> {
    let mut records = Vec::new();
    for (species, gene) in group.members() {
        let cds = canonical_cds(genomes, species, gene).await?;
        records.push(FastaRecord::new(species.common_name.clone(), cds));
    }
    Ok(SampledGene::new(group, records))
}
