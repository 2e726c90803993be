//! One-to-one ortholog resolution
//!
//! A group is all-or-nothing: every target species must contribute exactly
//! one `ortholog_one2one` gene, or the reference gene is rejected.

use crate::error::ResolutionError;
use crate::model::{Gene, HomologyType, Species};
use crate::store::{ComparaStore, GenomeStore};

/// Reference gene plus exactly one ortholog per target species
#[derive(Debug, Clone)]
pub struct OrthologGroup {
    pub reference: (Species, Gene),
    pub orthologs: Vec<(Species, Gene)>,
}

impl OrthologGroup {
    pub fn reference_gene(&self) -> &Gene {
        &self.reference.1
    }

    pub fn reference_species(&self) -> &Species {
        &self.reference.0
    }

    /// Reference first, then targets in request order
    pub fn members(&self) -> impl Iterator<Item = (&Species, &Gene)> {
        std::iter::once((&self.reference.0, &self.reference.1))
            .chain(self.orthologs.iter().map(|(s, g)| (s, g)))
    }
}

async fn load_gene(
    genomes: &dyn GenomeStore,
    species: &Species,
    gene_id: &str,
) -> Result<Gene, ResolutionError> {
    genomes
        .gene(species, gene_id)
        .await?
        .ok_or_else(|| ResolutionError::GeneNotFound {
            species: species.common_name.clone(),
            gene_id: gene_id.to_string(),
        })
}

/// Stable id of the single one-to-one ortholog of `gene_id` in `target`
pub async fn one2one_ortholog(
    compara: &dyn ComparaStore,
    gene_id: &str,
    target: &Species,
) -> Result<String, ResolutionError> {
    let records = compara.homologies(gene_id, target).await?;

    let mut eligible: Vec<String> = records
        .into_iter()
        .filter(|r| HomologyType::classify(&r.description).is_one_to_one_ortholog())
        .map(|r| r.stable_id)
        .collect();

    match eligible.len() {
        0 => Err(ResolutionError::NoOrtholog {
            gene_id: gene_id.to_string(),
            species: target.common_name.clone(),
        }),
        1 => Ok(eligible.remove(0)),
        count => Err(ResolutionError::DuplicateOrtholog {
            gene_id: gene_id.to_string(),
            species: target.common_name.clone(),
            count,
        }),
    }
}

pub async fn resolve_orthologs(
    genomes: &dyn GenomeStore,
    compara: &dyn ComparaStore,
    reference: &Species,
    targets: &[Species],
    gene_id: &str,
) -> Result<OrthologGroup, ResolutionError> {
    let ref_gene = load_gene(genomes, reference, gene_id).await?;
    if !ref_gene.is_protein_coding() {
        return Err(ResolutionError::NotProteinCoding {
            gene_id: gene_id.to_string(),
            biotype: ref_gene.biotype,
        });
    }

    // Check every target before loading any ortholog gene
    let mut ortholog_ids = Vec::with_capacity(targets.len());
    for target in targets {
        ortholog_ids.push(one2one_ortholog(compara, gene_id, target).await?);
    }

    let mut orthologs = Vec::with_capacity(targets.len());
    for (target, ortholog_id) in targets.iter().zip(ortholog_ids) {
        let gene = load_gene(genomes, target, &ortholog_id).await?;
        orthologs.push((target.clone(), gene));
    }

    tracing::debug!(gene_id, orthologs = orthologs.len(), "Resolved ortholog group");

    Ok(OrthologGroup {
        reference: (reference.clone(), ref_gene),
        orthologs,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::fixtures::{self, Fixture};

    #[tokio::test]
    async fn test_group_has_one_ortholog_per_target() {
        let fx = Fixture::new();
        let group = resolve_orthologs(&fx, &fx, &fx.human, &fx.targets(), fixtures::HUMAN_GENE)
            .await
            .unwrap();

        let ids: Vec<_> = group.members().map(|(_, g)| g.stable_id.as_str()).collect();
        assert_eq!(ids, [fixtures::HUMAN_GENE, fixtures::MOUSE_GENE, fixtures::OPOSSUM_GENE]);
        assert_eq!(group.orthologs.len(), 2);
        assert_eq!(group.reference_species().common_name, "Human");
    }

    #[tokio::test]
    async fn test_one2many_target_rejects_group() {
        let fx = Fixture::new();
        let err = resolve_orthologs(&fx, &fx, &fx.human, &fx.targets(), fixtures::BRCA2)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ResolutionError::NoOrtholog { ref species, .. } if species == "Opossum"
        ));
    }

    #[tokio::test]
    async fn test_duplicate_one2one_rows_are_an_error() {
        let fx = Fixture::new();
        let err = resolve_orthologs(&fx, &fx, &fx.human, &fx.targets(), fixtures::DUPLICATED_GENE)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::DuplicateOrtholog { count: 2, .. }));
    }

    #[tokio::test]
    async fn test_unknown_and_non_coding_reference() {
        let fx = Fixture::new();
        let err = resolve_orthologs(&fx, &fx, &fx.human, &fx.targets(), "ENSG99999999999")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::GeneNotFound { .. }));

        let err = resolve_orthologs(&fx, &fx, &fx.human, &fx.targets(), fixtures::LNCRNA_GENE)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolutionError::NotProteinCoding { .. }));
    }
}
