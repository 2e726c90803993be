//! In-memory Ensembl slice for tests
//!
//! Human, mouse and opossum with a handful of genes, synthetic chromosome
//! sequence and two EPO alignment blocks over the human gene
//! ENSG00000012048 (chr17:51-150, reverse strand).

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use homsampler_common::seq::UNKNOWN_BASE;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{StoreError, StoreResult};
use crate::model::{
    AlignMethod, AlignmentBlock, Exon, Gene, GeneSummary, GenomicAlign, GenomicRegion,
    HomologyRecord, Interval, Location, Species, Strand, Transcript, Translation, PROTEIN_CODING,
};
use crate::store::{ComparaStore, GenomeStore};

pub const HUMAN_GENE: &str = "ENSG00000012048";
pub const MOUSE_GENE: &str = "ENSMUSG00000017146";
pub const OPOSSUM_GENE: &str = "ENSMODG00000001745";
/// Has a one-to-many ortholog in opossum
pub const BRCA2: &str = "ENSG00000139618";
/// Has two one-to-one rows for mouse
pub const DUPLICATED_GENE: &str = "ENSG00000141510";
pub const LNCRNA_GENE: &str = "ENSG00000228630";

pub const EPO_METHOD: i64 = 788;

const HUMAN: &str = "homo_sapiens";
const MOUSE: &str = "mus_musculus";
const OPOSSUM: &str = "monodelphis_domestica";

fn species(name: &str, common: &str, core_db: &str, taxon: u32) -> Species {
    Species {
        name: name.to_string(),
        common_name: common.to_string(),
        core_db: core_db.to_string(),
        taxon_id: Some(taxon),
    }
}

/// Deterministic pseudo-random ACGT
fn synthetic_sequence(seed: u64, len: usize) -> Vec<u8> {
    let mut state = seed;
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            b"ACGT"[(state >> 62) as usize]
        })
        .collect()
}

fn chrom(name: &str, start: u64, end: u64) -> GenomicRegion {
    GenomicRegion::new("chromosome", name, start, end)
}

fn gene(
    stable_id: &str,
    species: &str,
    biotype: &str,
    region: GenomicRegion,
    strand: Strand,
    exons: &[(u64, u64)],
    translation: Option<Translation>,
) -> Gene {
    Gene {
        stable_id: stable_id.to_string(),
        species: species.to_string(),
        biotype: biotype.to_string(),
        location: Location { region, strand },
        description: Some(format!("{} test gene", stable_id)),
        transcripts: vec![Transcript {
            stable_id: stable_id.replace('G', "T"),
            biotype: biotype.to_string(),
            strand,
            exons: exons.iter().map(|&(start, end)| Exon { start, end }).collect(),
            translation,
            is_canonical: true,
        }],
    }
}

fn align(species: &str, region: GenomicRegion, strand: Strand, cigar: &str) -> GenomicAlign {
    GenomicAlign {
        species: species.to_string(),
        region,
        strand,
        cigar_line: cigar.to_string(),
    }
}

fn homology(stable_id: &str, description: &str) -> HomologyRecord {
    HomologyRecord {
        stable_id: stable_id.to_string(),
        description: description.to_string(),
    }
}

pub struct Fixture {
    pub human: Species,
    pub mouse: Species,
    pub opossum: Species,
    genes: HashMap<(String, String), Gene>,
    chromosomes: HashMap<(String, String), Vec<u8>>,
    homologies: HashMap<(String, String), Vec<HomologyRecord>>,
    blocks: Vec<AlignmentBlock>,
    repeats: HashMap<String, Vec<Interval>>,
    transient_failures: AtomicUsize,
    delay: Option<Duration>,
}

impl Fixture {
    pub fn new() -> Self {
        let human = species(HUMAN, "Human", "homo_sapiens_core_81_38", 9606);
        let mouse = species(MOUSE, "Mouse", "mus_musculus_core_81_38", 10090);
        let opossum = species(OPOSSUM, "Opossum", "monodelphis_domestica_core_81_5", 13616);

        let coding = |start_exon, seq_start, end_exon, seq_end| {
            Some(Translation {
                start_exon,
                seq_start,
                end_exon,
                seq_end,
            })
        };

        let genes = vec![
            gene(
                HUMAN_GENE,
                HUMAN,
                PROTEIN_CODING,
                chrom("17", 51, 150),
                Strand::Reverse,
                &[(131, 150), (91, 110), (51, 70)],
                coding(0, 5, 2, 16),
            ),
            gene(
                DUPLICATED_GENE,
                HUMAN,
                PROTEIN_CODING,
                chrom("17", 201, 260),
                Strand::Forward,
                &[(201, 260)],
                coding(0, 1, 0, 60),
            ),
            gene(
                LNCRNA_GENE,
                HUMAN,
                "lncRNA",
                chrom("17", 270, 290),
                Strand::Forward,
                &[(270, 290)],
                None,
            ),
            gene(
                BRCA2,
                HUMAN,
                PROTEIN_CODING,
                chrom("13", 1001, 1100),
                Strand::Forward,
                &[(1001, 1030), (1071, 1100)],
                coding(0, 1, 1, 30),
            ),
            gene(
                MOUSE_GENE,
                MOUSE,
                PROTEIN_CODING,
                chrom("11", 1001, 1130),
                Strand::Forward,
                &[(1001, 1010), (1120, 1130)],
                coding(0, 1, 1, 11),
            ),
            gene(
                OPOSSUM_GENE,
                OPOSSUM,
                PROTEIN_CODING,
                chrom("2", 501, 560),
                Strand::Forward,
                &[(501, 505), (556, 560)],
                coding(0, 1, 1, 5),
            ),
        ];

        let chromosomes = [
            ((HUMAN, "17"), synthetic_sequence(17, 300)),
            ((HUMAN, "13"), synthetic_sequence(13, 1200)),
            ((MOUSE, "11"), synthetic_sequence(11, 1200)),
            ((OPOSSUM, "2"), synthetic_sequence(2, 600)),
        ]
        .into_iter()
        .map(|((sp, name), seq)| ((sp.to_string(), name.to_string()), seq))
        .collect();

        let homologies = [
            (
                (HUMAN_GENE, MOUSE),
                vec![
                    homology(MOUSE_GENE, "ortholog_one2one"),
                    homology("ENSMUSG00000099999", "between_species_paralog"),
                ],
            ),
            ((HUMAN_GENE, OPOSSUM), vec![homology(OPOSSUM_GENE, "ortholog_one2one")]),
            ((BRCA2, MOUSE), vec![homology("ENSMUSG00000041147", "ortholog_one2one")]),
            (
                (BRCA2, OPOSSUM),
                vec![
                    homology("ENSMODG00000012001", "ortholog_one2many"),
                    homology("ENSMODG00000012002", "ortholog_one2many"),
                ],
            ),
            (
                (DUPLICATED_GENE, MOUSE),
                vec![
                    homology("ENSMUSG00000059552", "ortholog_one2one"),
                    homology("ENSMUSG00000059553", "ortholog_one2one"),
                ],
            ),
            ((DUPLICATED_GENE, OPOSSUM), vec![homology("ENSMODG00000019001", "ortholog_one2one")]),
        ]
        .into_iter()
        .map(|((g, sp), rows)| ((g.to_string(), sp.to_string()), rows))
        .collect();

        let blocks = vec![
            AlignmentBlock {
                id: 1,
                rows: vec![
                    align(HUMAN, chrom("17", 41, 100), Strand::Forward, "60M"),
                    align(MOUSE, chrom("11", 1001, 1060), Strand::Forward, "60M"),
                    align(OPOSSUM, chrom("2", 501, 560), Strand::Reverse, "60M"),
                    align("rattus_norvegicus", chrom("10", 2001, 2060), Strand::Forward, "60M"),
                ],
            },
            AlignmentBlock {
                id: 2,
                rows: vec![
                    align(HUMAN, chrom("17", 95, 160), Strand::Forward, "30M2D36M"),
                    align(MOUSE, chrom("11", 1061, 1128), Strand::Forward, "68M"),
                ],
            },
        ];

        Self {
            human,
            mouse,
            opossum,
            genes: genes
                .into_iter()
                .map(|g| ((g.species.clone(), g.stable_id.clone()), g))
                .collect(),
            chromosomes,
            homologies,
            blocks,
            repeats: HashMap::new(),
            transient_failures: AtomicUsize::new(0),
            delay: None,
        }
    }

    pub fn targets(&self) -> Vec<Species> {
        vec![self.mouse.clone(), self.opossum.clone()]
    }

    pub fn gene_of(&self, species: &Species, stable_id: &str) -> Gene {
        self.genes[&(species.name.clone(), stable_id.to_string())].clone()
    }

    /// Whole chromosome of the species' first fixture gene
    pub fn chromosome(&self, species: &Species) -> &[u8] {
        let name = match species.name.as_str() {
            HUMAN => "17",
            MOUSE => "11",
            _ => "2",
        };
        &self.chromosomes[&(species.name.clone(), name.to_string())]
    }

    pub fn with_repeat(mut self, species: &str, interval: Interval) -> Self {
        self.repeats
            .entry(species.to_string())
            .or_default()
            .push(interval);
        self
    }

    /// The next `n` gene lookups fail with a pool timeout
    pub fn with_transient_failures(self, n: usize) -> Self {
        self.transient_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Every gene lookup sleeps first
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn take_failure(&self) -> bool {
        self.transient_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl GenomeStore for Fixture {
    async fn gene(&self, species: &Species, stable_id: &str) -> StoreResult<Option<Gene>> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.take_failure() {
            return Err(StoreError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        Ok(self
            .genes
            .get(&(species.name.clone(), stable_id.to_string()))
            .cloned())
    }

    async fn region_sequence(&self, species: &Species, region: &GenomicRegion) -> StoreResult<Vec<u8>> {
        let chrom = self
            .chromosomes
            .get(&(species.name.clone(), region.seq_region.clone()))
            .ok_or_else(|| StoreError::inconsistent(format!("no sequence for {}", region)))?;
        Ok((region.start..=region.end)
            .map(|pos| {
                pos.checked_sub(1)
                    .and_then(|i| chrom.get(i as usize))
                    .copied()
                    .unwrap_or(UNKNOWN_BASE)
            })
            .collect())
    }

    async fn repeat_intervals(&self, species: &Species, region: &GenomicRegion) -> StoreResult<Vec<Interval>> {
        Ok(self
            .repeats
            .get(&species.name)
            .map(|rs| {
                rs.iter()
                    .filter(|r| r.overlaps(&region.interval()))
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn genes_matching(
        &self,
        species: &Species,
        biotype: &str,
        seq_regions: Option<&[String]>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<GeneSummary>> {
        let mut genes: Vec<&Gene> = self
            .genes
            .values()
            .filter(|g| g.species == species.name && g.biotype == biotype)
            .filter(|g| seq_regions.map_or(true, |names| names.contains(&g.location.region.seq_region)))
            .collect();
        genes.sort_by(|a, b| a.stable_id.cmp(&b.stable_id));
        genes.truncate(limit.unwrap_or(usize::MAX));

        Ok(genes
            .into_iter()
            .map(|g| GeneSummary {
                stable_id: g.stable_id.clone(),
                biotype: g.biotype.clone(),
                location: g.location.clone(),
                description: g.description.clone(),
            })
            .collect())
    }

    async fn taxon_id(&self, _core_db: &str) -> StoreResult<Option<u32>> {
        Ok(None)
    }
}

#[async_trait]
impl ComparaStore for Fixture {
    async fn homologies(&self, gene_stable_id: &str, target: &Species) -> StoreResult<Vec<HomologyRecord>> {
        Ok(self
            .homologies
            .get(&(gene_stable_id.to_string(), target.name.clone()))
            .cloned()
            .unwrap_or_default())
    }

    async fn alignment_blocks(
        &self,
        method_clade_id: i64,
        reference: &Species,
        region: &GenomicRegion,
    ) -> StoreResult<Vec<AlignmentBlock>> {
        if method_clade_id != EPO_METHOD {
            return Ok(Vec::new());
        }
        Ok(self
            .blocks
            .iter()
            .filter(|b| {
                b.rows.iter().any(|ga| {
                    ga.species == reference.name
                        && ga.region.same_seq_region(region)
                        && ga.region.interval().overlaps(&region.interval())
                })
            })
            .cloned()
            .collect())
    }

    async fn align_methods(&self, species: &[Species]) -> StoreResult<Vec<AlignMethod>> {
        let method = AlignMethod {
            method_clade_id: EPO_METHOD,
            method: "EPO".to_string(),
            name: "mammals EPO".to_string(),
            species: vec![HUMAN.to_string(), MOUSE.to_string(), OPOSSUM.to_string()],
        };
        let covered = species.iter().all(|s| method.species.contains(&s.name));
        Ok(if covered { vec![method] } else { Vec::new() })
    }
}
