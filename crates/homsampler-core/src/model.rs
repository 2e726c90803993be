//! Read-only views of Ensembl core and compara records
//!
//! Coordinates are 1-based and inclusive, as stored by Ensembl.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Biotype eligible for sampling
pub const PROTEIN_CODING: &str = "protein_coding";

/// A species resolved against one release's schema catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Species {
    /// Production name, e.g. `homo_sapiens`
    pub name: String,

    /// Display name used as the FASTA header, e.g. `Human`
    pub common_name: String,

    /// Core schema for the pinned release, e.g. `homo_sapiens_core_81_38`
    pub core_db: String,

    pub taxon_id: Option<u32>,
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.common_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    /// Ensembl stores strand as 1 / -1
    pub fn from_ensembl(value: i64) -> Option<Self> {
        match value {
            1 => Some(Strand::Forward),
            -1 => Some(Strand::Reverse),
            _ => None,
        }
    }

    pub fn as_ensembl(self) -> i64 {
        match self {
            Strand::Forward => 1,
            Strand::Reverse => -1,
        }
    }
}

/// Closed interval on a seq region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Interval {
    pub start: u64,
    pub end: u64,
}

impl Interval {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, pos: u64) -> bool {
        self.start <= pos && pos <= self.end
    }

    pub fn overlaps(&self, other: &Interval) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

/// A span on a named seq region of one coordinate system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GenomicRegion {
    pub coord_system: String,
    pub seq_region: String,
    pub start: u64,
    pub end: u64,
}

impl GenomicRegion {
    pub fn new(
        coord_system: impl Into<String>,
        seq_region: impl Into<String>,
        start: u64,
        end: u64,
    ) -> Self {
        Self {
            coord_system: coord_system.into(),
            seq_region: seq_region.into(),
            start,
            end,
        }
    }

    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }

    pub fn len(&self) -> u64 {
        self.interval().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn same_seq_region(&self, other: &GenomicRegion) -> bool {
        self.coord_system == other.coord_system && self.seq_region == other.seq_region
    }

    /// Same seq region, new bounds
    pub fn with_bounds(&self, start: u64, end: u64) -> Self {
        Self {
            coord_system: self.coord_system.clone(),
            seq_region: self.seq_region.clone(),
            start,
            end,
        }
    }
}

impl fmt::Display for GenomicRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}-{}",
            self.coord_system, self.seq_region, self.start, self.end
        )
    }
}

/// Stranded region
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub region: GenomicRegion,
    pub strand: Strand,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.region, self.strand.as_ensembl())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exon {
    pub start: u64,
    pub end: u64,
}

impl Exon {
    pub fn interval(&self) -> Interval {
        Interval::new(self.start, self.end)
    }
}

/// Coding region of a transcript, as offsets into its start and end exons
///
/// Exon indexes refer to the transcript's rank-ordered exon list; offsets are
/// 1-based and counted in transcript orientation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub start_exon: usize,
    pub seq_start: u64,
    pub end_exon: usize,
    pub seq_end: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    pub stable_id: String,
    pub biotype: String,
    pub strand: Strand,

    /// Exons in rank (transcript) order
    pub exons: Vec<Exon>,

    pub translation: Option<Translation>,
    pub is_canonical: bool,
}

impl Transcript {
    /// Genomic intervals of the coding sequence, in transcript order
    pub fn coding_segments(&self) -> Vec<Interval> {
        let Some(tl) = &self.translation else {
            return Vec::new();
        };

        let mut segments = Vec::new();
        for (idx, exon) in self.exons.iter().enumerate() {
            if idx < tl.start_exon || idx > tl.end_exon {
                continue;
            }

            let (mut start, mut end) = (exon.start, exon.end);
            match self.strand {
                Strand::Forward => {
                    if idx == tl.start_exon {
                        start = exon.start + tl.seq_start - 1;
                    }
                    if idx == tl.end_exon {
                        end = exon.start + tl.seq_end - 1;
                    }
                },
                Strand::Reverse => {
                    if idx == tl.start_exon {
                        end = (exon.end + 1).saturating_sub(tl.seq_start);
                    }
                    if idx == tl.end_exon {
                        start = (exon.end + 1).saturating_sub(tl.seq_end);
                    }
                },
            }

            if start <= end {
                segments.push(Interval::new(start, end));
            }
        }
        segments
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gene {
    pub stable_id: String,

    /// Production name of the owning species
    pub species: String,

    pub biotype: String,
    pub location: Location,
    pub description: Option<String>,
    pub transcripts: Vec<Transcript>,
}

impl Gene {
    pub fn is_protein_coding(&self) -> bool {
        self.biotype == PROTEIN_CODING
    }

    pub fn canonical_transcript(&self) -> Option<&Transcript> {
        self.transcripts.iter().find(|t| t.is_canonical)
    }

    /// Exon intervals from every transcript, unmerged
    pub fn exon_intervals(&self) -> Vec<Interval> {
        self.transcripts
            .iter()
            .flat_map(|t| t.exons.iter().map(Exon::interval))
            .collect()
    }

    /// Coding intervals from every transcript with a translation, unmerged
    pub fn coding_intervals(&self) -> Vec<Interval> {
        self.transcripts
            .iter()
            .flat_map(Transcript::coding_segments)
            .collect()
    }
}

/// Gene listing row, used for reference gene selection and `dump_genes`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneSummary {
    pub stable_id: String,
    pub biotype: String,
    pub location: Location,
    pub description: Option<String>,
}

/// Homology classes as recorded in `homology.description`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HomologyType {
    OrthologOne2One,
    OrthologOne2Many,
    OrthologMany2Many,
    ApparentOrthologOne2One,
    PossibleOrtholog,
    WithinSpeciesParalog,
    OtherParalog,
    BetweenSpeciesParalog,
    GeneSplit,
    Homoeolog,
    AltAllele,
    Unrecognized(String),
}

impl HomologyType {
    pub fn classify(description: &str) -> Self {
        match description.trim() {
            "ortholog_one2one" => HomologyType::OrthologOne2One,
            "ortholog_one2many" => HomologyType::OrthologOne2Many,
            "ortholog_many2many" => HomologyType::OrthologMany2Many,
            "apparent_ortholog_one2one" => HomologyType::ApparentOrthologOne2One,
            "possible_ortholog" => HomologyType::PossibleOrtholog,
            "within_species_paralog" => HomologyType::WithinSpeciesParalog,
            "other_paralog" => HomologyType::OtherParalog,
            "between_species_paralog" => HomologyType::BetweenSpeciesParalog,
            "gene_split" | "putative_gene_split" | "contiguous_gene_split" => {
                HomologyType::GeneSplit
            },
            "homoeolog_one2one" | "homoeolog_one2many" | "homoeolog_many2many" => {
                HomologyType::Homoeolog
            },
            "alt_allele" => HomologyType::AltAllele,
            other => HomologyType::Unrecognized(other.to_string()),
        }
    }

    /// Only strict one-to-one orthology is eligible for sampling
    pub fn is_one_to_one_ortholog(&self) -> bool {
        match self {
            HomologyType::OrthologOne2One => true,
            HomologyType::OrthologOne2Many
            | HomologyType::OrthologMany2Many
            | HomologyType::ApparentOrthologOne2One
            | HomologyType::PossibleOrtholog
            | HomologyType::WithinSpeciesParalog
            | HomologyType::OtherParalog
            | HomologyType::BetweenSpeciesParalog
            | HomologyType::GeneSplit
            | HomologyType::Homoeolog
            | HomologyType::AltAllele
            | HomologyType::Unrecognized(_) => false,
        }
    }
}

/// One homology row linking a reference gene to a gene in a target species
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomologyRecord {
    pub stable_id: String,
    pub description: String,
}

/// One `genomic_align` row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomicAlign {
    /// Production name of the species
    pub species: String,
    pub region: GenomicRegion,
    pub strand: Strand,
    pub cigar_line: String,
}

/// A `genomic_align_block` and all of its rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentBlock {
    pub id: i64,
    pub rows: Vec<GenomicAlign>,
}

/// A `method_link_species_set` that stores genomic alignments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignMethod {
    pub method_clade_id: i64,
    pub method: String,
    pub name: String,
    pub species: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(strand: Strand, exons: &[(u64, u64)], tl: Translation) -> Transcript {
        Transcript {
            stable_id: "ENST1".to_string(),
            biotype: PROTEIN_CODING.to_string(),
            strand,
            exons: exons
                .iter()
                .map(|&(start, end)| Exon { start, end })
                .collect(),
            translation: Some(tl),
            is_canonical: true,
        }
    }

    #[test]
    fn test_coding_segments_forward_strand() {
        let t = transcript(
            Strand::Forward,
            &[(100, 120), (200, 230), (300, 340)],
            Translation {
                start_exon: 0,
                seq_start: 6,
                end_exon: 2,
                seq_end: 10,
            },
        );
        assert_eq!(
            t.coding_segments(),
            vec![
                Interval::new(105, 120),
                Interval::new(200, 230),
                Interval::new(300, 309)
            ]
        );
    }

    #[test]
    fn test_coding_segments_reverse_strand() {
        // rank order runs high to low on the reverse strand
        let t = transcript(
            Strand::Reverse,
            &[(131, 150), (91, 110), (51, 70)],
            Translation {
                start_exon: 0,
                seq_start: 5,
                end_exon: 2,
                seq_end: 16,
            },
        );
        assert_eq!(
            t.coding_segments(),
            vec![
                Interval::new(131, 146),
                Interval::new(91, 110),
                Interval::new(55, 70)
            ]
        );
    }

    #[test]
    fn test_coding_within_single_exon() {
        let t = transcript(
            Strand::Forward,
            &[(10, 60)],
            Translation {
                start_exon: 0,
                seq_start: 3,
                end_exon: 0,
                seq_end: 32,
            },
        );
        assert_eq!(t.coding_segments(), vec![Interval::new(12, 41)]);
    }

    #[test]
    fn test_homology_classification_is_strict() {
        assert!(HomologyType::classify("ortholog_one2one").is_one_to_one_ortholog());
        assert!(!HomologyType::classify("ortholog_one2many").is_one_to_one_ortholog());
        assert!(!HomologyType::classify("apparent_ortholog_one2one").is_one_to_one_ortholog());
        assert_eq!(
            HomologyType::classify("ortholog_weird"),
            HomologyType::Unrecognized("ortholog_weird".to_string())
        );
        assert!(!HomologyType::classify("ortholog_weird").is_one_to_one_ortholog());
    }

    #[test]
    fn test_location_display() {
        let loc = Location {
            region: GenomicRegion::new("chromosome", "17", 43044295, 43125483),
            strand: Strand::Reverse,
        };
        assert_eq!(loc.to_string(), "chromosome:17:43044295-43125483:-1");
    }
}
