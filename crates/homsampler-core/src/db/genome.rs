//! Core schema reads: gene models, genomic DNA, repeats

use async_trait::async_trait;
use homsampler_common::seq::{reverse_complement, UNKNOWN_BASE};
use sqlx::{FromRow, MySql, QueryBuilder, Row};
use std::collections::HashMap;

use super::{validate_schema_name, MysqlEnsembl};
use crate::error::{StoreError, StoreResult};
use crate::model::{
    Exon, Gene, GeneSummary, GenomicRegion, Interval, Location, Species, Strand, Transcript,
    Translation,
};
use crate::store::GenomeStore;

#[derive(Debug, FromRow)]
struct GeneRow {
    gene_id: i64,
    stable_id: String,
    biotype: String,
    description: Option<String>,
    seq_region: String,
    coord_system: String,
    region_start: i64,
    region_end: i64,
    strand: i64,
    canonical_transcript_id: Option<i64>,
}

#[derive(Debug, FromRow)]
struct TranscriptRow {
    transcript_id: i64,
    stable_id: String,
    biotype: String,
    strand: i64,
    start_exon_id: Option<i64>,
    seq_start: Option<i64>,
    end_exon_id: Option<i64>,
    seq_end: Option<i64>,
}

#[derive(Debug, FromRow)]
struct ExonRow {
    transcript_id: i64,
    exon_id: i64,
    region_start: i64,
    region_end: i64,
}

/// One `assembly` row mapping a contig onto the requested seq region
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow)]
pub struct AssemblyPiece {
    pub asm_start: i64,
    pub asm_end: i64,
    pub cmp_start: i64,
    pub cmp_end: i64,
    pub ori: i64,
    pub cmp_seq_region_id: i64,
}

/// Where a piece lands in a requested region and which contig bases fill it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceProjection {
    /// 0-based offset into the requested region's buffer
    pub offset: usize,
    /// 1-based start on the contig
    pub cmp_from: u64,
    pub len: usize,
    pub reverse: bool,
}

/// Project an assembly piece onto `[start, end]` of the assembled seq region
pub fn project_assembly_piece(piece: &AssemblyPiece, start: u64, end: u64) -> Option<PieceProjection> {
    let asm_start = u64::try_from(piece.asm_start).ok()?;
    let asm_end = u64::try_from(piece.asm_end).ok()?;
    let cmp_start = u64::try_from(piece.cmp_start).ok()?;
    let cmp_end = u64::try_from(piece.cmp_end).ok()?;

    let ov_start = start.max(asm_start);
    let ov_end = end.min(asm_end);
    if ov_start > ov_end {
        return None;
    }

    let len = ov_end - ov_start + 1;
    let reverse = piece.ori < 0;
    let cmp_from = if reverse {
        // asm_start pairs with cmp_end when the contig is reversed
        let cmp_to = cmp_end.checked_sub(ov_start - asm_start)?;
        cmp_to.checked_sub(len - 1)?
    } else {
        cmp_start + (ov_start - asm_start)
    };

    Some(PieceProjection {
        offset: usize::try_from(ov_start - start).ok()?,
        cmp_from,
        len: usize::try_from(len).ok()?,
        reverse,
    })
}

fn strand_of(value: i64, what: &str) -> StoreResult<Strand> {
    Strand::from_ensembl(value)
        .ok_or_else(|| StoreError::inconsistent(format!("{} has strand {}", what, value)))
}

fn coord(value: i64) -> StoreResult<u64> {
    u64::try_from(value).map_err(|_| StoreError::inconsistent(format!("negative coordinate {}", value)))
}

impl MysqlEnsembl {
    async fn seq_region_id(&self, core: &str, region: &GenomicRegion) -> StoreResult<Option<i64>> {
        let sql = format!(
            r#"
            SELECT CAST(sr.seq_region_id AS SIGNED) AS seq_region_id
            FROM {core}.seq_region sr
            JOIN {core}.coord_system cs ON cs.coord_system_id = sr.coord_system_id
            WHERE sr.name = ? AND cs.name = ? AND FIND_IN_SET('default_version', cs.attrib)
            ORDER BY cs.`rank`
            LIMIT 1
            "#
        );
        let id: Option<i64> = sqlx::query_scalar(&sql)
            .bind(&region.seq_region)
            .bind(&region.coord_system)
            .fetch_optional(self.pool())
            .await?;
        Ok(id)
    }

    async fn contig_substring(&self, core: &str, seq_region_id: i64, from: u64, len: usize) -> StoreResult<Option<String>> {
        let sql = format!("SELECT SUBSTRING(sequence, ?, ?) FROM {core}.dna WHERE seq_region_id = ?");
        let seq: Option<String> = sqlx::query_scalar(&sql)
            .bind(from)
            .bind(len as u64)
            .bind(seq_region_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(seq)
    }

    async fn load_transcripts(&self, core: &str, gene: &GeneRow) -> StoreResult<Vec<Transcript>> {
        let sql = format!(
            r#"
            SELECT CAST(t.transcript_id AS SIGNED) AS transcript_id, t.stable_id, t.biotype,
                   CAST(t.seq_region_strand AS SIGNED) AS strand,
                   CAST(tl.start_exon_id AS SIGNED) AS start_exon_id,
                   CAST(tl.seq_start AS SIGNED) AS seq_start,
                   CAST(tl.end_exon_id AS SIGNED) AS end_exon_id,
                   CAST(tl.seq_end AS SIGNED) AS seq_end
            FROM {core}.transcript t
            LEFT JOIN {core}.translation tl ON tl.translation_id = t.canonical_translation_id
            WHERE t.gene_id = ?
            ORDER BY t.transcript_id
            "#
        );
        let transcript_rows: Vec<TranscriptRow> = sqlx::query_as(&sql)
            .bind(gene.gene_id)
            .fetch_all(self.pool())
            .await?;

        let sql = format!(
            r#"
            SELECT CAST(et.transcript_id AS SIGNED) AS transcript_id,
                   CAST(e.exon_id AS SIGNED) AS exon_id,
                   CAST(e.seq_region_start AS SIGNED) AS region_start,
                   CAST(e.seq_region_end AS SIGNED) AS region_end
            FROM {core}.exon_transcript et
            JOIN {core}.exon e ON e.exon_id = et.exon_id
            JOIN {core}.transcript t ON t.transcript_id = et.transcript_id
            WHERE t.gene_id = ?
            ORDER BY et.transcript_id, et.`rank`
            "#
        );
        let exon_rows: Vec<ExonRow> = sqlx::query_as(&sql)
            .bind(gene.gene_id)
            .fetch_all(self.pool())
            .await?;

        let mut exons_by_transcript: HashMap<i64, Vec<ExonRow>> = HashMap::new();
        for row in exon_rows {
            exons_by_transcript.entry(row.transcript_id).or_default().push(row);
        }

        let mut transcripts = Vec::with_capacity(transcript_rows.len());
        for row in transcript_rows {
            let exon_rows = exons_by_transcript.remove(&row.transcript_id).unwrap_or_default();
            let exon_index = |exon_id: i64| exon_rows.iter().position(|e| e.exon_id == exon_id);

            let translation = match (row.start_exon_id, row.seq_start, row.end_exon_id, row.seq_end) {
                (Some(start_id), Some(seq_start), Some(end_id), Some(seq_end)) => {
                    let start_exon = exon_index(start_id).ok_or_else(|| {
                        StoreError::inconsistent(format!(
                            "translation of {} starts in an exon it does not contain",
                            row.stable_id
                        ))
                    })?;
                    let end_exon = exon_index(end_id).ok_or_else(|| {
                        StoreError::inconsistent(format!(
                            "translation of {} ends in an exon it does not contain",
                            row.stable_id
                        ))
                    })?;
                    Some(Translation {
                        start_exon,
                        seq_start: coord(seq_start)?,
                        end_exon,
                        seq_end: coord(seq_end)?,
                    })
                },
                _ => None,
            };

            let exons = exon_rows
                .iter()
                .map(|e| {
                    Ok(Exon {
                        start: coord(e.region_start)?,
                        end: coord(e.region_end)?,
                    })
                })
                .collect::<StoreResult<Vec<_>>>()?;

            transcripts.push(Transcript {
                is_canonical: gene.canonical_transcript_id == Some(row.transcript_id),
                strand: strand_of(row.strand, &row.stable_id)?,
                stable_id: row.stable_id,
                biotype: row.biotype,
                exons,
                translation,
            });
        }

        Ok(transcripts)
    }
}

#[async_trait]
impl GenomeStore for MysqlEnsembl {
    async fn gene(&self, species: &Species, stable_id: &str) -> StoreResult<Option<Gene>> {
        let core = validate_schema_name(&species.core_db)?;
        let sql = format!(
            r#"
            SELECT CAST(g.gene_id AS SIGNED) AS gene_id, g.stable_id, g.biotype, g.description,
                   sr.name AS seq_region, cs.name AS coord_system,
                   CAST(g.seq_region_start AS SIGNED) AS region_start,
                   CAST(g.seq_region_end AS SIGNED) AS region_end,
                   CAST(g.seq_region_strand AS SIGNED) AS strand,
                   CAST(g.canonical_transcript_id AS SIGNED) AS canonical_transcript_id
            FROM {core}.gene g
            JOIN {core}.seq_region sr ON sr.seq_region_id = g.seq_region_id
            JOIN {core}.coord_system cs ON cs.coord_system_id = sr.coord_system_id
            WHERE g.stable_id = ?
            LIMIT 1
            "#
        );
        let row: Option<GeneRow> = sqlx::query_as(&sql)
            .bind(stable_id)
            .fetch_optional(self.pool())
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let transcripts = self.load_transcripts(core, &row).await?;
        let region = GenomicRegion::new(
            row.coord_system.clone(),
            row.seq_region.clone(),
            coord(row.region_start)?,
            coord(row.region_end)?,
        );

        Ok(Some(Gene {
            location: Location {
                region,
                strand: strand_of(row.strand, &row.stable_id)?,
            },
            stable_id: row.stable_id,
            species: species.name.clone(),
            biotype: row.biotype,
            description: row.description,
            transcripts,
        }))
    }

    async fn region_sequence(&self, species: &Species, region: &GenomicRegion) -> StoreResult<Vec<u8>> {
        let core = validate_schema_name(&species.core_db)?;
        let len = usize::try_from(region.len())
            .map_err(|_| StoreError::inconsistent(format!("region {} too long", region)))?;
        let mut buffer = vec![UNKNOWN_BASE; len];
        if len == 0 {
            return Ok(buffer);
        }

        let Some(seq_region_id) = self.seq_region_id(core, region).await? else {
            return Err(StoreError::inconsistent(format!(
                "seq region {} not found in {}",
                region, core
            )));
        };

        let sql = format!(
            r#"
            SELECT CAST(a.asm_start AS SIGNED) AS asm_start, CAST(a.asm_end AS SIGNED) AS asm_end,
                   CAST(a.cmp_start AS SIGNED) AS cmp_start, CAST(a.cmp_end AS SIGNED) AS cmp_end,
                   CAST(a.ori AS SIGNED) AS ori,
                   CAST(a.cmp_seq_region_id AS SIGNED) AS cmp_seq_region_id
            FROM {core}.assembly a
            JOIN {core}.dna d ON d.seq_region_id = a.cmp_seq_region_id
            WHERE a.asm_seq_region_id = ? AND a.asm_end >= ? AND a.asm_start <= ?
            ORDER BY a.asm_start
            "#
        );
        let pieces: Vec<AssemblyPiece> = sqlx::query_as(&sql)
            .bind(seq_region_id)
            .bind(region.start)
            .bind(region.end)
            .fetch_all(self.pool())
            .await?;

        if pieces.is_empty() {
            // Sequence-level region: DNA is stored against the region itself
            if let Some(seq) = self
                .contig_substring(core, seq_region_id, region.start, len)
                .await?
            {
                for (slot, base) in buffer.iter_mut().zip(seq.bytes()) {
                    *slot = base.to_ascii_uppercase();
                }
            }
            return Ok(buffer);
        }

        for piece in &pieces {
            let Some(proj) = project_assembly_piece(piece, region.start, region.end) else {
                continue;
            };
            let Some(seq) = self
                .contig_substring(core, piece.cmp_seq_region_id, proj.cmp_from, proj.len)
                .await?
            else {
                continue;
            };

            let mut bases = seq.into_bytes();
            bases.make_ascii_uppercase();
            if proj.reverse {
                bases = reverse_complement(&bases);
            }
            let end = (proj.offset + bases.len()).min(buffer.len());
            buffer[proj.offset..end].copy_from_slice(&bases[..end - proj.offset]);
        }

        tracing::trace!(region = %region, pieces = pieces.len(), "Assembled region sequence");
        Ok(buffer)
    }

    async fn repeat_intervals(&self, species: &Species, region: &GenomicRegion) -> StoreResult<Vec<Interval>> {
        let core = validate_schema_name(&species.core_db)?;
        let Some(seq_region_id) = self.seq_region_id(core, region).await? else {
            return Ok(Vec::new());
        };

        let sql = format!(
            r#"
            SELECT CAST(rf.seq_region_start AS SIGNED) AS region_start,
                   CAST(rf.seq_region_end AS SIGNED) AS region_end
            FROM {core}.repeat_feature rf
            WHERE rf.seq_region_id = ? AND rf.seq_region_end >= ? AND rf.seq_region_start <= ?
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(seq_region_id)
            .bind(region.start)
            .bind(region.end)
            .fetch_all(self.pool())
            .await?;

        rows.iter()
            .map(|row| {
                let start: i64 = row.try_get("region_start")?;
                let end: i64 = row.try_get("region_end")?;
                Ok(Interval::new(coord(start)?, coord(end)?))
            })
            .collect()
    }

    async fn genes_matching(
        &self,
        species: &Species,
        biotype: &str,
        seq_regions: Option<&[String]>,
        limit: Option<usize>,
    ) -> StoreResult<Vec<GeneSummary>> {
        let core = validate_schema_name(&species.core_db)?;
        let mut builder: QueryBuilder<MySql> = QueryBuilder::new(format!(
            r#"
            SELECT CAST(g.gene_id AS SIGNED) AS gene_id, g.stable_id, g.biotype, g.description,
                   sr.name AS seq_region, cs.name AS coord_system,
                   CAST(g.seq_region_start AS SIGNED) AS region_start,
                   CAST(g.seq_region_end AS SIGNED) AS region_end,
                   CAST(g.seq_region_strand AS SIGNED) AS strand,
                   CAST(g.canonical_transcript_id AS SIGNED) AS canonical_transcript_id
            FROM {core}.gene g
            JOIN {core}.seq_region sr ON sr.seq_region_id = g.seq_region_id
            JOIN {core}.coord_system cs ON cs.coord_system_id = sr.coord_system_id
            WHERE g.biotype = "#
        ));
        builder.push_bind(biotype);

        if let Some(names) = seq_regions.filter(|n| !n.is_empty()) {
            builder.push(" AND sr.name IN (");
            let mut separated = builder.separated(", ");
            for name in names {
                separated.push_bind(name);
            }
            separated.push_unseparated(")");
        }

        builder.push(" ORDER BY g.stable_id");
        if let Some(limit) = limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit as u64);
        }

        let rows: Vec<GeneRow> = builder.build_query_as().fetch_all(self.pool()).await?;

        rows.into_iter()
            .map(|row| {
                Ok(GeneSummary {
                    location: Location {
                        region: GenomicRegion::new(
                            row.coord_system,
                            row.seq_region,
                            coord(row.region_start)?,
                            coord(row.region_end)?,
                        ),
                        strand: strand_of(row.strand, &row.stable_id)?,
                    },
                    stable_id: row.stable_id,
                    biotype: row.biotype,
                    description: row.description,
                })
            })
            .collect()
    }

    async fn taxon_id(&self, core_db: &str) -> StoreResult<Option<u32>> {
        let core = validate_schema_name(core_db)?;
        let sql = format!(
            "SELECT meta_value FROM {core}.meta WHERE meta_key = 'species.taxonomy_id' LIMIT 1"
        );
        let value: Option<String> = sqlx::query_scalar(&sql).fetch_optional(self.pool()).await?;
        Ok(value.and_then(|v| v.trim().parse().ok()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn piece(asm: (i64, i64), cmp: (i64, i64), ori: i64) -> AssemblyPiece {
        AssemblyPiece {
            asm_start: asm.0,
            asm_end: asm.1,
            cmp_start: cmp.0,
            cmp_end: cmp.1,
            ori,
            cmp_seq_region_id: 7,
        }
    }

    #[test]
    fn test_forward_piece_projection() {
        let p = piece((1001, 2000), (1, 1000), 1);
        let proj = project_assembly_piece(&p, 1500, 1509).unwrap();
        assert_eq!(
            proj,
            PieceProjection {
                offset: 0,
                cmp_from: 500,
                len: 10,
                reverse: false
            }
        );

        // request starts before the piece
        let proj = project_assembly_piece(&p, 991, 1010).unwrap();
        assert_eq!(proj.offset, 10);
        assert_eq!(proj.cmp_from, 1);
        assert_eq!(proj.len, 10);
    }

    #[test]
    fn test_reverse_piece_projection() {
        let p = piece((1001, 2000), (1, 1000), -1);
        // asm 1001 maps to cmp 1000, asm 1010 to cmp 991
        let proj = project_assembly_piece(&p, 1001, 1010).unwrap();
        assert_eq!(proj.cmp_from, 991);
        assert_eq!(proj.len, 10);
        assert!(proj.reverse);
    }

    #[test]
    fn test_disjoint_piece_is_skipped() {
        let p = piece((1001, 2000), (1, 1000), 1);
        assert!(project_assembly_piece(&p, 1, 1000).is_none());
    }
}
