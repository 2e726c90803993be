//! Compara schema reads: homologies, whole-genome alignment blocks, methods

use async_trait::async_trait;
use sqlx::{FromRow, MySql, QueryBuilder};
use std::collections::BTreeMap;

use super::MysqlEnsembl;
use crate::error::{StoreError, StoreResult};
use crate::model::{
    AlignMethod, AlignmentBlock, GenomicAlign, GenomicRegion, HomologyRecord, Species, Strand,
};
use crate::store::ComparaStore;

#[derive(Debug, FromRow)]
struct HomologyRow {
    stable_id: String,
    description: String,
}

#[derive(Debug, FromRow)]
struct GenomicAlignRow {
    block_id: i64,
    species: String,
    coord_system: String,
    seq_region: String,
    region_start: i64,
    region_end: i64,
    strand: i64,
    cigar_line: String,
}

#[derive(Debug, FromRow)]
struct MethodRow {
    method_clade_id: i64,
    method: String,
    name: String,
    species: String,
}

fn to_align(row: GenomicAlignRow) -> StoreResult<GenomicAlign> {
    let strand = Strand::from_ensembl(row.strand).ok_or_else(|| {
        StoreError::inconsistent(format!(
            "genomic align in block {} has strand {}",
            row.block_id, row.strand
        ))
    })?;
    let start = u64::try_from(row.region_start)
        .map_err(|_| StoreError::inconsistent(format!("block {} starts below 1", row.block_id)))?;
    let end = u64::try_from(row.region_end)
        .map_err(|_| StoreError::inconsistent(format!("block {} ends below 1", row.block_id)))?;

    Ok(GenomicAlign {
        species: row.species,
        region: GenomicRegion::new(row.coord_system, row.seq_region, start, end),
        strand,
        cigar_line: row.cigar_line,
    })
}

/// Group rows (already ordered by block) into blocks
fn group_blocks(rows: Vec<GenomicAlignRow>) -> StoreResult<Vec<AlignmentBlock>> {
    let mut blocks: Vec<AlignmentBlock> = Vec::new();
    for row in rows {
        let id = row.block_id;
        let align = to_align(row)?;
        match blocks.last_mut() {
            Some(block) if block.id == id => block.rows.push(align),
            _ => blocks.push(AlignmentBlock {
                id,
                rows: vec![align],
            }),
        }
    }
    Ok(blocks)
}

/// Keep methods whose species set covers every requested species
fn methods_covering(rows: Vec<MethodRow>, wanted: &[&str]) -> Vec<AlignMethod> {
    let mut methods: BTreeMap<i64, AlignMethod> = BTreeMap::new();
    for row in rows {
        methods
            .entry(row.method_clade_id)
            .or_insert_with(|| AlignMethod {
                method_clade_id: row.method_clade_id,
                method: row.method.clone(),
                name: row.name.clone(),
                species: Vec::new(),
            })
            .species
            .push(row.species);
    }

    methods
        .into_values()
        .filter(|m| wanted.iter().all(|w| m.species.iter().any(|s| s == w)))
        .map(|mut m| {
            m.species.sort();
            m.species.dedup();
            m
        })
        .collect()
}

#[async_trait]
impl ComparaStore for MysqlEnsembl {
    async fn homologies(
        &self,
        gene_stable_id: &str,
        target: &Species,
    ) -> StoreResult<Vec<HomologyRecord>> {
        let compara = self.compara_db();
        let sql = format!(
            r#"
            SELECT gm2.stable_id AS stable_id, CAST(h.description AS CHAR) AS description
            FROM {compara}.gene_member gm1
            JOIN {compara}.homology_member hm1 ON hm1.gene_member_id = gm1.gene_member_id
            JOIN {compara}.homology h ON h.homology_id = hm1.homology_id
            JOIN {compara}.homology_member hm2
                ON hm2.homology_id = h.homology_id AND hm2.gene_member_id <> hm1.gene_member_id
            JOIN {compara}.gene_member gm2 ON gm2.gene_member_id = hm2.gene_member_id
            JOIN {compara}.genome_db gdb ON gdb.genome_db_id = gm2.genome_db_id
            WHERE gm1.stable_id = ? AND gdb.name = ?
            "#
        );
        let rows: Vec<HomologyRow> = sqlx::query_as(&sql)
            .bind(gene_stable_id)
            .bind(&target.name)
            .fetch_all(self.pool())
            .await?;

        tracing::debug!(
            gene = gene_stable_id,
            target = %target.name,
            rows = rows.len(),
            "Fetched homologies"
        );

        Ok(rows
            .into_iter()
            .map(|r| HomologyRecord {
                stable_id: r.stable_id,
                description: r.description,
            })
            .collect())
    }

    async fn alignment_blocks(
        &self,
        method_clade_id: i64,
        reference: &Species,
        region: &GenomicRegion,
    ) -> StoreResult<Vec<AlignmentBlock>> {
        let compara = self.compara_db();
        let sql = format!(
            r#"
            SELECT DISTINCT CAST(ga.genomic_align_block_id AS SIGNED) AS block_id
            FROM {compara}.genomic_align ga
            JOIN {compara}.dnafrag df ON df.dnafrag_id = ga.dnafrag_id
            JOIN {compara}.genome_db gdb ON gdb.genome_db_id = df.genome_db_id
            WHERE ga.method_link_species_set_id = ?
              AND gdb.name = ?
              AND df.name = ?
              AND df.coord_system_name = ?
              AND ga.dnafrag_start <= ?
              AND ga.dnafrag_end >= ?
            ORDER BY block_id
            "#
        );
        let block_ids: Vec<i64> = sqlx::query_scalar(&sql)
            .bind(method_clade_id)
            .bind(&reference.name)
            .bind(&region.seq_region)
            .bind(&region.coord_system)
            .bind(region.end)
            .bind(region.start)
            .fetch_all(self.pool())
            .await?;

        if block_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut builder: QueryBuilder<MySql> = QueryBuilder::new(format!(
            r#"
            SELECT CAST(ga.genomic_align_block_id AS SIGNED) AS block_id,
                   gdb.name AS species,
                   df.coord_system_name AS coord_system,
                   df.name AS seq_region,
                   CAST(ga.dnafrag_start AS SIGNED) AS region_start,
                   CAST(ga.dnafrag_end AS SIGNED) AS region_end,
                   CAST(ga.dnafrag_strand AS SIGNED) AS strand,
                   ga.cigar_line
            FROM {compara}.genomic_align ga
            JOIN {compara}.dnafrag df ON df.dnafrag_id = ga.dnafrag_id
            JOIN {compara}.genome_db gdb ON gdb.genome_db_id = df.genome_db_id
            WHERE ga.genomic_align_block_id IN ("#
        ));
        let mut separated = builder.separated(", ");
        for id in &block_ids {
            separated.push_bind(*id);
        }
        separated.push_unseparated(") ORDER BY ga.genomic_align_block_id, ga.genomic_align_id");

        let rows: Vec<GenomicAlignRow> = builder.build_query_as().fetch_all(self.pool()).await?;
        let blocks = group_blocks(rows)?;

        tracing::debug!(
            method_clade_id,
            region = %region,
            blocks = blocks.len(),
            "Fetched alignment blocks"
        );

        Ok(blocks)
    }

    async fn align_methods(&self, species: &[Species]) -> StoreResult<Vec<AlignMethod>> {
        let compara = self.compara_db();
        let sql = format!(
            r#"
            SELECT CAST(mlss.method_link_species_set_id AS SIGNED) AS method_clade_id,
                   ml.type AS method,
                   mlss.name AS name,
                   gdb.name AS species
            FROM {compara}.method_link_species_set mlss
            JOIN {compara}.method_link ml ON ml.method_link_id = mlss.method_link_id
            JOIN {compara}.species_set ss ON ss.species_set_id = mlss.species_set_id
            JOIN {compara}.genome_db gdb ON gdb.genome_db_id = ss.genome_db_id
            WHERE ml.class LIKE 'GenomicAlign%'
            ORDER BY mlss.method_link_species_set_id
            "#
        );
        let rows: Vec<MethodRow> = sqlx::query_as(&sql).fetch_all(self.pool()).await?;

        let wanted: Vec<&str> = species.iter().map(|s| s.name.as_str()).collect();
        Ok(methods_covering(rows, &wanted))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn align_row(block_id: i64, species: &str, strand: i64) -> GenomicAlignRow {
        GenomicAlignRow {
            block_id,
            species: species.to_string(),
            coord_system: "chromosome".to_string(),
            seq_region: "1".to_string(),
            region_start: 10,
            region_end: 20,
            strand,
            cigar_line: "11M".to_string(),
        }
    }

    #[test]
    fn test_rows_grouped_by_block() {
        let rows = vec![
            align_row(4, "homo_sapiens", 1),
            align_row(4, "mus_musculus", -1),
            align_row(9, "homo_sapiens", 1),
        ];
        let blocks = group_blocks(rows).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].rows.len(), 2);
        assert_eq!(blocks[0].rows[1].strand, Strand::Reverse);
        assert_eq!(blocks[1].id, 9);
    }

    #[test]
    fn test_bad_strand_is_inconsistent() {
        let err = group_blocks(vec![align_row(1, "homo_sapiens", 0)]).unwrap_err();
        assert!(matches!(err, StoreError::Inconsistent(_)));
    }

    #[test]
    fn test_methods_must_cover_all_species() {
        let row = |id: i64, species: &str| MethodRow {
            method_clade_id: id,
            method: "EPO".to_string(),
            name: format!("set {}", id),
            species: species.to_string(),
        };
        let rows = vec![
            row(548, "homo_sapiens"),
            row(548, "mus_musculus"),
            row(788, "homo_sapiens"),
            row(788, "mus_musculus"),
            row(788, "monodelphis_domestica"),
        ];
        let methods = methods_covering(rows, &["homo_sapiens", "monodelphis_domestica"]);
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].method_clade_id, 788);
        assert_eq!(methods[0].species.len(), 3);
    }
}
