//! Gene and seq region lists supplied on the command line

use std::path::Path;

use crate::error::{CliError, Result};

const STABLEID_COLUMN: &str = "stableid";

/// Stable ids from the `stableid` column of a `.csv` or `.tsv` file
///
/// The delimiter follows the extension; anything other than `.csv` is read as
/// tab separated, which is what `dump_genes` writes.
pub fn read_ref_genes(path: &Path) -> Result<Vec<String>> {
    let delimiter = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => b',',
        _ => b'\t',
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(|e| CliError::input_file(path, e.to_string()))?;

    let column = reader
        .headers()
        .map_err(|e| CliError::input_file(path, e.to_string()))?
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(STABLEID_COLUMN))
        .ok_or_else(|| {
            CliError::input_file(path, format!("missing '{}' column", STABLEID_COLUMN))
        })?;

    let mut ids = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| CliError::input_file(path, e.to_string()))?;
        if let Some(id) = record.get(column).map(str::trim).filter(|id| !id.is_empty()) {
            if !ids.iter().any(|seen| seen == id) {
                ids.push(id.to_string());
            }
        }
    }

    if ids.is_empty() {
        return Err(CliError::input_file(path, "no stable ids"));
    }
    Ok(ids)
}

/// Seq region names, one per line; blank lines and `#` comments ignored
pub fn read_coord_names(path: &Path) -> Result<Vec<String>> {
    let text =
        std::fs::read_to_string(path).map_err(|e| CliError::input_file(path, e.to_string()))?;
    let names: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect();

    if names.is_empty() {
        return Err(CliError::input_file(path, "no seq region names"));
    }
    Ok(names)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_ref_genes_from_tsv_and_csv() {
        let dir = TempDir::new().unwrap();

        let tsv = dir.path().join("genes.tsv");
        fs::write(
            &tsv,
            "stableid\tbiotype\nENSG00000139618\tprotein_coding\nENSG00000012048\tprotein_coding\n",
        )
        .unwrap();
        assert_eq!(
            read_ref_genes(&tsv).unwrap(),
            vec!["ENSG00000139618", "ENSG00000012048"]
        );

        let csv = dir.path().join("genes.csv");
        fs::write(&csv, "location,StableId\nchr13,ENSG00000139618\nchr13,ENSG00000139618\n")
            .unwrap();
        assert_eq!(read_ref_genes(&csv).unwrap(), vec!["ENSG00000139618"]);
    }

    #[test]
    fn test_ref_genes_without_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("genes.tsv");
        fs::write(&path, "gene\nENSG00000139618\n").unwrap();

        let err = read_ref_genes(&path).unwrap_err();
        assert!(err.to_string().contains("missing 'stableid' column"));
    }

    #[test]
    fn test_coord_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("coords.txt");
        fs::write(&path, "# autosomes\n13\n\n 17 \n").unwrap();
        assert_eq!(read_coord_names(&path).unwrap(), vec!["13", "17"]);

        fs::write(&path, "\n# nothing\n").unwrap();
        assert!(read_coord_names(&path).is_err());
    }
}
