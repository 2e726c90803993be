//! `show_available_species`: releases and species on the host

use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use homsampler_core::species::AvailableSpecies;
use serde::Serialize;

use crate::commands::connect;
use crate::error::Result;
use crate::OutputFormat;

#[derive(Debug, Serialize)]
struct SpeciesRow<'a> {
    release: u32,
    db_name: &'a str,
    species: &'a str,
    common_name: &'a str,
}

impl<'a> From<&'a AvailableSpecies> for SpeciesRow<'a> {
    fn from(available: &'a AvailableSpecies) -> Self {
        Self {
            release: available.release,
            db_name: &available.species.core_db,
            species: &available.species.name,
            common_name: &available.species.common_name,
        }
    }
}

pub async fn run(account: Option<&str>, release: Option<u32>, format: OutputFormat) -> Result<()> {
    let catalog = connect(account, 1).await?;
    let available = catalog.resolver.available(release);
    catalog.pool.close().await;

    if available.is_empty() {
        match release {
            Some(release) => println!("No species found for release {}.", release),
            None => println!("No Ensembl core databases found on this host."),
        }
        return Ok(());
    }

    let rows: Vec<SpeciesRow<'_>> = available.iter().map(SpeciesRow::from).collect();
    match format {
        OutputFormat::Table => {
            print!("{}", format_as_table(&rows));
            println!("{} {} species", "Total:".cyan().bold(), rows.len());
        },
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&rows)?),
    }
    Ok(())
}

fn format_as_table(rows: &[SpeciesRow<'_>]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Release", "Db Name", "Species", "Common Name"]);

    for row in rows {
        table.add_row(vec![
            row.release.to_string(),
            row.db_name.to_string(),
            row.species.to_string(),
            row.common_name.to_string(),
        ]);
    }

    format!("{}\n", table)
}
