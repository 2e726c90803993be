//! `show_align_methods`: compara alignments covering a species set

use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use homsampler_core::model::AlignMethod;
use homsampler_core::store::ComparaStore;

use crate::commands::connect;
use crate::error::Result;
use crate::OutputFormat;

pub async fn run(
    account: Option<&str>,
    species: &[String],
    release: u32,
    format: OutputFormat,
) -> Result<()> {
    let catalog = connect(account, 1).await?;
    let store = catalog.release_store(release)?;
    let species = catalog.resolver.resolve(species, release)?;

    let methods = store.align_methods(&species).await?;
    store.close().await;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&methods)?),
        OutputFormat::Table if methods.is_empty() => {
            let names: Vec<&str> = species.iter().map(|s| s.common_name.as_str()).collect();
            println!(
                "No genomic alignments in release {} include all of: {}",
                release,
                names.join(", ")
            );
        },
        OutputFormat::Table => {
            print!("{}", format_as_table(&methods));
            println!(
                "{} pass one of these ids to {} {}",
                "Hint:".cyan().bold(),
                "one2one --method_clade_id".green(),
                "(add --introns for intron sampling)"
            );
        },
    }
    Ok(())
}

fn format_as_table(methods: &[AlignMethod]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["method_link_species_set_id", "method", "species_set_name"]);

    for method in methods {
        table.add_row(vec![
            method.method_clade_id.to_string(),
            method.method.clone(),
            method.name.clone(),
        ]);
    }

    format!("{}\n", table)
}
