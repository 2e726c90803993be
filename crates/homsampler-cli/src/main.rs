//! homolog_sampler - Main entry point

use clap::Parser;
use homsampler_cli::commands::{align_methods, dump_genes, one2one, show_species};
use homsampler_cli::{Cli, Commands};
use homsampler_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::path::Path;
use std::process;
use tracing::{error, warn};

#[tokio::main]
async fn main() {
    // .env must be loaded before clap reads ENSEMBL_ACCOUNT
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return;
    }

    let Some(command) = cli.command.as_ref() else {
        eprintln!("Error: A subcommand is required");
        eprintln!();
        eprintln!("For more information, try '--help'.");
        process::exit(2);
    };

    let run_log = match command {
        Commands::One2One(args) => match one2one::prepare_run_log(args) {
            Ok(path) => path,
            Err(e) => {
                eprintln!("Error: {}", e);
                process::exit(1);
            },
        },
        _ => None,
    };

    let base_config = log_config(cli.verbose, run_log.as_deref());
    let (log_config, env_error) = match base_config.clone().with_env_overrides() {
        Ok(config) => (config, None),
        Err(e) => (base_config, Some(e)),
    };

    // The CLI works without logging; keep the guard so the run log is flushed
    let log_guard = init_logging(&log_config).ok().flatten();
    if let Some(e) = env_error {
        warn!(error = %e, "Ignoring invalid LOG_* environment settings");
    }

    if let Err(e) = execute_command(&cli, command).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        drop(log_guard);
        process::exit(1);
    }
}

/// Warnings to the console; `one2one` also keeps an info-level run log
fn log_config(verbose: bool, run_log: Option<&Path>) -> LogConfig {
    let level = if verbose { LogLevel::Debug } else { LogLevel::Info };
    match run_log {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "one2one.log".to_string());
            LogConfig::builder()
                .level(level)
                .output(if verbose { LogOutput::Both } else { LogOutput::File })
                .log_dir(dir)
                .log_file_name(name)
                .filter_directives("sqlx=warn")
                .build()
        },
        None => LogConfig::builder()
            .level(if verbose { LogLevel::Debug } else { LogLevel::Warn })
            .output(LogOutput::Console)
            .filter_directives("sqlx=warn")
            .build(),
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli, command: &Commands) -> homsampler_cli::Result<()> {
    let account = cli.ensembl_account.as_deref();

    match command {
        Commands::One2One(args) => one2one::run(account, args).await,

        Commands::ShowAvailableSpecies { release, format } => {
            show_species::run(account, *release, *format).await
        },

        Commands::ShowAlignMethods {
            species,
            release,
            format,
        } => align_methods::run(account, species, *release, *format).await,

        Commands::DumpGenes(args) => dump_genes::run(account, args).await,
    }
}
