//! CLI command implementations
//!
//! Each subcommand has its own module with a `run` function. They share
//! [`connect`], which turns the account string into a pool and a species
//! catalog for the host.

pub mod align_methods;
pub mod dump_genes;
pub mod one2one;
pub mod show_species;

use homsampler_core::account::Account;
use homsampler_core::db::{create_pool, list_schemas, DbConfig, MysqlEnsembl};
use homsampler_core::species::SpeciesResolver;
use homsampler_core::ConfigError;
use sqlx::mysql::MySqlPool;

use crate::error::Result;
use crate::progress::create_spinner;

/// Open pool plus the schemas it can see
pub struct Catalog {
    pub pool: MySqlPool,
    pub resolver: SpeciesResolver,
}

impl Catalog {
    /// Store pinned to one release's compara schema
    pub fn release_store(&self, release: u32) -> Result<MysqlEnsembl> {
        let compara_db = self.resolver.compara_db(release)?;
        Ok(MysqlEnsembl::new(self.pool.clone(), compara_db)?)
    }
}

/// Parse the account, connect, and read the schema catalog
pub async fn connect(account: Option<&str>, jobs: usize) -> Result<Catalog> {
    let account = Account::from_value(account)?;
    let spinner = create_spinner(&format!("Connecting to {}...", account.host));
    let result = open_catalog(&account, jobs).await;
    spinner.finish_and_clear();
    result
}

async fn open_catalog(account: &Account, jobs: usize) -> Result<Catalog> {
    let config = DbConfig::from_env().with_min_capacity(jobs);
    let pool = create_pool(account, &config).await?;
    let schemas = list_schemas(&pool).await.map_err(ConfigError::Catalog)?;
    tracing::debug!(schemas = schemas.len(), "Read schema catalog");

    Ok(Catalog {
        pool,
        resolver: SpeciesResolver::new(schemas),
    })
}
