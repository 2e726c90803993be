//! MySQL access to an Ensembl host
//!
//! One pool per run, opened without a default schema. Every query names its
//! schema explicitly (`homo_sapiens_core_81_38.gene`), and schema names are
//! only accepted after [`validate_schema_name`].

mod compara;
mod genome;

use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use std::time::Duration;

use crate::account::Account;
use crate::error::{ConfigError, StoreError, StoreResult};

pub use self::genome::{project_assembly_piece, AssemblyPiece, PieceProjection};

#[derive(Debug, Clone)]
pub struct DbConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: Option<u64>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            max_connections: 4,
            min_connections: 1,
            connect_timeout_secs: 30,
            idle_timeout_secs: Some(600),
        }
    }
}

impl DbConfig {
    /// Defaults with `HS_DB_MAX_CONNECTIONS` / `HS_DB_CONNECT_TIMEOUT` overrides
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_connections = std::env::var("HS_DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_connections);

        let connect_timeout_secs = std::env::var("HS_DB_CONNECT_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.connect_timeout_secs);

        Self {
            max_connections,
            connect_timeout_secs,
            ..defaults
        }
    }

    /// Make sure the pool can serve `jobs` concurrent genes
    pub fn with_min_capacity(mut self, jobs: usize) -> Self {
        let jobs = u32::try_from(jobs).unwrap_or(u32::MAX);
        self.max_connections = self.max_connections.max(jobs);
        self
    }
}

pub async fn create_pool(account: &Account, config: &DbConfig) -> Result<MySqlPool, ConfigError> {
    let options = MySqlConnectOptions::new()
        .host(&account.host)
        .port(account.port)
        .username(&account.user)
        .password(&account.password);

    let mut pool_options = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs));

    if let Some(idle_timeout) = config.idle_timeout_secs {
        pool_options = pool_options.idle_timeout(Duration::from_secs(idle_timeout));
    }

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(ConfigError::Connection)?;

    tracing::info!(
        account = %account,
        max_connections = config.max_connections,
        "Database connection pool created"
    );

    Ok(pool)
}

/// Every schema visible to the account
pub async fn list_schemas(pool: &MySqlPool) -> StoreResult<Vec<String>> {
    let names: Vec<String> = sqlx::query_scalar("SHOW DATABASES")
        .fetch_all(pool)
        .await?;
    Ok(names)
}

/// Schema names are interpolated into SQL, so only plain identifiers pass
pub fn validate_schema_name(name: &str) -> StoreResult<&str> {
    let valid = !name.is_empty()
        && name.len() <= 64
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if valid {
        Ok(name)
    } else {
        Err(StoreError::InvalidSchemaName(name.to_string()))
    }
}

/// Ensembl core and compara reads over one pool, pinned to one release
#[derive(Clone)]
pub struct MysqlEnsembl {
    pool: MySqlPool,
    compara_db: String,
}

impl MysqlEnsembl {
    pub fn new(pool: MySqlPool, compara_db: impl Into<String>) -> StoreResult<Self> {
        let compara_db = compara_db.into();
        validate_schema_name(&compara_db)?;
        Ok(Self { pool, compara_db })
    }

    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }

    pub fn compara_db(&self) -> &str {
        &self.compara_db
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_schema_name_validation() {
        assert!(validate_schema_name("homo_sapiens_core_81_38").is_ok());
        assert!(validate_schema_name("ensembl_compara_81").is_ok());
        assert!(validate_schema_name("x; DROP TABLE gene").is_err());
        assert!(validate_schema_name("a.b").is_err());
        assert!(validate_schema_name("").is_err());
    }

    #[test]
    #[serial]
    fn test_db_config_env_overrides() {
        std::env::set_var("HS_DB_MAX_CONNECTIONS", "12");
        let config = DbConfig::from_env();
        assert_eq!(config.max_connections, 12);
        assert_eq!(config.connect_timeout_secs, 30);
        std::env::remove_var("HS_DB_MAX_CONNECTIONS");

        let config = DbConfig::default().with_min_capacity(8);
        assert_eq!(config.max_connections, 8);
    }
}
