//! MySQL account parsed from `ENSEMBL_ACCOUNT`

use std::fmt;

use crate::error::ConfigError;

/// Environment variable holding `"host user password [port]"`
pub const ACCOUNT_ENV_VAR: &str = "ENSEMBL_ACCOUNT";

pub const DEFAULT_MYSQL_PORT: u16 = 3306;

#[derive(Clone, PartialEq, Eq)]
pub struct Account {
    pub host: String,
    pub user: String,
    pub password: String,
    pub port: u16,
}

impl Account {
    /// Parse a whitespace separated `host user password [port]` value
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let fields: Vec<&str> = value.split_whitespace().collect();
        let (host, user, password, port) = match fields.as_slice() {
            [host, user, password] => (*host, *user, *password, DEFAULT_MYSQL_PORT),
            [host, user, password, port] => {
                let port = port.parse::<u16>().map_err(|_| {
                    ConfigError::MalformedCredentials(format!("invalid port '{}'", port))
                })?;
                (*host, *user, *password, port)
            },
            [] => return Err(ConfigError::MissingCredentials),
            other => {
                return Err(ConfigError::MalformedCredentials(format!(
                    "expected 3 or 4 fields, found {}",
                    other.len()
                )))
            },
        };

        Ok(Self {
            host: host.to_string(),
            user: user.to_string(),
            password: password.to_string(),
            port,
        })
    }

    /// Read and parse the account from an optional value (usually the env var)
    pub fn from_value(value: Option<&str>) -> Result<Self, ConfigError> {
        match value {
            Some(v) => Self::parse(v),
            None => Err(ConfigError::MissingCredentials),
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_value(std::env::var(ACCOUNT_ENV_VAR).ok().as_deref())
    }
}

// Keeps the password out of logs and error output
impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("port", &self.port)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_parse_three_and_four_fields() {
        let acc = Account::parse("ensembldb.ensembl.org anonymous pw").unwrap();
        assert_eq!(acc.host, "ensembldb.ensembl.org");
        assert_eq!(acc.port, DEFAULT_MYSQL_PORT);

        let acc = Account::parse("  db.local  jill  secret  5306 ").unwrap();
        assert_eq!(acc.user, "jill");
        assert_eq!(acc.port, 5306);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            Account::parse("host-only"),
            Err(ConfigError::MalformedCredentials(_))
        ));
        assert!(matches!(
            Account::parse("h u p notaport"),
            Err(ConfigError::MalformedCredentials(_))
        ));
        assert!(matches!(
            Account::parse("   "),
            Err(ConfigError::MissingCredentials)
        ));
    }

    #[test]
    fn test_display_redacts_password() {
        let acc = Account::parse("db.local jill secret").unwrap();
        assert_eq!(acc.to_string(), "jill@db.local:3306");
        assert!(!format!("{:?}", acc).contains("secret"));
    }

    #[test]
    #[serial]
    fn test_from_env_missing() {
        std::env::remove_var(ACCOUNT_ENV_VAR);
        assert!(matches!(
            Account::from_env(),
            Err(ConfigError::MissingCredentials)
        ));

        std::env::set_var(ACCOUNT_ENV_VAR, "db.local jill secret 3307");
        assert_eq!(Account::from_env().unwrap().port, 3307);
        std::env::remove_var(ACCOUNT_ENV_VAR);
    }
}
