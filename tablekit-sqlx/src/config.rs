use crate::options::{AccessMode, DeferrableMode, IsolationLevel, PgTxOptions};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tablekit_core::{Config, ConfigError};

/// Connection settings read from the `database.*` keys.
///
/// | Key | Default |
/// |-----|---------|
/// | `database.url` | required |
/// | `database.max_connections` | `10` |
/// | `database.min_connections` | `0` |
/// | `database.acquire_timeout_secs` | `30` |
/// | `database.isolation` | `read_committed` |
/// | `database.read_only` | `false` |
/// | `database.deferrable` | `false` |
#[derive(Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub tx_options: PgTxOptions,
}

impl DatabaseConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 10,
            min_connections: 0,
            acquire_timeout: Duration::from_secs(30),
            tx_options: PgTxOptions::default(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let url: String = config.get("database.url")?;
        let isolation: String = config.get_or("database.isolation", "read_committed".to_string())?;
        let isolation: IsolationLevel = isolation.parse().map_err(|e: crate::options::ParseOptionError| {
            ConfigError::Invalid {
                key: "database.isolation".into(),
                message: e.to_string(),
            }
        })?;
        let access_mode = if config.get_or("database.read_only", false)? {
            AccessMode::ReadOnly
        } else {
            AccessMode::ReadWrite
        };
        let deferrable = if config.get_or("database.deferrable", false)? {
            DeferrableMode::Deferrable
        } else {
            DeferrableMode::NotDeferrable
        };
        let max_connections = config.get_or("database.max_connections", 10u32)?;
        let min_connections = config.get_or("database.min_connections", 0u32)?;
        if min_connections > max_connections {
            return Err(ConfigError::Invalid {
                key: "database.min_connections".into(),
                message: format!("{min_connections} exceeds max_connections {max_connections}"),
            });
        }
        Ok(Self {
            url,
            max_connections,
            min_connections,
            acquire_timeout: Duration::from_secs(config.get_or("database.acquire_timeout_secs", 30u64)?),
            tx_options: PgTxOptions {
                isolation,
                access_mode,
                deferrable,
            },
        })
    }

    pub fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(self.acquire_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::from_yaml_str("database:\n  url: postgres://localhost/app\n", "test").unwrap();
        let db = DatabaseConfig::from_config(&config).unwrap();
        assert_eq!(db, DatabaseConfig::new("postgres://localhost/app"));
    }

    #[test]
    fn test_overrides() {
        let yaml = "database:\n  url: postgres://db/app\n  max_connections: 4\n  isolation: serializable\n  read_only: true\n";
        let config = Config::from_yaml_str(yaml, "test").unwrap();
        let db = DatabaseConfig::from_config(&config).unwrap();
        assert_eq!(db.max_connections, 4);
        assert_eq!(
            db.tx_options.statement(),
            "SET TRANSACTION ISOLATION LEVEL SERIALIZABLE, READ ONLY, NOT DEFERRABLE"
        );
    }

    #[test]
    fn test_url_required() {
        let err = DatabaseConfig::from_config(&Config::empty()).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(key) if key == "database.url"));
    }

    #[test]
    fn test_unknown_isolation() {
        let yaml = "database:\n  url: postgres://db/app\n  isolation: snapshot\n";
        let config = Config::from_yaml_str(yaml, "test").unwrap();
        assert!(matches!(
            DatabaseConfig::from_config(&config),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
