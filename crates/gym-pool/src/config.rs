use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{PoolError, PoolResult};
use crate::pool::PoolConfig;
#[cfg(feature = "sqlite")]
use crate::{manager::SqliteManager, pool::Pool};

/// Database drivers the pool knows how to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Driver {
    #[default]
    Sqlite,
}

impl FromStr for Driver {
    type Err = PoolError;

    fn from_str(s: &str) -> PoolResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Driver::Sqlite),
            other => Err(PoolError::Config(format!("unsupported driver '{other}'"))),
        }
    }
}

/// Database configuration, read once at start.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Driver identity (default: sqlite)
    pub driver: Driver,

    /// Data source, e.g. `sqlite://gym.db` or a plain file path (default: gym.db)
    pub url: String,

    /// Database user, for drivers that authenticate
    pub user: Option<String>,

    /// Database password, for drivers that authenticate
    pub password: Option<String>,

    /// Number of pooled connections (default: 8)
    pub pool_size: usize,

    /// Default acquire timeout in milliseconds; unset waits indefinitely
    pub acquire_timeout_ms: Option<u64>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            driver: Driver::Sqlite,
            url: "gym.db".to_string(),
            user: None,
            password: None,
            pool_size: 8,
            acquire_timeout_ms: None,
        }
    }
}

impl DbConfig {
    /// Load configuration from environment variables (with .env support).
    pub fn from_env() -> PoolResult<Self> {
        // Load .env file if present (ignore errors if missing)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key lookup, using the same keys as
    /// [`DbConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> PoolResult<Self> {
        let defaults = Self::default();
        let config = Self {
            driver: match lookup("DB_DRIVER") {
                Some(value) => value.parse()?,
                None => defaults.driver,
            },
            url: lookup("DATABASE_URL").unwrap_or(defaults.url),
            user: lookup("DB_USER"),
            password: lookup("DB_PASSWORD"),
            pool_size: match lookup("DB_POOL_SIZE") {
                Some(value) => parse_number("DB_POOL_SIZE", &value)?,
                None => defaults.pool_size,
            },
            acquire_timeout_ms: lookup("DB_ACQUIRE_TIMEOUT_MS")
                .map(|value| parse_number("DB_ACQUIRE_TIMEOUT_MS", &value))
                .transpose()?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document, either flat or under a `[database]` table.
    pub fn from_toml_str(source: &str) -> PoolResult<Self> {
        let table: toml::Table = source
            .parse()
            .map_err(|err: toml::de::Error| PoolError::Config(err.to_string()))?;
        let value = match table.get("database") {
            Some(database) => database.clone(),
            None => toml::Value::Table(table),
        };
        let config: DbConfig = value
            .try_into()
            .map_err(|err: toml::de::Error| PoolError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject an empty url and any invalid pool setting.
    pub fn validate(&self) -> PoolResult<()> {
        if self.url.trim().is_empty() {
            return Err(PoolError::Config("database url is empty".to_string()));
        }
        self.pool_config().validate()
    }

    /// Default acquire timeout, `None` when unset.
    pub fn acquire_timeout(&self) -> Option<Duration> {
        self.acquire_timeout_ms.map(Duration::from_millis)
    }

    /// Pool sizing and wait policy derived from this configuration.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig {
            max_size: self.pool_size,
            acquire_timeout: self.acquire_timeout(),
        }
    }

    /// Connection manager for the configured SQLite database.
    #[cfg(feature = "sqlite")]
    pub fn sqlite_manager(&self) -> PoolResult<SqliteManager> {
        if self.user.is_some() || self.password.is_some() {
            log::debug!("sqlite driver ignores DB_USER/DB_PASSWORD");
        }
        let path = self
            .url
            .strip_prefix("sqlite://")
            .or_else(|| self.url.strip_prefix("sqlite:"))
            .unwrap_or(&self.url);
        if path == ":memory:" {
            return Err(PoolError::Config(
                "in-memory sqlite gives every pooled connection its own database; use a file"
                    .to_string(),
            ));
        }
        Ok(SqliteManager::file(path))
    }

    /// Open the pool described by this configuration.
    #[cfg(feature = "sqlite")]
    pub fn connect_sqlite(&self) -> PoolResult<Pool<SqliteManager>> {
        Pool::connect(self.sqlite_manager()?, self.pool_config())
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> PoolResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| PoolError::Config(format!("{key} must be a number, got '{value}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_config_defaults() {
        let config = DbConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.driver, Driver::Sqlite);
        assert_eq!(config.url, "gym.db");
        assert_eq!(config.pool_size, 8);
        assert!(config.acquire_timeout().is_none());
        assert!(config.user.is_none());
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_config_from_lookup() {
        let config = DbConfig::from_lookup(lookup_from(&[
            ("DB_DRIVER", "SQLite"),
            ("DATABASE_URL", "sqlite:///var/lib/gym/gym.db"),
            ("DB_USER", "gym"),
            ("DB_PASSWORD", "secret"),
            ("DB_POOL_SIZE", "3"),
            ("DB_ACQUIRE_TIMEOUT_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(config.pool_size, 3);
        assert_eq!(config.acquire_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.user.as_deref(), Some("gym"));
        let manager = config.sqlite_manager().unwrap();
        assert_eq!(manager.path().to_str(), Some("/var/lib/gym/gym.db"));
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let err = DbConfig::from_lookup(lookup_from(&[("DB_POOL_SIZE", "many")])).unwrap_err();
        assert!(err.to_string().contains("DB_POOL_SIZE"));

        assert!(matches!(
            DbConfig::from_lookup(lookup_from(&[("DB_POOL_SIZE", "0")])),
            Err(PoolError::Config(_))
        ));
        assert!(matches!(
            DbConfig::from_lookup(lookup_from(&[("DB_DRIVER", "oracle")])),
            Err(PoolError::Config(_))
        ));
    }

    #[test]
    fn test_config_from_toml() {
        let config = DbConfig::from_toml_str(
            r#"
            [database]
            url = "gym-test.db"
            pool_size = 2
            acquire_timeout_ms = 1000
            "#,
        )
        .unwrap();
        assert_eq!(config.url, "gym-test.db");
        assert_eq!(config.pool_size, 2);
        assert_eq!(config.driver, Driver::Sqlite);

        let flat = DbConfig::from_toml_str("url = \"flat.db\"\npool_size = 4\n").unwrap();
        assert_eq!(flat.url, "flat.db");
        assert_eq!(flat.pool_size, 4);
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_memory_url_rejected() {
        let config = DbConfig {
            url: "sqlite::memory:".to_string(),
            ..DbConfig::default()
        };
        assert!(matches!(config.sqlite_manager(), Err(PoolError::Config(_))));
    }
}
