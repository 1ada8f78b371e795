//! Named SQL statements loaded from TOML.
//!
//! A catalog file keeps its statements under a `[query]` table:
//!
//! ```toml
//! [query]
//! find_by_login = "SELECT id FROM users WHERE login = ?1 LIMIT 1"
//! ```

use std::collections::HashMap;

use serde::Deserialize;

use crate::error::{DaoError, DaoResult};

const USERS_CATALOG: &str = include_str!("../sql/users.toml");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    query: HashMap<String, String>,
}

/// Logical key to SQL text, for one repository.
#[derive(Debug, Clone)]
pub struct QueryCatalog {
    name: String,
    queries: HashMap<String, String>,
}

impl QueryCatalog {
    pub fn from_toml_str(name: impl Into<String>, source: &str) -> DaoResult<Self> {
        let file: CatalogFile = toml::from_str(source)?;
        let name = name.into();
        log::debug!("loaded query catalog '{}' with {} statements", name, file.query.len());
        Ok(Self {
            name,
            queries: file.query,
        })
    }

    /// The statements the user repository ships with.
    pub fn users() -> DaoResult<Self> {
        Self::from_toml_str("users", USERS_CATALOG)
    }

    /// SQL for `key`, or [`DaoError::MissingQuery`].
    pub fn get(&self, key: &str) -> DaoResult<&str> {
        self.queries
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| DaoError::MissingQuery(format!("{}.{}", self.name, key)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn contains(&self, key: &str) -> bool {
        self.queries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Replace or add one statement.
    pub fn with_query(mut self, key: impl Into<String>, sql: impl Into<String>) -> Self {
        self.queries.insert(key.into(), sql.into());
        self
    }
}
