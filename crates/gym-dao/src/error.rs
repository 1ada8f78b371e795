use gym_pool::PoolError;
use thiserror::Error;

/// Errors returned by repository operations.
#[derive(Debug, Error)]
pub enum DaoError {
    /// Error from the SQLite driver.
    #[error("database error: {0}")]
    Sql(#[from] rusqlite::Error),

    /// No connection could be borrowed.
    #[error("connection pool error: {0}")]
    Pool(#[from] PoolError),

    /// A write touched an unexpected number of rows.
    #[error("{operation} on {table} affected {actual} row(s), expected {expected}")]
    AffectedRows {
        operation: &'static str,
        table: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A row the operation depends on does not exist.
    #[error("row not found: {0}")]
    MissingRow(String),

    /// A column held a value outside its allowed domain.
    #[error("unexpected value {value} in column {column}")]
    InvalidValue { column: &'static str, value: i64 },

    #[error("unknown user role '{0}'")]
    UnknownRole(String),

    #[error("query '{0}' is not in the catalog")]
    MissingQuery(String),

    #[error("invalid query catalog: {0}")]
    Catalog(#[from] toml::de::Error),

    #[error("schema migration failed at {step}: {source}")]
    Schema {
        step: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

pub type DaoResult<T> = Result<T, DaoError>;
