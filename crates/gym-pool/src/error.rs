use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

/// Shared, cloneable driver error.
///
/// Initialization failures are handed to every caller of a lazily built pool,
/// so the underlying cause has to be shareable.
pub type DriverError = Arc<dyn std::error::Error + Send + Sync>;

/// Errors returned by gym-pool operations.
#[derive(Debug, Clone, Error)]
pub enum PoolError {
    /// Opening one of the initial connections failed. No pool was created.
    /// `index` is zero-based; the message counts from one.
    #[error("failed to open connection {} of {capacity}: {source}", .index + 1)]
    Connect {
        index: usize,
        capacity: usize,
        #[source]
        source: DriverError,
    },

    /// No connection became available before the deadline.
    #[error("pool exhausted: no connection available after {0:?}")]
    Timeout(Duration),

    /// The caller cancelled a pending acquire.
    #[error("acquire cancelled")]
    Cancelled,

    /// The pool has been shut down.
    #[error("pool is shut down")]
    Closed,

    /// Invalid configuration (zero capacity, unknown driver, bad value).
    #[error("invalid pool configuration: {0}")]
    Config(String),
}

impl PoolError {
    pub(crate) fn connect(
        index: usize,
        capacity: usize,
        err: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        PoolError::Connect {
            index,
            capacity,
            source: Arc::new(err),
        }
    }
}

pub type PoolResult<T> = Result<T, PoolError>;
