//! # gym-pool
//!
//! A bounded, thread-safe cache of database connections.
//!
//! ## Features
//! - **Blocking acquire/release**: callers wait on a condition variable while
//!   the pool is empty; returning a connection wakes one waiter.
//! - **Guaranteed release**: connections are lent as [`PooledConnection`]
//!   guards that go back to the pool on drop, on every exit path.
//! - **Bounded waits**: per-call timeouts, deadlines and cancellation tokens.
//! - **One-time init**: [`LazyPool`] builds the pool exactly once and shares a
//!   failed initialization with every caller.
//! - **Coordinated shutdown**: idle connections are closed, lent ones are
//!   reported and closed when they come back.

pub mod config;
pub mod error;
pub mod lazy;
pub mod manager;
pub mod pool;

pub use config::{DbConfig, Driver};
pub use error::{DriverError, PoolError, PoolResult};
pub use lazy::LazyPool;
#[cfg(feature = "sqlite")]
pub use manager::SqliteManager;
pub use manager::ManageConnection;
pub use pool::{AcquireOptions, Pool, PoolConfig, PoolState, PooledConnection, ShutdownReport};
pub use tokio_util::sync::CancellationToken;
