//! Once-per-process pool construction.

use std::fmt;
use std::sync::OnceLock;

use crate::error::PoolResult;
use crate::manager::ManageConnection;
use crate::pool::{Pool, PoolConfig, PooledConnection, ShutdownReport};

type InitFn<M> = Box<dyn Fn() -> PoolResult<Pool<M>> + Send + Sync>;

/// A pool that is built on first use.
///
/// The first caller runs the initializer; concurrent callers block until it
/// finishes and then all observe the same pool, or the same error. After
/// initialization [`LazyPool::get`] is a single atomic load.
pub struct LazyPool<M: ManageConnection> {
    cell: OnceLock<PoolResult<Pool<M>>>,
    init: InitFn<M>,
}

impl<M: ManageConnection + Clone> LazyPool<M> {
    pub fn new(manager: M, config: PoolConfig) -> Self {
        Self::with_init(move || Pool::connect(manager.clone(), config.clone()))
    }
}

impl<M: ManageConnection> LazyPool<M> {
    pub fn with_init<F>(init: F) -> Self
    where
        F: Fn() -> PoolResult<Pool<M>> + Send + Sync + 'static,
    {
        Self {
            cell: OnceLock::new(),
            init: Box::new(init),
        }
    }

    /// The pool, initializing it if no one has yet.
    pub fn get(&self) -> PoolResult<&Pool<M>> {
        self.cell
            .get_or_init(|| {
                log::debug!("initializing connection pool");
                (self.init)()
            })
            .as_ref()
            .map_err(Clone::clone)
    }

    pub fn acquire(&self) -> PoolResult<PooledConnection<M>> {
        self.get()?.acquire()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Shut the pool down if it was successfully built. Never triggers
    /// initialization.
    pub fn shutdown(&self) -> Option<ShutdownReport> {
        match self.cell.get() {
            Some(Ok(pool)) => Some(pool.shutdown()),
            _ => None,
        }
    }
}

impl<M: ManageConnection> fmt::Debug for LazyPool<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyPool")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
