//! Shared, blocking connection pool.
//!
//! A fixed number of connections is opened up front. Callers borrow one with
//! [`Pool::acquire`] and get it back as a [`PooledConnection`] guard; dropping
//! the guard returns the connection and wakes one waiter.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::{PoolError, PoolResult};
use crate::manager::ManageConnection;

/// How often a waiter holding a cancellation token re-checks it.
/// Cancelling a token never notifies the pool's condition variable.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Pool sizing and default wait behaviour.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of connections opened at start. Fixed for the pool's lifetime.
    pub max_size: usize,
    /// Default bound for [`Pool::acquire`]. `None` waits indefinitely.
    pub acquire_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 8,
            acquire_timeout: None,
        }
    }
}

impl PoolConfig {
    /// `max_size` connections, waiting indefinitely by default.
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            ..Self::default()
        }
    }

    /// Bound every plain [`Pool::acquire`] by `timeout`.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    /// Reject a zero `max_size` or a zero `acquire_timeout`.
    pub fn validate(&self) -> PoolResult<()> {
        if self.max_size == 0 {
            return Err(PoolError::Config(
                "max_size must be greater than 0".to_string(),
            ));
        }
        if self.acquire_timeout.is_some_and(|t| t.is_zero()) {
            return Err(PoolError::Config(
                "acquire_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-call wait policy for [`Pool::acquire_with`].
#[derive(Debug, Clone, Default)]
pub struct AcquireOptions {
    deadline: Option<Instant>,
    cancel: Option<CancellationToken>,
}

impl AcquireOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up once `timeout` has elapsed from now. A timeout too large to
    /// be represented as an [`Instant`] means no deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Instant::now().checked_add(timeout);
        self
    }

    /// Give up at `deadline`.
    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Abort the wait when `token` is cancelled.
    ///
    /// A blocked waiter notices the cancellation on its next re-check, so
    /// it returns [`PoolError::Cancelled`] up to 10 ms after the token fires.
    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|t| t.is_cancelled())
    }
}

/// Point-in-time view of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolState {
    pub capacity: usize,
    pub idle: usize,
    pub lent: usize,
    pub waiters: usize,
    pub closed: bool,
}

/// Outcome of [`Pool::shutdown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Idle connections closed cleanly.
    pub closed: usize,
    /// Idle connections whose close call failed (logged).
    pub failed: usize,
    /// Connections still lent when the pool was shut down.
    pub still_lent: usize,
}

struct Slot<C> {
    id: u64,
    conn: C,
}

struct State<C> {
    idle: VecDeque<Slot<C>>,
    lent: HashSet<u64>,
    waiters: usize,
    closed: bool,
}

struct Shared<M: ManageConnection> {
    manager: M,
    config: PoolConfig,
    state: Mutex<State<M::Connection>>,
    available: Condvar,
}

/// Cloneable handle to one pool. All clones share the same connections.
pub struct Pool<M: ManageConnection> {
    shared: Arc<Shared<M>>,
}

impl<M: ManageConnection> Clone for Pool<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M: ManageConnection> fmt::Debug for Pool<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool").field("state", &self.state()).finish()
    }
}

impl<M: ManageConnection> Pool<M> {
    /// Open `config.max_size` connections and build the pool.
    ///
    /// Either every connection opens and the pool is returned, or the ones
    /// already opened are closed again and the first failure is returned.
    pub fn connect(manager: M, config: PoolConfig) -> PoolResult<Self> {
        config.validate()?;
        let capacity = config.max_size;
        let mut idle = VecDeque::with_capacity(capacity);

        for index in 0..capacity {
            match manager.connect() {
                Ok(conn) => idle.push_back(Slot {
                    id: index as u64,
                    conn,
                }),
                Err(err) => {
                    log::error!(
                        "failed to open connection {} of {}: {}",
                        index + 1,
                        capacity,
                        err
                    );
                    for slot in idle.drain(..) {
                        if let Err(close_err) = manager.close(slot.conn) {
                            log::warn!(
                                "failed to close connection {} after init failure: {}",
                                slot.id,
                                close_err
                            );
                        }
                    }
                    return Err(PoolError::connect(index, capacity, err));
                }
            }
        }

        log::info!("connection pool ready with {} connections", capacity);

        Ok(Self {
            shared: Arc::new(Shared {
                manager,
                config,
                state: Mutex::new(State {
                    idle,
                    lent: HashSet::with_capacity(capacity),
                    waiters: 0,
                    closed: false,
                }),
                available: Condvar::new(),
            }),
        })
    }

    /// Borrow a connection, waiting as long as the configured
    /// `acquire_timeout` allows (indefinitely when unset).
    pub fn acquire(&self) -> PoolResult<PooledConnection<M>> {
        match self.shared.config.acquire_timeout {
            Some(timeout) => self.acquire_timeout(timeout),
            None => self.acquire_with(&AcquireOptions::new()),
        }
    }

    /// Borrow a connection, failing with [`PoolError::Timeout`] after `timeout`.
    pub fn acquire_timeout(&self, timeout: Duration) -> PoolResult<PooledConnection<M>> {
        self.acquire_with(&AcquireOptions::new().timeout(timeout))
    }

    /// Borrow a connection honouring a deadline and/or a cancellation token.
    pub fn acquire_with(&self, options: &AcquireOptions) -> PoolResult<PooledConnection<M>> {
        let started = Instant::now();
        let mut state = self.shared.state.lock();

        if state.closed {
            return Err(PoolError::Closed);
        }
        if let Some(slot) = state.idle.pop_front() {
            state.lent.insert(slot.id);
            return Ok(self.lend(slot));
        }

        state.waiters += 1;
        let outcome = loop {
            // Re-check after every wake: a notification is a hint, not a hand-off.
            if state.closed {
                break Err(PoolError::Closed);
            }
            if let Some(slot) = state.idle.pop_front() {
                break Ok(slot);
            }
            if options.is_cancelled() {
                break Err(PoolError::Cancelled);
            }

            let now = Instant::now();
            if let Some(deadline) = options.deadline {
                if now >= deadline {
                    break Err(PoolError::Timeout(
                        deadline.saturating_duration_since(started),
                    ));
                }
            }

            let poll_at = options.cancel.as_ref().map(|_| now + CANCEL_POLL_INTERVAL);
            let wake_at = match (options.deadline, poll_at) {
                (Some(deadline), Some(poll)) => Some(deadline.min(poll)),
                (deadline, poll) => deadline.or(poll),
            };
            match wake_at {
                Some(at) => {
                    self.shared.available.wait_until(&mut state, at);
                }
                None => self.shared.available.wait(&mut state),
            }
        };
        state.waiters -= 1;

        match outcome {
            Ok(slot) => {
                state.lent.insert(slot.id);
                Ok(self.lend(slot))
            }
            Err(err) => {
                log::debug!("acquire gave up after {:?}: {}", started.elapsed(), err);
                Err(err)
            }
        }
    }

    /// Return a connection explicitly. Equivalent to dropping the guard.
    pub fn release(&self, conn: PooledConnection<M>) {
        if !Arc::ptr_eq(&self.shared, &conn.pool.shared) {
            log::warn!(
                "connection {} released through a different pool; returning it to its owner",
                conn.slot_id()
            );
        }
        drop(conn);
    }

    /// Run `f` with a borrowed connection; the connection is returned on
    /// every exit path, including early returns and panics inside `f`.
    pub fn with_connection<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut M::Connection) -> Result<T, E>,
        E: From<PoolError>,
    {
        let mut conn = self.acquire()?;
        f(&mut *conn)
    }

    /// Close every idle connection and refuse further acquires.
    ///
    /// Close failures are logged and counted but never abort the shutdown.
    /// Connections still lent are reported and closed when they come back.
    pub fn shutdown(&self) -> ShutdownReport {
        let (slots, still_lent) = {
            let mut state = self.shared.state.lock();
            state.closed = true;
            let slots: Vec<_> = state.idle.drain(..).collect();
            (slots, state.lent.len())
        };
        self.shared.available.notify_all();

        let mut report = ShutdownReport {
            still_lent,
            ..ShutdownReport::default()
        };
        for slot in slots {
            match self.shared.manager.close(slot.conn) {
                Ok(()) => report.closed += 1,
                Err(err) => {
                    log::error!("failed to close connection {} during shutdown: {}", slot.id, err);
                    report.failed += 1;
                }
            }
        }

        if still_lent > 0 {
            log::warn!(
                "pool shut down with {} connection(s) still lent; they will be closed on return",
                still_lent
            );
        }
        log::info!(
            "pool shut down: {} closed, {} failed to close, {} still lent",
            report.closed,
            report.failed,
            report.still_lent
        );
        report
    }

    /// Snapshot of idle, lent and waiting counts.
    pub fn state(&self) -> PoolState {
        let state = self.shared.state.lock();
        PoolState {
            capacity: self.shared.config.max_size,
            idle: state.idle.len(),
            lent: state.lent.len(),
            waiters: state.waiters,
            closed: state.closed,
        }
    }

    /// Number of connections the pool owns.
    pub fn capacity(&self) -> usize {
        self.shared.config.max_size
    }

    /// Configuration the pool was built with.
    pub fn config(&self) -> &PoolConfig {
        &self.shared.config
    }

    /// Manager that opens and closes this pool's connections.
    pub fn manager(&self) -> &M {
        &self.shared.manager
    }

    fn lend(&self, slot: Slot<M::Connection>) -> PooledConnection<M> {
        PooledConnection {
            pool: self.clone(),
            slot: Some(slot),
        }
    }

    fn put_back(&self, slot: Slot<M::Connection>) {
        let mut state = self.shared.state.lock();

        // Guards only come back to the pool that lent them; an unknown id
        // means the lent set is corrupt, so the connection is not reused.
        if !state.lent.remove(&slot.id) {
            drop(state);
            log::error!(
                "connection {} returned but not lent by this pool; closing it",
                slot.id
            );
            self.close_quietly(slot);
            return;
        }

        if state.closed {
            drop(state);
            log::info!("connection {} returned after shutdown; closing it", slot.id);
            self.close_quietly(slot);
            return;
        }

        state.idle.push_back(slot);
        drop(state);
        self.shared.available.notify_one();
    }

    fn close_quietly(&self, slot: Slot<M::Connection>) {
        if let Err(err) = self.shared.manager.close(slot.conn) {
            log::error!("failed to close connection {}: {}", slot.id, err);
        }
    }
}

/// A connection lent by a [`Pool`]. Returned to the pool when dropped.
pub struct PooledConnection<M: ManageConnection> {
    pool: Pool<M>,
    slot: Option<Slot<M::Connection>>,
}

impl<M: ManageConnection> PooledConnection<M> {
    /// Stable identifier of the underlying connection within its pool.
    pub fn slot_id(&self) -> u64 {
        self.slot().id
    }

    /// The pool this connection belongs to.
    pub fn pool(&self) -> &Pool<M> {
        &self.pool
    }

    fn slot(&self) -> &Slot<M::Connection> {
        match &self.slot {
            Some(slot) => slot,
            None => unreachable!("pooled connection used after it was returned"),
        }
    }
}

impl<M: ManageConnection> Deref for PooledConnection<M> {
    type Target = M::Connection;

    fn deref(&self) -> &M::Connection {
        &self.slot().conn
    }
}

impl<M: ManageConnection> DerefMut for PooledConnection<M> {
    fn deref_mut(&mut self) -> &mut M::Connection {
        match &mut self.slot {
            Some(slot) => &mut slot.conn,
            None => unreachable!("pooled connection used after it was returned"),
        }
    }
}

impl<M: ManageConnection> Drop for PooledConnection<M> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            self.pool.put_back(slot);
        }
    }
}

impl<M: ManageConnection> fmt::Debug for PooledConnection<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("slot_id", &self.slot.as_ref().map(|s| s.id))
            .finish()
    }
}
