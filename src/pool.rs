//! # Connection Pool Module
//!
//! A bounded pool of long-lived external connections with blocking
//! acquisition, lazy health verification, and in-place recovery.
//!
//! ## Design
//!
//! - **Bounded**: the pool is created with a fixed capacity and never grows.
//!   Under load, at most `capacity` connections are lent out concurrently;
//!   further acquirers block until a loan is returned or their timeout
//!   elapses.
//! - **Blocking with timeout**: `acquire` parks the calling worker thread on
//!   a condition variable. Pool exhaustion is surfaced as
//!   [`PoolError::Unavailable`] - a backpressure condition, not a connection
//!   fault.
//! - **Lazy validation**: a connection is only health-checked when it is
//!   about to be handed out. A dead connection gets one synchronous
//!   reconnect-in-place; if that fails too, the connection is handed out
//!   anyway and the caller's next operation surfaces the failure. The slot is
//!   never discarded, so the pool cannot shrink by attrition.
//! - **Scoped release**: acquisition returns a [`PoolGuard`]; the loan ends
//!   when the guard drops, on every exit path. Double release and
//!   release-without-acquire are structurally impossible.
//!
//! ## Locking
//!
//! One `Mutex` protects the idle queue, one `Condvar` wakes blocked
//! acquirers. The critical section is queue manipulation only - connection
//! I/O (validation, reconnect, close) always happens outside the lock.
//!
//! ## Example
//!
//! ```rust,ignore
//! let pool = Pool::new(MySqlFactory::from_config(&config.database), 5);
//! let mut conn = pool.acquire(Duration::from_secs(3))?;
//! conn.exec_drop("DELETE FROM play_history WHERE user_id = ?", (user_id,))?;
//! // guard drops here; the connection returns to the idle queue
//! ```

use std::collections::VecDeque;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Establishes, validates, and tears down the external connections a
/// [`Pool`] manages.
///
/// The pool itself is transport-agnostic; production code plugs in the MySQL
/// factory from [`crate::db`], tests plug in fakes.
pub trait ConnectionFactory: Send + Sync + 'static {
    type Conn: Send;

    /// Establish one new connection.
    fn connect(&self) -> anyhow::Result<Self::Conn>;

    /// Cheaply check whether an idle connection is still usable.
    fn is_valid(&self, conn: &mut Self::Conn) -> bool;

    /// Tear a connection down. The default is to drop it.
    fn disconnect(&self, conn: Self::Conn) {
        drop(conn);
    }
}

/// Why an acquisition attempt produced no connection.
#[derive(Debug)]
pub enum PoolError {
    /// Every connection stayed lent out for the whole timeout. This is a
    /// capacity condition, not a connection fault - callers should surface
    /// it and move on, not retry in a tight loop.
    Unavailable {
        /// How long the caller waited before giving up.
        waited: Duration,
    },
    /// The pool has been shut down; no further acquisitions will succeed.
    Closed,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::Unavailable { waited } => write!(
                f,
                "connection pool exhausted: no connection became available within {waited:?}"
            ),
            PoolError::Closed => write!(f, "connection pool is shut down"),
        }
    }
}

impl std::error::Error for PoolError {}

/// One pool slot: the connection plus its health bookkeeping.
struct PooledConnection<C> {
    conn: C,
    /// Outcome of the most recent validation or reconnect attempt. A `false`
    /// here means the caller received a connection whose next operation is
    /// expected to fail.
    live: bool,
    last_validated: Instant,
}

struct PoolState<C> {
    idle: VecDeque<PooledConnection<C>>,
    closed: bool,
}

/// Bounded connection pool. See the [module docs](self) for the contract.
pub struct Pool<F: ConnectionFactory> {
    factory: F,
    capacity: usize,
    established: usize,
    state: Mutex<PoolState<F::Conn>>,
    available: Condvar,
}

impl<F: ConnectionFactory> Pool<F> {
    /// Eagerly establish up to `capacity` connections.
    ///
    /// A slot whose connection fails to establish is logged and left absent;
    /// the pool starts below nominal capacity rather than failing startup.
    pub fn new(factory: F, capacity: usize) -> Self {
        let mut idle = VecDeque::with_capacity(capacity);
        for slot in 0..capacity {
            match factory.connect() {
                Ok(conn) => idle.push_back(PooledConnection {
                    conn,
                    live: true,
                    last_validated: Instant::now(),
                }),
                Err(e) => {
                    error!(slot = slot, error = %e, "Failed to establish pool connection");
                }
            }
        }

        let established = idle.len();
        if established == capacity {
            info!(capacity = capacity, "Connection pool created");
        } else {
            warn!(
                capacity = capacity,
                established = established,
                "Connection pool created below nominal capacity"
            );
        }

        Pool {
            factory,
            capacity,
            established,
            state: Mutex::new(PoolState {
                idle,
                closed: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Nominal capacity the pool was created with.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The factory this pool establishes connections with.
    #[must_use]
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// How many connections were actually established at construction.
    #[must_use]
    pub fn established(&self) -> usize {
        self.established
    }

    /// Number of connections currently idle (not lent out).
    #[must_use]
    pub fn available(&self) -> usize {
        self.lock_state().idle.len()
    }

    /// Borrow a connection, blocking the calling thread for up to `timeout`.
    ///
    /// On success the popped connection is validated outside the pool lock;
    /// a dead one gets a single reconnect attempt before being handed out.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Unavailable`] if no connection was released within
    ///   `timeout`
    /// - [`PoolError::Closed`] if the pool was shut down before or during
    ///   the wait
    pub fn acquire(&self, timeout: Duration) -> Result<PoolGuard<'_, F>, PoolError> {
        let start = Instant::now();
        let mut slot = {
            let state = self.lock_state();
            if state.closed {
                return Err(PoolError::Closed);
            }

            let (mut state, _timed_out) = self
                .available
                .wait_timeout_while(state, timeout, |s| !s.closed && s.idle.is_empty())
                .unwrap_or_else(PoisonError::into_inner);

            if state.closed {
                return Err(PoolError::Closed);
            }
            match state.idle.pop_front() {
                Some(slot) => slot,
                None => {
                    let waited = start.elapsed();
                    warn!(waited_ms = waited.as_millis() as u64, "Pool acquisition timed out");
                    return Err(PoolError::Unavailable { waited });
                }
            }
        };

        // Validation and reconnect do network I/O; the pool lock is already
        // released at this point.
        slot.live = self.factory.is_valid(&mut slot.conn);
        if !slot.live {
            warn!("Pooled connection is not valid, trying to reconnect");
            match self.factory.connect() {
                Ok(fresh) => {
                    let dead = std::mem::replace(&mut slot.conn, fresh);
                    self.factory.disconnect(dead);
                    slot.live = true;
                    info!("Pooled connection re-established");
                }
                Err(e) => {
                    // Hand the dead connection out anyway: the caller's next
                    // operation surfaces the failure, and the slot returns to
                    // the queue for another recovery attempt later.
                    error!(error = %e, "Reconnect failed");
                }
            }
        }
        slot.last_validated = Instant::now();

        Ok(PoolGuard {
            pool: self,
            slot: Some(slot),
        })
    }

    /// Close every idle connection and refuse further acquisitions.
    ///
    /// Idempotent. Loans still outstanding are closed, best-effort, when
    /// their guards drop.
    pub fn shutdown(&self) {
        let drained: Vec<PooledConnection<F::Conn>> = {
            let mut state = self.lock_state();
            if state.closed {
                return;
            }
            state.closed = true;
            state.idle.drain(..).collect()
        };
        self.available.notify_all();

        let closed = drained.len();
        for slot in drained {
            self.factory.disconnect(slot.conn);
        }
        info!(closed = closed, "Connection pool shut down");
    }

    /// Return a loan to the idle queue and wake one waiting acquirer.
    /// Only reachable through [`PoolGuard::drop`].
    fn release(&self, slot: PooledConnection<F::Conn>) {
        let mut state = self.lock_state();
        if state.closed {
            drop(state);
            self.factory.disconnect(slot.conn);
            return;
        }
        state.idle.push_back(slot);
        drop(state);
        self.available.notify_one();
    }

    fn lock_state(&self) -> MutexGuard<'_, PoolState<F::Conn>> {
        // A poisoned lock means some thread panicked mid-section; the queue
        // itself is still structurally sound, so keep going.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Scoped loan of one pooled connection.
///
/// Derefs to the underlying connection. Dropping the guard returns the
/// connection to the pool on every exit path - success, business error, or
/// panic unwind - so handlers cannot forget to release.
pub struct PoolGuard<'a, F: ConnectionFactory> {
    pool: &'a Pool<F>,
    slot: Option<PooledConnection<F::Conn>>,
}

impl<F: ConnectionFactory> PoolGuard<'_, F> {
    /// Whether the most recent validation or reconnect succeeded. A `false`
    /// means operations on this connection are expected to fail.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.slot.as_ref().map(|s| s.live).unwrap_or(false)
    }

    /// When this connection last passed (or failed) validation.
    #[must_use]
    pub fn last_validated(&self) -> Option<Instant> {
        self.slot.as_ref().map(|s| s.last_validated)
    }
}

impl<F: ConnectionFactory> Deref for PoolGuard<'_, F> {
    type Target = F::Conn;

    fn deref(&self) -> &Self::Target {
        // Invariant: `slot` is only `None` after drop.
        &self.slot.as_ref().expect("pool guard already released").conn
    }
}

impl<F: ConnectionFactory> DerefMut for PoolGuard<'_, F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.slot.as_mut().expect("pool guard already released").conn
    }
}

impl<F: ConnectionFactory> Drop for PoolGuard<'_, F> {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            self.pool.release(slot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// In-memory factory: connections are just sequence numbers.
    struct FakeFactory {
        connects: AtomicUsize,
        fail_connect: AtomicBool,
        valid: AtomicBool,
    }

    impl FakeFactory {
        fn new() -> Self {
            FakeFactory {
                connects: AtomicUsize::new(0),
                fail_connect: AtomicBool::new(false),
                valid: AtomicBool::new(true),
            }
        }
    }

    impl ConnectionFactory for FakeFactory {
        type Conn = usize;

        fn connect(&self) -> anyhow::Result<usize> {
            if self.fail_connect.load(Ordering::SeqCst) {
                anyhow::bail!("connect refused");
            }
            Ok(self.connects.fetch_add(1, Ordering::SeqCst))
        }

        fn is_valid(&self, _conn: &mut usize) -> bool {
            self.valid.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn establishes_capacity_connections() {
        let pool = Pool::new(FakeFactory::new(), 3);
        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.established(), 3);
        assert_eq!(pool.available(), 3);
    }

    #[test]
    fn failed_slots_leave_pool_below_capacity() {
        let factory = FakeFactory::new();
        factory.fail_connect.store(true, Ordering::SeqCst);
        let pool = Pool::new(factory, 3);
        assert_eq!(pool.capacity(), 3);
        assert_eq!(pool.established(), 0);
    }

    #[test]
    fn guard_drop_returns_connection() {
        let pool = Pool::new(FakeFactory::new(), 1);
        {
            let guard = pool.acquire(Duration::from_millis(100)).expect("acquire");
            assert!(guard.is_live());
            assert_eq!(pool.available(), 0);
        }
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn empty_pool_times_out_with_unavailable() {
        let pool = Pool::new(FakeFactory::new(), 1);
        let _held = pool.acquire(Duration::from_millis(50)).expect("first acquire");
        match pool.acquire(Duration::from_millis(50)) {
            Err(PoolError::Unavailable { waited }) => {
                assert!(waited >= Duration::from_millis(40));
            }
            Err(other) => panic!("expected Unavailable, got {other:?}"),
            Ok(_) => panic!("expected Unavailable, got a connection"),
        };
    }

    #[test]
    fn dead_connection_is_reconnected_in_place() {
        let pool = Pool::new(FakeFactory::new(), 1);
        pool.factory.valid.store(false, Ordering::SeqCst);
        let guard = pool.acquire(Duration::from_millis(100)).expect("acquire");
        // One initial connect plus one reconnect.
        assert_eq!(pool.factory.connects.load(Ordering::SeqCst), 2);
        assert!(guard.is_live());
    }

    #[test]
    fn failed_reconnect_still_hands_out_the_connection() {
        let pool = Pool::new(FakeFactory::new(), 1);
        pool.factory.valid.store(false, Ordering::SeqCst);
        pool.factory.fail_connect.store(true, Ordering::SeqCst);
        let guard = pool.acquire(Duration::from_millis(100)).expect("acquire");
        assert!(!guard.is_live());
        drop(guard);
        // The slot went back to the queue rather than leaking.
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn shutdown_fails_acquisitions_fast() {
        let pool = Pool::new(FakeFactory::new(), 2);
        pool.shutdown();
        assert!(matches!(
            pool.acquire(Duration::from_secs(5)),
            Err(PoolError::Closed)
        ));
        // Idempotent.
        pool.shutdown();
    }

    #[test]
    fn release_after_shutdown_closes_the_loan() {
        let pool = Pool::new(FakeFactory::new(), 1);
        let guard = pool.acquire(Duration::from_millis(100)).expect("acquire");
        pool.shutdown();
        drop(guard);
        assert_eq!(pool.available(), 0);
    }
}
