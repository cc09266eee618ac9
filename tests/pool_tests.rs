//! Concurrency tests for the bounded connection pool.
//!
//! These run on plain std threads: the pool's contract is thread-level
//! blocking with a timeout, independent of the coroutine runtime.

mod common;

use common::fake_db::FakeDbFactory;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tunedeck::pool::{Pool, PoolError};

const HOLD: Duration = Duration::from_millis(100);

/// Under contention from more callers than capacity, the number of loans
/// outstanding at any instant never exceeds capacity.
#[test]
fn at_most_capacity_connections_are_lent() {
    for capacity in [1usize, 2, 4] {
        let pool = Arc::new(Pool::new(FakeDbFactory::new(), capacity));
        let outstanding = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut workers = Vec::new();
        for _ in 0..capacity * 3 {
            let pool = Arc::clone(&pool);
            let outstanding = Arc::clone(&outstanding);
            let peak = Arc::clone(&peak);
            workers.push(thread::spawn(move || {
                let guard = pool.acquire(Duration::from_secs(5)).expect("acquire");
                let now = outstanding.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(20));
                outstanding.fetch_sub(1, Ordering::SeqCst);
                drop(guard);
            }));
        }
        for worker in workers {
            worker.join().expect("worker thread");
        }

        assert!(
            peak.load(Ordering::SeqCst) <= capacity,
            "peak {} exceeded capacity {}",
            peak.load(Ordering::SeqCst),
            capacity
        );
    }
}

/// A blocked acquirer is woken by a release rather than waiting out its
/// whole timeout.
#[test]
fn release_wakes_a_blocked_acquirer() {
    let pool = Arc::new(Pool::new(FakeDbFactory::new(), 1));
    let guard = pool.acquire(Duration::from_secs(1)).expect("first acquire");

    let start = Instant::now();
    let waiter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || {
            let guard = pool.acquire(Duration::from_secs(5)).expect("second acquire");
            drop(guard);
        })
    };

    thread::sleep(HOLD);
    drop(guard);
    waiter.join().expect("waiter thread");

    let waited = start.elapsed();
    assert!(waited >= HOLD, "acquired before the loan was returned: {waited:?}");
    assert!(waited < Duration::from_secs(4), "waited out the timeout: {waited:?}");
}

/// Acquisition never hangs past its timeout (plus scheduling slack).
#[test]
fn exhausted_pool_times_out_promptly() {
    let pool = Pool::new(FakeDbFactory::new(), 1);
    let _held = pool.acquire(Duration::from_millis(100)).expect("acquire");

    let start = Instant::now();
    let result = pool.acquire(Duration::from_millis(200));
    let elapsed = start.elapsed();

    assert!(matches!(result, Err(PoolError::Unavailable { .. })));
    assert!(elapsed >= Duration::from_millis(180));
    assert!(
        elapsed < Duration::from_millis(1200),
        "timed out too slowly: {elapsed:?}"
    );
}

/// A connection that died while idle is replaced before the next caller
/// sees it.
#[test]
fn dead_idle_connection_is_replaced_on_acquire() {
    let pool = Pool::new(FakeDbFactory::new(), 2);
    assert_eq!(pool.factory().connects.load(Ordering::SeqCst), 2);

    pool.factory().valid.store(false, Ordering::SeqCst);
    let guard = pool.acquire(Duration::from_millis(200)).expect("acquire");
    assert!(guard.is_live());
    assert_eq!(
        pool.factory().connects.load(Ordering::SeqCst),
        3,
        "expected one reconnect"
    );
}

/// When reconnection fails too, the caller still gets the connection and
/// the failure surfaces on use, not as an acquisition error.
#[test]
fn failed_recovery_is_the_callers_problem_not_the_pools() {
    let pool = Pool::new(FakeDbFactory::new(), 1);
    pool.factory().valid.store(false, Ordering::SeqCst);
    pool.factory().fail_connect.store(true, Ordering::SeqCst);

    let guard = pool.acquire(Duration::from_millis(200)).expect("acquire");
    assert!(!guard.is_live());
    drop(guard);

    // The slot stayed in rotation; once the backend recovers, so does the
    // connection.
    pool.factory().fail_connect.store(false, Ordering::SeqCst);
    let guard = pool.acquire(Duration::from_millis(200)).expect("acquire");
    assert!(guard.is_live());
}

/// Shutdown wakes blocked acquirers with `Closed` instead of leaving them
/// to time out.
#[test]
fn shutdown_wakes_blocked_acquirers() {
    let pool = Arc::new(Pool::new(FakeDbFactory::new(), 1));
    let _held = pool.acquire(Duration::from_secs(1)).expect("acquire");

    let waiter = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || pool.acquire(Duration::from_secs(10)).map(drop))
    };

    thread::sleep(Duration::from_millis(50));
    pool.shutdown();

    match waiter.join().expect("waiter thread") {
        Err(PoolError::Closed) => {}
        other => panic!("expected Closed, got {other:?}"),
    }
}
