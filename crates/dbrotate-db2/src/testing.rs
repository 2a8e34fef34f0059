//! Recording mock driver for tests.
//!
//! [`MockDriver`] hands out [`MockConnection`]s that share one recorder. It
//! records every DSN opened, every statement executed and every ping/close,
//! and can be told to fail opening, pinging or a specific statement, or to
//! cancel a context after a given statement. For concurrency tests it can
//! hold statements in flight until released.

use std::future::Future;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use asupersync::runtime::RuntimeBuilder;
use asupersync::{CancelKind, Cx, Outcome};
use dbrotate_core::{Connection, Error};
use dbrotate_pool::{Driver, PoolConfig};

/// Upper bound on how long a held statement waits before giving up.
const HOLD_LIMIT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
enum Failure {
    Message(String),
    Timeout,
}

impl Failure {
    fn to_error(&self) -> Error {
        match self {
            Failure::Message(msg) => Error::Custom(msg.clone()),
            Failure::Timeout => Error::Timeout,
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    opened: Vec<(String, PoolConfig)>,
    ping_calls: usize,
    close_calls: usize,
    executed: Vec<String>,
    in_flight: usize,
    max_in_flight: usize,
    held: bool,
    fail_open: Option<Failure>,
    fail_ping: Option<Failure>,
    fail_statement: Option<(usize, Failure)>,
    cancel_after: Option<(usize, Cx)>,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<MockState>,
    changed: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// A driver that opens [`MockConnection`]s and records what they do.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    shared: Arc<Shared>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `open` fail with `message`.
    pub fn fail_open(&self, message: impl Into<String>) {
        self.shared.lock().fail_open = Some(Failure::Message(message.into()));
    }

    /// Make every subsequent `ping` fail with `message`.
    pub fn fail_ping(&self, message: impl Into<String>) {
        self.shared.lock().fail_ping = Some(Failure::Message(message.into()));
    }

    /// Make the `n`-th executed statement (1-based, counted across all
    /// connections) fail with `message`.
    pub fn fail_statement(&self, n: usize, message: impl Into<String>) {
        self.shared.lock().fail_statement = Some((n, Failure::Message(message.into())));
    }

    /// Make the `n`-th executed statement report an expired deadline.
    pub fn timeout_statement(&self, n: usize) {
        self.shared.lock().fail_statement = Some((n, Failure::Timeout));
    }

    /// Cancel `cx` with a timeout once the `n`-th statement has run.
    pub fn cancel_after(&self, n: usize, cx: &Cx) {
        self.shared.lock().cancel_after = Some((n, cx.clone()));
    }

    /// Hold every statement in flight until [`release`](Self::release).
    pub fn hold(&self) {
        self.shared.lock().held = true;
    }

    /// Let held statements complete.
    pub fn release(&self) {
        self.shared.lock().held = false;
        self.shared.changed.notify_all();
    }

    /// Block until at least `n` statements are in flight at once.
    pub fn wait_for_in_flight(&self, n: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.lock();
        while state.in_flight < n {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            state = self
                .shared
                .changed
                .wait_timeout(state, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
        true
    }

    pub fn open_calls(&self) -> usize {
        self.shared.lock().opened.len()
    }

    /// DSN passed to the most recent `open`.
    pub fn last_dsn(&self) -> Option<String> {
        self.shared.lock().opened.last().map(|(dsn, _)| dsn.clone())
    }

    /// Pool limits passed to the most recent `open`.
    pub fn last_pool(&self) -> Option<PoolConfig> {
        self.shared.lock().opened.last().map(|(_, pool)| pool.clone())
    }

    pub fn ping_calls(&self) -> usize {
        self.shared.lock().ping_calls
    }

    pub fn close_calls(&self) -> usize {
        self.shared.lock().close_calls
    }

    /// Handles opened and not yet closed.
    pub fn live_connections(&self) -> usize {
        let state = self.shared.lock();
        state.opened.len() - state.close_calls
    }

    pub fn execute_calls(&self) -> usize {
        self.shared.lock().executed.len()
    }

    /// Every statement executed so far, in order.
    pub fn executed(&self) -> Vec<String> {
        self.shared.lock().executed.clone()
    }

    /// Highest number of statements observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.shared.lock().max_in_flight
    }
}

impl Driver for MockDriver {
    type Conn = MockConnection;

    async fn open(&self, _cx: &Cx, dsn: &str, pool: &PoolConfig) -> Outcome<MockConnection, Error> {
        let mut state = self.shared.lock();
        if let Some(failure) = &state.fail_open {
            return Outcome::Err(failure.to_error());
        }
        state.opened.push((dsn.to_string(), pool.clone()));
        Outcome::Ok(MockConnection {
            shared: Arc::clone(&self.shared),
        })
    }
}

/// Connection handed out by [`MockDriver`].
#[derive(Debug)]
pub struct MockConnection {
    shared: Arc<Shared>,
}

impl MockConnection {
    fn run(&self, sql: &str) -> Outcome<u64, Error> {
        let mut state = self.shared.lock();
        state.executed.push(sql.to_string());
        let index = state.executed.len();
        state.in_flight += 1;
        state.max_in_flight = state.max_in_flight.max(state.in_flight);
        self.shared.changed.notify_all();

        let deadline = Instant::now() + HOLD_LIMIT;
        while state.held && Instant::now() < deadline {
            state = self
                .shared
                .changed
                .wait_timeout(state, Duration::from_millis(20))
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }

        state.in_flight -= 1;
        self.shared.changed.notify_all();

        if let Some((_, cx)) = state.cancel_after.as_ref().filter(|(n, _)| *n == index) {
            cx.cancel_with(CancelKind::Timeout, Some("statement deadline"));
        }

        match &state.fail_statement {
            Some((n, failure)) if *n == index => Outcome::Err(failure.to_error()),
            _ => Outcome::Ok(0),
        }
    }
}

impl Connection for MockConnection {
    async fn execute(&self, _cx: &Cx, sql: &str) -> Outcome<u64, Error> {
        self.run(sql)
    }

    async fn ping(&self, _cx: &Cx) -> Outcome<(), Error> {
        let mut state = self.shared.lock();
        state.ping_calls += 1;
        match &state.fail_ping {
            Some(failure) => Outcome::Err(failure.to_error()),
            None => Outcome::Ok(()),
        }
    }

    async fn close(self, _cx: &Cx) -> dbrotate_core::Result<()> {
        self.shared.lock().close_calls += 1;
        Ok(())
    }
}

/// Unwrap a successful outcome, panicking with the error otherwise.
pub fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(v) => v,
        Outcome::Err(e) => panic!("unexpected error: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

/// Drive a future to completion on a fresh current-thread runtime.
pub fn block_on<F: Future>(future: F) -> F::Output {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    rt.block_on(future)
}
