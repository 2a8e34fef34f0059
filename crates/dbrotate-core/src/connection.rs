//! Database connection trait.
//!
//! A [`Connection`] is the live handle a backend rotates credentials through.
//! Only raw SQL text execution, a connectivity probe and a graceful close are
//! needed: administrative statements such as `ALTER USER` cannot take bound
//! parameters on most servers, so the trait carries no parameter binding.
//!
//! All operations integrate with asupersync's structured concurrency via `Cx`
//! context for proper cancellation and timeout handling.

use std::future::Future;

use crate::error::Result;
use asupersync::{Cx, Outcome};

/// A database connection capable of executing administrative statements.
///
/// All operations are async and take a `Cx` context for cancellation/timeout support.
/// Implementations must be `Send + Sync` so that concurrent rotations can share
/// one handle; any sub-connection pooling happens beneath this trait.
///
/// # Example
///
/// ```rust,ignore
/// let affected = conn.execute(&cx, r#"ALTER USER "app" IDENTIFIED BY "n3w""#).await;
/// conn.ping(&cx).await;
/// conn.close(&cx).await?;
/// ```
pub trait Connection: Send + Sync {
    /// Execute a single raw SQL statement and return rows affected.
    fn execute(&self, cx: &Cx, sql: &str) -> impl Future<Output = Outcome<u64, crate::Error>> + Send;

    /// Check that the connection is usable by sending a ping.
    fn ping(&self, cx: &Cx) -> impl Future<Output = Outcome<(), crate::Error>> + Send;

    /// Close the connection gracefully.
    fn close(self, cx: &Cx) -> impl Future<Output = Result<()>> + Send;
}
