//! Connection lifecycle.
//!
//! [`ConnectionManager`] owns the single driver handle. Rotations take the
//! slot shared so they run in parallel; `initialize` and `close` take it
//! exclusively and therefore wait for in-flight rotations to drain. The
//! driver's handle does its own pooling, so sharing one handle between
//! concurrent rotations is safe.

use std::ops::Deref;
use std::sync::PoisonError;

use asupersync::sync::{RwLock, RwLockError, RwLockReadGuard};
use asupersync::{CancelKind, CancelReason, Cx, Outcome};
use dbrotate_core::{ConfigMap, Connection, ConnectionError, ConnectionErrorKind, Error, SecretMap};
use dbrotate_pool::Driver;

use crate::config::ConnectionConfig;
use crate::mask::SecretMasker;

/// Shared access to an initialized connection.
///
/// Holding the guard keeps `initialize` and `close` from replacing the handle.
pub struct ConnectionGuard<'a, C> {
    slot: RwLockReadGuard<'a, Option<C>>,
}

impl<C> Deref for ConnectionGuard<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        match self.slot.as_ref() {
            Some(conn) => conn,
            None => unreachable!("connection guard over an empty slot"),
        }
    }
}

/// Owns the driver handle and the configuration it was opened with.
pub struct ConnectionManager<D: Driver> {
    driver: D,
    slot: RwLock<Option<D::Conn>>,
    // Read without the slot lock so error redaction never waits on a rotation.
    config: std::sync::RwLock<ConnectionConfig>,
}

impl<D: Driver> ConnectionManager<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            slot: RwLock::new(None),
            config: std::sync::RwLock::new(ConnectionConfig::default()),
        }
    }

    /// Snapshot of the most recently decoded configuration.
    pub fn config(&self) -> ConnectionConfig {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Redaction map for the current configuration.
    pub fn secret_values(&self) -> SecretMap {
        SecretMasker::values(
            &self
                .config
                .read()
                .unwrap_or_else(PoisonError::into_inner),
        )
    }

    fn store_config(&self, config: ConnectionConfig) {
        *self
            .config
            .write()
            .unwrap_or_else(PoisonError::into_inner) = config;
    }

    /// Replace the connection with one built from `raw`.
    ///
    /// Any existing handle is closed first, so a failed initialization
    /// leaves the manager uninitialized rather than on the old handle.
    /// With `verify` set the new handle is pinged, and closed again if the
    /// ping fails.
    #[tracing::instrument(level = "debug", skip_all, fields(verify = verify))]
    pub async fn initialize(
        &self,
        cx: &Cx,
        raw: &ConfigMap,
        verify: bool,
    ) -> Outcome<ConnectionConfig, Error> {
        if let Some(reason) = cx.cancel_reason() {
            return Outcome::Cancelled(reason);
        }

        let mut slot = match self.slot.write(cx).await {
            Ok(slot) => slot,
            Err(e) => return lock_failure(cx, e),
        };

        if let Some(old) = slot.take() {
            if let Err(e) = old.close(cx).await {
                let e = e.redact(&self.secret_values());
                tracing::warn!(error = %e, "failed to close existing DB2 connection");
            }
        }

        let config = match ConnectionConfig::decode(raw) {
            Ok(config) => config,
            Err(e) => return Outcome::Err(e.into()),
        };
        self.store_config(config.clone());

        let pool = config.pool_config();
        let conn = match self
            .driver
            .open(cx, &config.connection_string(), &pool)
            .await
        {
            Outcome::Ok(conn) => conn,
            Outcome::Err(e) => {
                return Outcome::Err(
                    ConnectionError::new(ConnectionErrorKind::Open, "failed to open DB2 connection")
                        .with_source(e)
                        .into(),
                );
            }
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        if verify {
            match conn.ping(cx).await {
                Outcome::Ok(()) => {
                    tracing::debug!("DB2 connection verified successfully");
                }
                Outcome::Err(e) => {
                    close_quietly(cx, conn).await;
                    return Outcome::Err(
                        ConnectionError::new(
                            ConnectionErrorKind::Verify,
                            "failed to verify DB2 connection",
                        )
                        .with_source(e)
                        .into(),
                    );
                }
                Outcome::Cancelled(r) => {
                    close_quietly(cx, conn).await;
                    return Outcome::Cancelled(r);
                }
                Outcome::Panicked(p) => {
                    close_quietly(cx, conn).await;
                    return Outcome::Panicked(p);
                }
            }
        }

        *slot = Some(conn);
        tracing::info!(
            max_open = ?pool.max_open_connections,
            max_idle = ?pool.max_idle_connections,
            "DB2 connection initialized"
        );
        Outcome::Ok(config)
    }

    /// Shared access to the connection, or `NotInitialized` when there is none.
    pub async fn acquire(&self, cx: &Cx) -> Outcome<ConnectionGuard<'_, D::Conn>, Error> {
        if let Some(reason) = cx.cancel_reason() {
            return Outcome::Cancelled(reason);
        }
        let slot = match self.slot.read(cx).await {
            Ok(slot) => slot,
            Err(e) => return lock_failure(cx, e),
        };
        if slot.is_none() {
            return Outcome::Err(Error::NotInitialized);
        }
        Outcome::Ok(ConnectionGuard { slot })
    }

    /// Whether a handle is currently installed.
    pub async fn is_initialized(&self, cx: &Cx) -> bool {
        match self.slot.read(cx).await {
            Ok(slot) => slot.is_some(),
            Err(_) => false,
        }
    }

    /// Close and drop the handle. Closing an empty manager succeeds.
    #[tracing::instrument(level = "debug", skip_all)]
    pub async fn close(&self, cx: &Cx) -> Outcome<(), Error> {
        if let Some(reason) = cx.cancel_reason() {
            return Outcome::Cancelled(reason);
        }
        let mut slot = match self.slot.write(cx).await {
            Ok(slot) => slot,
            Err(e) => return lock_failure(cx, e),
        };
        let Some(conn) = slot.take() else {
            return Outcome::Ok(());
        };
        match conn.close(cx).await {
            Ok(()) => {
                tracing::debug!("DB2 connection closed");
                Outcome::Ok(())
            }
            Err(e) => Outcome::Err(
                ConnectionError::new(ConnectionErrorKind::Close, "failed to close DB2 connection")
                    .with_source(e)
                    .into(),
            ),
        }
    }
}

impl<D: Driver + std::fmt::Debug> std::fmt::Debug for ConnectionManager<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("driver", &self.driver)
            .field("config", &self.config())
            .finish_non_exhaustive()
    }
}

async fn close_quietly<C: Connection>(cx: &Cx, conn: C) {
    if let Err(e) = conn.close(cx).await {
        tracing::debug!(error = %e, "failed to close unverified DB2 connection");
    }
}

/// A cancelled wait is a cancellation, not a connection failure.
fn lock_failure<T>(cx: &Cx, err: RwLockError) -> Outcome<T, Error> {
    match err {
        RwLockError::Cancelled => Outcome::Cancelled(
            cx.cancel_reason()
                .unwrap_or_else(|| CancelReason::new(CancelKind::User)),
        ),
        RwLockError::Poisoned | RwLockError::PolledAfterCompletion => Outcome::Err(
            ConnectionError::new(ConnectionErrorKind::Lock, "failed to acquire connection lock")
                .into(),
        ),
    }
}
