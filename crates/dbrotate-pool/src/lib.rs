//! Connection pool limits and the driver seam for dbrotate.
//!
//! A backend owns a single logical handle; the driver beneath it may keep
//! several physical connections. [`PoolConfig`] carries the limits the
//! administrator configured and [`Driver`] opens a handle honouring them.
//!
//! Limits are optional: an unset limit leaves the driver's own default in
//! place, and non-positive configured values count as unset.

use std::future::Future;
use std::time::Duration;

use asupersync::{Cx, Outcome};
use dbrotate_core::{Connection, Error};

/// Connection pool configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolConfig {
    /// Maximum number of open connections
    pub max_open_connections: Option<usize>,
    /// Maximum number of idle connections kept around
    pub max_idle_connections: Option<usize>,
    /// Maximum amount of time a connection may be reused
    pub max_lifetime: Option<Duration>,
}

impl PoolConfig {
    /// Create a configuration that leaves every limit to the driver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from raw configured values, dropping anything that is not positive.
    pub fn from_limits(
        max_open: Option<i64>,
        max_idle: Option<i64>,
        max_lifetime: Option<Duration>,
    ) -> Self {
        Self {
            max_open_connections: positive(max_open),
            max_idle_connections: positive(max_idle),
            max_lifetime: max_lifetime.filter(|d| !d.is_zero()),
        }
    }

    /// Set max open connections.
    pub fn max_open(mut self, n: usize) -> Self {
        self.max_open_connections = (n > 0).then_some(n);
        self
    }

    /// Set max idle connections.
    pub fn max_idle(mut self, n: usize) -> Self {
        self.max_idle_connections = (n > 0).then_some(n);
        self
    }

    /// Set max lifetime.
    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = (!lifetime.is_zero()).then_some(lifetime);
        self
    }

    /// True when no limit is configured.
    pub fn is_unbounded(&self) -> bool {
        self.max_open_connections.is_none()
            && self.max_idle_connections.is_none()
            && self.max_lifetime.is_none()
    }
}

fn positive(value: Option<i64>) -> Option<usize> {
    value
        .filter(|v| *v > 0)
        .and_then(|v| usize::try_from(v).ok())
}

/// Opens pooled database handles from a driver connection string.
///
/// Opening is allowed to be lazy: a driver may defer the first physical
/// connection until a statement runs, which is why callers that need
/// certainty follow up with [`Connection::ping`].
pub trait Driver: Send + Sync {
    /// The handle type this driver produces.
    type Conn: Connection + 'static;

    /// Open a handle for `dsn`, applying the limits in `pool`.
    fn open(
        &self,
        cx: &Cx,
        dsn: &str,
        pool: &PoolConfig,
    ) -> impl Future<Output = Outcome<Self::Conn, Error>> + Send;
}
