//! DB2 static-credential rotation backend.
//!
//! `dbrotate-db2` rotates the passwords of accounts that already exist in a
//! DB2 database. The host configures a connection through
//! [`Database::initialize`](dbrotate_core::Database::initialize) and asks for
//! rotations through [`Database::update_user`](dbrotate_core::Database::update_user);
//! creating and deleting accounts is not supported.
//!
//! # Components
//!
//! - [`ConnectionConfig`]: weakly typed decoding of the host's configuration
//! - [`ConnectionManager`]: owns the driver handle behind a reader/writer lock
//! - [`RotationExecutor`]: renders and runs the password-change statements
//! - [`SecretMasker`]: maps live credentials to redaction placeholders
//! - [`Db2Database`]: the lifecycle facade tying them together
//!
//! The wire protocol belongs to the [`Driver`](dbrotate_pool::Driver)
//! supplied by the caller; this crate only builds its connection string.
//!
//! # Example
//!
//! ```ignore
//! use dbrotate_core::{ChangePassword, Cx, Database, InitializeRequest, UpdateUserRequest};
//!
//! let db = dbrotate_db2::new(driver);
//! db.initialize(&cx, InitializeRequest::new(config).verify(true)).await;
//! db.update_user(
//!     &cx,
//!     UpdateUserRequest::new("app").password(ChangePassword::new("n3w-pass")),
//! )
//! .await;
//! db.close(&cx).await;
//! ```

pub mod config;
pub mod database;
pub mod dsn;
pub mod manager;
pub mod mask;
pub mod rotation;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::ConnectionConfig;
pub use database::{DB2_TYPE_NAME, Db2Database};
pub use manager::{ConnectionGuard, ConnectionManager};
pub use mask::SecretMasker;
pub use rotation::{DEFAULT_CHANGE_PASSWORD_STATEMENT, RotationExecutor, render_statement};

use dbrotate_core::SanitizedDatabase;
use dbrotate_pool::Driver;

/// Build a DB2 backend over `driver`, wrapped so its errors never carry
/// the configured credentials.
pub fn new<D: Driver>(driver: D) -> SanitizedDatabase<Db2Database<D>> {
    SanitizedDatabase::new(Db2Database::new(driver))
}
