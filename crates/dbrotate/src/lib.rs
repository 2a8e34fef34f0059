//! dbrotate - static-credential password rotation, built on asupersync.
//!
//! dbrotate rotates the passwords of existing database accounts on behalf of
//! a secrets-management host. It provides:
//!
//! - A host-facing [`Database`] lifecycle trait
//! - A DB2 backend ([`db2`]) with reader/writer connection locking
//! - Error sanitizing middleware that scrubs live credentials from errors
//! - Cancel-correct operations through asupersync's `Cx` and `Outcome`
//!
//! # Quick Start
//!
//! ```ignore
//! use dbrotate::prelude::*;
//!
//! async fn rotate(cx: &Cx, driver: impl Driver, config: ConfigMap) {
//!     let db = dbrotate::db2::new(driver);
//!
//!     match db.initialize(cx, InitializeRequest::new(config).verify(true)).await {
//!         Outcome::Ok(_) => {}
//!         Outcome::Err(e) => return eprintln!("initialize failed: {e}"),
//!         _ => return,
//!     }
//!
//!     let req = UpdateUserRequest::new("app").password(ChangePassword::new("n3w-pass"));
//!     if let Outcome::Err(e) = db.update_user(cx, req).await {
//!         eprintln!("rotation failed: {e}");
//!     }
//!
//!     db.close(cx).await;
//! }
//! ```

pub use dbrotate_core::{
    // asupersync re-exports
    Budget,
    // Lifecycle requests and responses
    ChangePassword,
    ConfigMap,
    // Errors
    ConfigError,
    Connection,
    ConnectionError,
    ConnectionErrorKind,
    Cx,
    Database,
    DeleteUserRequest,
    DeleteUserResponse,
    Error,
    ExecutionError,
    InitializeRequest,
    InitializeResponse,
    NewUserRequest,
    NewUserResponse,
    Outcome,
    Result,
    // Masking
    SanitizedDatabase,
    SecretMap,
    SecretValues,
    Statements,
    UnsupportedError,
    UpdateUserRequest,
    UpdateUserResponse,
    UsernameMetadata,
    ValidationError,
};

pub use dbrotate_pool::{Driver, PoolConfig};

/// DB2 backend.
pub mod db2 {
    pub use dbrotate_db2::{
        ConnectionConfig, ConnectionManager, DB2_TYPE_NAME, DEFAULT_CHANGE_PASSWORD_STATEMENT,
        Db2Database, RotationExecutor, SecretMasker, new, render_statement,
    };
}

/// Prelude module for convenient imports.
///
/// ```ignore
/// use dbrotate::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        ChangePassword, ConfigMap, Connection, Cx, Database, Driver, Error, InitializeRequest,
        Outcome, PoolConfig, Result, SanitizedDatabase, SecretValues, Statements,
        UpdateUserRequest,
    };
}
