//! Core types and traits for dbrotate.
//!
//! This crate provides the foundational abstractions shared by every
//! credential-rotation backend:
//!
//! - `Connection` trait for the live database handle
//! - `Database` trait for the host-facing lifecycle (initialize, rotate, close)
//! - `SecretMap` and the `SanitizedDatabase` middleware that scrubs secrets
//! - `Error` taxonomy
//! - `Outcome` re-export from asupersync for cancel-correct operations
//! - `Cx` context for structured concurrency

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Budget, Cx, Outcome};

pub mod connection;
pub mod database;
pub mod error;
pub mod mask;
pub mod sanitize;

pub use connection::Connection;
pub use database::{
    ChangePassword, ConfigMap, Database, DeleteUserRequest, DeleteUserResponse,
    InitializeRequest, InitializeResponse, NewUserRequest, NewUserResponse, Statements,
    UpdateUserRequest, UpdateUserResponse, UsernameMetadata,
};
pub use error::{
    ConfigError, ConnectionError, ConnectionErrorKind, Error, ExecutionError, RedactedError,
    Result, UnsupportedError, ValidationError,
};
pub use mask::{SecretMap, SecretValues};
pub use sanitize::SanitizedDatabase;
