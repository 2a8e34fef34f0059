//! Host-facing lifecycle interface.
//!
//! The secrets-management host drives a backend through the [`Database`]
//! trait: it configures a connection with [`initialize`](Database::initialize),
//! asks for credential changes with [`update_user`](Database::update_user)
//! and tears everything down with [`close`](Database::close). Transport and
//! scheduling live on the host side of this boundary; a backend is a plain
//! library whose calls run to completion inside the caller's `Cx`.

use std::future::Future;
use std::time::SystemTime;

use asupersync::{Cx, Outcome};
use serde::{Deserialize, Serialize};

/// Raw configuration bag as supplied by the host.
pub type ConfigMap = serde_json::Map<String, serde_json::Value>;

/// Request to (re)configure the backend's connection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitializeRequest {
    /// Connection configuration, decoded by the backend
    pub config: ConfigMap,
    /// Probe the database before reporting success
    #[serde(default)]
    pub verify_connection: bool,
}

impl InitializeRequest {
    pub fn new(config: ConfigMap) -> Self {
        Self {
            config,
            verify_connection: false,
        }
    }

    /// Request a connectivity probe as part of initialization.
    pub fn verify(mut self, verify: bool) -> Self {
        self.verify_connection = verify;
        self
    }
}

/// Configuration the backend accepted; the host persists it as given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitializeResponse {
    pub config: ConfigMap,
}

/// Ordered SQL templates supplied by the administrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statements {
    #[serde(default)]
    pub commands: Vec<String>,
}

impl Statements {
    pub fn new<I, S>(commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Metadata the host offers for generating a dynamic username.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsernameMetadata {
    pub display_name: String,
    pub role_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewUserRequest {
    pub username_config: UsernameMetadata,
    #[serde(default)]
    pub statements: Statements,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub expiration: Option<SystemTime>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUserResponse {
    pub username: String,
}

/// A password change for an existing account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePassword {
    pub new_password: String,
    /// Statements to run; the backend's default is used when empty
    #[serde(default)]
    pub statements: Statements,
}

impl ChangePassword {
    pub fn new(new_password: impl Into<String>) -> Self {
        Self {
            new_password: new_password.into(),
            statements: Statements::default(),
        }
    }

    pub fn statements(mut self, statements: Statements) -> Self {
        self.statements = statements;
        self
    }
}

/// Rotation request for a static account.
///
/// `password` is `None` when the host only touches non-password metadata;
/// backends treat that as a successful no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    pub username: String,
    #[serde(default)]
    pub password: Option<ChangePassword>,
}

impl UpdateUserRequest {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: None,
        }
    }

    pub fn password(mut self, change: ChangePassword) -> Self {
        self.password = Some(change);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateUserResponse {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteUserRequest {
    pub username: String,
    #[serde(default)]
    pub statements: Statements,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteUserResponse {}

/// Lifecycle operations a credential backend exposes to the host.
pub trait Database: Send + Sync {
    /// Constant identifier of the backend type. Valid in any state.
    fn type_name(&self) -> &'static str;

    /// Configure (or reconfigure) the connection.
    fn initialize(
        &self,
        cx: &Cx,
        req: InitializeRequest,
    ) -> impl Future<Output = Outcome<InitializeResponse, crate::Error>> + Send;

    /// Create a dynamic account.
    fn new_user(
        &self,
        cx: &Cx,
        req: NewUserRequest,
    ) -> impl Future<Output = Outcome<NewUserResponse, crate::Error>> + Send;

    /// Change credentials of an existing account.
    fn update_user(
        &self,
        cx: &Cx,
        req: UpdateUserRequest,
    ) -> impl Future<Output = Outcome<UpdateUserResponse, crate::Error>> + Send;

    /// Remove a dynamic account.
    fn delete_user(
        &self,
        cx: &Cx,
        req: DeleteUserRequest,
    ) -> impl Future<Output = Outcome<DeleteUserResponse, crate::Error>> + Send;

    /// Release the connection. Idempotent.
    fn close(&self, cx: &Cx) -> impl Future<Output = Outcome<(), crate::Error>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_request_builder() {
        let req = UpdateUserRequest::new("app").password(
            ChangePassword::new("pw").statements(Statements::new(["ALTER USER x"])),
        );
        assert_eq!(req.username, "app");
        let change = req.password.expect("password change");
        assert_eq!(change.new_password, "pw");
        assert_eq!(change.statements.commands, vec!["ALTER USER x".to_string()]);
    }

    #[test]
    fn update_request_deserializes_without_password() {
        let req: UpdateUserRequest =
            serde_json::from_str(r#"{"username":"app"}"#).expect("decode request");
        assert_eq!(req.username, "app");
        assert!(req.password.is_none());
    }

    #[test]
    fn initialize_request_defaults_to_no_verify() {
        let req: InitializeRequest =
            serde_json::from_str(r#"{"config":{"connection_url":"DATABASE=x"}}"#)
                .expect("decode request");
        assert!(!req.verify_connection);
        assert!(InitializeRequest::new(ConfigMap::new()).verify(true).verify_connection);
    }
}
