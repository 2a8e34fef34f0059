//! Error types for dbrotate operations.

use std::fmt;

use crate::mask::SecretMap;

/// The primary error type for all dbrotate operations.
#[derive(Debug)]
pub enum Error {
    /// Missing or invalid configuration
    Config(ConfigError),
    /// Operation needs a live connection that does not exist
    NotInitialized,
    /// Missing username or password on a rotation request
    Validation(ValidationError),
    /// Connection-related errors (open, verify, close)
    Connection(ConnectionError),
    /// A rotation statement failed
    Execution(ExecutionError),
    /// The requested lifecycle operation is not offered by this backend
    Unsupported(UnsupportedError),
    /// The driver reported that the caller's deadline expired
    Timeout,
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// The driver could not open a handle for the connection string
    Open,
    /// The connectivity probe after opening failed
    Verify,
    /// Closing the handle failed
    Close,
    /// The connection slot lock could not be acquired
    Lock,
}

/// Validation error for rotation requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Request field that failed validation
    pub field: &'static str,
    /// Human-readable error message
    pub message: String,
}

/// A rotation statement failed against the database.
///
/// Carries the username the rotation was for, never the password.
#[derive(Debug)]
pub struct ExecutionError {
    pub username: String,
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedError {
    /// Name of the rejected operation, e.g. `NewUser`
    pub operation: &'static str,
    pub message: String,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }
}

impl ConnectionError {
    pub fn new(kind: ConnectionErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying driver error.
    pub fn with_source(mut self, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl ValidationError {
    /// A required field is missing or empty.
    pub fn required(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl ExecutionError {
    pub fn new(
        username: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            username: username.into(),
            source: source.into(),
        }
    }
}

impl UnsupportedError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            message: message.into(),
        }
    }
}

impl Error {
    /// Is this a cancellation or deadline expiry that must not be wrapped or retried?
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Timeout)
    }

    /// Is this a connection error that likely requires re-initialization?
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::NotInitialized)
    }

    /// Rewrite this error so that none of the given secrets appear in its text.
    ///
    /// The variant is preserved. Free-form messages, usernames and driver
    /// sources are replaced by their redacted rendering; sources are flattened
    /// to text because an arbitrary `dyn Error` cannot be rewritten in place.
    pub fn redact(self, secrets: &SecretMap) -> Error {
        if secrets.is_empty() {
            return self;
        }
        match self {
            Error::Config(e) => Error::Config(ConfigError {
                message: secrets.redact(&e.message),
                source: redact_source(e.source, secrets),
            }),
            Error::Validation(e) => Error::Validation(ValidationError {
                field: e.field,
                message: secrets.redact(&e.message),
            }),
            Error::Connection(e) => Error::Connection(ConnectionError {
                kind: e.kind,
                message: secrets.redact(&e.message),
                source: redact_source(e.source, secrets),
            }),
            Error::Execution(e) => Error::Execution(ExecutionError {
                username: secrets.redact(&e.username),
                source: Box::new(RedactedError(secrets.redact(&e.source.to_string()))),
            }),
            Error::Unsupported(e) => Error::Unsupported(UnsupportedError {
                operation: e.operation,
                message: secrets.redact(&e.message),
            }),
            Error::Custom(msg) => Error::Custom(secrets.redact(&msg)),
            other @ (Error::NotInitialized | Error::Timeout) => other,
        }
    }
}

fn redact_source(
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
    secrets: &SecretMap,
) -> Option<Box<dyn std::error::Error + Send + Sync>> {
    source.map(|err| {
        Box::new(RedactedError(secrets.redact(&err.to_string())))
            as Box<dyn std::error::Error + Send + Sync>
    })
}

/// Text of an underlying error after secret values were scrubbed from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedactedError(pub String);

impl fmt::Display for RedactedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for RedactedError {}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => match &e.source {
                Some(source) => write!(f, "{}: {}", e.message, source),
                None => write!(f, "{}", e.message),
            },
            Error::NotInitialized => write!(f, "DB2 connection not initialized"),
            Error::Validation(e) => write!(f, "{}", e),
            Error::Connection(e) => match &e.source {
                Some(source) => write!(f, "{}: {}", e.message, source),
                None => write!(f, "{}", e.message),
            },
            Error::Execution(e) => write!(f, "{}", e),
            Error::Unsupported(e) => write!(f, "{}", e),
            Error::Timeout => write!(f, "Operation timed out"),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Connection(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Execution(e) => Some(e.source.as_ref()),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "failed to update password for user {}: {}",
            self.username, self.source
        )
    }
}

impl fmt::Display for UnsupportedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::Validation(err)
    }
}

impl From<ExecutionError> for Error {
    fn from(err: ExecutionError) -> Self {
        Error::Execution(err)
    }
}

impl From<UnsupportedError> for Error {
    fn from(err: UnsupportedError) -> Self {
        Error::Unsupported(err)
    }
}

/// Result type alias for dbrotate operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets() -> SecretMap {
        let mut map = SecretMap::new();
        map.insert("admin", "[username]");
        map.insert("hunter2", "[password]");
        map
    }

    #[test]
    fn execution_error_names_user() {
        let err = Error::Execution(ExecutionError::new("alice", "SQL0104N syntax"));
        assert_eq!(
            err.to_string(),
            "failed to update password for user alice: SQL0104N syntax"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn redact_rewrites_messages_and_sources() {
        let err = Error::Connection(
            ConnectionError::new(ConnectionErrorKind::Verify, "failed to verify DB2 connection")
                .with_source("login failed for admin using hunter2"),
        );
        let redacted = err.redact(&secrets());
        assert_eq!(
            redacted.to_string(),
            "failed to verify DB2 connection: login failed for [username] using [password]"
        );
        match redacted {
            Error::Connection(e) => assert_eq!(e.kind, ConnectionErrorKind::Verify),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn redact_execution_error_masks_username() {
        let err = Error::Execution(ExecutionError::new("admin", "denied for admin"));
        let redacted = err.redact(&secrets());
        assert_eq!(
            redacted.to_string(),
            "failed to update password for user [username]: denied for [username]"
        );
    }

    #[test]
    fn redact_with_empty_map_is_identity() {
        let err = Error::Custom("hunter2".to_string());
        assert_eq!(err.redact(&SecretMap::new()).to_string(), "hunter2");
    }

    #[test]
    fn cancellation_and_connection_flags() {
        assert!(Error::Timeout.is_cancellation());
        assert!(!Error::NotInitialized.is_cancellation());
        assert!(Error::NotInitialized.is_connection_error());
        let open = Error::Connection(ConnectionError::new(
            ConnectionErrorKind::Open,
            "failed to open DB2 connection",
        ));
        assert!(open.is_connection_error());
        assert!(!Error::Custom("x".into()).is_connection_error());
    }
}
