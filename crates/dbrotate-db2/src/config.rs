//! DB2 connection configuration.
//!
//! Decodes the host's configuration bag into a [`ConnectionConfig`]. Decoding
//! is weakly typed: hosts frequently store every value as a string, so
//! numbers may arrive quoted, strings may arrive as numbers, and an empty
//! string for a numeric field means "not set". Unknown keys are ignored.
//!
//! # Keys
//!
//! | key | type |
//! |-----|------|
//! | `connection_url` | string, required |
//! | `username` | string |
//! | `password` | string |
//! | `max_open_connections` | integer |
//! | `max_idle_connections` | integer |
//! | `max_connection_lifetime` | seconds, or a duration such as `"30s"`, `"1h30m"` |

use std::fmt;
use std::time::Duration;

use dbrotate_core::{ConfigError, ConfigMap};
use dbrotate_pool::PoolConfig;
use serde::Deserialize;

use crate::dsn;

/// Typed DB2 connection configuration.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Driver connection string.
    /// Format: `DATABASE=<db>;HOSTNAME=<host>;PORT=<port>;PROTOCOL=TCPIP[;UID=<user>;PWD=<pass>]`
    #[serde(deserialize_with = "weak::string")]
    pub connection_url: String,
    /// Username for the connection (may also be embedded in `connection_url`)
    #[serde(deserialize_with = "weak::string")]
    pub username: String,
    /// Password for the connection (may also be embedded in `connection_url`)
    #[serde(deserialize_with = "weak::string")]
    pub password: String,
    /// Limit on open connections held by the driver
    #[serde(deserialize_with = "weak::int")]
    pub max_open_connections: Option<i64>,
    /// Limit on idle connections held by the driver
    #[serde(deserialize_with = "weak::int")]
    pub max_idle_connections: Option<i64>,
    /// Maximum amount of time a connection may be reused
    #[serde(deserialize_with = "weak::duration")]
    pub max_connection_lifetime: Option<Duration>,
}

impl ConnectionConfig {
    /// Create a configuration for the given connection string.
    pub fn new(connection_url: impl Into<String>) -> Self {
        Self {
            connection_url: connection_url.into(),
            ..Default::default()
        }
    }

    /// Set the username.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Set the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the open-connection limit.
    pub fn max_open_connections(mut self, n: i64) -> Self {
        self.max_open_connections = Some(n);
        self
    }

    /// Set the idle-connection limit.
    pub fn max_idle_connections(mut self, n: i64) -> Self {
        self.max_idle_connections = Some(n);
        self
    }

    /// Set the connection lifetime.
    pub fn max_connection_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_connection_lifetime = Some(lifetime);
        self
    }

    /// Decode and validate a raw configuration bag.
    pub fn decode(raw: &ConfigMap) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_value(serde_json::Value::Object(raw.clone()))
            .map_err(|e| ConfigError {
                message: "failed to decode configuration".to_string(),
                source: Some(Box::new(e)),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check required fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection_url.is_empty() {
            return Err(ConfigError::new("connection_url is required"));
        }
        Ok(())
    }

    /// Pool limits to hand to the driver. Non-positive values are dropped.
    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::from_limits(
            self.max_open_connections,
            self.max_idle_connections,
            self.max_connection_lifetime,
        )
    }

    /// Connection string for the driver, with credentials appended when needed.
    pub fn connection_string(&self) -> String {
        dsn::build_connection_string(self)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("connection_url", &dsn::redact_password(&self.connection_url))
            .field("username", &redacted(&self.username))
            .field("password", &redacted(&self.password))
            .field("max_open_connections", &self.max_open_connections)
            .field("max_idle_connections", &self.max_idle_connections)
            .field("max_connection_lifetime", &self.max_connection_lifetime)
            .finish()
    }
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() { "" } else { "[redacted]" }
}

/// Weakly typed field decoders.
mod weak {
    use std::sync::LazyLock;
    use std::time::Duration;

    use regex::Regex;
    use serde::de::{Deserializer, Error as _};
    use serde::Deserialize;
    use serde_json::Value;

    static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"^(?:(?:\d+(?:\.\d*)?|\.\d+)(?:ns|us|µs|μs|ms|s|m|h))+$")
            .expect("valid duration regex")
    });
    static DURATION_PART_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(\d+(?:\.\d*)?|\.\d+)(ns|us|µs|μs|ms|s|m|h)")
            .expect("valid duration part regex")
    });

    pub(super) fn string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(String::new()),
            Value::String(s) => Ok(s),
            Value::Number(n) => Ok(n.to_string()),
            Value::Bool(b) => Ok(if b { "1" } else { "0" }.to_string()),
            other => Err(D::Error::custom(format!(
                "expected a string, found {}",
                kind(&other)
            ))),
        }
    }

    pub(super) fn int<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            Value::Bool(b) => Ok(Some(i64::from(b))),
            Value::Number(n) => number_to_int(&n)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("expected an integer, found {n}"))),
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Ok(None);
                }
                s.parse::<i64>()
                    .map(Some)
                    .map_err(|_| D::Error::custom(format!("cannot parse '{s}' as an integer")))
            }
            other => Err(D::Error::custom(format!(
                "expected an integer, found {}",
                kind(&other)
            ))),
        }
    }

    pub(super) fn duration<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        match Value::deserialize(d)? {
            Value::Null => Ok(None),
            Value::Number(n) => match number_to_int(&n) {
                Some(secs) if secs >= 0 => Ok(Some(Duration::from_secs(secs.unsigned_abs()))),
                _ => Err(D::Error::custom(format!("invalid duration {n}"))),
            },
            Value::String(s) => parse_duration(s.trim()).map_err(D::Error::custom),
            other => Err(D::Error::custom(format!(
                "expected a duration, found {}",
                kind(&other)
            ))),
        }
    }

    /// Parse seconds (`"90"`) or a unit-suffixed duration (`"1h30m"`, `"250ms"`).
    #[allow(clippy::cast_possible_truncation)]
    pub(super) fn parse_duration(s: &str) -> Result<Option<Duration>, String> {
        if s.is_empty() {
            return Ok(None);
        }
        if let Ok(secs) = s.parse::<u64>() {
            return Ok(Some(Duration::from_secs(secs)));
        }
        if !DURATION_RE.is_match(s) {
            return Err(format!("invalid duration '{s}'"));
        }

        let mut total_nanos = 0u128;
        for caps in DURATION_PART_RE.captures_iter(s) {
            let value: f64 = caps[1]
                .parse()
                .map_err(|_| format!("invalid duration '{s}'"))?;
            let unit_nanos: u64 = match &caps[2] {
                "ns" => 1,
                "us" | "µs" | "μs" => 1_000,
                "ms" => 1_000_000,
                "s" => 1_000_000_000,
                "m" => 60_000_000_000,
                "h" => 3_600_000_000_000,
                _ => return Err(format!("invalid duration unit in '{s}'")),
            };
            let nanos = (value * unit_nanos as f64).round();
            if !nanos.is_finite() || nanos >= u64::MAX as f64 {
                return Err(format!("duration '{s}' out of range"));
            }
            total_nanos += nanos as u128;
        }
        u64::try_from(total_nanos)
            .map(|n| Some(Duration::from_nanos(n)))
            .map_err(|_| format!("duration '{s}' out of range"))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn number_to_int(n: &serde_json::Number) -> Option<i64> {
        if let Some(i) = n.as_i64() {
            return Some(i);
        }
        n.as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
            .map(|f| f as i64)
    }

    fn kind(value: &Value) -> &'static str {
        match value {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bag(value: serde_json::Value) -> ConfigMap {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn test_decode_full_config() {
        let config = ConnectionConfig::decode(&bag(json!({
            "connection_url": "DATABASE=testdb;HOSTNAME=localhost;PORT=50000",
            "username": "testuser",
            "password": "testpass",
            "max_open_connections": 8,
            "max_idle_connections": "2",
            "max_connection_lifetime": "5m",
        })))
        .expect("decode config");

        assert_eq!(
            config.connection_url,
            "DATABASE=testdb;HOSTNAME=localhost;PORT=50000"
        );
        assert_eq!(config.username, "testuser");
        assert_eq!(config.password, "testpass");
        assert_eq!(config.max_open_connections, Some(8));
        assert_eq!(config.max_idle_connections, Some(2));
        assert_eq!(config.max_connection_lifetime, Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_decode_missing_connection_url() {
        let err = ConnectionConfig::decode(&bag(json!({
            "username": "testuser",
            "password": "testpass",
        })))
        .expect_err("missing url must fail");
        assert_eq!(err.message, "connection_url is required");
    }

    #[test]
    fn test_decode_rejects_bad_types() {
        let err = ConnectionConfig::decode(&bag(json!({
            "connection_url": "DATABASE=x",
            "max_open_connections": "lots",
        })))
        .expect_err("non-numeric limit must fail");
        assert_eq!(err.message, "failed to decode configuration");
        assert!(err.source.is_some());

        assert!(
            ConnectionConfig::decode(&bag(json!({
                "connection_url": ["DATABASE=x"],
            })))
            .is_err()
        );
    }

    #[test]
    fn test_decode_weak_values() {
        let config = ConnectionConfig::decode(&bag(json!({
            "connection_url": "DATABASE=x",
            "username": 1234,
            "max_open_connections": "",
            "max_idle_connections": null,
            "max_connection_lifetime": 90,
            "unknown_key": {"ignored": true},
        })))
        .expect("decode config");
        assert_eq!(config.username, "1234");
        assert_eq!(config.max_open_connections, None);
        assert_eq!(config.max_idle_connections, None);
        assert_eq!(config.max_connection_lifetime, Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_parse_duration_forms() {
        assert_eq!(weak::parse_duration("").unwrap(), None);
        assert_eq!(
            weak::parse_duration("45").unwrap(),
            Some(Duration::from_secs(45))
        );
        assert_eq!(
            weak::parse_duration("1h30m").unwrap(),
            Some(Duration::from_secs(5400))
        );
        assert_eq!(
            weak::parse_duration("250ms").unwrap(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(
            weak::parse_duration("1.5s").unwrap(),
            Some(Duration::from_millis(1500))
        );
        assert!(weak::parse_duration("soon").is_err());
        assert!(weak::parse_duration("-5s").is_err());
    }

    #[test]
    fn test_pool_config_drops_non_positive() {
        let config = ConnectionConfig::new("DATABASE=x")
            .max_open_connections(0)
            .max_idle_connections(-1);
        assert!(config.pool_config().is_unbounded());

        let config = ConnectionConfig::new("DATABASE=x")
            .max_open_connections(10)
            .max_connection_lifetime(Duration::from_secs(60));
        let pool = config.pool_config();
        assert_eq!(pool.max_open_connections, Some(10));
        assert_eq!(pool.max_idle_connections, None);
        assert_eq!(pool.max_lifetime, Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_debug_hides_credentials() {
        let config = ConnectionConfig::new("DATABASE=x;UID=inlineuser;PWD=inlinepw")
            .username("db2admin")
            .password("s3cret");
        let rendered = format!("{config:?}");
        for secret in ["db2admin", "s3cret", "inlinepw"] {
            assert!(!rendered.contains(secret), "{rendered}");
        }
        assert!(rendered.contains("PWD=****"), "{rendered}");
    }
}
