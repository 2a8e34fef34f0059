//! Secret masking for the DB2 backend.

use dbrotate_core::SecretMap;

use crate::config::ConnectionConfig;

/// Placeholder substituted for the configured username.
pub const USERNAME_PLACEHOLDER: &str = "[username]";
/// Placeholder substituted for the configured password.
pub const PASSWORD_PLACEHOLDER: &str = "[password]";

/// Derives the redaction map for a configuration.
pub struct SecretMasker;

impl SecretMasker {
    /// Map the configured username and password to their placeholders.
    /// Empty values are left out.
    pub fn values(config: &ConnectionConfig) -> SecretMap {
        let mut secrets = SecretMap::new();
        secrets.insert(config.username.as_str(), USERNAME_PLACEHOLDER);
        secrets.insert(config.password.as_str(), PASSWORD_PLACEHOLDER);
        secrets
    }
}
