//! Secret-to-placeholder maps used to scrub outward text.
//!
//! A [`SecretMap`] maps literal secret values (a username, a password) to the
//! fixed placeholder that replaces them in any log line or error message.
//! Backends expose their current map through [`SecretValues`]; the
//! sanitizing middleware consults it after every call.

use std::collections::BTreeMap;

/// Mapping from a literal secret value to its placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretMap {
    entries: BTreeMap<String, String>,
}

impl SecretMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a secret. Empty secrets are ignored, since replacing the empty
    /// string would corrupt every message.
    pub fn insert(&mut self, secret: impl Into<String>, placeholder: impl Into<String>) {
        let secret = secret.into();
        if secret.is_empty() {
            return;
        }
        self.entries.insert(secret, placeholder.into());
    }

    /// Placeholder registered for a secret.
    pub fn get(&self, secret: &str) -> Option<&str> {
        self.entries.get(secret).map(String::as_str)
    }

    pub fn contains(&self, secret: &str) -> bool {
        self.entries.contains_key(secret)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over `(secret, placeholder)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Replace every occurrence of every secret in `text`.
    ///
    /// Longer secrets are replaced first so that a secret containing another
    /// (a password that embeds the username) is hidden as a whole.
    pub fn redact(&self, text: &str) -> String {
        let mut ordered: Vec<(&str, &str)> = self.iter().collect();
        ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let mut out = text.to_string();
        for (secret, placeholder) in ordered {
            if out.contains(secret) {
                out = out.replace(secret, placeholder);
            }
        }
        out
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SecretMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = SecretMap::new();
        for (secret, placeholder) in iter {
            map.insert(secret, placeholder);
        }
        map
    }
}

/// Source of the secret values a backend currently holds.
///
/// Must reflect the live configuration exactly and must never fail; it is
/// called even after the backend has been closed.
pub trait SecretValues {
    fn secret_values(&self) -> SecretMap;
}
