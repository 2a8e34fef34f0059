//! DB2 CLI connection strings.
//!
//! Only credential-marker detection is performed; the rest of the string is
//! passed to the driver untouched.

use crate::config::ConnectionConfig;

/// Keyword introducing the user id in a DB2 connection string.
pub const UID_MARKER: &str = "UID=";
/// Keyword introducing the password in a DB2 connection string.
pub const PWD_MARKER: &str = "PWD=";

/// Does the connection string already carry credentials?
pub fn contains_credentials(conn_str: &str) -> bool {
    conn_str.contains(UID_MARKER) || conn_str.contains(PWD_MARKER)
}

/// Build the driver connection string.
///
/// Separately configured credentials are appended as `;UID=<user>;PWD=<pass>`
/// only when both are non-empty and the URL has no credentials of its own.
/// Credentials embedded in the URL always win; the separate values are then
/// dropped rather than duplicated.
pub fn build_connection_string(config: &ConnectionConfig) -> String {
    let url = &config.connection_url;
    if config.username.is_empty() || config.password.is_empty() || contains_credentials(url) {
        return url.clone();
    }
    format!(
        "{url};{UID_MARKER}{};{PWD_MARKER}{}",
        config.username, config.password
    )
}

/// Replace the value of every `PWD=` entry with `****`, for diagnostics.
pub fn redact_password(conn_str: &str) -> String {
    let mut out = String::with_capacity(conn_str.len());
    let mut rest = conn_str;
    while let Some(pos) = rest.find(PWD_MARKER) {
        let value_start = pos + PWD_MARKER.len();
        out.push_str(&rest[..value_start]);
        out.push_str("****");
        rest = match rest[value_start..].find(';') {
            Some(end) => &rest[value_start + end..],
            None => "",
        };
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_credentials() {
        let cases = [
            ("DATABASE=mydb;HOSTNAME=localhost;UID=user;PWD=pass", true),
            ("DATABASE=mydb;HOSTNAME=localhost;PWD=pass", true),
            ("DATABASE=mydb;HOSTNAME=localhost;UID=user", true),
            ("DATABASE=mydb;HOSTNAME=localhost;PORT=50000", false),
        ];
        for (conn_str, expected) in cases {
            assert_eq!(contains_credentials(conn_str), expected, "{conn_str}");
        }
    }

    #[test]
    fn test_build_appends_credentials() {
        let config = ConnectionConfig::new("DATABASE=testdb;HOSTNAME=localhost;PORT=50000")
            .username("testuser")
            .password("testpass");
        assert_eq!(
            build_connection_string(&config),
            "DATABASE=testdb;HOSTNAME=localhost;PORT=50000;UID=testuser;PWD=testpass"
        );
    }

    #[test]
    fn test_build_keeps_embedded_credentials() {
        let url = "DATABASE=testdb;HOSTNAME=localhost;PORT=50000;PROTOCOL=TCPIP;PWD=inline";
        let config = ConnectionConfig::new(url)
            .username("testuser")
            .password("testpass");
        assert_eq!(build_connection_string(&config), url);
    }

    #[test]
    fn test_build_requires_both_credentials() {
        let url = "DATABASE=testdb;HOSTNAME=localhost;PORT=50000";
        let only_user = ConnectionConfig::new(url).username("testuser");
        assert_eq!(build_connection_string(&only_user), url);

        let only_password = ConnectionConfig::new(url).password("testpass");
        assert_eq!(build_connection_string(&only_password), url);
    }

    #[test]
    fn test_redact_password() {
        assert_eq!(
            redact_password("DATABASE=x;UID=u;PWD=secret;PORT=1"),
            "DATABASE=x;UID=u;PWD=****;PORT=1"
        );
        assert_eq!(redact_password("DATABASE=x;PWD=secret"), "DATABASE=x;PWD=****");
        assert_eq!(redact_password("DATABASE=x"), "DATABASE=x");
    }
}
