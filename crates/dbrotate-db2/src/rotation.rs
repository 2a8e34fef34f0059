//! Password rotation statements.
//!
//! Rotation statements are administrator-supplied SQL templates containing
//! `{{username}}` and `{{password}}` placeholders. Values are substituted
//! textually: `ALTER USER ... IDENTIFIED BY` does not accept bound
//! parameters, so the template author is responsible for quoting.

use asupersync::{Cx, Outcome};
use dbrotate_core::{Connection, Error, ExecutionError, ValidationError};

/// Statement used when the request carries none.
pub const DEFAULT_CHANGE_PASSWORD_STATEMENT: &str =
    r#"ALTER USER "{{username}}" IDENTIFIED BY "{{password}}""#;

/// Substitute `{{username}}` and `{{password}}` in a template.
///
/// Substitution is a single left-to-right pass, so placeholder-like text
/// inside a substituted value is never expanded again. Unknown placeholders
/// are left as written.
pub fn render_statement(template: &str, username: &str, password: &str) -> String {
    let mut out = String::with_capacity(template.len() + username.len() + password.len());
    let mut rest = template;
    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            out.push_str(&rest[open..]);
            return out;
        };
        match &after[..close] {
            "username" => out.push_str(username),
            "password" => out.push_str(password),
            other => {
                out.push_str("{{");
                out.push_str(other);
                out.push_str("}}");
            }
        }
        rest = &after[close + 2..];
    }
    out.push_str(rest);
    out
}

/// Runs password-change statements against a connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct RotationExecutor;

impl RotationExecutor {
    /// Change `username`'s password to `new_password`.
    ///
    /// Statements run in order; the first failure stops the sequence and is
    /// reported as an [`ExecutionError`] naming the user. Timeouts and
    /// cancellation are returned as-is. Nothing is retried: the statements
    /// set an absolute password, so the caller can safely run the whole
    /// rotation again.
    #[tracing::instrument(level = "debug", skip_all, fields(username = %username, statements = statements.len()))]
    pub async fn rotate<C: Connection>(
        &self,
        cx: &Cx,
        conn: &C,
        username: &str,
        new_password: &str,
        statements: &[String],
    ) -> Outcome<(), Error> {
        if username.is_empty() {
            return Outcome::Err(ValidationError::required("username", "username is required").into());
        }
        if new_password.is_empty() {
            return Outcome::Err(
                ValidationError::required("new_password", "new password is required").into(),
            );
        }

        let default_statements = [DEFAULT_CHANGE_PASSWORD_STATEMENT.to_string()];
        let statements = if statements.is_empty() {
            &default_statements[..]
        } else {
            statements
        };

        for stmt in statements {
            if let Some(reason) = cx.cancel_reason() {
                return Outcome::Cancelled(reason);
            }

            let query = render_statement(stmt, username, new_password);
            tracing::debug!(username = %username, "executing password rotation statement");

            match conn.execute(cx, &query).await {
                Outcome::Ok(_) => {}
                Outcome::Err(e) if e.is_cancellation() => return Outcome::Err(e),
                Outcome::Err(e) => return Outcome::Err(ExecutionError::new(username, e).into()),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
        }

        tracing::info!(username = %username, "successfully rotated password");
        Outcome::Ok(())
    }
}
