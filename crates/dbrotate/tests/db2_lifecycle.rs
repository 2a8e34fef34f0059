//! End-to-end DB2 lifecycle through the sanitizing wrapper.

use asupersync::Outcome;
use dbrotate::prelude::*;
use dbrotate::{ConnectionErrorKind, NewUserRequest};
use dbrotate_db2::testing::{MockDriver, block_on, unwrap_outcome};
use serde_json::json;

fn config(username: &str, password: &str) -> ConfigMap {
    match json!({
        "connection_url": "DATABASE=testdb;HOSTNAME=localhost;PORT=50000;PROTOCOL=TCPIP",
        "username": username,
        "password": password,
        "max_open_connections": 4,
        "max_idle_connections": "",
        "max_connection_lifetime": "5m",
    }) {
        serde_json::Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

#[test]
fn db2_rotates_password_end_to_end() {
    let driver = MockDriver::new();
    let db = dbrotate::db2::new(driver.clone());
    let cx = Cx::for_testing();

    assert_eq!(db.type_name(), "db2");

    block_on(async {
        let req = InitializeRequest::new(config("admin", "adminpw")).verify(true);
        unwrap_outcome(db.initialize(&cx, req).await);

        let req = UpdateUserRequest::new("testuser").password(ChangePassword::new("newpw"));
        unwrap_outcome(db.update_user(&cx, req).await);

        unwrap_outcome(db.close(&cx).await);
    });

    assert_eq!(
        driver.last_dsn().as_deref(),
        Some("DATABASE=testdb;HOSTNAME=localhost;PORT=50000;PROTOCOL=TCPIP;UID=admin;PWD=adminpw")
    );
    let pool = driver.last_pool().expect("pool config");
    assert_eq!(pool.max_open_connections, Some(4));
    assert_eq!(pool.max_idle_connections, None);
    assert_eq!(pool.max_lifetime, Some(std::time::Duration::from_secs(300)));
    assert_eq!(
        driver.executed(),
        vec![r#"ALTER USER "testuser" IDENTIFIED BY "newpw""#.to_string()]
    );
    assert_eq!(driver.live_connections(), 0);
}

#[test]
fn db2_custom_statements_run_in_order() {
    let driver = MockDriver::new();
    let db = dbrotate::db2::new(driver.clone());
    let cx = Cx::for_testing();

    block_on(async {
        unwrap_outcome(
            db.initialize(&cx, InitializeRequest::new(config("admin", "adminpw")))
                .await,
        );
        let change = ChangePassword::new("newpw").statements(Statements::new([
            "ALTER USER {{username}} IDENTIFIED BY '{{password}}'",
            "GRANT CONNECT ON DATABASE TO USER {{username}}",
        ]));
        unwrap_outcome(
            db.update_user(&cx, UpdateUserRequest::new("app").password(change))
                .await,
        );
    });

    assert_eq!(
        driver.executed(),
        vec![
            "ALTER USER app IDENTIFIED BY 'newpw'".to_string(),
            "GRANT CONNECT ON DATABASE TO USER app".to_string(),
        ]
    );
}

#[test]
fn verify_failure_is_scrubbed_of_credentials() {
    let driver = MockDriver::new();
    driver.fail_ping("SQL30082N security processing failed for admin with adminpw");
    let db = dbrotate::db2::new(driver.clone());
    let cx = Cx::for_testing();

    block_on(async {
        let req = InitializeRequest::new(config("admin", "adminpw")).verify(true);
        match db.initialize(&cx, req).await {
            Outcome::Err(err @ Error::Connection(_)) => {
                if let Error::Connection(e) = &err {
                    assert_eq!(e.kind, ConnectionErrorKind::Verify);
                }
                assert_eq!(
                    err.to_string(),
                    "failed to verify DB2 connection: \
                     SQL30082N security processing failed for [username] with [password]"
                );
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    });
    assert_eq!(driver.live_connections(), 0);
}

#[test]
fn execution_failure_is_scrubbed_of_credentials() {
    let driver = MockDriver::new();
    driver.fail_statement(1, "SQL0551N admin lacks privilege");
    let db = dbrotate::db2::new(driver.clone());
    let cx = Cx::for_testing();

    block_on(async {
        unwrap_outcome(
            db.initialize(&cx, InitializeRequest::new(config("admin", "adminpw")))
                .await,
        );
        let req = UpdateUserRequest::new("app").password(ChangePassword::new("newpw"));
        match db.update_user(&cx, req).await {
            Outcome::Err(e @ Error::Execution(_)) => {
                assert_eq!(
                    e.to_string(),
                    "failed to update password for user app: SQL0551N [username] lacks privilege"
                );
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    });
}

#[test]
fn unsupported_operations_pass_through_wrapper() {
    let db = dbrotate::db2::new(MockDriver::new());
    let cx = Cx::for_testing();

    block_on(async {
        let outcome = db.new_user(&cx, NewUserRequest::default()).await;
        assert!(matches!(outcome, Outcome::Err(Error::Unsupported(_))));
    });
}

#[test]
fn wrapper_reports_live_secrets() {
    let db = dbrotate::db2::new(MockDriver::new());
    let cx = Cx::for_testing();
    assert!(db.secret_values().is_empty());

    block_on(async {
        unwrap_outcome(
            db.initialize(&cx, InitializeRequest::new(config("admin", "adminpw")))
                .await,
        );
    });
    let secrets = db.secret_values();
    assert_eq!(secrets.get("admin"), Some("[username]"));
    assert_eq!(secrets.get("adminpw"), Some("[password]"));

    let live = db.inner().manager().config();
    assert_eq!(live.username, "admin");
    assert_eq!(live.max_connection_lifetime, Some(std::time::Duration::from_secs(300)));
}
