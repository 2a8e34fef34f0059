//! DB2 static-credential backend.

use asupersync::{Cx, Outcome};
use dbrotate_core::{
    Database, DeleteUserRequest, DeleteUserResponse, Error, InitializeRequest,
    InitializeResponse, NewUserRequest, NewUserResponse, SecretMap, SecretValues,
    UnsupportedError, UpdateUserRequest, UpdateUserResponse,
};
use dbrotate_pool::Driver;

use crate::manager::ConnectionManager;
use crate::rotation::RotationExecutor;

/// Backend type identifier reported to the host.
pub const DB2_TYPE_NAME: &str = "db2";

/// Rotates passwords of existing DB2 accounts.
///
/// Only pre-existing accounts are managed; dynamic user creation and
/// deletion are rejected. Wrap it with [`dbrotate_core::SanitizedDatabase`]
/// (or build it through [`crate::new`]) before handing it to a host.
pub struct Db2Database<D: Driver> {
    manager: ConnectionManager<D>,
    executor: RotationExecutor,
}

impl<D: Driver> Db2Database<D> {
    pub fn new(driver: D) -> Self {
        Self {
            manager: ConnectionManager::new(driver),
            executor: RotationExecutor,
        }
    }

    pub fn manager(&self) -> &ConnectionManager<D> {
        &self.manager
    }
}

impl<D: Driver + std::fmt::Debug> std::fmt::Debug for Db2Database<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Db2Database")
            .field("manager", &self.manager)
            .finish_non_exhaustive()
    }
}

impl<D: Driver> SecretValues for Db2Database<D> {
    fn secret_values(&self) -> SecretMap {
        self.manager.secret_values()
    }
}

impl<D: Driver> Database for Db2Database<D> {
    fn type_name(&self) -> &'static str {
        DB2_TYPE_NAME
    }

    async fn initialize(
        &self,
        cx: &Cx,
        req: InitializeRequest,
    ) -> Outcome<InitializeResponse, Error> {
        match self
            .manager
            .initialize(cx, &req.config, req.verify_connection)
            .await
        {
            Outcome::Ok(_) => Outcome::Ok(InitializeResponse { config: req.config }),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    async fn new_user(&self, _cx: &Cx, _req: NewUserRequest) -> Outcome<NewUserResponse, Error> {
        Outcome::Err(
            UnsupportedError::new(
                "new_user",
                "NewUser is not supported for DB2 static credentials plugin",
            )
            .into(),
        )
    }

    #[tracing::instrument(level = "debug", skip_all, fields(username = %req.username))]
    async fn update_user(
        &self,
        cx: &Cx,
        req: UpdateUserRequest,
    ) -> Outcome<UpdateUserResponse, Error> {
        let conn = match self.manager.acquire(cx).await {
            Outcome::Ok(conn) => conn,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        let Some(change) = req.password else {
            return Outcome::Ok(UpdateUserResponse {});
        };

        match self
            .executor
            .rotate(
                cx,
                &*conn,
                &req.username,
                &change.new_password,
                &change.statements.commands,
            )
            .await
        {
            Outcome::Ok(()) => Outcome::Ok(UpdateUserResponse {}),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    async fn delete_user(
        &self,
        _cx: &Cx,
        _req: DeleteUserRequest,
    ) -> Outcome<DeleteUserResponse, Error> {
        Outcome::Err(
            UnsupportedError::new(
                "delete_user",
                "DeleteUser is not supported for DB2 static credentials plugin",
            )
            .into(),
        )
    }

    async fn close(&self, cx: &Cx) -> Outcome<(), Error> {
        self.manager.close(cx).await
    }
}
