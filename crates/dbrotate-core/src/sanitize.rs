//! Error-sanitizing middleware.
//!
//! [`SanitizedDatabase`] wraps a backend and scrubs its secret values out of
//! every error it returns. The secret map is fetched after the inner call
//! completes, so an `initialize` that installs new credentials is scrubbed
//! with the new values.

use std::sync::Arc;

use asupersync::{Cx, Outcome};

use crate::database::{
    Database, DeleteUserRequest, DeleteUserResponse, InitializeRequest, InitializeResponse,
    NewUserRequest, NewUserResponse, UpdateUserRequest, UpdateUserResponse,
};
use crate::error::Error;
use crate::mask::{SecretMap, SecretValues};

/// A [`Database`] whose errors never contain the inner backend's secrets.
pub struct SanitizedDatabase<D> {
    inner: Arc<D>,
}

impl<D> SanitizedDatabase<D>
where
    D: Database + SecretValues,
{
    pub fn new(inner: D) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// The wrapped backend.
    pub fn inner(&self) -> &Arc<D> {
        &self.inner
    }

    fn sanitize<T>(&self, outcome: Outcome<T, Error>) -> Outcome<T, Error> {
        match outcome {
            Outcome::Err(e) => Outcome::Err(e.redact(&self.inner.secret_values())),
            other => other,
        }
    }
}

impl<D> Clone for SanitizedDatabase<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D> std::fmt::Debug for SanitizedDatabase<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SanitizedDatabase")
            .field("inner", &std::any::type_name::<D>())
            .finish()
    }
}

impl<D> SecretValues for SanitizedDatabase<D>
where
    D: Database + SecretValues,
{
    fn secret_values(&self) -> SecretMap {
        self.inner.secret_values()
    }
}

impl<D> Database for SanitizedDatabase<D>
where
    D: Database + SecretValues,
{
    fn type_name(&self) -> &'static str {
        self.inner.type_name()
    }

    async fn initialize(
        &self,
        cx: &Cx,
        req: InitializeRequest,
    ) -> Outcome<InitializeResponse, Error> {
        let outcome = self.inner.initialize(cx, req).await;
        self.sanitize(outcome)
    }

    async fn new_user(&self, cx: &Cx, req: NewUserRequest) -> Outcome<NewUserResponse, Error> {
        let outcome = self.inner.new_user(cx, req).await;
        self.sanitize(outcome)
    }

    async fn update_user(
        &self,
        cx: &Cx,
        req: UpdateUserRequest,
    ) -> Outcome<UpdateUserResponse, Error> {
        let outcome = self.inner.update_user(cx, req).await;
        self.sanitize(outcome)
    }

    async fn delete_user(
        &self,
        cx: &Cx,
        req: DeleteUserRequest,
    ) -> Outcome<DeleteUserResponse, Error> {
        let outcome = self.inner.delete_user(cx, req).await;
        self.sanitize(outcome)
    }

    async fn close(&self, cx: &Cx) -> Outcome<(), Error> {
        let outcome = self.inner.close(cx).await;
        self.sanitize(outcome)
    }
}
