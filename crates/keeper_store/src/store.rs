//! The storage contract shared by every backend and decorator.

use async_trait::async_trait;

use crate::context::Context;
use crate::error::StoreError;
use crate::models::{Secret, SecretId, User, UserId};

/// User and secret CRUD. Implementations must behave identically so callers
/// can swap one for another without other changes.
///
/// Secret lookups are always by `(user_id, secret_id)` together: a secret
/// owned by a different user is reported exactly like one that does not
/// exist ([`StoreError::SecretNotFound`]).
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fails with [`StoreError::UserExists`] if `login` is taken.
    async fn create_user(
        &self,
        ctx: &Context,
        login: &str,
        password_hash: &str,
    ) -> Result<User, StoreError>;

    /// Fails with [`StoreError::UserNotFound`].
    async fn get_user_by_login(&self, ctx: &Context, login: &str) -> Result<User, StoreError>;

    /// Stores `secret` under `secret.user_id`; the incoming `id` is ignored
    /// and the assigned one is returned.
    async fn create_secret(&self, ctx: &Context, secret: Secret) -> Result<Secret, StoreError>;

    /// All secrets owned by `user_id`, oldest first. Empty if none.
    async fn list_secrets(&self, ctx: &Context, user_id: UserId)
        -> Result<Vec<Secret>, StoreError>;

    async fn get_secret(
        &self,
        ctx: &Context,
        user_id: UserId,
        secret_id: SecretId,
    ) -> Result<Secret, StoreError>;

    /// Replaces type, payload and metadata of the secret identified by
    /// `secret.id` and `secret.user_id`.
    async fn update_secret(&self, ctx: &Context, secret: Secret) -> Result<Secret, StoreError>;

    async fn delete_secret(
        &self,
        ctx: &Context,
        user_id: UserId,
        secret_id: SecretId,
    ) -> Result<(), StoreError>;
}
