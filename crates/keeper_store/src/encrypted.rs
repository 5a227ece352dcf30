//! Transparent at-rest encryption of secret payloads.
//!
//! `EncryptedStore` is itself a [`SecretStore`], so it wraps either backend
//! (or another `EncryptedStore`) without callers noticing. Only `data` is
//! touched; user records and `metadata` pass through as-is.

use std::sync::Arc;

use async_trait::async_trait;
use keeper_crypto::SecretCipher;

use crate::context::Context;
use crate::error::StoreError;
use crate::models::{Secret, SecretId, User, UserId};
use crate::store::SecretStore;

pub struct EncryptedStore {
    inner: Arc<dyn SecretStore>,
    /// `None` means encryption is disabled and every call forwards verbatim.
    cipher: Option<SecretCipher>,
}

impl EncryptedStore {
    /// Wrap `inner`. A missing or empty `key` disables encryption.
    ///
    /// The key string is truncated or zero-padded to 32 bytes; no key
    /// derivation is applied.
    pub fn new(inner: Arc<dyn SecretStore>, key: Option<&str>) -> Self {
        let cipher = key
            .filter(|k| !k.is_empty())
            .map(SecretCipher::from_passphrase);
        Self { inner, cipher }
    }

    pub fn is_enabled(&self) -> bool {
        self.cipher.is_some()
    }

    fn seal(&self, data: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        match &self.cipher {
            Some(cipher) if !data.is_empty() => cipher
                .encrypt(data)
                .map(Some)
                .map_err(StoreError::Encryption),
            _ => Ok(None),
        }
    }

    fn open(&self, secret: &mut Secret) -> Result<(), StoreError> {
        let Some(cipher) = &self.cipher else {
            return Ok(());
        };
        if secret.data.is_empty() {
            return Ok(());
        }
        let plain = cipher
            .decrypt(&secret.data)
            .map_err(|_| StoreError::Decryption {
                secret_id: secret.id,
            })?;
        secret.data = plain.to_vec();
        Ok(())
    }
}

#[async_trait]
impl SecretStore for EncryptedStore {
    async fn create_user(
        &self,
        ctx: &Context,
        login: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        self.inner.create_user(ctx, login, password_hash).await
    }

    async fn get_user_by_login(&self, ctx: &Context, login: &str) -> Result<User, StoreError> {
        self.inner.get_user_by_login(ctx, login).await
    }

    async fn create_secret(&self, ctx: &Context, secret: Secret) -> Result<Secret, StoreError> {
        ctx.check()?;
        let Some(sealed) = self.seal(&secret.data)? else {
            return self.inner.create_secret(ctx, secret).await;
        };
        let stored = self
            .inner
            .create_secret(
                ctx,
                Secret {
                    data: sealed,
                    ..secret.clone()
                },
            )
            .await?;
        Ok(Secret {
            id: stored.id,
            ..secret
        })
    }

    async fn list_secrets(
        &self,
        ctx: &Context,
        user_id: UserId,
    ) -> Result<Vec<Secret>, StoreError> {
        ctx.check()?;
        let mut secrets = self.inner.list_secrets(ctx, user_id).await?;
        for secret in &mut secrets {
            self.open(secret)?;
        }
        Ok(secrets)
    }

    async fn get_secret(
        &self,
        ctx: &Context,
        user_id: UserId,
        secret_id: SecretId,
    ) -> Result<Secret, StoreError> {
        ctx.check()?;
        let mut secret = self.inner.get_secret(ctx, user_id, secret_id).await?;
        self.open(&mut secret)?;
        Ok(secret)
    }

    async fn update_secret(&self, ctx: &Context, secret: Secret) -> Result<Secret, StoreError> {
        ctx.check()?;
        let Some(sealed) = self.seal(&secret.data)? else {
            return self.inner.update_secret(ctx, secret).await;
        };
        self.inner
            .update_secret(
                ctx,
                Secret {
                    data: sealed,
                    ..secret.clone()
                },
            )
            .await?;
        Ok(secret)
    }

    async fn delete_secret(
        &self,
        ctx: &Context,
        user_id: UserId,
        secret_id: SecretId,
    ) -> Result<(), StoreError> {
        self.inner.delete_secret(ctx, user_id, secret_id).await
    }
}
