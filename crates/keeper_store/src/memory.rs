//! Volatile backend: plain maps behind one reader/writer lock.
//!
//! Writers hold the write lock for the whole mutation, readers share the
//! read lock. The lock is never held across an `.await`.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::context::Context;
use crate::error::StoreError;
use crate::models::{Secret, SecretId, User, UserId};
use crate::store::SecretStore;

struct Tables {
    users: HashMap<UserId, User>,
    logins: HashMap<String, UserId>,
    /// Secrets grouped per owner, in creation order.
    secrets: HashMap<UserId, Vec<Secret>>,
    next_user_id: UserId,
    next_secret_id: SecretId,
}

pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                users: HashMap::new(),
                logins: HashMap::new(),
                secrets: HashMap::new(),
                next_user_id: 1,
                next_secret_id: 1,
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretStore for MemoryStore {
    async fn create_user(
        &self,
        ctx: &Context,
        login: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        ctx.check()?;
        let mut t = self.tables.write();

        if t.logins.contains_key(login) {
            return Err(StoreError::UserExists {
                login: login.to_string(),
            });
        }

        let user = User {
            id: t.next_user_id,
            login: login.to_string(),
            password_hash: password_hash.to_string(),
        };
        t.next_user_id += 1;
        t.logins.insert(user.login.clone(), user.id);
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user_by_login(&self, ctx: &Context, login: &str) -> Result<User, StoreError> {
        ctx.check()?;
        let t = self.tables.read();
        t.logins
            .get(login)
            .and_then(|id| t.users.get(id))
            .cloned()
            .ok_or_else(|| StoreError::UserNotFound {
                login: login.to_string(),
            })
    }

    async fn create_secret(&self, ctx: &Context, mut secret: Secret) -> Result<Secret, StoreError> {
        ctx.check()?;
        let mut t = self.tables.write();

        if !t.users.contains_key(&secret.user_id) {
            return Err(StoreError::OwnerNotFound {
                user_id: secret.user_id,
            });
        }

        secret.id = t.next_secret_id;
        t.next_secret_id += 1;
        t.secrets
            .entry(secret.user_id)
            .or_default()
            .push(secret.clone());
        Ok(secret)
    }

    async fn list_secrets(
        &self,
        ctx: &Context,
        user_id: UserId,
    ) -> Result<Vec<Secret>, StoreError> {
        ctx.check()?;
        let t = self.tables.read();
        Ok(t.secrets.get(&user_id).cloned().unwrap_or_default())
    }

    async fn get_secret(
        &self,
        ctx: &Context,
        user_id: UserId,
        secret_id: SecretId,
    ) -> Result<Secret, StoreError> {
        ctx.check()?;
        let t = self.tables.read();
        t.secrets
            .get(&user_id)
            .and_then(|owned| owned.iter().find(|s| s.id == secret_id))
            .cloned()
            .ok_or(StoreError::SecretNotFound { secret_id })
    }

    async fn update_secret(&self, ctx: &Context, secret: Secret) -> Result<Secret, StoreError> {
        ctx.check()?;
        let mut t = self.tables.write();
        let slot = t
            .secrets
            .get_mut(&secret.user_id)
            .and_then(|owned| owned.iter_mut().find(|s| s.id == secret.id))
            .ok_or(StoreError::SecretNotFound {
                secret_id: secret.id,
            })?;
        *slot = secret.clone();
        Ok(secret)
    }

    async fn delete_secret(
        &self,
        ctx: &Context,
        user_id: UserId,
        secret_id: SecretId,
    ) -> Result<(), StoreError> {
        ctx.check()?;
        let mut t = self.tables.write();
        let owned = t
            .secrets
            .get_mut(&user_id)
            .ok_or(StoreError::SecretNotFound { secret_id })?;
        let pos = owned
            .iter()
            .position(|s| s.id == secret_id)
            .ok_or(StoreError::SecretNotFound { secret_id })?;
        owned.remove(pos);
        Ok(())
    }
}
