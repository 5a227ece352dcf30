//! Durable backend over SQLite via sqlx.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::context::Context;
use crate::error::StoreError;
use crate::migrations;
use crate::models::{Secret, SecretId, SecretRow, User, UserId};
use crate::store::SecretStore;

/// Store handle. Cheap to clone (the pool is shared).
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database file at `path` and migrate it.
    ///
    /// WAL and foreign-key enforcement are set per connection, not in a
    /// migration: SQLite refuses to change `journal_mode` inside the
    /// transaction sqlx wraps each migration in.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        debug!(path = %path.display(), "opening secret database");
        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(opts).await?;
        Self::from_pool(pool).await
    }

    /// Connect using an sqlx URL such as `sqlite://keeper.db` or
    /// `sqlite::memory:`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);

        if url.contains(":memory:") {
            return Self::single_connection(opts).await;
        }
        debug!(url, "connecting to secret database");
        let pool = SqlitePool::connect_with(opts).await?;
        Self::from_pool(pool).await
    }

    /// A private in-memory database. Contents vanish when the store is
    /// dropped.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        Self::single_connection(opts).await
    }

    // An in-memory database lives only as long as its connection, so the
    // pool must hold exactly one and never recycle it.
    async fn single_connection(opts: SqliteConnectOptions) -> Result<Self, StoreError> {
        debug!("opening in-memory secret database");
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        migrations::run(&pool).await?;
        debug!("secret database schema ready");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl SecretStore for SqliteStore {
    async fn create_user(
        &self,
        ctx: &Context,
        login: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let result = ctx
            .run(
                sqlx::query("INSERT INTO users (login, password_hash) VALUES (?, ?)")
                    .bind(login)
                    .bind(password_hash)
                    .execute(&self.pool),
            )
            .await?;

        match result {
            Ok(done) => Ok(User {
                id: done.last_insert_rowid(),
                login: login.to_string(),
                password_hash: password_hash.to_string(),
            }),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::UserExists {
                    login: login.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_user_by_login(&self, ctx: &Context, login: &str) -> Result<User, StoreError> {
        ctx.run(
            sqlx::query_as::<_, User>(
                "SELECT id, login, password_hash FROM users WHERE login = ?",
            )
            .bind(login)
            .fetch_optional(&self.pool),
        )
        .await??
        .ok_or_else(|| StoreError::UserNotFound {
            login: login.to_string(),
        })
    }

    async fn create_secret(&self, ctx: &Context, mut secret: Secret) -> Result<Secret, StoreError> {
        let result = ctx
            .run(
                sqlx::query(
                    "INSERT INTO secrets (user_id, type, data, metadata) VALUES (?, ?, ?, ?)",
                )
                .bind(secret.user_id)
                .bind(secret.kind.tag())
                .bind(&secret.data)
                .bind(&secret.metadata)
                .execute(&self.pool),
            )
            .await?;

        match result {
            Ok(done) => {
                secret.id = done.last_insert_rowid();
                Ok(secret)
            }
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                Err(StoreError::OwnerNotFound {
                    user_id: secret.user_id,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_secrets(
        &self,
        ctx: &Context,
        user_id: UserId,
    ) -> Result<Vec<Secret>, StoreError> {
        let rows = ctx
            .run(
                sqlx::query_as::<_, SecretRow>(
                    "SELECT id, user_id, type, data, metadata FROM secrets
                     WHERE user_id = ? ORDER BY id",
                )
                .bind(user_id)
                .fetch_all(&self.pool),
            )
            .await??;

        rows.into_iter().map(Secret::try_from).collect()
    }

    async fn get_secret(
        &self,
        ctx: &Context,
        user_id: UserId,
        secret_id: SecretId,
    ) -> Result<Secret, StoreError> {
        let row = ctx
            .run(
                sqlx::query_as::<_, SecretRow>(
                    "SELECT id, user_id, type, data, metadata FROM secrets
                     WHERE id = ? AND user_id = ?",
                )
                .bind(secret_id)
                .bind(user_id)
                .fetch_optional(&self.pool),
            )
            .await??
            .ok_or(StoreError::SecretNotFound { secret_id })?;

        Secret::try_from(row)
    }

    async fn update_secret(&self, ctx: &Context, secret: Secret) -> Result<Secret, StoreError> {
        let done = ctx
            .run(
                sqlx::query(
                    "UPDATE secrets SET type = ?, data = ?, metadata = ?
                     WHERE id = ? AND user_id = ?",
                )
                .bind(secret.kind.tag())
                .bind(&secret.data)
                .bind(&secret.metadata)
                .bind(secret.id)
                .bind(secret.user_id)
                .execute(&self.pool),
            )
            .await??;

        if done.rows_affected() == 0 {
            return Err(StoreError::SecretNotFound {
                secret_id: secret.id,
            });
        }
        Ok(secret)
    }

    async fn delete_secret(
        &self,
        ctx: &Context,
        user_id: UserId,
        secret_id: SecretId,
    ) -> Result<(), StoreError> {
        let done = ctx
            .run(
                sqlx::query("DELETE FROM secrets WHERE id = ? AND user_id = ?")
                    .bind(secret_id)
                    .bind(user_id)
                    .execute(&self.pool),
            )
            .await??;

        if done.rows_affected() == 0 {
            return Err(StoreError::SecretNotFound { secret_id });
        }
        Ok(())
    }
}
