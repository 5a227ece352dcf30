use thiserror::Error;

use crate::models::{SecretId, UserId};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user with login '{login}' already exists")]
    UserExists { login: String },

    #[error("user with login '{login}' not found")]
    UserNotFound { login: String },

    /// Also returned when the secret exists but belongs to someone else.
    #[error("secret with ID '{secret_id}' not found")]
    SecretNotFound { secret_id: SecretId },

    #[error("owner user {user_id} does not exist")]
    OwnerNotFound { user_id: UserId },

    /// Stored ciphertext failed to decrypt: tampering, truncation or a
    /// different key. Never reported as not-found.
    #[error("failed to decrypt secret {secret_id}")]
    Decryption { secret_id: SecretId },

    #[error("failed to encrypt secret data: {0}")]
    Encryption(#[source] keeper_crypto::CryptoError),

    #[error("unknown secret type tag {0}")]
    InvalidSecretType(i64),

    #[error("request cancelled")]
    Cancelled,

    #[error("request deadline exceeded")]
    DeadlineExceeded,

    #[error("storage backend unavailable: {0}")]
    BackendUnavailable(#[source] sqlx::Error),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::BackendUnavailable(e),
            other => StoreError::Database(other),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for StoreError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        StoreError::Migration(e.to_string())
    }
}
