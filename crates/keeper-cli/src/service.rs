//! Authenticated request boundary in front of the store.
//!
//! Secret operations require an [`AuthenticatedUser`], which only
//! [`Keeper::authenticate`] can produce. The acting user id comes from the
//! verified token and overrides whatever `user_id` a payload carries.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use keeper_crypto::{hash_password, verify_password, CryptoError, TokenError, TokenIssuer};
use keeper_store::{
    Context, EncryptedStore, MemoryStore, Secret, SecretId, SecretStore, SqliteStore, StoreError,
    User, UserId,
};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{Config, StorageType};

const BEARER_PREFIX: &str = "Bearer ";

/// Coarse failure class for transport-level mapping (HTTP status, exit
/// code, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Conflict,
    NotFound,
    IntegrityFailure,
    Unavailable,
    Internal,
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("missing or malformed bearer credential")]
    MissingCredential,

    #[error("invalid token: {0}")]
    InvalidToken(#[source] TokenError),

    /// Unknown login and wrong password look the same.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid secret ID {0}")]
    InvalidSecretId(SecretId),

    #[error("failed to hash password: {0}")]
    Hashing(#[source] CryptoError),

    #[error("failed to issue token: {0}")]
    TokenSigning(#[source] CryptoError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::MissingCredential
            | ServiceError::InvalidToken(_)
            | ServiceError::InvalidCredentials => ErrorKind::Unauthorized,
            ServiceError::InvalidSecretId(_) => ErrorKind::BadRequest,
            ServiceError::Hashing(_) | ServiceError::TokenSigning(_) => ErrorKind::Internal,
            ServiceError::Store(e) => match e {
                StoreError::UserExists { .. } => ErrorKind::Conflict,
                StoreError::UserNotFound { .. } | StoreError::SecretNotFound { .. } => {
                    ErrorKind::NotFound
                }
                StoreError::Decryption { .. } => ErrorKind::IntegrityFailure,
                StoreError::BackendUnavailable(_)
                | StoreError::Cancelled
                | StoreError::DeadlineExceeded => ErrorKind::Unavailable,
                _ => ErrorKind::Internal,
            },
        }
    }
}

/// Verified acting user. No public constructor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser {
    user_id: UserId,
}

impl AuthenticatedUser {
    pub fn user_id(&self) -> UserId {
        self.user_id
    }
}

pub struct Keeper {
    store: Arc<dyn SecretStore>,
    tokens: TokenIssuer,
    request_timeout: Duration,
}

impl Keeper {
    pub fn new(store: Arc<dyn SecretStore>, tokens: TokenIssuer, request_timeout: Duration) -> Self {
        Self {
            store,
            tokens,
            request_timeout,
        }
    }

    /// Build the configured backend, wrap it for encryption when a key is
    /// set, and attach a token issuer.
    pub async fn from_config(cfg: &Config) -> Result<Self, StoreError> {
        let backend: Arc<dyn SecretStore> = match cfg.storage_type {
            StorageType::Memory => {
                warn!("using in-memory storage; data is lost when the process exits");
                Arc::new(MemoryStore::new())
            }
            StorageType::Sqlite => Arc::new(open_sqlite(&cfg.database_dsn).await?),
        };

        let store: Arc<dyn SecretStore> = match cfg.encryption_key() {
            Some(key) => Arc::new(EncryptedStore::new(backend, Some(key))),
            None => {
                warn!("encryption_key not set; secret payloads are stored in plaintext");
                backend
            }
        };

        Ok(Self::new(
            store,
            TokenIssuer::new(&cfg.jwt_secret),
            cfg.request_timeout(),
        ))
    }

    fn context(&self) -> Context {
        Context::with_timeout(self.request_timeout)
    }

    pub async fn register(&self, login: &str, password: &str) -> Result<User, ServiceError> {
        let hash = hash_password(password).map_err(ServiceError::Hashing)?;
        let user = self.store.create_user(&self.context(), login, &hash).await?;
        info!(user_id = user.id, "user registered");
        Ok(user)
    }

    /// Returns a signed bearer token.
    pub async fn login(&self, login: &str, password: &str) -> Result<String, ServiceError> {
        let user = match self.store.get_user_by_login(&self.context(), login).await {
            Ok(user) => user,
            Err(StoreError::UserNotFound { .. }) => return Err(ServiceError::InvalidCredentials),
            Err(e) => return Err(e.into()),
        };
        if !verify_password(password, &user.password_hash) {
            return Err(ServiceError::InvalidCredentials);
        }
        let token = self
            .tokens
            .issue(user.id)
            .map_err(ServiceError::TokenSigning)?;
        info!(user_id = user.id, "user logged in");
        Ok(token)
    }

    /// Validate an `Authorization` header value of the form `Bearer <token>`.
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<AuthenticatedUser, ServiceError> {
        let token = authorization
            .and_then(|h| h.strip_prefix(BEARER_PREFIX))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(ServiceError::MissingCredential)?;

        match self.tokens.verify(token) {
            Ok(user_id) => Ok(AuthenticatedUser { user_id }),
            Err(e) => {
                warn!(reason = %e, "rejected bearer token");
                Err(ServiceError::InvalidToken(e))
            }
        }
    }

    pub async fn create_secret(
        &self,
        who: &AuthenticatedUser,
        secret: Secret,
    ) -> Result<Secret, ServiceError> {
        let secret = Secret {
            id: 0,
            user_id: who.user_id,
            ..secret
        };
        Ok(self.store.create_secret(&self.context(), secret).await?)
    }

    pub async fn list_secrets(&self, who: &AuthenticatedUser) -> Result<Vec<Secret>, ServiceError> {
        Ok(self.store.list_secrets(&self.context(), who.user_id).await?)
    }

    pub async fn get_secret(
        &self,
        who: &AuthenticatedUser,
        secret_id: SecretId,
    ) -> Result<Secret, ServiceError> {
        check_secret_id(secret_id)?;
        Ok(self
            .store
            .get_secret(&self.context(), who.user_id, secret_id)
            .await?)
    }

    pub async fn update_secret(
        &self,
        who: &AuthenticatedUser,
        secret: Secret,
    ) -> Result<Secret, ServiceError> {
        check_secret_id(secret.id)?;
        let secret = Secret {
            user_id: who.user_id,
            ..secret
        };
        Ok(self.store.update_secret(&self.context(), secret).await?)
    }

    pub async fn delete_secret(
        &self,
        who: &AuthenticatedUser,
        secret_id: SecretId,
    ) -> Result<(), ServiceError> {
        check_secret_id(secret_id)?;
        Ok(self
            .store
            .delete_secret(&self.context(), who.user_id, secret_id)
            .await?)
    }
}

fn check_secret_id(secret_id: SecretId) -> Result<(), ServiceError> {
    if secret_id <= 0 {
        return Err(ServiceError::InvalidSecretId(secret_id));
    }
    Ok(())
}

async fn open_sqlite(dsn: &str) -> Result<SqliteStore, StoreError> {
    if dsn.starts_with("sqlite:") {
        SqliteStore::connect(dsn).await
    } else {
        SqliteStore::open(Path::new(dsn)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keeper() -> Keeper {
        Keeper::new(
            Arc::new(MemoryStore::new()),
            TokenIssuer::new("test-secret"),
            Duration::from_secs(5),
        )
    }

    #[test]
    fn error_kinds_map_for_transport() {
        assert_eq!(ServiceError::MissingCredential.kind(), ErrorKind::Unauthorized);
        assert_eq!(
            ServiceError::InvalidToken(TokenError::Expired).kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            ServiceError::from(StoreError::UserExists { login: "a".into() }).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            ServiceError::from(StoreError::SecretNotFound { secret_id: 1 }).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ServiceError::from(StoreError::Decryption { secret_id: 1 }).kind(),
            ErrorKind::IntegrityFailure
        );
        assert_eq!(
            ServiceError::from(StoreError::DeadlineExceeded).kind(),
            ErrorKind::Unavailable
        );
        assert_eq!(ServiceError::InvalidSecretId(0).kind(), ErrorKind::BadRequest);
    }

    #[test]
    fn authenticate_requires_bearer_scheme() {
        let k = keeper();
        for header in [None, Some(""), Some("Bearer "), Some("Basic abc"), Some("bearer x")] {
            assert!(matches!(
                k.authenticate(header),
                Err(ServiceError::MissingCredential)
            ));
        }
    }

    #[test]
    fn authenticate_rejects_garbage_token() {
        let k = keeper();
        assert!(matches!(
            k.authenticate(Some("Bearer not.a.token")),
            Err(ServiceError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn non_positive_secret_ids_are_rejected_before_the_store() {
        let k = keeper();
        k.register("alice", "pw").await.unwrap();
        let token = k.login("alice", "pw").await.unwrap();
        let who = k.authenticate(Some(format!("Bearer {token}").as_str())).unwrap();
        assert!(matches!(
            k.get_secret(&who, 0).await,
            Err(ServiceError::InvalidSecretId(0))
        ));
        assert!(matches!(
            k.delete_secret(&who, -3).await,
            Err(ServiceError::InvalidSecretId(-3))
        ));
    }
}
