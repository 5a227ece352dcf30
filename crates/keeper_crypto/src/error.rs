use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("AEAD encryption failed")]
    AeadEncrypt,

    #[error("AEAD decryption failed (malformed envelope or authentication tag mismatch)")]
    AeadDecrypt,

    #[error("Token signing failed: {0}")]
    TokenSigning(String),

    #[error("Serialisation error: {0}")]
    Serialisation(#[from] serde_json::Error),
}

/// Reasons a bearer token is rejected. All of them mean "invalid token" to
/// the caller; the variants exist so tests and logs can tell them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token uses an unsupported signing algorithm")]
    UnsupportedAlgorithm,

    #[error("token signature does not match")]
    BadSignature,

    #[error("token has expired")]
    Expired,
}
