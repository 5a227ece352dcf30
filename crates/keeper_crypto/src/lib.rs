//! keeper_crypto: cryptographic primitives for the Keeper secret store
//!
//! # Design principles
//! - NO custom crypto; all primitives come from audited Rust crates.
//! - Key material and signing secrets are zeroized on drop.
//! - Verification paths report typed failures; nothing is logged here.
//!
//! # Module layout
//! - `aead`    : AES-256-GCM envelope for secret payloads (nonce || ct+tag)
//! - `kdf`     : key normalization for the at-rest encryption key
//! - `password`: Argon2id password hashing and verification
//! - `token`   : HS256 bearer tokens carrying the acting user id
//! - `error`   : unified error type

pub mod aead;
pub mod error;
pub mod kdf;
pub mod password;
pub mod token;

pub use aead::SecretCipher;
pub use error::{CryptoError, TokenError};
pub use password::{hash_password, verify_password};
pub use token::TokenIssuer;
