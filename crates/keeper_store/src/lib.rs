//! keeper_store: persistence for users and their secrets
//!
//! # Layers
//! - [`SecretStore`] is the storage contract. Every backend and the
//!   encryption decorator implement it, so callers hold an
//!   `Arc<dyn SecretStore>` and never care which one they got.
//! - [`MemoryStore`] keeps everything in process memory behind one
//!   reader/writer lock. Nothing survives a restart.
//! - [`SqliteStore`] persists to SQLite via sqlx. The schema is created on
//!   open by the embedded migrations in `migrations/`.
//! - [`EncryptedStore`] wraps any store and encrypts secret payloads with
//!   AES-256-GCM before they reach it. User rows and secret metadata are
//!   stored as given.
//!
//! # Acting user
//! Secret operations take the owning user id explicitly. This layer trusts
//! it; establishing it from a verified token is the caller's job.

pub mod context;
pub mod db;
pub mod encrypted;
pub mod error;
pub mod memory;
pub mod migrations;
pub mod models;
pub mod store;

pub use context::Context;
pub use db::SqliteStore;
pub use encrypted::EncryptedStore;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use models::{Secret, SecretId, SecretType, User, UserId};
pub use store::SecretStore;
