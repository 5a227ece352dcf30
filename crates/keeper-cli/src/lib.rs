//! keeper_cli: authenticated service boundary and command-line client
//!
//! - `config` : layered runtime configuration (flags, env, JSON file)
//! - `service`: `Keeper`: registration, login, token checks, and
//!   per-user secret CRUD over any `SecretStore`
//! - `paths`  : per-user config directory and saved bearer token

pub mod config;
pub mod paths;
pub mod service;

pub use config::{Config, ConfigArgs, ConfigError, StorageType};
pub use service::{AuthenticatedUser, ErrorKind, Keeper, ServiceError};
