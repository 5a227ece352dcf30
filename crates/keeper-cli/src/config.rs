//! Runtime configuration.
//!
//! Resolution order, highest first: command-line flags, `KEEPER_*`
//! environment variables, the JSON file named by `--config`, built-in
//! defaults. clap folds flags and environment into [`ConfigArgs`]; anything
//! still unset there falls back to the file, then to [`Config::default`].

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Memory,
    Sqlite,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage_type: StorageType,
    /// SQLite file path or sqlx URL. Required for `sqlite`.
    pub database_dsn: String,
    pub jwt_secret: String,
    /// Empty disables at-rest encryption.
    pub encryption_key: String,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Memory,
            database_dsn: String::new(),
            jwt_secret: String::new(),
            encryption_key: String::new(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("storage_type", &self.storage_type)
            .field("database_dsn", &self.database_dsn)
            .field("jwt_secret", &"<redacted>")
            .field("encryption_enabled", &!self.encryption_key.is_empty())
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("database_dsn is required when storage_type is 'sqlite'")]
    MissingDatabaseDsn,

    #[error("jwt_secret is required")]
    MissingJwtSecret,

    #[error("request_timeout must be at least one second")]
    ZeroTimeout,
}

/// Flag and environment layer.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigArgs {
    /// Path to a JSON configuration file
    #[arg(long = "config", env = "KEEPER_CONFIG", global = true)]
    pub config_file: Option<PathBuf>,

    /// Storage backend
    #[arg(long, env = "KEEPER_STORAGE_TYPE", value_enum, global = true)]
    pub storage_type: Option<StorageType>,

    /// SQLite database path or URL
    #[arg(long, env = "KEEPER_DATABASE_DSN", global = true)]
    pub database_dsn: Option<String>,

    /// Token signing secret
    #[arg(long, env = "KEEPER_JWT_SECRET", hide_env_values = true, global = true)]
    pub jwt_secret: Option<String>,

    /// At-rest encryption key for secret payloads
    #[arg(long, env = "KEEPER_ENCRYPTION_KEY", hide_env_values = true, global = true)]
    pub encryption_key: Option<String>,

    /// Per-request deadline in seconds
    #[arg(long = "request-timeout", env = "KEEPER_REQUEST_TIMEOUT", global = true)]
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    /// Parse a JSON file. Missing fields keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Layer `args` over the file (if any) over defaults, then validate.
    pub fn resolve(args: &ConfigArgs) -> Result<Self, ConfigError> {
        let mut cfg = match &args.config_file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        cfg.apply(args);
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply(&mut self, args: &ConfigArgs) {
        if let Some(storage_type) = args.storage_type {
            self.storage_type = storage_type;
        }
        if let Some(dsn) = &args.database_dsn {
            self.database_dsn = dsn.clone();
        }
        if let Some(secret) = &args.jwt_secret {
            self.jwt_secret = secret.clone();
        }
        if let Some(key) = &args.encryption_key {
            self.encryption_key = key.clone();
        }
        if let Some(secs) = args.request_timeout_secs {
            self.request_timeout_secs = secs;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_type == StorageType::Sqlite && self.database_dsn.is_empty() {
            return Err(ConfigError::MissingDatabaseDsn);
        }
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::MissingJwtSecret);
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn encryption_key(&self) -> Option<&str> {
        Some(self.encryption_key.as_str()).filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args() -> ConfigArgs {
        ConfigArgs {
            jwt_secret: Some("s3cret".into()),
            ..ConfigArgs::default()
        }
    }

    #[test]
    fn defaults_need_only_a_signing_secret() {
        let cfg = Config::resolve(&args()).unwrap();
        assert_eq!(cfg.storage_type, StorageType::Memory);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.encryption_key(), None);
    }

    #[test]
    fn missing_jwt_secret_is_rejected() {
        let err = Config::resolve(&ConfigArgs::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingJwtSecret));
    }

    #[test]
    fn sqlite_requires_dsn() {
        let err = Config::resolve(&ConfigArgs {
            storage_type: Some(StorageType::Sqlite),
            ..args()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingDatabaseDsn));
    }

    #[test]
    fn flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"storage_type":"sqlite","database_dsn":"from-file.db","jwt_secret":"file","encryption_key":"file-key"}}"#
        )
        .unwrap();

        let cfg = Config::resolve(&ConfigArgs {
            config_file: Some(file.path().to_path_buf()),
            database_dsn: Some("from-flag.db".into()),
            ..ConfigArgs::default()
        })
        .unwrap();

        assert_eq!(cfg.storage_type, StorageType::Sqlite);
        assert_eq!(cfg.database_dsn, "from-flag.db");
        assert_eq!(cfg.jwt_secret, "file");
        assert_eq!(cfg.encryption_key(), Some("file-key"));
        assert_eq!(cfg.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn unknown_storage_type_in_file_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"storage_type":"postgres"}}"#).unwrap();
        let err = Config::resolve(&ConfigArgs {
            config_file: Some(file.path().to_path_buf()),
            ..args()
        })
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn debug_hides_secrets() {
        let cfg = Config {
            jwt_secret: "s3cret".into(),
            encryption_key: "k3y".into(),
            ..Config::default()
        };
        let shown = format!("{cfg:?}");
        assert!(!shown.contains("s3cret"));
        assert!(!shown.contains("k3y"));
    }
}
