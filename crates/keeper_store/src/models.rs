//! Domain records and their SQL row mappings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::StoreError;

pub type UserId = i64;
pub type SecretId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    #[serde(default)]
    pub id: UserId,
    pub login: String,
    /// PHC-encoded Argon2id hash. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
}

/// Closed set of secret kinds. The integer tags are part of the wire and
/// storage format and must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum SecretType {
    LoginPassword = 0,
    Text = 1,
    Binary = 2,
    BankCard = 3,
}

impl SecretType {
    pub const ALL: [SecretType; 4] = [
        SecretType::LoginPassword,
        SecretType::Text,
        SecretType::Binary,
        SecretType::BankCard,
    ];

    pub fn tag(self) -> i64 {
        self as i64
    }

    pub fn name(self) -> &'static str {
        match self {
            SecretType::LoginPassword => "login",
            SecretType::Text => "text",
            SecretType::Binary => "binary",
            SecretType::BankCard => "bankcard",
        }
    }
}

impl TryFrom<i64> for SecretType {
    type Error = StoreError;

    fn try_from(tag: i64) -> Result<Self, Self::Error> {
        SecretType::ALL
            .into_iter()
            .find(|t| t.tag() == tag)
            .ok_or(StoreError::InvalidSecretType(tag))
    }
}

impl From<SecretType> for i64 {
    fn from(t: SecretType) -> Self {
        t.tag()
    }
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid secret type '{0}' (expected login, text, binary or bankcard)")]
pub struct UnknownSecretType(pub String);

impl FromStr for SecretType {
    type Err = UnknownSecretType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SecretType::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| UnknownSecretType(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    #[serde(default)]
    pub id: SecretId,
    #[serde(default)]
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: SecretType,
    /// Opaque payload; ciphertext envelope when stored behind an
    /// [`EncryptedStore`](crate::EncryptedStore). Standard base64 in JSON.
    #[serde(with = "base64_bytes", default)]
    pub data: Vec<u8>,
    /// Plaintext label. Never encrypted.
    #[serde(default)]
    pub metadata: String,
}

impl Secret {
    /// A not-yet-stored secret; the store assigns `id`.
    pub fn new(
        user_id: UserId,
        kind: SecretType,
        data: impl Into<Vec<u8>>,
        metadata: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            user_id,
            kind,
            data: data.into(),
            metadata: metadata.into(),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct SecretRow {
    pub id: i64,
    pub user_id: i64,
    #[sqlx(rename = "type")]
    pub kind: i64,
    pub data: Vec<u8>,
    pub metadata: Option<String>,
}

impl TryFrom<SecretRow> for Secret {
    type Error = StoreError;

    fn try_from(row: SecretRow) -> Result<Self, Self::Error> {
        Ok(Secret {
            id: row.id,
            user_id: row.user_id,
            kind: SecretType::try_from(row.kind)?,
            data: row.data,
            metadata: row.metadata.unwrap_or_default(),
        })
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let encoded = Option::<String>::deserialize(d)?.unwrap_or_default();
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_tags_are_stable() {
        assert_eq!(SecretType::LoginPassword.tag(), 0);
        assert_eq!(SecretType::Text.tag(), 1);
        assert_eq!(SecretType::Binary.tag(), 2);
        assert_eq!(SecretType::BankCard.tag(), 3);
        assert!(matches!(
            SecretType::try_from(4),
            Err(StoreError::InvalidSecretType(4))
        ));
    }

    #[test]
    fn type_names_parse() {
        assert_eq!("bankcard".parse::<SecretType>(), Ok(SecretType::BankCard));
        assert_eq!("login".parse::<SecretType>(), Ok(SecretType::LoginPassword));
        assert!("card".parse::<SecretType>().is_err());
    }

    #[test]
    fn secret_json_matches_wire_format() {
        let secret = Secret {
            id: 3,
            user_id: 1,
            kind: SecretType::Text,
            data: b"hello".to_vec(),
            metadata: "note".into(),
        };
        let value = serde_json::to_value(&secret).unwrap();
        assert_eq!(
            value,
            json!({"id": 3, "user_id": 1, "type": 1, "data": "aGVsbG8=", "metadata": "note"})
        );
        let back: Secret = serde_json::from_value(value).unwrap();
        assert_eq!(back, secret);
    }

    #[test]
    fn secret_json_rejects_unknown_type() {
        let err = serde_json::from_value::<Secret>(json!({"type": 9, "data": ""}));
        assert!(err.is_err());
    }

    #[test]
    fn user_json_hides_password_hash() {
        let user = User {
            id: 1,
            login: "alice".into(),
            password_hash: "$argon2id$...".into(),
        };
        let value = serde_json::to_value(&user).unwrap();
        assert_eq!(value, json!({"id": 1, "login": "alice"}));
    }
}
