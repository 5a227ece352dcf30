//! Authenticated encryption for secret payloads
//!
//! Uses AES-256-GCM (96-bit nonce, 128-bit tag), no associated data.
//!
//! Ciphertext wire format:
//!   [ nonce (12 bytes) | ciphertext + tag ]

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use zeroize::Zeroizing;

use crate::{
    error::CryptoError,
    kdf::{normalize_key, KEY_LEN},
};

pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

/// Holds the at-rest key for the lifetime of the process. Immutable after
/// construction, so one instance can be shared across tasks.
pub struct SecretCipher {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl SecretCipher {
    pub fn new(key: [u8; KEY_LEN]) -> Self {
        Self { key: Zeroizing::new(key) }
    }

    /// Build from the operator-supplied key string (see [`normalize_key`]).
    pub fn from_passphrase(key: &str) -> Self {
        Self { key: normalize_key(key) }
    }

    /// Encrypt `plaintext`, prepending a fresh random nonce.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        encrypt(&self.key, plaintext)
    }

    /// Decrypt wire-format bytes (nonce || ciphertext+tag).
    pub fn decrypt(&self, data: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        decrypt(&self.key, data)
    }
}

impl std::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretCipher").finish_non_exhaustive()
    }
}

/// Encrypt `plaintext` with a 32-byte key, prepending a random 12-byte nonce.
pub fn encrypt(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::AeadEncrypt)?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::AeadEncrypt)?;

    let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt wire-format bytes. Fails on anything shorter than a nonce, on a
/// wrong key, and on any tampering.
pub fn decrypt(key: &[u8; KEY_LEN], data: &[u8]) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if data.len() < NONCE_LEN {
        return Err(CryptoError::AeadDecrypt);
    }
    let (nonce_bytes, ct) = data.split_at(NONCE_LEN);

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::AeadDecrypt)?;

    let plaintext = cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ct)
        .map_err(|_| CryptoError::AeadDecrypt)?;

    Ok(Zeroizing::new(plaintext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_recovers_plaintext() {
        let cipher = SecretCipher::from_passphrase("K");
        let ct = cipher.encrypt(b"hello").expect("encrypt");
        assert_eq!(ct.len(), NONCE_LEN + 5 + TAG_LEN);
        let pt = cipher.decrypt(&ct).expect("decrypt");
        assert_eq!(pt.as_slice(), b"hello");
    }

    #[test]
    fn same_plaintext_encrypts_differently() {
        let cipher = SecretCipher::new([9u8; KEY_LEN]);
        let a = cipher.encrypt(b"card 4111").unwrap();
        let b = cipher.encrypt(b"card 4111").unwrap();
        assert_ne!(a, b);
        assert_ne!(a[..NONCE_LEN], b[..NONCE_LEN]);
    }

    #[test]
    fn wrong_key_is_rejected() {
        let ct = SecretCipher::from_passphrase("first").encrypt(b"payload").unwrap();
        let err = SecretCipher::from_passphrase("second").decrypt(&ct).unwrap_err();
        assert!(matches!(err, CryptoError::AeadDecrypt));
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let cipher = SecretCipher::from_passphrase("K");
        let mut ct = cipher.encrypt(b"payload").unwrap();
        let last = ct.len() - 1;
        ct[last] ^= 0x01;
        assert!(matches!(cipher.decrypt(&ct), Err(CryptoError::AeadDecrypt)));
    }

    #[test]
    fn short_input_is_rejected() {
        let cipher = SecretCipher::from_passphrase("K");
        assert!(matches!(cipher.decrypt(&[0u8; 5]), Err(CryptoError::AeadDecrypt)));
        // A bare nonce has no tag to authenticate.
        assert!(matches!(
            cipher.decrypt(&[0u8; NONCE_LEN]),
            Err(CryptoError::AeadDecrypt)
        ));
    }
}
