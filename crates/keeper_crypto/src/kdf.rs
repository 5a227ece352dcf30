//! At-rest key material
//!
//! `normalize_key` turns the operator-supplied key string into the 32 bytes
//! AES-256 needs by truncating or right-padding with zeros. It is NOT a key
//! derivation function: a short or low-entropy string yields a weak key.
//! The scheme is kept as-is so existing ciphertexts stay readable.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use zeroize::Zeroizing;

pub const KEY_LEN: usize = 32;

/// Copy the UTF-8 bytes of `key` into a 32-byte buffer, truncating anything
/// past 32 bytes and zero-filling the rest.
pub fn normalize_key(key: &str) -> Zeroizing<[u8; KEY_LEN]> {
    let mut out = Zeroizing::new([0u8; KEY_LEN]);
    let bytes = key.as_bytes();
    let n = bytes.len().min(KEY_LEN);
    out[..n].copy_from_slice(&bytes[..n]);
    out
}

/// Fresh random 32-byte key, standard base64. Suitable as an
/// `encryption_key` setting.
pub fn generate_key() -> String {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    rand::rngs::OsRng.fill_bytes(key.as_mut());
    STANDARD.encode(key.as_ref())
}
