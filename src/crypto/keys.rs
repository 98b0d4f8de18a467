//! Per-record symmetric keys.
//!
//! Every credential record gets its own 32-byte AES-256 key, generated
//! from the OS CSPRNG at store time and persisted in the same row as the
//! ciphertext it protects.  The key exists in memory only for the duration
//! of one encrypt or decrypt call and is zeroed when dropped.

use rand::TryRngCore;
use zeroize::Zeroize;

use crate::errors::{Result, VaultError};

/// Length of a record key in bytes (256 bits, for AES-256-GCM).
pub const KEY_LEN: usize = 32;

/// A 32-byte record key that automatically zeroes its memory when dropped.
///
/// Deliberately has no `Debug`, `Clone`, or serde implementations — key
/// bytes must never end up in logs, error messages, or responses.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct RecordKey {
    bytes: [u8; KEY_LEN],
}

impl RecordKey {
    /// Generate a fresh random key from the OS entropy source.
    ///
    /// Uses the fallible CSPRNG interface so entropy-source failure
    /// surfaces as `EntropyExhausted` instead of aborting the process.
    /// This error is fatal for the request and must not be retried here.
    pub fn generate() -> Result<Self> {
        let mut bytes = [0u8; KEY_LEN];
        rand::rngs::OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| VaultError::EntropyExhausted(format!("OS random source: {e}")))?;
        Ok(Self { bytes })
    }

    /// Reconstruct a key from bytes loaded out of the record store.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_LEN {
            return Err(VaultError::MalformedCiphertext(format!(
                "stored key has {} bytes, expected {KEY_LEN}",
                bytes.len()
            )));
        }
        let mut buf = [0u8; KEY_LEN];
        buf.copy_from_slice(bytes);
        Ok(Self { bytes: buf })
    }

    /// Access the raw key bytes (e.g. to pass to the field codec).
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_are_unique() {
        let k1 = RecordKey::generate().unwrap();
        let k2 = RecordKey::generate().unwrap();
        assert_ne!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn from_bytes_roundtrip() {
        let k1 = RecordKey::generate().unwrap();
        let k2 = RecordKey::from_bytes(k1.as_bytes()).unwrap();
        assert_eq!(k1.as_bytes(), k2.as_bytes());
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        assert!(RecordKey::from_bytes(&[0u8; 16]).is_err());
        assert!(RecordKey::from_bytes(&[]).is_err());
    }
}
