//! AES-256-GCM authenticated encryption for individual record fields.
//!
//! Each call to `encrypt_field` generates a fresh random 12-byte nonce and
//! prepends it to the ciphertext, so two encryptions of the same plaintext
//! under the same key never produce the same bytes.  `decrypt_field` splits
//! the nonce back out before decrypting and verifies the auth tag —
//! either the full plaintext comes back or an error does, never a prefix.
//!
//! Layout of the stored byte buffer:
//!   [ 12-byte nonce | ciphertext + 16-byte auth tag ]

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use crate::errors::{Result, VaultError};

/// Size of the AES-256-GCM nonce in bytes.
const NONCE_LEN: usize = 12;

/// Size of the GCM authentication tag in bytes.
const TAG_LEN: usize = 16;

/// Encrypt one field value with a 32-byte record key.
///
/// Returns the nonce prepended to the ciphertext (nonce || ciphertext).
/// An empty plaintext is valid and produces nonce + tag only.
pub fn encrypt_field(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| VaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    // Fresh random nonce per call — nonce reuse under the same key would
    // break both confidentiality and integrity.
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| VaultError::EncryptionFailed(format!("encryption error: {e}")))?;

    // Prepend the nonce so one blob per field is all the store holds.
    let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Decrypt a field blob produced by `encrypt_field`.
///
/// Fails with `MalformedCiphertext` when the blob cannot even hold a nonce
/// and a tag, and with `IntegrityFailure` when the tag does not verify
/// (tampered data, corrupted storage, or the wrong key).
pub fn decrypt_field(key: &[u8], blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(VaultError::MalformedCiphertext(format!(
            "blob has {} bytes, need at least {}",
            blob.len(),
            NONCE_LEN + TAG_LEN
        )));
    }

    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| VaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| VaultError::IntegrityFailure)
}
