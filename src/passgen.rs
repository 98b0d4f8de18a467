//! Generated passwords for store requests that supply a length instead of
//! a secret value.
//!
//! Draws from the OS CSPRNG with rejection sampling, so every character
//! position is uniform over the charset — a plain modulo would bias the
//! low end of the alphabet.

use rand::TryRngCore;
use zeroize::Zeroizing;

use crate::errors::{Result, VaultError};

/// Characters a generated password may contain.
const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ\
                         abcdefghijklmnopqrstuvwxyz\
                         0123456789\
                         !@#$%^&*()-_=+[]{}";

/// Shortest password this module will generate.
pub const MIN_LENGTH: usize = 8;

/// Longest password this module will generate.
pub const MAX_LENGTH: usize = 128;

/// Generate a random password of `length` characters.
///
/// The result is wrapped in `Zeroizing` so the plaintext is cleared once
/// the caller is done encrypting it.
pub fn generate_password(length: usize) -> Result<Zeroizing<String>> {
    if !(MIN_LENGTH..=MAX_LENGTH).contains(&length) {
        return Err(VaultError::InvalidInput(format!(
            "password length must be between {MIN_LENGTH} and {MAX_LENGTH}, got {length}"
        )));
    }

    let mut rng = rand::rngs::OsRng;

    // Largest multiple of the charset size that fits in a u32; values at
    // or above it are rejected to keep the distribution uniform.
    let charset_len = CHARSET.len() as u32;
    let reject_above = u32::MAX - (u32::MAX % charset_len);

    let mut password = String::with_capacity(length);
    while password.len() < length {
        let sample = rng
            .try_next_u32()
            .map_err(|e| VaultError::EntropyExhausted(format!("OS random source: {e}")))?;
        if sample >= reject_above {
            continue;
        }
        password.push(CHARSET[(sample % charset_len) as usize] as char);
    }

    Ok(Zeroizing::new(password))
}
