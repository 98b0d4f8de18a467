//! Cryptographic primitives: per-record key generation and field-level
//! authenticated encryption.

pub mod encryption;
pub mod keys;

pub use encryption::{decrypt_field, encrypt_field};
pub use keys::{RecordKey, KEY_LEN};
