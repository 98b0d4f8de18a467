use thiserror::Error;

use crate::vault::record::RecordId;

/// All errors that can occur in credvault.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Access errors ---
    //
    // `Forbidden` is a generic denial on purpose: it carries no record
    // metadata, so a non-owner learns nothing beyond "no".
    #[error("Access denied")]
    Forbidden,

    #[error("Record {0} not found")]
    RecordNotFound(RecordId),

    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Ciphertext failed authentication — tampered data or key mismatch")]
    IntegrityFailure,

    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    #[error("Key generation failed: {0}")]
    EntropyExhausted(String),

    // --- Concurrency ---
    #[error("Record {0} was modified concurrently — re-read and retry")]
    UpdateConflict(RecordId),

    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Ambient errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    #[error("Audit error: {0}")]
    AuditError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience type alias for credvault results.
pub type Result<T> = std::result::Result<T, VaultError>;
