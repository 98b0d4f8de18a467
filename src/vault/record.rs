//! Credential record types.
//!
//! A record belongs to exactly one owner and carries one ciphertext blob
//! per named field plus the record key that encrypted them.  The key field
//! is private — the only way at it is `CredentialRecord::key_bytes`, and
//! it never appears in `Debug` output or serialized responses.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroizing;

/// The authenticated identity that owns records.  Produced by the access
/// gate at the transport edge; the vault never mints these itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnerId(Uuid);

impl OwnerId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque record identifier, assigned at creation, immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The fixed set of encrypted fields a credential record can hold.
///
/// Deliberately an enum rather than free-form names: only these five
/// attributes are ever encrypted, so non-secret metadata (ids, versions,
/// timestamps) can never be swept into the ciphertext by accident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldName {
    ApplicationName,
    SiteUrl,
    EmailUsed,
    UsernameUsed,
    Password,
}

impl FieldName {
    /// All field names in storage order.
    pub const ALL: [FieldName; 5] = [
        FieldName::ApplicationName,
        FieldName::SiteUrl,
        FieldName::EmailUsed,
        FieldName::UsernameUsed,
        FieldName::Password,
    ];

    /// The database column holding this field's ciphertext.
    pub fn column(&self) -> &'static str {
        match self {
            FieldName::ApplicationName => "application_name",
            FieldName::SiteUrl => "site_url",
            FieldName::EmailUsed => "email_used",
            FieldName::UsernameUsed => "username_used",
            FieldName::Password => "password",
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Ordered plaintext mapping of field name -> value.
///
/// Used for both input (fields to store/update) and output (decrypted
/// retrieval results).  Each value is encrypted independently; values are
/// never concatenated before encryption.
pub type FieldMap = BTreeMap<FieldName, String>;

/// A stored credential record: owner, per-record key, and one ciphertext
/// blob per present field.
pub struct CredentialRecord {
    pub id: RecordId,
    pub owner: OwnerId,
    /// The record key bytes — private, zeroed when the record is dropped.
    key_bytes: Zeroizing<Vec<u8>>,
    /// Ciphertext per field (nonce + ciphertext + tag), absent fields omitted.
    pub ciphertexts: BTreeMap<FieldName, Vec<u8>>,
    /// Optimistic-concurrency version, bumped on every update.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CredentialRecord {
    pub fn new(
        id: RecordId,
        owner: OwnerId,
        key_bytes: Vec<u8>,
        ciphertexts: BTreeMap<FieldName, Vec<u8>>,
        version: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner,
            key_bytes: Zeroizing::new(key_bytes),
            ciphertexts,
            version,
            created_at,
            updated_at,
        }
    }

    /// Access the raw record key bytes.
    ///
    /// Callers must hold the result only long enough for one encrypt or
    /// decrypt pass and must never log or serialize it.
    pub fn key_bytes(&self) -> &[u8] {
        &self.key_bytes
    }

    /// Non-secret view of this record.
    pub fn metadata(&self) -> RecordMetadata {
        RecordMetadata {
            id: self.id,
            owner: self.owner,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

// Manual Debug so the key and ciphertext bytes stay out of logs.
impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("id", &self.id)
            .field("owner", &self.owner)
            .field("fields", &self.ciphertexts.keys().collect::<Vec<_>>())
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

/// Non-secret record metadata, safe to serialize into responses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub id: RecordId,
    pub owner: OwnerId,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// List-view entry: metadata plus an optional decrypted display label
/// (the application name).  No other field is ever decrypted for listing.
#[derive(Debug, Clone, Serialize)]
pub struct RecordSummary {
    pub id: RecordId,
    pub label: Option<String>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_map_to_distinct_columns() {
        let mut cols: Vec<&str> = FieldName::ALL.iter().map(|f| f.column()).collect();
        cols.sort_unstable();
        cols.dedup();
        assert_eq!(cols.len(), FieldName::ALL.len());
    }

    #[test]
    fn debug_output_hides_key_and_ciphertext() {
        let mut ciphertexts = BTreeMap::new();
        ciphertexts.insert(FieldName::Password, vec![0xDE, 0xAD, 0xBE, 0xEF]);

        let record = CredentialRecord::new(
            RecordId::generate(),
            OwnerId::new(Uuid::new_v4()),
            vec![0x42; 32],
            ciphertexts,
            1,
            Utc::now(),
            Utc::now(),
        );

        let debug = format!("{record:?}");
        assert!(!debug.contains("66, 66"), "key bytes must not appear");
        assert!(!debug.contains("222, 173"), "ciphertext bytes must not appear");
        assert!(debug.contains("Password"));
    }

    #[test]
    fn field_map_iterates_in_storage_order() {
        let mut map = FieldMap::new();
        map.insert(FieldName::Password, "p".into());
        map.insert(FieldName::ApplicationName, "a".into());

        let names: Vec<FieldName> = map.keys().copied().collect();
        assert_eq!(names, vec![FieldName::ApplicationName, FieldName::Password]);
    }
}
