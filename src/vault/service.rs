//! High-level vault operations invoked by request handlers.
//!
//! `VaultService` wraps the repository and the crypto layer and enforces
//! the ownership gate: every read, update, or delete first checks that the
//! authenticated caller owns the record, using a metadata-only lookup, so
//! the record key is never loaded — let alone used — on behalf of a
//! non-owner.
//!
//! Key policy: one fresh key per record, generated at `store` and
//! persisted in the same row as the ciphertext.  Updates always re-encrypt
//! under the record's existing key, so key and ciphertext cannot drift
//! apart.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::Utc;
use zeroize::Zeroize;

use crate::audit::AuditLog;
use crate::config::Settings;
use crate::crypto::encryption::{decrypt_field, encrypt_field};
use crate::crypto::keys::RecordKey;
use crate::errors::{Result, VaultError};

use super::record::{
    CredentialRecord, FieldMap, FieldName, OwnerId, RecordId, RecordMetadata, RecordSummary,
};
use super::repository::VaultRepository;

/// The main vault handle.
pub struct VaultService {
    repo: VaultRepository,
    audit: Option<AuditLog>,
}

impl VaultService {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Open the vault under `<base_dir>/<settings.vault_dir>`, creating
    /// the directory and databases as needed.
    pub fn open(settings: &Settings, base_dir: &Path) -> Result<Self> {
        let vault_dir = base_dir.join(&settings.vault_dir);
        std::fs::create_dir_all(&vault_dir)?;

        let repo = VaultRepository::open(&vault_dir.join(&settings.database_file))?;
        let audit = if settings.audit_log {
            AuditLog::open(&vault_dir)
        } else {
            None
        };

        Ok(Self { repo, audit })
    }

    // ------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------

    /// Store a new credential record for `owner`.
    ///
    /// Generates a fresh record key, encrypts every provided field with
    /// it, and persists key + ciphertext as one atomic insert.  The owner
    /// is always the authenticated caller — there is no way to pass a
    /// client-supplied owner through this API.  The response carries
    /// metadata only, never an echo of the plaintext.
    pub fn store(&self, owner: &OwnerId, fields: &FieldMap) -> Result<RecordMetadata> {
        let key = RecordKey::generate()?;

        let mut ciphertexts = BTreeMap::new();
        for (name, value) in fields {
            ciphertexts.insert(*name, encrypt_field(key.as_bytes(), value.as_bytes())?);
        }

        let now = Utc::now();
        let record = CredentialRecord::new(
            RecordId::generate(),
            *owner,
            key.as_bytes().to_vec(),
            ciphertexts,
            1,
            now,
            now,
        );
        let metadata = record.metadata();

        self.repo.insert(&record)?;
        self.log("store", owner, Some(&metadata.id), None);

        Ok(metadata)
    }

    /// Decrypt and return every stored field of a record.
    ///
    /// The plaintext map is produced fresh on every call and never cached.
    pub fn retrieve(&self, owner: &OwnerId, id: &RecordId) -> Result<FieldMap> {
        self.gate(owner, id)?;

        let record = self
            .repo
            .fetch(id)?
            .ok_or(VaultError::RecordNotFound(*id))?;

        let fields = self.decrypt_record(owner, &record)?;
        self.log("retrieve", owner, Some(id), None);
        Ok(fields)
    }

    /// Re-encrypt only the fields present in `changed`, under the
    /// record's existing key.  Fields not included keep their prior
    /// ciphertext byte-for-byte.
    ///
    /// An empty `changed` map is a gated no-op.  A concurrent update to
    /// the same record surfaces as `UpdateConflict` — nothing is written.
    pub fn update(&self, owner: &OwnerId, id: &RecordId, changed: &FieldMap) -> Result<()> {
        self.gate(owner, id)?;

        if changed.is_empty() {
            return Ok(());
        }

        let record = self
            .repo
            .fetch(id)?
            .ok_or(VaultError::RecordNotFound(*id))?;

        // The existing key, never a fresh one: re-keying here would orphan
        // the untouched fields' ciphertext.
        let key = RecordKey::from_bytes(record.key_bytes())?;

        let mut ciphertexts = BTreeMap::new();
        for (name, value) in changed {
            ciphertexts.insert(*name, encrypt_field(key.as_bytes(), value.as_bytes())?);
        }

        let applied = self
            .repo
            .update_fields(id, record.version, &ciphertexts, Utc::now())?;
        if !applied {
            return Err(VaultError::UpdateConflict(*id));
        }

        let names: Vec<&str> = changed.keys().map(|f| f.column()).collect();
        self.log("update", owner, Some(id), Some(&names.join(",")));
        Ok(())
    }

    /// List metadata for every record `owner` holds.
    ///
    /// Only the application name is decrypted, per item and under the
    /// same ownership guarantee as `retrieve` (the query is scoped to the
    /// owner).  No other field leaves the store in any form.
    pub fn list_owned(&self, owner: &OwnerId) -> Result<Vec<RecordSummary>> {
        let records = self.repo.list_by_owner(owner)?;

        let mut summaries = Vec::with_capacity(records.len());
        for record in &records {
            let label = match record.ciphertexts.get(&FieldName::ApplicationName) {
                Some(ct) => {
                    let key = RecordKey::from_bytes(record.key_bytes())?;
                    Some(self.decrypt_utf8(owner, &record.id, &key, ct)?)
                }
                None => None,
            };

            summaries.push(RecordSummary {
                id: record.id,
                label,
                version: record.version,
                created_at: record.created_at,
                updated_at: record.updated_at,
            });
        }

        self.log("list", owner, None, Some(&format!("{} records", summaries.len())));
        Ok(summaries)
    }

    /// Delete a record, purging its key and ciphertext.  Terminal: a
    /// deleted record can be neither retrieved nor updated.
    pub fn delete(&self, owner: &OwnerId, id: &RecordId) -> Result<()> {
        self.gate(owner, id)?;

        if !self.repo.delete(id)? {
            return Err(VaultError::RecordNotFound(*id));
        }

        self.log("delete", owner, Some(id), None);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// The ownership gate.  Metadata-only lookup: the row holding the key
    /// is not read here, so a `Forbidden` outcome never touches the key.
    fn gate(&self, owner: &OwnerId, id: &RecordId) -> Result<RecordMetadata> {
        let meta = self
            .repo
            .fetch_meta(id)?
            .ok_or(VaultError::RecordNotFound(*id))?;

        if meta.owner != *owner {
            self.log("forbidden", owner, Some(id), None);
            return Err(VaultError::Forbidden);
        }

        Ok(meta)
    }

    /// Decrypt every stored field of a record into a plaintext map.
    fn decrypt_record(&self, owner: &OwnerId, record: &CredentialRecord) -> Result<FieldMap> {
        let key = RecordKey::from_bytes(record.key_bytes())?;

        let mut fields = FieldMap::new();
        for (name, ciphertext) in &record.ciphertexts {
            fields.insert(*name, self.decrypt_utf8(owner, &record.id, &key, ciphertext)?);
        }
        Ok(fields)
    }

    /// Decrypt one field blob to a string, recording integrity failures
    /// in the audit log before surfacing them.
    fn decrypt_utf8(
        &self,
        owner: &OwnerId,
        id: &RecordId,
        key: &RecordKey,
        ciphertext: &[u8],
    ) -> Result<String> {
        let plaintext_bytes = match decrypt_field(key.as_bytes(), ciphertext) {
            Ok(bytes) => bytes,
            Err(e @ VaultError::IntegrityFailure) => {
                // Possible tampering or key/ciphertext desync — worth a
                // trace, but the entry carries identifiers only.
                self.log("integrity_failure", owner, Some(id), None);
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        // from_utf8 takes ownership; on error, zeroize the bytes inside
        // the error before discarding.
        String::from_utf8(plaintext_bytes).map_err(|e| {
            let mut bad_bytes = e.into_bytes();
            bad_bytes.zeroize();
            VaultError::MalformedCiphertext("decrypted value is not valid UTF-8".to_string())
        })
    }

    /// Fire-and-forget audit entry.  Never fails the parent operation.
    fn log(&self, operation: &str, owner: &OwnerId, id: Option<&RecordId>, details: Option<&str>) {
        if let Some(ref audit) = self.audit {
            audit.log(operation, owner, id, details);
        }
    }
}
