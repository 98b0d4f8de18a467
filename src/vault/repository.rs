//! SQLite-backed persistence for credential records.
//!
//! One row per record holds the owner, the record key, and one ciphertext
//! BLOB per field.  Because key and ciphertext live in the same row, every
//! insert, update, and delete is a single statement — the key can never be
//! committed without its ciphertext or vice versa.
//!
//! Concurrent updates to the same record are serialized with optimistic
//! versioning: `update_fields` only applies when the caller's version
//! matches the stored one, and reports `false` otherwise.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::errors::Result;
use crate::vault::record::{CredentialRecord, FieldName, OwnerId, RecordId, RecordMetadata};

/// Handle to the record database.
pub struct VaultRepository {
    conn: Connection,
}

impl VaultRepository {
    /// Open (or create) the record database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // Restrict the database file to the owning user.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(path, perms);
        }

        let repo = Self { conn };
        repo.run_migrations()?;
        Ok(repo)
    }

    /// Open an in-memory database, used by unit tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let repo = Self { conn };
        repo.run_migrations()?;
        Ok(repo)
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS credential_records (
                id               TEXT PRIMARY KEY,
                owner            TEXT NOT NULL,
                key_bytes        BLOB NOT NULL,
                application_name BLOB,
                site_url         BLOB,
                email_used       BLOB,
                username_used    BLOB,
                password         BLOB,
                version          INTEGER NOT NULL DEFAULT 1,
                created_at       TEXT NOT NULL,
                updated_at       TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_credential_records_owner
                ON credential_records(owner);",
        )?;
        Ok(())
    }

    /// Insert a freshly created record.
    ///
    /// Key and all field ciphertexts go in as one statement, so the write
    /// is atomic: there is no window where ciphertext exists without its
    /// key.
    pub fn insert(&self, record: &CredentialRecord) -> Result<()> {
        self.conn.execute(
            "INSERT INTO credential_records
                (id, owner, key_bytes,
                 application_name, site_url, email_used, username_used, password,
                 version, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                record.id.to_string(),
                record.owner.to_string(),
                record.key_bytes(),
                record.ciphertexts.get(&FieldName::ApplicationName),
                record.ciphertexts.get(&FieldName::SiteUrl),
                record.ciphertexts.get(&FieldName::EmailUsed),
                record.ciphertexts.get(&FieldName::UsernameUsed),
                record.ciphertexts.get(&FieldName::Password),
                record.version,
                record.created_at.to_rfc3339(),
                record.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch only the non-secret metadata for a record.
    ///
    /// The service uses this for the ownership gate so the key row is
    /// never even loaded on behalf of a non-owner.
    pub fn fetch_meta(&self, id: &RecordId) -> Result<Option<RecordMetadata>> {
        let mut stmt = self.conn.prepare(
            "SELECT owner, version, created_at, updated_at
             FROM credential_records WHERE id = ?1",
        )?;

        let mut rows = stmt.query(rusqlite::params![id.to_string()])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let owner: String = row.get(0)?;
        let version: i64 = row.get(1)?;
        let created_at: String = row.get(2)?;
        let updated_at: String = row.get(3)?;

        Ok(Some(RecordMetadata {
            id: *id,
            owner: parse_owner(&owner)?,
            version,
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
        }))
    }

    /// Fetch a full record, including its key and ciphertexts.
    pub fn fetch(&self, id: &RecordId) -> Result<Option<CredentialRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner, key_bytes,
                    application_name, site_url, email_used, username_used, password,
                    version, created_at, updated_at
             FROM credential_records WHERE id = ?1",
        )?;

        let mut rows = stmt.query(rusqlite::params![id.to_string()])?;
        match rows.next()? {
            Some(row) => Ok(Some(row_to_record(row)?)),
            None => Ok(None),
        }
    }

    /// Replace the ciphertext of the given fields, leaving every other
    /// column untouched.
    ///
    /// Applies only when `expected_version` still matches; returns `false`
    /// when another update won the race, in which case nothing changed.
    pub fn update_fields(
        &self,
        id: &RecordId,
        expected_version: i64,
        changed: &BTreeMap<FieldName, Vec<u8>>,
        updated_at: DateTime<Utc>,
    ) -> Result<bool> {
        if changed.is_empty() {
            return Ok(true);
        }

        // Column names come from the FieldName enum, never from input.
        let mut assignments: Vec<String> =
            changed.keys().map(|f| format!("{} = ?", f.column())).collect();
        assignments.push("version = version + 1".to_string());
        assignments.push("updated_at = ?".to_string());

        let sql = format!(
            "UPDATE credential_records SET {} WHERE id = ? AND version = ?",
            assignments.join(", ")
        );

        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = changed
            .values()
            .map(|ct| Box::new(ct.clone()) as Box<dyn rusqlite::types::ToSql>)
            .collect();
        params.push(Box::new(updated_at.to_rfc3339()));
        params.push(Box::new(id.to_string()));
        params.push(Box::new(expected_version));

        let params_refs: Vec<&dyn rusqlite::types::ToSql> = params.iter().map(|p| &**p).collect();
        let affected = self.conn.execute(&sql, params_refs.as_slice())?;
        Ok(affected == 1)
    }

    /// List every record belonging to `owner`, sorted by creation time.
    pub fn list_by_owner(&self, owner: &OwnerId) -> Result<Vec<CredentialRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, owner, key_bytes,
                    application_name, site_url, email_used, username_used, password,
                    version, created_at, updated_at
             FROM credential_records WHERE owner = ?1
             ORDER BY created_at, id",
        )?;

        let mut rows = stmt.query(rusqlite::params![owner.to_string()])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(row_to_record(row)?);
        }
        Ok(records)
    }

    /// Delete a record, purging its key and ciphertext in one statement.
    /// Returns `true` if the record existed.
    pub fn delete(&self, id: &RecordId) -> Result<bool> {
        let affected = self.conn.execute(
            "DELETE FROM credential_records WHERE id = ?1",
            rusqlite::params![id.to_string()],
        )?;
        Ok(affected == 1)
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> Result<CredentialRecord> {
    let id_str: String = row.get(0)?;
    let owner_str: String = row.get(1)?;
    let key_bytes: Vec<u8> = row.get(2)?;

    let mut ciphertexts = BTreeMap::new();
    for (idx, field) in FieldName::ALL.iter().enumerate() {
        let blob: Option<Vec<u8>> = row.get(3 + idx)?;
        if let Some(ct) = blob {
            ciphertexts.insert(*field, ct);
        }
    }

    let version: i64 = row.get(8)?;
    let created_at: String = row.get(9)?;
    let updated_at: String = row.get(10)?;

    Ok(CredentialRecord::new(
        parse_record_id(&id_str)?,
        parse_owner(&owner_str)?,
        key_bytes,
        ciphertexts,
        version,
        parse_timestamp(&created_at),
        parse_timestamp(&updated_at),
    ))
}

fn parse_record_id(s: &str) -> Result<RecordId> {
    let uuid = uuid::Uuid::parse_str(s).map_err(|e| {
        crate::errors::VaultError::Storage(rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(e),
        ))
    })?;
    Ok(RecordId::new(uuid))
}

fn parse_owner(s: &str) -> Result<OwnerId> {
    let uuid = uuid::Uuid::parse_str(s).map_err(|e| {
        crate::errors::VaultError::Storage(rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            Box::new(e),
        ))
    })?;
    Ok(OwnerId::new(uuid))
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample_record(owner: OwnerId) -> CredentialRecord {
        let mut ciphertexts = BTreeMap::new();
        ciphertexts.insert(FieldName::ApplicationName, vec![1, 2, 3]);
        ciphertexts.insert(FieldName::Password, vec![4, 5, 6, 7]);

        let now = Utc::now();
        CredentialRecord::new(
            RecordId::generate(),
            owner,
            vec![0xAB; 32],
            ciphertexts,
            1,
            now,
            now,
        )
    }

    #[test]
    fn insert_and_fetch_roundtrip() {
        let repo = VaultRepository::open_in_memory().unwrap();
        let owner = OwnerId::new(Uuid::new_v4());
        let record = sample_record(owner);

        repo.insert(&record).unwrap();

        let fetched = repo.fetch(&record.id).unwrap().expect("record exists");
        assert_eq!(fetched.owner, owner);
        assert_eq!(fetched.key_bytes(), record.key_bytes());
        assert_eq!(fetched.ciphertexts, record.ciphertexts);
        assert_eq!(fetched.version, 1);
        assert!(!fetched.ciphertexts.contains_key(&FieldName::SiteUrl));
    }

    #[test]
    fn fetch_meta_does_not_require_key() {
        let repo = VaultRepository::open_in_memory().unwrap();
        let owner = OwnerId::new(Uuid::new_v4());
        let record = sample_record(owner);
        repo.insert(&record).unwrap();

        let meta = repo.fetch_meta(&record.id).unwrap().expect("meta exists");
        assert_eq!(meta.owner, owner);
        assert_eq!(meta.version, 1);

        let missing = repo.fetch_meta(&RecordId::generate()).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn update_fields_bumps_version_and_leaves_others_alone() {
        let repo = VaultRepository::open_in_memory().unwrap();
        let record = sample_record(OwnerId::new(Uuid::new_v4()));
        repo.insert(&record).unwrap();

        let app_name_before = record.ciphertexts[&FieldName::ApplicationName].clone();

        let mut changed = BTreeMap::new();
        changed.insert(FieldName::Password, vec![9, 9, 9]);

        let applied = repo
            .update_fields(&record.id, 1, &changed, Utc::now())
            .unwrap();
        assert!(applied);

        let after = repo.fetch(&record.id).unwrap().unwrap();
        assert_eq!(after.version, 2);
        assert_eq!(after.ciphertexts[&FieldName::Password], vec![9, 9, 9]);
        assert_eq!(after.ciphertexts[&FieldName::ApplicationName], app_name_before);
    }

    #[test]
    fn update_fields_rejects_stale_version() {
        let repo = VaultRepository::open_in_memory().unwrap();
        let record = sample_record(OwnerId::new(Uuid::new_v4()));
        repo.insert(&record).unwrap();

        let mut changed = BTreeMap::new();
        changed.insert(FieldName::Password, vec![9]);

        // First writer wins.
        assert!(repo.update_fields(&record.id, 1, &changed, Utc::now()).unwrap());
        // Second writer with the stale version loses; nothing changes.
        assert!(!repo.update_fields(&record.id, 1, &changed, Utc::now()).unwrap());

        let after = repo.fetch(&record.id).unwrap().unwrap();
        assert_eq!(after.version, 2);
    }

    #[test]
    fn list_by_owner_is_isolated() {
        let repo = VaultRepository::open_in_memory().unwrap();
        let alice = OwnerId::new(Uuid::new_v4());
        let bob = OwnerId::new(Uuid::new_v4());

        repo.insert(&sample_record(alice)).unwrap();
        repo.insert(&sample_record(alice)).unwrap();
        repo.insert(&sample_record(bob)).unwrap();

        assert_eq!(repo.list_by_owner(&alice).unwrap().len(), 2);
        assert_eq!(repo.list_by_owner(&bob).unwrap().len(), 1);
    }

    #[test]
    fn delete_purges_the_row() {
        let repo = VaultRepository::open_in_memory().unwrap();
        let record = sample_record(OwnerId::new(Uuid::new_v4()));
        repo.insert(&record).unwrap();

        assert!(repo.delete(&record.id).unwrap());
        assert!(repo.fetch(&record.id).unwrap().is_none());
        // Deleting again reports the record as gone.
        assert!(!repo.delete(&record.id).unwrap());
    }
}
