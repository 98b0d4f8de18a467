//! The vault subsystem: record model, SQLite-backed persistence, and the
//! service layer that enforces the ownership gate around all crypto.

pub mod record;
pub mod repository;
pub mod service;

pub use record::{CredentialRecord, FieldMap, FieldName, OwnerId, RecordId, RecordMetadata, RecordSummary};
pub use repository::VaultRepository;
pub use service::VaultService;
