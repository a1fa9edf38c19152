//! Record storage.
//!
//! `RecordStore` holds the four record collections behind a single `RwLock`,
//! optionally mirrored to a JSON snapshot file on disk. The production
//! deployment fronts a real database; this store exists so the access
//! subsystem's contract — uniqueness constraints and atomic
//! read-modify-write operations — lives in one place and can be exercised
//! directly in tests and the CLI.
//!
//! ## Atomicity
//!
//! Every mutating method takes the write lock for its whole read-check-write
//! sequence, so:
//!
//! - `insert_identity` observes all three identity uniqueness constraints
//!   (contact, username, ephemeral scoped code) in the same critical section
//!   as the insert — concurrent first redemptions of one case code cannot
//!   both succeed.
//! - `set_case_token_if_absent` and `set_document_fingerprint_if_absent`
//!   are compare-and-set: the first writer wins and every caller is handed
//!   the surviving value.

use crate::config::OwnerWritePolicy;
use crate::credentials::Secret;
use crate::model::{Case, Document, Identity, Subject};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to read store file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to write store file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to serialize store: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize store: {0}")]
    Deserialization(serde_json::Error),
    #[error("{entity} violates unique {field}: {value}")]
    UniqueViolation {
        entity: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("store lock poisoned")]
    Poisoned,
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    cases: HashMap<Uuid, Case>,
    #[serde(default)]
    subjects: HashMap<Uuid, Subject>,
    #[serde(default)]
    identities: HashMap<Uuid, Identity>,
    #[serde(default)]
    documents: HashMap<Uuid, Document>,
}

/// Shared record store.
#[derive(Debug)]
pub struct RecordStore {
    data: RwLock<StoreData>,
    backing_file: Option<PathBuf>,
}

impl RecordStore {
    /// Create an empty store with no disk backing.
    pub fn in_memory() -> Self {
        Self {
            data: RwLock::new(StoreData::default()),
            backing_file: None,
        }
    }

    /// Open a store backed by a JSON snapshot file.
    ///
    /// The file is loaded if it exists; otherwise the store starts empty and
    /// the file is created on the first mutation.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the file exists but cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let data = if path.is_file() {
            let contents = fs::read_to_string(&path).map_err(StoreError::FileRead)?;
            serde_json::from_str(&contents).map_err(StoreError::Deserialization)?
        } else {
            StoreData::default()
        };

        Ok(Self {
            data: RwLock::new(data),
            backing_file: Some(path),
        })
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, StoreData>> {
        self.data.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, StoreData>> {
        self.data.write().map_err(|_| StoreError::Poisoned)
    }

    /// Write the snapshot file, if this store is disk-backed.
    ///
    /// Called with the write lock held so snapshots are serialised in the
    /// same order as the mutations they capture.
    fn flush(&self, data: &StoreData) -> StoreResult<()> {
        let Some(path) = &self.backing_file else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(data).map_err(StoreError::Serialization)?;
        fs::write(path, json).map_err(StoreError::FileWrite)
    }

    // ------------------------------------------------------------------
    // Inserts (staff workflows, seeding, tests)
    // ------------------------------------------------------------------

    pub fn insert_subject(&self, subject: Subject) -> StoreResult<()> {
        let mut data = self.write()?;
        data.subjects.insert(subject.id, subject);
        self.flush(&data)
    }

    /// Insert a case, enforcing code and token uniqueness.
    pub fn insert_case(&self, case: Case) -> StoreResult<()> {
        let mut data = self.write()?;

        if data.cases.values().any(|c| c.code == case.code) {
            return Err(StoreError::UniqueViolation {
                entity: "case",
                field: "code",
                value: case.code,
            });
        }
        if let Some(token) = &case.link_token {
            if data
                .cases
                .values()
                .any(|c| c.link_token.as_deref() == Some(token.as_str()))
            {
                return Err(StoreError::UniqueViolation {
                    entity: "case",
                    field: "link_token",
                    value: token.clone(),
                });
            }
        }

        data.cases.insert(case.id, case);
        self.flush(&data)
    }

    /// Insert an identity, enforcing contact, username and — for ephemeral
    /// identities — scoped-code uniqueness in one critical section.
    pub fn insert_identity(&self, identity: Identity) -> StoreResult<()> {
        let mut data = self.write()?;

        if data.identities.values().any(|i| i.contact == identity.contact) {
            return Err(StoreError::UniqueViolation {
                entity: "identity",
                field: "contact",
                value: identity.contact,
            });
        }
        if data
            .identities
            .values()
            .any(|i| i.username == identity.username)
        {
            return Err(StoreError::UniqueViolation {
                entity: "identity",
                field: "username",
                value: identity.username,
            });
        }
        if let Some(code) = identity.role.scoped_code() {
            if data
                .identities
                .values()
                .any(|i| i.role.scoped_code() == Some(code))
            {
                return Err(StoreError::UniqueViolation {
                    entity: "identity",
                    field: "scoped_code",
                    value: code.to_string(),
                });
            }
        }

        data.identities.insert(identity.id, identity);
        self.flush(&data)
    }

    /// Insert a document, enforcing access-token and fingerprint uniqueness.
    pub fn insert_document(&self, document: Document) -> StoreResult<()> {
        let mut data = self.write()?;

        if data
            .documents
            .values()
            .any(|d| d.access_token == document.access_token)
        {
            return Err(StoreError::UniqueViolation {
                entity: "document",
                field: "access_token",
                value: document.access_token,
            });
        }
        if let Some(fp) = &document.fingerprint {
            if data
                .documents
                .values()
                .any(|d| d.fingerprint.as_deref() == Some(fp.as_str()))
            {
                return Err(StoreError::UniqueViolation {
                    entity: "document",
                    field: "fingerprint",
                    value: fp.clone(),
                });
            }
        }

        data.documents.insert(document.id, document);
        self.flush(&data)
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub fn case_by_id(&self, id: Uuid) -> StoreResult<Option<Case>> {
        Ok(self.read()?.cases.get(&id).cloned())
    }

    /// Exact match against the stored (upper-cased) case code.
    pub fn case_by_code(&self, code: &str) -> StoreResult<Option<Case>> {
        Ok(self
            .read()?
            .cases
            .values()
            .find(|c| c.code == code)
            .cloned())
    }

    /// Exact (case-sensitive) match against the link token.
    pub fn case_by_token(&self, token: &str) -> StoreResult<Option<Case>> {
        Ok(self
            .read()?
            .cases
            .values()
            .find(|c| c.link_token.as_deref() == Some(token))
            .cloned())
    }

    /// Case-insensitive token match, used by the public verifier.
    pub fn case_by_token_ci(&self, token: &str) -> StoreResult<Option<Case>> {
        Ok(self
            .read()?
            .cases
            .values()
            .find(|c| {
                c.link_token
                    .as_deref()
                    .is_some_and(|t| t.eq_ignore_ascii_case(token))
            })
            .cloned())
    }

    pub fn list_cases(&self) -> StoreResult<Vec<Case>> {
        Ok(self.read()?.cases.values().cloned().collect())
    }

    pub fn subject_by_id(&self, id: Uuid) -> StoreResult<Option<Subject>> {
        Ok(self.read()?.subjects.get(&id).cloned())
    }

    pub fn identity_by_id(&self, id: Uuid) -> StoreResult<Option<Identity>> {
        Ok(self.read()?.identities.get(&id).cloned())
    }

    /// Lookup by unique contact handle (the session subsystem's login key).
    pub fn identity_by_contact(&self, contact: &str) -> StoreResult<Option<Identity>> {
        Ok(self
            .read()?
            .identities
            .values()
            .find(|i| i.contact == contact)
            .cloned())
    }

    /// The single ephemeral identity scoped to `code`, if one exists.
    pub fn ephemeral_identity_for_code(&self, code: &str) -> StoreResult<Option<Identity>> {
        Ok(self
            .read()?
            .identities
            .values()
            .find(|i| i.role.scoped_code() == Some(code))
            .cloned())
    }

    pub fn document_by_id(&self, id: Uuid) -> StoreResult<Option<Document>> {
        Ok(self.read()?.documents.get(&id).cloned())
    }

    /// All documents issued against a case.
    pub fn documents_for_case(&self, case_id: Uuid) -> StoreResult<Vec<Document>> {
        Ok(self
            .read()?
            .documents
            .values()
            .filter(|d| d.case_id == case_id)
            .cloned()
            .collect())
    }

    /// Case-insensitive fingerprint match, used by the public verifier.
    pub fn document_by_fingerprint_ci(&self, fingerprint: &str) -> StoreResult<Option<Document>> {
        Ok(self
            .read()?
            .documents
            .values()
            .find(|d| {
                d.fingerprint
                    .as_deref()
                    .is_some_and(|f| f.eq_ignore_ascii_case(fingerprint))
            })
            .cloned())
    }

    // ------------------------------------------------------------------
    // Atomic mutations
    // ------------------------------------------------------------------

    /// Overwrite an identity's secret and, optionally, its display name.
    ///
    /// Returns `false` if the identity no longer exists.
    pub fn rotate_identity_secret(
        &self,
        id: Uuid,
        secret: Secret,
        display_name: Option<String>,
    ) -> StoreResult<bool> {
        let mut data = self.write()?;
        let Some(identity) = data.identities.get_mut(&id) else {
            return Ok(false);
        };
        identity.secret = secret;
        if let Some(name) = display_name {
            identity.display_name = name;
        }
        self.flush(&data)?;
        Ok(true)
    }

    /// Set a case's link token unless one is already present.
    ///
    /// Returns the surviving token — the stored one if the case already had
    /// a token, otherwise `token`. Returns `None` if the case does not
    /// exist.
    pub fn set_case_token_if_absent(
        &self,
        case_id: Uuid,
        token: &str,
    ) -> StoreResult<Option<String>> {
        let mut data = self.write()?;

        let taken = data.cases.values().any(|c| {
            c.id != case_id && c.link_token.as_deref() == Some(token)
        });
        if taken {
            return Err(StoreError::UniqueViolation {
                entity: "case",
                field: "link_token",
                value: token.to_string(),
            });
        }

        let Some(case) = data.cases.get_mut(&case_id) else {
            return Ok(None);
        };
        if let Some(existing) = &case.link_token {
            return Ok(Some(existing.clone()));
        }
        case.link_token = Some(token.to_string());
        self.flush(&data)?;
        Ok(Some(token.to_string()))
    }

    /// Bind a case's owner reference under the given write policy.
    ///
    /// Returns `true` if the reference was written.
    pub fn set_case_owner(
        &self,
        case_id: Uuid,
        identity_id: Uuid,
        policy: OwnerWritePolicy,
    ) -> StoreResult<bool> {
        let mut data = self.write()?;
        let Some(case) = data.cases.get_mut(&case_id) else {
            return Ok(false);
        };
        if policy == OwnerWritePolicy::SetOnce && case.owner_identity_id.is_some() {
            return Ok(false);
        }
        case.owner_identity_id = Some(identity_id);
        self.flush(&data)?;
        Ok(true)
    }

    /// Bind a subject's owner reference under the given write policy.
    ///
    /// Returns `true` if the reference was written.
    pub fn set_subject_owner(
        &self,
        subject_id: Uuid,
        identity_id: Uuid,
        policy: OwnerWritePolicy,
    ) -> StoreResult<bool> {
        let mut data = self.write()?;
        let Some(subject) = data.subjects.get_mut(&subject_id) else {
            return Ok(false);
        };
        if policy == OwnerWritePolicy::SetOnce && subject.owner_identity_id.is_some() {
            return Ok(false);
        }
        subject.owner_identity_id = Some(identity_id);
        self.flush(&data)?;
        Ok(true)
    }

    /// Set a document's fingerprint unless one is already present.
    ///
    /// Returns the surviving fingerprint, or `None` if the document does not
    /// exist. A second seal attempt gets the first digest back unchanged.
    pub fn set_document_fingerprint_if_absent(
        &self,
        document_id: Uuid,
        fingerprint: &str,
    ) -> StoreResult<Option<String>> {
        let mut data = self.write()?;

        let taken = data.documents.values().any(|d| {
            d.id != document_id && d.fingerprint.as_deref() == Some(fingerprint)
        });
        if taken {
            return Err(StoreError::UniqueViolation {
                entity: "document",
                field: "fingerprint",
                value: fingerprint.to_string(),
            });
        }

        let Some(document) = data.documents.get_mut(&document_id) else {
            return Ok(None);
        };
        if let Some(existing) = &document.fingerprint {
            return Ok(Some(existing.clone()));
        }
        document.fingerprint = Some(fingerprint.to_string());
        self.flush(&data)?;
        Ok(Some(fingerprint.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CaseStatus, Role, Species};
    use chrono::Utc;

    fn sample_subject() -> Subject {
        Subject {
            id: Uuid::new_v4(),
            name: "Thor".into(),
            species: Species::Canine,
            breed: Some("Border Collie".into()),
            guardian_name: "Maria Souza".into(),
            guardian_phone: None,
            owner_identity_id: None,
            created_at: Utc::now(),
        }
    }

    fn sample_case(code: &str, subject_id: Uuid) -> Case {
        Case {
            id: Uuid::new_v4(),
            code: code.into(),
            link_token: None,
            subject_id,
            owner_identity_id: None,
            status: CaseStatus::Scheduled,
            scheduled_at: Utc::now(),
            location: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    fn sample_identity(contact: &str, username: &str, code: &str) -> Identity {
        Identity {
            id: Uuid::new_v4(),
            contact: contact.into(),
            username: username.into(),
            display_name: "Maria Souza".into(),
            role: Role::Ephemeral {
                case_code: code.into(),
            },
            secret: Secret::generate(12),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_case_rejects_duplicate_code() {
        let store = RecordStore::in_memory();
        let subject = sample_subject();
        store.insert_subject(subject.clone()).unwrap();
        store.insert_case(sample_case("P-ABC123", subject.id)).unwrap();

        let result = store.insert_case(sample_case("P-ABC123", subject.id));
        assert!(matches!(
            result,
            Err(StoreError::UniqueViolation { field: "code", .. })
        ));
    }

    #[test]
    fn test_insert_identity_rejects_second_ephemeral_for_same_code() {
        let store = RecordStore::in_memory();
        store
            .insert_identity(sample_identity("a@clinic", "SunnyTutor1", "P-ABC123"))
            .unwrap();

        let result = store.insert_identity(sample_identity("b@clinic", "SunnyTutor2", "P-ABC123"));
        assert!(matches!(
            result,
            Err(StoreError::UniqueViolation {
                field: "scoped_code",
                ..
            })
        ));
    }

    #[test]
    fn test_insert_identity_rejects_duplicate_username() {
        let store = RecordStore::in_memory();
        store
            .insert_identity(sample_identity("a@clinic", "SunnyTutor1", "P-AAA111"))
            .unwrap();

        let result = store.insert_identity(sample_identity("b@clinic", "SunnyTutor1", "P-BBB222"));
        assert!(matches!(
            result,
            Err(StoreError::UniqueViolation {
                field: "username",
                ..
            })
        ));
    }

    #[test]
    fn test_set_case_token_if_absent_is_first_writer_wins() {
        let store = RecordStore::in_memory();
        let subject = sample_subject();
        let case = sample_case("P-ABC123", subject.id);
        let case_id = case.id;
        store.insert_subject(subject).unwrap();
        store.insert_case(case).unwrap();

        let first = store.set_case_token_if_absent(case_id, "aaa111").unwrap();
        let second = store.set_case_token_if_absent(case_id, "bbb222").unwrap();

        assert_eq!(first.as_deref(), Some("aaa111"));
        assert_eq!(second.as_deref(), Some("aaa111"));
        assert_eq!(
            store.case_by_id(case_id).unwrap().unwrap().link_token.as_deref(),
            Some("aaa111")
        );
    }

    #[test]
    fn test_set_case_owner_set_once_keeps_first_claimant() {
        let store = RecordStore::in_memory();
        let subject = sample_subject();
        let case = sample_case("P-ABC123", subject.id);
        let case_id = case.id;
        store.insert_subject(subject).unwrap();
        store.insert_case(case).unwrap();

        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        assert!(store
            .set_case_owner(case_id, first, OwnerWritePolicy::SetOnce)
            .unwrap());
        assert!(!store
            .set_case_owner(case_id, second, OwnerWritePolicy::SetOnce)
            .unwrap());
        assert_eq!(
            store.case_by_id(case_id).unwrap().unwrap().owner_identity_id,
            Some(first)
        );
    }

    #[test]
    fn test_set_subject_owner_overwrite_follows_latest() {
        let store = RecordStore::in_memory();
        let subject = sample_subject();
        let subject_id = subject.id;
        store.insert_subject(subject).unwrap();

        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        store
            .set_subject_owner(subject_id, first, OwnerWritePolicy::Overwrite)
            .unwrap();
        store
            .set_subject_owner(subject_id, second, OwnerWritePolicy::Overwrite)
            .unwrap();

        assert_eq!(
            store
                .subject_by_id(subject_id)
                .unwrap()
                .unwrap()
                .owner_identity_id,
            Some(second)
        );
    }

    #[test]
    fn test_fingerprint_compare_and_set_returns_first_digest() {
        let store = RecordStore::in_memory();
        let subject = sample_subject();
        let case = sample_case("P-ABC123", subject.id);
        let doc = crate::model::Document {
            id: Uuid::new_v4(),
            kind: crate::model::DocumentKind::Report,
            title: "Report".into(),
            content: "Body".into(),
            case_id: case.id,
            subject_id: subject.id,
            physical_exam: None,
            prescription: Vec::new(),
            exam_details: None,
            certificate_details: None,
            diagnosis: None,
            observations: None,
            status: crate::model::DocumentStatus::Published,
            fingerprint: None,
            access_token: "TOK1".into(),
            created_at: Utc::now(),
        };
        let doc_id = doc.id;
        store.insert_subject(subject).unwrap();
        store.insert_case(case).unwrap();
        store.insert_document(doc).unwrap();

        let first = store
            .set_document_fingerprint_if_absent(doc_id, "abc111")
            .unwrap();
        let second = store
            .set_document_fingerprint_if_absent(doc_id, "def222")
            .unwrap();

        assert_eq!(first.as_deref(), Some("abc111"));
        assert_eq!(second.as_deref(), Some("abc111"));
    }

    #[test]
    fn test_lookup_misses_return_none_not_errors() {
        let store = RecordStore::in_memory();
        assert!(store.case_by_code("P-NOPE00").unwrap().is_none());
        assert!(store.case_by_token("nope").unwrap().is_none());
        assert!(store.document_by_fingerprint_ci("nope").unwrap().is_none());
        assert!(store.ephemeral_identity_for_code("P-NOPE00").unwrap().is_none());
    }

    #[test]
    fn test_open_round_trips_through_snapshot_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("clinic.json");

        let subject = sample_subject();
        let case = sample_case("P-ABC123", subject.id);
        let case_id = case.id;
        {
            let store = RecordStore::open(&path).unwrap();
            store.insert_subject(subject).unwrap();
            store.insert_case(case).unwrap();
        }

        let reopened = RecordStore::open(&path).unwrap();
        let loaded = reopened.case_by_id(case_id).unwrap().unwrap();
        assert_eq!(loaded.code, "P-ABC123");
    }

    #[test]
    fn test_open_on_missing_file_starts_empty() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = RecordStore::open(dir.path().join("fresh.json")).unwrap();
        assert!(store.list_cases().unwrap().is_empty());
    }
}
