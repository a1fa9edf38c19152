//! Document fingerprinting.
//!
//! A fingerprint is a SHA-256 digest over a canonical serialisation of a
//! published document's own fields. Two rules make it a usable integrity
//! proof:
//!
//! 1. **Fixed field order.** The payload is a dedicated struct; serde
//!    serialises struct fields in declaration order, so the byte stream is
//!    stable across recomputations. Nothing relies on map iteration order.
//! 2. **Fixed time input.** The only timestamp in the payload is the
//!    document's stored creation time (epoch milliseconds), captured once
//!    when the document was created. Recomputing from the same stored
//!    fields therefore always yields the same digest.
//!
//! The payload carries a scheme tag so a future change to the field set or
//! encoding can mint fingerprints under a new tag without silently
//! invalidating old ones.

use crate::error::{AccessError, AccessResult};
use crate::model::{
    CertificateDetails, Document, DocumentKind, DocumentStatus, ExamDetails, PhysicalExam,
    PrescriptionEntry,
};
use crate::store::RecordStore;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

/// Hashing scheme tag, mixed into every digest.
pub const FINGERPRINT_SCHEME: &str = "cdf-v1";

/// Canonical digest payload. Field order is the contract — do not reorder.
#[derive(Serialize)]
struct FingerprintPayload<'a> {
    scheme: &'static str,
    kind: DocumentKind,
    title: &'a str,
    content: &'a str,
    prescription: &'a [PrescriptionEntry],
    physical_exam: &'a Option<PhysicalExam>,
    exam_details: &'a Option<ExamDetails>,
    certificate_details: &'a Option<CertificateDetails>,
    case_id: Uuid,
    subject_id: Uuid,
    created_at_ms: i64,
}

/// Compute a document's fingerprint from its stored fields.
///
/// Pure: calling this twice on the same stored document always returns the
/// same digest.
///
/// # Errors
///
/// Returns `Internal` if payload serialisation fails.
pub fn compute_fingerprint(document: &Document) -> AccessResult<String> {
    let payload = FingerprintPayload {
        scheme: FINGERPRINT_SCHEME,
        kind: document.kind,
        title: &document.title,
        content: &document.content,
        prescription: &document.prescription,
        physical_exam: &document.physical_exam,
        exam_details: &document.exam_details,
        certificate_details: &document.certificate_details,
        case_id: document.case_id,
        subject_id: document.subject_id,
        created_at_ms: document.created_at.timestamp_millis(),
    };

    let bytes = serde_json::to_vec(&payload).map_err(|e| {
        AccessError::Internal(format!("failed to serialise fingerprint payload: {e}"))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

/// Computes and persists document fingerprints at publish time.
#[derive(Clone)]
pub struct DocumentSealer {
    store: Arc<RecordStore>,
}

impl DocumentSealer {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    /// Seal a published document, persisting its fingerprint at most once.
    ///
    /// An already-sealed document returns its stored fingerprint unchanged;
    /// the persist step is a compare-and-set, so two concurrent seals of the
    /// same document converge on one digest.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the document does not exist
    /// - `Validation` if the document is still a draft
    /// - `Internal` on storage failure
    pub fn seal(&self, document_id: Uuid) -> AccessResult<String> {
        let document = self
            .store
            .document_by_id(document_id)?
            .ok_or(AccessError::NotFound("document"))?;

        if let Some(existing) = document.fingerprint {
            return Ok(existing);
        }

        if document.status != DocumentStatus::Published {
            return Err(AccessError::Validation(
                "only published documents can be fingerprinted".into(),
            ));
        }

        let fingerprint = compute_fingerprint(&document)?;
        let surviving = self
            .store
            .set_document_fingerprint_if_absent(document_id, &fingerprint)?
            .ok_or(AccessError::NotFound("document"))?;

        tracing::info!(document = %document_id, "sealed document fingerprint");
        Ok(surviving)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ExamResultRow;
    use chrono::{TimeZone, Utc};

    fn sample_document(status: DocumentStatus) -> Document {
        Document {
            id: Uuid::new_v4(),
            kind: DocumentKind::ExamResult,
            title: "Complete blood count".into(),
            content: "See attached values.".into(),
            case_id: Uuid::new_v4(),
            subject_id: Uuid::new_v4(),
            physical_exam: None,
            prescription: Vec::new(),
            exam_details: Some(ExamDetails {
                material: Some("whole blood".into()),
                method: Some("automated counter".into()),
                collected_at: None,
                sample_condition: None,
                results: vec![ExamResultRow {
                    parameter: "Hematocrit".into(),
                    value: "42".into(),
                    reference: Some("37-55".into()),
                    unit: Some("%".into()),
                }],
            }),
            certificate_details: None,
            diagnosis: None,
            observations: None,
            status,
            fingerprint: None,
            access_token: "ACCESSTOK001".into(),
            created_at: Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_fingerprint_is_reproducible() {
        let doc = sample_document(DocumentStatus::Published);
        let first = compute_fingerprint(&doc).unwrap();
        let second = compute_fingerprint(&doc).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let doc = sample_document(DocumentStatus::Published);
        let mut altered = doc.clone();
        altered.content.push_str(" Amended.");

        assert_ne!(
            compute_fingerprint(&doc).unwrap(),
            compute_fingerprint(&altered).unwrap()
        );
    }

    #[test]
    fn test_fingerprint_changes_with_creation_time() {
        let doc = sample_document(DocumentStatus::Published);
        let mut shifted = doc.clone();
        shifted.created_at = doc.created_at + chrono::Duration::milliseconds(1);

        assert_ne!(
            compute_fingerprint(&doc).unwrap(),
            compute_fingerprint(&shifted).unwrap()
        );
    }

    #[test]
    fn test_seal_persists_once_and_is_idempotent() {
        let store = Arc::new(RecordStore::in_memory());
        let doc = sample_document(DocumentStatus::Published);
        let doc_id = doc.id;
        store.insert_document(doc).unwrap();

        let sealer = DocumentSealer::new(store.clone());
        let first = sealer.seal(doc_id).unwrap();
        let second = sealer.seal(doc_id).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            store.document_by_id(doc_id).unwrap().unwrap().fingerprint,
            Some(first)
        );
    }

    #[test]
    fn test_seal_rejects_draft() {
        let store = Arc::new(RecordStore::in_memory());
        let doc = sample_document(DocumentStatus::Draft);
        let doc_id = doc.id;
        store.insert_document(doc).unwrap();

        let sealer = DocumentSealer::new(store);
        assert!(matches!(
            sealer.seal(doc_id),
            Err(AccessError::Validation(_))
        ));
    }

    #[test]
    fn test_seal_unknown_document_is_not_found() {
        let sealer = DocumentSealer::new(Arc::new(RecordStore::in_memory()));
        assert!(matches!(
            sealer.seal(Uuid::new_v4()),
            Err(AccessError::NotFound("document"))
        ));
    }

    #[test]
    fn test_sealed_fingerprint_is_verifiable() {
        use crate::verifier::{Verified, Verifier};

        let store = Arc::new(RecordStore::in_memory());
        let doc = sample_document(DocumentStatus::Published);
        let doc_id = doc.id;
        store.insert_document(doc).unwrap();

        let fingerprint = DocumentSealer::new(store.clone()).seal(doc_id).unwrap();

        let verifier = Verifier::new(store);
        match verifier.verify(&fingerprint).unwrap() {
            Verified::Document(found) => assert_eq!(found.id, doc_id),
            other => panic!("expected document, got {other:?}"),
        }
        assert!(verifier.verify("not-a-real-hash").is_err());
    }

    #[test]
    fn test_seal_matches_direct_computation() {
        let store = Arc::new(RecordStore::in_memory());
        let doc = sample_document(DocumentStatus::Published);
        let expected = compute_fingerprint(&doc).unwrap();
        let doc_id = doc.id;
        store.insert_document(doc).unwrap();

        let sealed = DocumentSealer::new(store).seal(doc_id).unwrap();
        assert_eq!(sealed, expected);
    }
}
