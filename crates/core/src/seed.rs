//! Demo data seeding.
//!
//! Cases, subjects and documents are normally created by the staff CRUD
//! workflows, which live outside this subsystem. For local development and
//! the CLI this module plants one subject, one case and one published
//! document so the redemption, minting, sealing and verification flows have
//! something to operate on.

use crate::error::AccessResult;
use crate::model::{
    Case, CaseStatus, Document, DocumentKind, DocumentStatus, PhysicalExam, Species, Subject,
    SystemsReview,
};
use crate::store::RecordStore;
use chrono::Utc;
use uuid::Uuid;

/// Identifiers of the seeded records.
#[derive(Debug, Clone)]
pub struct DemoSeed {
    pub case_id: Uuid,
    pub case_code: String,
    pub subject_id: Uuid,
    pub document_id: Uuid,
}

/// Demo case code, stable so it can be typed from docs and scripts.
pub const DEMO_CASE_CODE: &str = "P-DEMO001";

/// Seed the demo records, skipping cleanly if the code is already taken.
///
/// # Errors
///
/// Returns `Internal` on storage failure.
pub fn seed_demo(store: &RecordStore) -> AccessResult<DemoSeed> {
    if let Some(case) = store.case_by_code(DEMO_CASE_CODE)? {
        let document_id = store
            .documents_for_case(case.id)?
            .first()
            .map(|d| d.id)
            .unwrap_or_default();
        return Ok(DemoSeed {
            case_id: case.id,
            case_code: case.code,
            subject_id: case.subject_id,
            document_id,
        });
    }

    let now = Utc::now();

    let subject = Subject {
        id: Uuid::new_v4(),
        name: "Thor".into(),
        species: Species::Canine,
        breed: Some("Border Collie".into()),
        guardian_name: "Maria Souza".into(),
        guardian_phone: Some("+55 11 98888-0000".into()),
        owner_identity_id: None,
        created_at: now,
    };

    let case = Case {
        id: Uuid::new_v4(),
        code: DEMO_CASE_CODE.into(),
        link_token: None,
        subject_id: subject.id,
        owner_identity_id: None,
        status: CaseStatus::Completed,
        scheduled_at: now,
        location: Some("Consulting room 2".into()),
        notes: Some("Annual check-up.".into()),
        created_at: now,
    };

    let document = Document {
        id: Uuid::new_v4(),
        kind: DocumentKind::Report,
        title: "Annual check-up report".into(),
        content: "General examination unremarkable. Weight stable.".into(),
        case_id: case.id,
        subject_id: subject.id,
        physical_exam: Some(PhysicalExam {
            temperature: Some("38.5 C".into()),
            heart_rate: Some("96 bpm".into()),
            respiratory_rate: Some("22 rpm".into()),
            mucous_membranes: Some("pink, moist".into()),
            capillary_refill: Some("< 2s".into()),
            lymph_nodes: Some("unremarkable".into()),
            systems: SystemsReview::default(),
        }),
        prescription: Vec::new(),
        exam_details: None,
        certificate_details: None,
        diagnosis: Some("Healthy".into()),
        observations: None,
        status: DocumentStatus::Published,
        fingerprint: None,
        access_token: format!("DEMO{}", Uuid::new_v4().simple()),
        created_at: now,
    };

    let seed = DemoSeed {
        case_id: case.id,
        case_code: case.code.clone(),
        subject_id: subject.id,
        document_id: document.id,
    };

    store.insert_subject(subject)?;
    store.insert_case(case)?;
    store.insert_document(document)?;

    tracing::info!(code = DEMO_CASE_CODE, "seeded demo records");
    Ok(seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_plants_redeemable_records() {
        let store = RecordStore::in_memory();
        let seed = seed_demo(&store).unwrap();

        let case = store.case_by_code(DEMO_CASE_CODE).unwrap().unwrap();
        assert_eq!(case.id, seed.case_id);
        assert!(store.subject_by_id(seed.subject_id).unwrap().is_some());
        assert!(store.document_by_id(seed.document_id).unwrap().is_some());
    }

    #[test]
    fn test_seed_is_safe_to_repeat() {
        let store = RecordStore::in_memory();
        seed_demo(&store).unwrap();
        let again = seed_demo(&store).unwrap();

        assert_eq!(again.case_code, DEMO_CASE_CODE);
        assert_eq!(store.list_cases().unwrap().len(), 1);
    }
}
