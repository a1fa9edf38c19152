//! The redemption flow.
//!
//! Wires the three credential-issuance components together: the resolver
//! finds the case behind a secret, the identity service issues credentials
//! scoped to the case code, and the linker binds the identity to the case
//! and subject. The external session subsystem then exchanges the returned
//! `{contact, secret}` pair for an authenticated session.
//!
//! Failure policy follows the components: resolution and issuance failures
//! abort the flow; linking is best-effort and never does.

use crate::config::CoreConfig;
use crate::error::AccessResult;
use crate::identity::{EphemeralIdentityService, IssuedCredentials};
use crate::linker::RecordLinker;
use crate::resolver::{CaseSecret, SecretResolver};
use crate::store::RecordStore;
use std::sync::Arc;

/// End-to-end redemption of a case secret for ephemeral credentials.
#[derive(Clone)]
pub struct RedemptionService {
    resolver: SecretResolver,
    identities: EphemeralIdentityService,
    linker: RecordLinker,
}

impl RedemptionService {
    pub fn new(store: Arc<RecordStore>, cfg: Arc<CoreConfig>) -> Self {
        Self {
            resolver: SecretResolver::new(store.clone()),
            identities: EphemeralIdentityService::new(store.clone(), cfg.clone()),
            linker: RecordLinker::new(store, cfg),
        }
    }

    /// Redeem a secret for one-time-disclosure credentials.
    ///
    /// The display-name hint passed to the identity service is the subject's
    /// guardian name.
    ///
    /// # Errors
    ///
    /// Propagates `Validation` / `NotFound` / `Internal` from resolution and
    /// issuance. A caller is never told more than "not found" about why a
    /// secret failed to resolve.
    pub fn redeem(&self, secret: &CaseSecret) -> AccessResult<IssuedCredentials> {
        let resolved = self.resolver.resolve(secret)?;

        let issued = self
            .identities
            .redeem(&resolved.case.code, &resolved.subject.guardian_name)?;

        self.linker
            .bind(&resolved.case, &resolved.subject, issued.identity_id);

        Ok(issued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AccessError;
    use crate::links::derive_link_token;
    use crate::model::{Case, CaseStatus, Species, Subject};
    use chrono::Utc;
    use uuid::Uuid;

    fn seeded() -> (RedemptionService, Arc<RecordStore>, Uuid, Uuid) {
        let store = Arc::new(RecordStore::in_memory());
        let cfg = Arc::new(
            CoreConfig::new("https://clinic.example", "access.clinic.example").unwrap(),
        );

        let subject = Subject {
            id: Uuid::new_v4(),
            name: "Mel".into(),
            species: Species::Canine,
            breed: Some("Beagle".into()),
            guardian_name: "Fernanda Costa".into(),
            guardian_phone: Some("+55 11 91234-0000".into()),
            owner_identity_id: None,
            created_at: Utc::now(),
        };
        let case = Case {
            id: Uuid::new_v4(),
            code: "P-ABC123".into(),
            link_token: Some(derive_link_token("P-ABC123")),
            subject_id: subject.id,
            owner_identity_id: None,
            status: CaseStatus::Confirmed,
            scheduled_at: Utc::now(),
            location: None,
            notes: None,
            created_at: Utc::now(),
        };
        let case_id = case.id;
        let subject_id = subject.id;
        store.insert_subject(subject).unwrap();
        store.insert_case(case).unwrap();

        (
            RedemptionService::new(store.clone(), cfg),
            store,
            case_id,
            subject_id,
        )
    }

    #[test]
    fn test_redeem_code_issues_credentials_and_links_owners() {
        let (svc, store, case_id, subject_id) = seeded();

        let issued = svc
            .redeem(&CaseSecret::Code("p-abc123".into()))
            .unwrap();

        assert_eq!(issued.contact, "temp_p-abc123@access.clinic.example");
        assert_eq!(issued.secret.expose().len(), 12);

        let case = store.case_by_id(case_id).unwrap().unwrap();
        let subject = store.subject_by_id(subject_id).unwrap().unwrap();
        assert_eq!(case.owner_identity_id, Some(issued.identity_id));
        assert_eq!(subject.owner_identity_id, Some(issued.identity_id));

        let identity = store
            .ephemeral_identity_for_code("P-ABC123")
            .unwrap()
            .unwrap();
        assert_eq!(identity.display_name, "Fernanda Costa");
    }

    #[test]
    fn test_repeat_redemption_rotates_secret_but_keeps_bindings() {
        let (svc, store, case_id, subject_id) = seeded();

        let first = svc.redeem(&CaseSecret::Code("P-ABC123".into())).unwrap();
        let second = svc.redeem(&CaseSecret::Code("P-ABC123".into())).unwrap();

        assert_eq!(first.contact, second.contact);
        assert_ne!(first.secret, second.secret);

        let case = store.case_by_id(case_id).unwrap().unwrap();
        let subject = store.subject_by_id(subject_id).unwrap().unwrap();
        assert_eq!(case.owner_identity_id, Some(first.identity_id));
        assert_eq!(subject.owner_identity_id, Some(second.identity_id));
        // Same identity both times, so the subject rewrite is a no-op value
        // change — but the write policy still applied.
        assert_eq!(first.identity_id, second.identity_id);
    }

    #[test]
    fn test_redeem_link_token_reaches_same_identity_as_code() {
        let (svc, _, _, _) = seeded();

        let by_code = svc.redeem(&CaseSecret::Code("P-ABC123".into())).unwrap();
        let by_token = svc
            .redeem(&CaseSecret::LinkToken(derive_link_token("P-ABC123")))
            .unwrap();

        assert_eq!(by_code.identity_id, by_token.identity_id);
    }

    #[test]
    fn test_redeem_unknown_secret_is_not_found() {
        let (svc, _, _, _) = seeded();

        assert!(matches!(
            svc.redeem(&CaseSecret::Code("P-NOPE99".into())),
            Err(AccessError::NotFound(_))
        ));
        assert!(matches!(
            svc.redeem(&CaseSecret::LinkToken("bogus".into())),
            Err(AccessError::NotFound(_))
        ));
    }
}
