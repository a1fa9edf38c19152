//! Ownership binding.
//!
//! After credentials are issued, the identity is bound to the case and to
//! its subject so later queries can be scoped to the owner. The two bindings
//! carry different write policies (see [`CoreConfig`]): by default the case
//! keeps its first claimant while the subject follows the most recent
//! redemption.
//!
//! Binding is best-effort. The credentials are already valid by the time the
//! linker runs, so a storage failure here is logged and swallowed rather
//! than failing the redemption.

use crate::config::CoreConfig;
use crate::model::{Case, Subject};
use crate::store::RecordStore;
use std::sync::Arc;
use uuid::Uuid;

/// Binds issued identities to their case and subject records.
#[derive(Clone)]
pub struct RecordLinker {
    store: Arc<RecordStore>,
    cfg: Arc<CoreConfig>,
}

impl RecordLinker {
    pub fn new(store: Arc<RecordStore>, cfg: Arc<CoreConfig>) -> Self {
        Self { store, cfg }
    }

    /// Bind `identity_id` to the case and subject owner references.
    ///
    /// Never fails: storage errors are logged with full context and the
    /// redemption flow continues.
    pub fn bind(&self, case: &Case, subject: &Subject, identity_id: Uuid) {
        match self
            .store
            .set_case_owner(case.id, identity_id, self.cfg.case_owner_policy())
        {
            Ok(written) => {
                tracing::debug!(case = %case.id, identity = %identity_id, written, "case owner binding");
            }
            Err(e) => {
                tracing::warn!(case = %case.id, identity = %identity_id, error = %e,
                    "failed to bind case owner; issued credentials remain valid");
            }
        }

        match self
            .store
            .set_subject_owner(subject.id, identity_id, self.cfg.subject_owner_policy())
        {
            Ok(written) => {
                tracing::debug!(subject = %subject.id, identity = %identity_id, written, "subject owner binding");
            }
            Err(e) => {
                tracing::warn!(subject = %subject.id, identity = %identity_id, error = %e,
                    "failed to bind subject owner; issued credentials remain valid");
            }
        }
    }
}
