//! Secret resolution.
//!
//! Maps a caller-supplied secret — a human-typed case code or a link token
//! lifted from a URL — to the case record it authorises, together with the
//! case's subject. A miss is `NotFound`; it is never collapsed with storage
//! failures, which surface as `Internal`.

use crate::error::{AccessError, AccessResult};
use crate::model::{Case, Subject};
use crate::store::RecordStore;
use std::sync::Arc;

/// A redemption secret, tagged by how the caller obtained it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaseSecret {
    /// Human-typed case code. Normalised by upper-casing and trimming.
    Code(String),
    /// Link token embedded in a shared URL. Trimmed only; token case is
    /// preserved at this layer (the public verifier relaxes it).
    LinkToken(String),
}

/// Normalise a case code the way it is stored: trimmed and upper-cased.
pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// A resolved case and its subject.
#[derive(Debug, Clone)]
pub struct ResolvedCase {
    pub case: Case,
    pub subject: Subject,
}

/// Resolves redemption secrets against the record store.
#[derive(Clone)]
pub struct SecretResolver {
    store: Arc<RecordStore>,
}

impl SecretResolver {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    /// Resolve a secret to the case it authorises.
    ///
    /// # Errors
    ///
    /// - `Validation` if the secret is empty after normalisation
    /// - `NotFound` if no case matches
    /// - `Internal` on storage failure, or if the matched case references a
    ///   subject that no longer exists
    pub fn resolve(&self, secret: &CaseSecret) -> AccessResult<ResolvedCase> {
        let case = match secret {
            CaseSecret::Code(raw) => {
                let code = normalize_code(raw);
                if code.is_empty() {
                    return Err(AccessError::Validation("case code is required".into()));
                }
                self.store.case_by_code(&code)?
            }
            CaseSecret::LinkToken(raw) => {
                let token = raw.trim();
                if token.is_empty() {
                    return Err(AccessError::Validation("link token is required".into()));
                }
                self.store.case_by_token(token)?
            }
        };

        let case = case.ok_or(AccessError::NotFound("case"))?;

        let subject = self
            .store
            .subject_by_id(case.subject_id)?
            .ok_or_else(|| {
                AccessError::Internal(format!(
                    "case {} references missing subject {}",
                    case.id, case.subject_id
                ))
            })?;

        Ok(ResolvedCase { case, subject })
    }
}
