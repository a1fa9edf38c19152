//! Public document verification.
//!
//! Resolves a scanned or hand-typed fingerprint back to the record that
//! produced it. Input arrives mangled in practice — copied out of a URL
//! path, wrapped in whitespace, re-cased by a QR decoder — so the needle is
//! trimmed, stripped of path separators and matched case-insensitively.
//!
//! Lookup order is documents by fingerprint first, then cases by link
//! token. Read-only and side-effect free; safe to expose unauthenticated.

use crate::error::{AccessError, AccessResult};
use crate::model::{Case, Document};
use crate::store::RecordStore;
use serde::Serialize;
use std::sync::Arc;

/// A successful verification, tagged by which collection matched.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", content = "record", rename_all = "snake_case")]
pub enum Verified {
    Document(Document),
    Case(Case),
}

/// Normalise a raw fingerprint: trim whitespace, drop stray `/` characters.
pub fn normalize_fingerprint(raw: &str) -> String {
    raw.trim().chars().filter(|c| *c != '/').collect()
}

/// Resolves fingerprints across documents and cases.
#[derive(Clone)]
pub struct Verifier {
    store: Arc<RecordStore>,
}

impl Verifier {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    /// Resolve a raw fingerprint string to its originating record.
    ///
    /// # Errors
    ///
    /// - `Validation` if the input is empty after normalisation
    /// - `NotFound` if neither collection matches
    /// - `Internal` on storage failure
    pub fn verify(&self, raw: &str) -> AccessResult<Verified> {
        let needle = normalize_fingerprint(raw);
        if needle.is_empty() {
            return Err(AccessError::Validation("fingerprint is required".into()));
        }

        if let Some(document) = self.store.document_by_fingerprint_ci(&needle)? {
            return Ok(Verified::Document(document));
        }

        if let Some(case) = self.store.case_by_token_ci(&needle)? {
            return Ok(Verified::Case(case));
        }

        Err(AccessError::NotFound("record"))
    }
}
