//! Shareable access links.
//!
//! A case's link token is derived deterministically from its code: SHA-256
//! over the normalised code, hex-encoded. Determinism makes concurrent
//! first-mints converge on the same value, so the persist step is a plain
//! set-if-absent. The flip side is documented here once: the token is only
//! as unguessable as the code space. It is a "skip the login form"
//! convenience secret, not a cryptographic capability token.

use crate::config::CoreConfig;
use crate::error::{AccessError, AccessResult};
use crate::resolver::normalize_code;
use crate::store::RecordStore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use uuid::Uuid;

/// A minted link token and the shareable URL built from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintedLink {
    pub token: String,
    pub url: String,
}

/// Derive the link token for a case code.
///
/// Lower-case hex SHA-256 of the normalised (trimmed, upper-cased) code.
pub fn derive_link_token(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalize_code(code).as_bytes());
    hex::encode(hasher.finalize())
}

/// Mints and persists shareable link tokens for cases.
#[derive(Clone)]
pub struct LinkMinter {
    store: Arc<RecordStore>,
    cfg: Arc<CoreConfig>,
}

impl LinkMinter {
    pub fn new(store: Arc<RecordStore>, cfg: Arc<CoreConfig>) -> Self {
        Self { store, cfg }
    }

    /// Mint the access link for a case, or return the existing one.
    ///
    /// Idempotent: once a case has a token, every later call returns that
    /// token unchanged.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the case does not exist
    /// - `Internal` on storage failure
    pub fn mint(&self, case_id: Uuid) -> AccessResult<MintedLink> {
        let case = self
            .store
            .case_by_id(case_id)?
            .ok_or(AccessError::NotFound("case"))?;

        if let Some(token) = case.link_token {
            return Ok(self.minted(token));
        }

        let token = derive_link_token(&case.code);
        let surviving = self
            .store
            .set_case_token_if_absent(case_id, &token)?
            .ok_or(AccessError::NotFound("case"))?;

        Ok(self.minted(surviving))
    }

    fn minted(&self, token: String) -> MintedLink {
        let url = format!("{}/access/{}", self.cfg.public_origin(), token);
        MintedLink { token, url }
    }
}
