//! Error taxonomy for the access subsystem.
//!
//! Every fallible operation in this crate resolves to one of four classes:
//!
//! - `Validation` — the caller supplied missing or malformed input
//! - `NotFound` — no record matches a well-formed secret or identifier
//! - `Conflict` — a uniqueness constraint fired during a concurrent write
//! - `Internal` — the storage layer failed or an invariant was broken
//!
//! `NotFound` and `Validation` are expected outcomes and map to client-facing
//! "not found / bad input" responses. `Internal` carries detail for
//! server-side logging only and must never reach a client verbatim.

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),
}

pub type AccessResult<T> = std::result::Result<T, AccessError>;

impl From<StoreError> for AccessError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation { .. } => AccessError::Conflict(err.to_string()),
            other => AccessError::Internal(other.to_string()),
        }
    }
}
