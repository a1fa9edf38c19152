//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process
//! startup and then passed into core services by reference. The intent is to
//! avoid reading process-wide environment variables during request handling,
//! which can lead to inconsistent behaviour in multi-threaded runtimes and
//! test harnesses.

use crate::credentials::MIN_SECRET_LENGTH;
use crate::error::{AccessError, AccessResult};

/// Write policy for an owner-reference binding.
///
/// The redemption flow binds an issued identity to two records: the case and
/// its subject. The observed behaviour of the system is asymmetric — the case
/// keeps its first claimant while the subject follows the most recent
/// redemption — so the policy is carried per binding instead of being baked
/// into the linker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerWritePolicy {
    /// Write only when the owner reference is currently empty.
    SetOnce,
    /// Write on every redemption, replacing any previous owner.
    Overwrite,
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    public_origin: String,
    handle_domain: String,
    secret_length: usize,
    case_owner_policy: OwnerWritePolicy,
    subject_owner_policy: OwnerWritePolicy,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// `public_origin` is the externally reachable origin used to build
    /// shareable access URLs (scheme + host, no trailing slash).
    /// `handle_domain` is the domain appended to generated ephemeral contact
    /// handles.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::Validation` if either value is empty or
    /// malformed.
    pub fn new(
        public_origin: impl Into<String>,
        handle_domain: impl Into<String>,
    ) -> AccessResult<Self> {
        let public_origin = public_origin.into().trim().trim_end_matches('/').to_string();
        let handle_domain = handle_domain.into().trim().to_string();

        if public_origin.is_empty() {
            return Err(AccessError::Validation(
                "public_origin cannot be empty".into(),
            ));
        }
        if handle_domain.is_empty() || handle_domain.contains('@') {
            return Err(AccessError::Validation(
                "handle_domain must be a bare domain".into(),
            ));
        }

        Ok(Self {
            public_origin,
            handle_domain,
            secret_length: MIN_SECRET_LENGTH,
            case_owner_policy: OwnerWritePolicy::SetOnce,
            subject_owner_policy: OwnerWritePolicy::Overwrite,
        })
    }

    /// Override the generated secret length.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::Validation` if `length` is below the minimum the
    /// credential generator supports.
    pub fn with_secret_length(mut self, length: usize) -> AccessResult<Self> {
        if length < MIN_SECRET_LENGTH {
            return Err(AccessError::Validation(format!(
                "secret_length must be at least {MIN_SECRET_LENGTH}"
            )));
        }
        self.secret_length = length;
        Ok(self)
    }

    pub fn with_case_owner_policy(mut self, policy: OwnerWritePolicy) -> Self {
        self.case_owner_policy = policy;
        self
    }

    pub fn with_subject_owner_policy(mut self, policy: OwnerWritePolicy) -> Self {
        self.subject_owner_policy = policy;
        self
    }

    pub fn public_origin(&self) -> &str {
        &self.public_origin
    }

    pub fn handle_domain(&self) -> &str {
        &self.handle_domain
    }

    pub fn secret_length(&self) -> usize {
        self.secret_length
    }

    pub fn case_owner_policy(&self) -> OwnerWritePolicy {
        self.case_owner_policy
    }

    pub fn subject_owner_policy(&self) -> OwnerWritePolicy {
        self.subject_owner_policy
    }
}
