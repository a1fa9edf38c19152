//! Ephemeral identity issuance.
//!
//! Redeeming a case code either creates the single ephemeral identity scoped
//! to that code or rotates its secret. The returned plaintext secret is the
//! only disclosure: losing it means redeeming again for a fresh one.
//!
//! ## First-redemption race
//!
//! Two concurrent redemptions of an unseen code can both observe "no
//! identity yet" and both attempt the insert. The store's uniqueness
//! constraint on the scoped code lets exactly one insert through; the loser
//! catches the conflict and retries once as fetch-and-rotate, so the caller
//! still walks away with valid credentials and exactly one identity row
//! exists per code.

use crate::config::CoreConfig;
use crate::credentials::{generate_username, is_placeholder_name, Secret};
use crate::error::{AccessError, AccessResult};
use crate::model::{Identity, Role};
use crate::resolver::normalize_code;
use crate::store::{RecordStore, StoreError};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

/// Credentials handed to the caller after a successful redemption.
///
/// `secret` is plaintext here and nowhere else; the session subsystem
/// consumes it, the identity-persistence layer hashes it at rest.
#[derive(Debug, Clone)]
pub struct IssuedCredentials {
    pub identity_id: Uuid,
    pub contact: String,
    pub secret: Secret,
}

/// Creates and re-activates ephemeral identities for case codes.
#[derive(Clone)]
pub struct EphemeralIdentityService {
    store: Arc<RecordStore>,
    cfg: Arc<CoreConfig>,
}

impl EphemeralIdentityService {
    pub fn new(store: Arc<RecordStore>, cfg: Arc<CoreConfig>) -> Self {
        Self { store, cfg }
    }

    /// Redeem a case code, issuing one-time-disclosure credentials.
    ///
    /// `display_hint` is typically the subject's guardian name; it becomes
    /// the display name on creation and replaces a still-placeholder display
    /// name on rotation.
    ///
    /// # Errors
    ///
    /// - `Validation` if the code is empty after normalisation
    /// - `Internal` on storage failure or if the post-conflict retry cannot
    ///   find the winning identity
    pub fn redeem(&self, case_code: &str, display_hint: &str) -> AccessResult<IssuedCredentials> {
        let code = normalize_code(case_code);
        if code.is_empty() {
            return Err(AccessError::Validation("case code is required".into()));
        }

        if let Some(existing) = self.store.ephemeral_identity_for_code(&code)? {
            return self.rotate(existing, display_hint);
        }

        match self.create(&code, display_hint) {
            Ok(issued) => Ok(issued),
            // Lost the first-redemption race: the winner's row exists now,
            // so retry exactly once as fetch-and-rotate.
            Err(AccessError::Conflict(_)) => {
                let existing = self
                    .store
                    .ephemeral_identity_for_code(&code)?
                    .ok_or_else(|| {
                        AccessError::Internal(format!(
                            "identity conflict for code {code} but no winning row found"
                        ))
                    })?;
                self.rotate(existing, display_hint)
            }
            Err(other) => Err(other),
        }
    }

    fn rotate(&self, identity: Identity, display_hint: &str) -> AccessResult<IssuedCredentials> {
        let secret = Secret::generate(self.cfg.secret_length());

        let hint = display_hint.trim();
        let refresh_name = !hint.is_empty()
            && (identity.display_name.is_empty()
                || identity.display_name == identity.username
                || is_placeholder_name(&identity.display_name));

        let found = self.store.rotate_identity_secret(
            identity.id,
            secret.clone(),
            refresh_name.then(|| hint.to_string()),
        )?;
        if !found {
            return Err(AccessError::Internal(format!(
                "identity {} vanished during secret rotation",
                identity.id
            )));
        }

        tracing::debug!(identity = %identity.id, "rotated ephemeral credentials");

        Ok(IssuedCredentials {
            identity_id: identity.id,
            contact: identity.contact,
            secret,
        })
    }

    fn create(&self, code: &str, display_hint: &str) -> AccessResult<IssuedCredentials> {
        let secret = Secret::generate(self.cfg.secret_length());
        let contact = format!("temp_{}@{}", code.to_lowercase(), self.cfg.handle_domain());

        // Placeholder usernames can collide; regenerate with a bounded
        // number of attempts. Any other uniqueness violation means a racer
        // won the scoped code and is handled by the caller.
        for _attempt in 0..5 {
            let username = generate_username();
            let hint = display_hint.trim();
            let display_name = if hint.is_empty() {
                username.clone()
            } else {
                hint.to_string()
            };

            let identity = Identity {
                id: Uuid::new_v4(),
                contact: contact.clone(),
                username,
                display_name,
                role: Role::Ephemeral {
                    case_code: code.to_string(),
                },
                secret: secret.clone(),
                created_at: Utc::now(),
            };
            let identity_id = identity.id;

            match self.store.insert_identity(identity) {
                Ok(()) => {
                    tracing::info!(code, identity = %identity_id, "created ephemeral identity");
                    return Ok(IssuedCredentials {
                        identity_id,
                        contact,
                        secret,
                    });
                }
                Err(StoreError::UniqueViolation {
                    field: "username", ..
                }) => continue,
                Err(other) => return Err(other.into()),
            }
        }

        Err(AccessError::Internal(
            "failed to allocate a unique placeholder username after 5 attempts".into(),
        ))
    }
}
