//! Credential material generation.
//!
//! Ephemeral identities carry two generated artefacts: a one-time-disclosure
//! secret and a placeholder username. Both are produced here, from the
//! operating system's CSPRNG. The secret is wrapped in [`Secret`], which
//! redacts itself in `Debug` output so credentials cannot leak through
//! logging.

use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Character set for generated secrets: mixed-case alphanumerics plus a small
/// symbol set.
const SECRET_CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*";

/// Minimum accepted secret length.
pub const MIN_SECRET_LENGTH: usize = 12;

const ADJECTIVES: &[&str] = &["Sunny", "Gentle", "Cheerful", "Loyal", "Bright", "Kind"];
const NOUNS: &[&str] = &["Guardian", "Tutor", "Friend", "Keeper", "Companion"];

/// A credential secret.
///
/// The plaintext is disclosed exactly once, in the issuance response; after
/// that the holder must re-redeem the case code to obtain a fresh one.
/// Hashing at rest is the job of the identity-persistence layer that consumes
/// issued credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret(String);

impl Secret {
    /// Generate a new random secret of `length` characters.
    ///
    /// Lengths below [`MIN_SECRET_LENGTH`] are raised to the minimum.
    pub fn generate(length: usize) -> Self {
        let length = length.max(MIN_SECRET_LENGTH);
        let mut out = String::with_capacity(length);
        for _ in 0..length {
            let idx = OsRng.gen_range(0..SECRET_CHARSET.len());
            out.push(SECRET_CHARSET[idx] as char);
        }
        Self(out)
    }

    /// Returns the plaintext. Callers must not log the result.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// Generate a placeholder username of the form adjective+noun+number,
/// e.g. `GentleGuardian4821`.
///
/// Used for the unique username field of a freshly created ephemeral
/// identity, and as the display-name fallback when no hint is available.
pub fn generate_username() -> String {
    let adjective = ADJECTIVES[OsRng.gen_range(0..ADJECTIVES.len())];
    let noun = NOUNS[OsRng.gen_range(0..NOUNS.len())];
    let number: u16 = OsRng.gen_range(0..10_000);
    format!("{adjective}{noun}{number}")
}

/// Returns true if `value` still looks like an auto-generated placeholder
/// username rather than a human-entered name.
///
/// Display names that match this pattern are eligible to be replaced by the
/// guardian-name hint on a later redemption.
pub fn is_placeholder_name(value: &str) -> bool {
    let stem = value.trim_end_matches(|c: char| c.is_ascii_digit());
    if stem.len() == value.len() || stem.is_empty() {
        return false;
    }
    ADJECTIVES.iter().any(|adj| stem.starts_with(adj))
        && NOUNS.iter().any(|noun| stem.ends_with(noun))
}
