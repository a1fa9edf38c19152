//! # Clinic Core
//!
//! Core business logic for the clinic access and document-integrity
//! subsystem:
//!
//! - Secret resolution: case codes and link tokens mapped to case records
//! - Ephemeral identity issuance with rotate-on-every-redemption secrets
//! - Ownership binding of issued identities to cases and subjects
//! - Deterministic access-link minting
//! - Content-addressable document fingerprints and public verification
//!
//! **No API concerns**: HTTP servers, request DTOs and status-code mapping
//! belong in `api-rest`. Everything here is synchronous, storage-backed and
//! directly testable.
//!
//! Configuration ([`CoreConfig`]) and storage ([`RecordStore`]) are built
//! once at process start and injected into the services that need them —
//! there is no ambient global state.

pub mod config;
pub mod credentials;
pub mod error;
pub mod fingerprint;
pub mod identity;
pub mod linker;
pub mod links;
pub mod model;
pub mod redemption;
pub mod resolver;
pub mod seed;
pub mod store;
pub mod verifier;

pub use config::{CoreConfig, OwnerWritePolicy};
pub use credentials::Secret;
pub use error::{AccessError, AccessResult};
pub use fingerprint::{compute_fingerprint, DocumentSealer, FINGERPRINT_SCHEME};
pub use identity::{EphemeralIdentityService, IssuedCredentials};
pub use linker::RecordLinker;
pub use links::{derive_link_token, LinkMinter, MintedLink};
pub use redemption::RedemptionService;
pub use resolver::{CaseSecret, ResolvedCase, SecretResolver};
pub use store::{RecordStore, StoreError, StoreResult};
pub use verifier::{Verified, Verifier};
