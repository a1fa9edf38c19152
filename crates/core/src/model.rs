//! Domain records for the access subsystem.
//!
//! These are the four record kinds this subsystem reads and writes: the case
//! (an appointment), its subject (the treated animal), the identity issued
//! against a case code, and the clinical document whose integrity is proven
//! by fingerprint. Staff workflows create cases and subjects; this subsystem
//! only mutates the owner references, the link token, and the document
//! fingerprint.

use crate::credentials::Secret;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle status of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Scheduled,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

/// Species of a treated subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Canine,
    Feline,
    Avian,
    Reptile,
    Rodent,
    Lagomorph,
    Wild,
    Other,
}

/// Account role.
///
/// This is a closed set. The `Ephemeral` variant carries the case code it is
/// scoped to as payload — an ephemeral identity is meaningless without its
/// code, so the two travel together rather than as a nullable side field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Role {
    Staff,
    Registered,
    Ephemeral { case_code: String },
}

impl Role {
    /// The case code an ephemeral identity is scoped to, if any.
    pub fn scoped_code(&self) -> Option<&str> {
        match self {
            Role::Ephemeral { case_code } => Some(case_code),
            _ => None,
        }
    }
}

/// One appointment at the clinic.
///
/// `code` is the human-entered shared secret (stored upper-cased and
/// trimmed). `link_token` is lazily assigned by the link minter and, once
/// set, never changes value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: Uuid,
    pub code: String,
    #[serde(default)]
    pub link_token: Option<String>,
    pub subject_id: Uuid,
    #[serde(default)]
    pub owner_identity_id: Option<Uuid>,
    pub status: CaseStatus,
    pub scheduled_at: DateTime<Utc>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A treated animal and its guardian details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: Uuid,
    pub name: String,
    pub species: Species,
    #[serde(default)]
    pub breed: Option<String>,
    pub guardian_name: String,
    #[serde(default)]
    pub guardian_phone: Option<String>,
    #[serde(default)]
    pub owner_identity_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// An account known to the clinic.
///
/// `contact` is the unique handle the session subsystem logs in with; for
/// ephemeral identities it embeds the lower-cased case code. `username` is a
/// generated placeholder kept for uniqueness and display-name fallback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub contact: String,
    pub username: String,
    pub display_name: String,
    #[serde(flatten)]
    pub role: Role,
    pub secret: Secret,
    pub created_at: DateTime<Utc>,
}

/// Document lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Draft,
    Published,
}

/// Kind of issued clinical document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Report,
    Prescription,
    ExamResult,
    HealthCertificate,
    Referral,
}

/// Vital signs and systems review recorded during a physical exam.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalExam {
    #[serde(default)]
    pub temperature: Option<String>,
    #[serde(default)]
    pub heart_rate: Option<String>,
    #[serde(default)]
    pub respiratory_rate: Option<String>,
    #[serde(default)]
    pub mucous_membranes: Option<String>,
    #[serde(default)]
    pub capillary_refill: Option<String>,
    #[serde(default)]
    pub lymph_nodes: Option<String>,
    #[serde(default)]
    pub systems: SystemsReview,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SystemsReview {
    #[serde(default)]
    pub cardiovascular: Option<String>,
    #[serde(default)]
    pub respiratory: Option<String>,
    #[serde(default)]
    pub digestive: Option<String>,
    #[serde(default)]
    pub neurological: Option<String>,
    #[serde(default)]
    pub integumentary: Option<String>,
    #[serde(default)]
    pub locomotor: Option<String>,
    #[serde(default)]
    pub other: Option<String>,
}

/// One prescribed medication line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionEntry {
    pub medication: String,
    #[serde(default)]
    pub active_principle: Option<String>,
    #[serde(default)]
    pub concentration: Option<String>,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    #[serde(default)]
    pub route: Option<String>,
    #[serde(default)]
    pub quantity: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Laboratory exam metadata and result rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExamDetails {
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub collected_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sample_condition: Option<String>,
    #[serde(default)]
    pub results: Vec<ExamResultRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResultRow {
    pub parameter: String,
    pub value: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// Declaration block of a health certificate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateDetails {
    pub declaration: String,
    #[serde(default)]
    pub valid_from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fit_to_travel: bool,
}

/// A clinical document issued against a case.
///
/// `fingerprint` is present only once the document is `Published` and has
/// been sealed; `access_token` is always present and belongs to the
/// rendering/viewing flow, not to verification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: Uuid,
    pub kind: DocumentKind,
    pub title: String,
    pub content: String,
    pub case_id: Uuid,
    pub subject_id: Uuid,
    #[serde(default)]
    pub physical_exam: Option<PhysicalExam>,
    #[serde(default)]
    pub prescription: Vec<PrescriptionEntry>,
    #[serde(default)]
    pub exam_details: Option<ExamDetails>,
    #[serde(default)]
    pub certificate_details: Option<CertificateDetails>,
    #[serde(default)]
    pub diagnosis: Option<String>,
    #[serde(default)]
    pub observations: Option<String>,
    pub status: DocumentStatus,
    #[serde(default)]
    pub fingerprint: Option<String>,
    pub access_token: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_scoped_code() {
        let ephemeral = Role::Ephemeral {
            case_code: "P-ABC123".into(),
        };
        assert_eq!(ephemeral.scoped_code(), Some("P-ABC123"));
        assert_eq!(Role::Staff.scoped_code(), None);
        assert_eq!(Role::Registered.scoped_code(), None);
    }

    #[test]
    fn test_role_serializes_as_tagged_variant() {
        let ephemeral = Role::Ephemeral {
            case_code: "P-ABC123".into(),
        };
        let json = serde_json::to_value(&ephemeral).unwrap();
        assert_eq!(json["role"], "ephemeral");
        assert_eq!(json["case_code"], "P-ABC123");

        let staff = serde_json::to_value(&Role::Staff).unwrap();
        assert_eq!(staff["role"], "staff");
    }

    #[test]
    fn test_document_round_trips_without_optional_sections() {
        let doc = Document {
            id: Uuid::new_v4(),
            kind: DocumentKind::Report,
            title: "Abdominal ultrasound".into(),
            content: "Findings within normal limits.".into(),
            case_id: Uuid::new_v4(),
            subject_id: Uuid::new_v4(),
            physical_exam: None,
            prescription: Vec::new(),
            exam_details: None,
            certificate_details: None,
            diagnosis: None,
            observations: None,
            status: DocumentStatus::Draft,
            fingerprint: None,
            access_token: "TOKEN123".into(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&doc).unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(doc, back);
    }
}
