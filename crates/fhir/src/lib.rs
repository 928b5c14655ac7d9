//! FHIR wire/boundary support for the clinical bundle codec.
//!
//! This crate provides **wire models** and **format helpers** for the FHIR resource subset the
//! codec reads and writes:
//! - Patient, Encounter, Observation, MedicationStatement
//! - List with contained FamilyMemberHistory (family history)
//! - transaction Bundle
//!
//! This crate focuses on:
//! - serialisation/deserialisation of the JSON wire format
//! - tolerant decoding of bundles produced by other systems
//! - small navigation helpers (first coding, reference target id)
//!
//! Clinical meaning (what a lab observation *is*) lives in `fhir-agent-core`. Wire structs here
//! do not use `deny_unknown_fields`: incoming bundles routinely carry elements this subset does
//! not model, and they must still be readable.

pub mod bundle;
pub mod datatypes;
pub mod encounter;
pub mod family_history;
pub mod medication_statement;
pub mod observation;
pub mod patient;
pub mod systems;

// Re-export wire types
pub use bundle::{Bundle, BundleEntry, BundleEntryRequest, Resource};
pub use datatypes::{
    Address, Annotation, CodeableConcept, CodeableReference, Coding, Dosage, HumanName,
    Identifier, Period, Quantity, Reference, Timing, TimingRepeat,
};
pub use encounter::{Encounter, EncounterReason};
pub use family_history::{FamilyMemberCondition, FamilyMemberHistory, List, ListEntry};
pub use medication_statement::{MedicationAdherence, MedicationStatement};
pub use observation::Observation;
pub use patient::Patient;

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("translation error: {0}")]
    Translation(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;
