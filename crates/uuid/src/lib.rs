//! Resource identifier utilities.
//!
//! Every resource the assembler emits gets a freshly generated identifier, and every
//! intra-bundle link is derived from that identifier. Keeping the formatting in one place means
//! `fullUrl`, `Patient/<id>` references and resource `id` fields can never disagree.
//!
//! ## Canonical identifier form
//! - Hyphenated, lowercase UUID (RFC 4122 text form)
//! - Example: `550e8400-e29b-41d4-a716-446655440000`
//!
//! Notes:
//! - This is the same value you would get from `Uuid::new_v4().hyphenated().to_string()`.
//! - Use [`ResourceId::parse`] for externally supplied identifiers; uppercase, braced, URN or
//!   simple (no hyphen) forms are rejected.
//!
//! ## Derived forms
//! - Temporary bundle reference: `urn:uuid:<id>` ([`ResourceId::urn`])
//! - Relative reference: `<ResourceType>/<id>` ([`ResourceId::reference`])
//!
//! The crate also provides [`IdentifierStamp`], the compact second-resolution timestamp used in
//! human-readable business identifiers such as `Encounter_Jane Doe_20260111143522`.

mod service;

// Re-export public types
pub use service::{IdentifierStamp, ResourceId, Uuid};

/// Error type for identifier operations.
#[derive(Debug, thiserror::Error)]
pub enum UuidError {
    /// Invalid input provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for identifier operations.
pub type UuidResult<T> = Result<T, UuidError>;
