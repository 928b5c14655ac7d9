//! # FHIR agent core
//!
//! Clinical narrative ⇄ FHIR transaction bundle codec and the batch pipeline around it.
//!
//! - [`extract_json_value`]: locate and repair the JSON in a model completion
//! - [`parse_record`]: JSON value → [`CanonicalRecord`], with dotted-path validation errors
//! - [`TerminologyResolver`]: rank-one LOINC / SNOMED CT code lookup
//! - [`Assembler`]: record → transaction bundle
//! - [`reduce_bundle`]: bundle → record
//! - [`render_summary`]: record → plain-text summary
//!
//! **No transport concerns**: HTTP clients for the terminology and generation services live in
//! `agent-clients`; this crate only defines the [`TerminologySearch`] and [`TextGenerator`]
//! seams they implement.

pub mod assemble;
pub mod cases;
pub mod config;
pub mod constants;
pub mod enums;
pub mod error;
pub mod generation;
pub mod json_repair;
pub mod parse;
pub mod pipeline;
pub mod record;
pub mod reduce;
pub mod schema;
pub mod storage;
pub mod summary;
pub mod terminology;

pub use assemble::{AssembledBundle, Assembler};
pub use cases::{append_generated_case, CaseBook, CaseEntry, CaseGroup};
pub use config::{model_settings_from_env_values, DiseaseSpec, PipelineConfig, RunMode};
pub use enums::{Adherence, Gender, Interpretation, ObservationStatus, PeriodUnit};
pub use error::{CoreError, CoreResult, ExtractionError, GenerationError, ReferenceError};
pub use generation::{GenerationRequest, ModelSettings, TextGenerator};
pub use json_repair::extract_json_value;
pub use parse::parse_record;
pub use pipeline::{CaseOutcome, CaseProcessor, RunReport};
pub use record::{
    CanonicalRecord, Encounter, FamilyCondition, FamilyHistory, FamilyMember, LabObservation,
    Medication, Observations, PatientAddress, PatientInfo, SymptomObservation, VitalSign,
};
pub use reduce::{reduce_bundle, reduce_bundle_reporting, Reduction};
pub use schema::{record_schema, schema_text};
pub use summary::{render_summary, render_summary_at};
pub use terminology::{
    Candidate, OfflineTerminology, ResolvedCode, SearchError, TerminologyResolver,
    TerminologySearch, Vocabulary,
};
