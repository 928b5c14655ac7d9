//! Constants used throughout the codec.
//!
//! Fixed codes written into assembled bundles, default values applied while parsing, and file
//! names used by the pipeline.

/// SNOMED CT code for encounter priority "Normal".
pub const ENCOUNTER_PRIORITY_CODE: &str = "17621005";
pub const ENCOUNTER_PRIORITY_DISPLAY: &str = "Normal";

/// SNOMED CT code for encounter type "Consultation".
pub const ENCOUNTER_TYPE_CODE: &str = "11429006";
pub const ENCOUNTER_TYPE_DISPLAY: &str = "Consultation";

/// Status written on every assembled Encounter.
pub const ENCOUNTER_STATUS: &str = "completed";

/// `use` of the temporary encounter identifier.
pub const ENCOUNTER_IDENTIFIER_USE: &str = "temp";

/// SNOMED CT code attached as the reason when a medication is not being taken.
pub const NOT_TAKING_REASON_CODE: &str = "266710000";

/// Reason recorded for a medication when the source gives none.
pub const DEFAULT_MEDICATION_REASON: &str = "Drugs not taken/completed";

/// Status written on every assembled MedicationStatement.
pub const MEDICATION_STATEMENT_STATUS: &str = "recorded";

/// LOINC code and display of the family history List.
pub const FAMILY_HISTORY_CODE: &str = "8670-2";
pub const FAMILY_HISTORY_DISPLAY: &str = "History of family member diseases";

/// Observation category codes and displays.
pub const CATEGORY_LABORATORY: (&str, &str) = ("laboratory", "Laboratory");
pub const CATEGORY_VITAL_SIGNS: (&str, &str) = ("vital-signs", "Vital Signs");
pub const CATEGORY_EXAM: (&str, &str) = ("exam", "Exam");

/// Code substituted when terminology lookup finds nothing.
pub const UNKNOWN_CODE: &str = "unknown";

/// Display used for codes and summary lines when the source name is blank.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Filename the rag-preparation mode appends summaries to.
pub const SUMMARY_FILENAME: &str = "summary.txt";

/// Separator written after each summary entry.
pub const SUMMARY_SEPARATOR: &str = "--------------------------------";

/// Default model settings.
pub const DEFAULT_PROMPT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_GENERATION_TEMPERATURE: f32 = 0.9;
pub const DEFAULT_MAX_TOKENS: u32 = 3000;
