//! FHIR general-purpose datatypes shared by the resource wire models.
//!
//! Only the elements the codec reads or writes are modelled. All fields are optional on the
//! wire; empty lists and absent options are skipped on output.

use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Coded values
// ============================================================================

/// A single code from a code system.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Coding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Coding {
    /// Build a fully populated coding.
    pub fn new(system: &str, code: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            system: Some(system.to_string()),
            code: Some(code.into()),
            display: Some(display.into()),
        }
    }
}

/// A concept expressed as zero or more codings plus optional text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CodeableConcept {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub coding: Vec<Coding>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl CodeableConcept {
    /// Concept with exactly one coding and no text.
    pub fn coded(coding: Coding) -> Self {
        Self {
            coding: vec![coding],
            text: None,
        }
    }

    /// Concept carrying text only.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            coding: Vec::new(),
            text: Some(text.into()),
        }
    }

    /// Attach concept text.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Code of the first coding, if any.
    pub fn first_code(&self) -> Option<&str> {
        self.coding.first().and_then(|c| c.code.as_deref())
    }

    /// Display of the first coding, if any.
    pub fn first_display(&self) -> Option<&str> {
        self.coding.first().and_then(|c| c.display.as_deref())
    }

    /// Concept text, falling back to the first coding display.
    pub fn text_or_display(&self) -> Option<&str> {
        self.text.as_deref().or_else(|| self.first_display())
    }

    /// First coding display, falling back to the concept text.
    pub fn display_or_text(&self) -> Option<&str> {
        self.first_display().or(self.text.as_deref())
    }
}

/// Reference to a concept or to another resource (R5 `CodeableReference`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct CodeableReference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concept: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<Reference>,
}

// ============================================================================
// References and identifiers
// ============================================================================

/// A literal reference to another resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Reference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Reference {
    /// Reference to `target` (for example `Patient/<id>`).
    pub fn to(target: impl Into<String>) -> Self {
        Self {
            reference: Some(target.into()),
            display: None,
        }
    }

    /// Attach a display string.
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    /// The id part of the reference.
    ///
    /// Handles relative (`Encounter/abc`), absolute (`http://x/fhir/Encounter/abc`) and
    /// temporary (`urn:uuid:abc`) forms. Returns `None` for blank references.
    pub fn target_id(&self) -> Option<&str> {
        let raw = self.reference.as_deref()?.trim();
        let tail = match raw.strip_prefix("urn:uuid:") {
            Some(rest) => rest,
            None => raw.rsplit('/').next().unwrap_or(raw),
        };
        (!tail.is_empty()).then_some(tail)
    }
}

/// A business identifier.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Identifier {
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

// ============================================================================
// Demographics
// ============================================================================

/// Human name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct HumanName {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub given: Vec<String>,
}

/// Postal address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

// ============================================================================
// Quantities, time and dosage
// ============================================================================

/// Measured amount.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Quantity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// Time range.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Period {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

/// Text note.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Annotation {
    #[serde(default)]
    pub text: String,
}

impl Annotation {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Repeat rule of a timing schedule.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingRepeat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_unit: Option<String>,
}

/// Timing schedule.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Timing {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat: Option<TimingRepeat>,
}

/// How a medication is or was taken.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct Dosage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing: Option<Timing>,
}

impl Dosage {
    /// The timing repeat rule, if present.
    pub fn repeat(&self) -> Option<&TimingRepeat> {
        self.timing.as_ref().and_then(|t| t.repeat.as_ref())
    }
}

// ============================================================================
// Serde helpers
// ============================================================================

/// Accept either a single element or an array for 0..* elements whose cardinality differs
/// between FHIR releases (for example `List.subject`).
pub(crate) fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    Ok(match Option::<OneOrMany<T>>::deserialize(deserializer)? {
        Some(OneOrMany::Many(items)) => items,
        Some(OneOrMany::One(item)) => vec![item],
        None => Vec::new(),
    })
}
