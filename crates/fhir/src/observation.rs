//! FHIR Observation wire model.

use crate::datatypes::{Annotation, CodeableConcept, Period, Quantity, Reference};
use serde::{Deserialize, Serialize};

/// Wire representation of an Observation resource.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub category: Vec<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_period: Option<Period>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_quantity: Option<Quantity>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_boolean: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interpretation: Vec<CodeableConcept>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub note: Vec<Annotation>,
}

impl Observation {
    pub const RESOURCE_TYPE: &'static str = "Observation";

    /// Empty Observation with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            resource_type: Self::RESOURCE_TYPE.to_string(),
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Lower-cased code of the first category coding (empty when absent).
    pub fn category_code(&self) -> String {
        self.category
            .first()
            .and_then(CodeableConcept::first_code)
            .unwrap_or_default()
            .to_lowercase()
    }

    /// Effective instant: `effectiveDateTime`, else `effectivePeriod.start`.
    pub fn effective(&self) -> Option<&str> {
        self.effective_date_time
            .as_deref()
            .or_else(|| self.effective_period.as_ref()?.start.as_deref())
            .filter(|s| !s.trim().is_empty())
    }

    /// Code of the first interpretation coding.
    pub fn interpretation_code(&self) -> Option<&str> {
        self.interpretation.first().and_then(CodeableConcept::first_code)
    }
}
