//! FHIR MedicationStatement wire model (R5 shape: `medication` is a CodeableReference and
//! `adherence` is a backbone element).

use crate::datatypes::{Annotation, CodeableConcept, CodeableReference, Dosage, Reference};
use serde::{Deserialize, Serialize};

/// Wire representation of a MedicationStatement resource.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationStatement {
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub medication: Option<CodeableReference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub encounter: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date_time: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub information_source: Vec<Reference>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub note: Vec<Annotation>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dosage: Vec<Dosage>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub adherence: Option<MedicationAdherence>,
}

/// Whether and why the medication is (not) being taken.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MedicationAdherence {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<CodeableConcept>,
}

impl MedicationStatement {
    pub const RESOURCE_TYPE: &'static str = "MedicationStatement";

    /// Empty MedicationStatement with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            resource_type: Self::RESOURCE_TYPE.to_string(),
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// The medication concept, when the medication is given as a concept.
    pub fn medication_concept(&self) -> Option<&CodeableConcept> {
        self.medication.as_ref().and_then(|m| m.concept.as_ref())
    }

    /// First dosage entry.
    pub fn first_dosage(&self) -> Option<&Dosage> {
        self.dosage.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_timing_and_adherence() {
        let input = r#"{
  "resourceType": "MedicationStatement",
  "status": "recorded",
  "medication": {"concept": {"text": "Metformin"}},
  "dosage": [{"text": "500 mg", "timing": {"repeat": {"frequency": 2, "period": 1, "periodUnit": "d"}}}],
  "adherence": {"code": {"coding": [{"code": "stopped"}]}, "reason": {"coding": [{"code": "266710000", "display": "side effects"}]}}
}"#;

        let statement: MedicationStatement = serde_json::from_str(input).unwrap();
        assert_eq!(
            statement.medication_concept().and_then(|c| c.text.as_deref()),
            Some("Metformin")
        );
        let repeat = statement.first_dosage().and_then(Dosage::repeat).unwrap();
        assert_eq!(repeat.frequency, Some(2));
        assert_eq!(repeat.period_unit.as_deref(), Some("d"));
        let adherence = statement.adherence.unwrap();
        assert_eq!(adherence.code.unwrap().first_code(), Some("stopped"));
        assert_eq!(adherence.reason.unwrap().first_display(), Some("side effects"));
    }
}
