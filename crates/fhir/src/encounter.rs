//! FHIR Encounter wire model (R5 shape for `reason`).

use crate::datatypes::{CodeableConcept, CodeableReference, Identifier, Reference};
use serde::{Deserialize, Serialize};

/// Wire representation of an Encounter resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Encounter {
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<CodeableConcept>,

    #[serde(rename = "type", default, skip_serializing_if = "Vec::is_empty")]
    pub encounter_type: Vec<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<Reference>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reason: Vec<EncounterReason>,
}

/// One reason entry; each carries zero or more coded/text values.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct EncounterReason {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub value: Vec<CodeableReference>,
}

impl EncounterReason {
    /// Reason carrying free text only.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            value: vec![CodeableReference {
                concept: Some(CodeableConcept::text(text)),
                reference: None,
            }],
        }
    }
}

impl Encounter {
    pub const RESOURCE_TYPE: &'static str = "Encounter";

    /// Empty Encounter with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            resource_type: Self::RESOURCE_TYPE.to_string(),
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Text of the first reason value that carries a concept text.
    pub fn reason_text(&self) -> Option<&str> {
        self.reason
            .iter()
            .flat_map(|r| r.value.iter())
            .filter_map(|v| v.concept.as_ref())
            .find_map(|c| c.text.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_text_finds_first_nested_concept_text() {
        let input = r#"{
  "resourceType": "Encounter",
  "id": "e1",
  "status": "completed",
  "reason": [
    { "value": [{ "reference": { "reference": "Condition/1" } }] },
    { "value": [{ "concept": { "text": "fatigue" } }, { "concept": { "text": "later" } }] }
  ]
}"#;

        let encounter: Encounter = serde_json::from_str(input).expect("parse encounter");
        assert_eq!(encounter.reason_text(), Some("fatigue"));
    }

    #[test]
    fn renders_type_and_reason_with_wire_names() {
        let mut encounter = Encounter::new("e1");
        encounter.encounter_type = vec![CodeableConcept::text("Consultation")];
        encounter.reason = vec![EncounterReason::text("fever")];

        let json = serde_json::to_value(&encounter).unwrap();
        assert_eq!(json["type"][0]["text"], "Consultation");
        assert_eq!(json["reason"][0]["value"][0]["concept"]["text"], "fever");
        assert!(json.get("identifier").is_none());
    }
}
