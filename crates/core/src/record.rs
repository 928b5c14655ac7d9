//! Canonical clinical record.
//!
//! The in-memory form both directions of the codec meet at. Built by [`crate::parse_record`]
//! from extracted JSON and by [`crate::reduce_bundle`] from an existing bundle. Serialises back
//! to the JSON shape described by [`crate::schema::record_schema`].

use crate::enums::{Adherence, Gender, Interpretation, ObservationStatus, PeriodUnit};
use crate::schema::keys;
use agent_types::NonEmptyText;
use agent_uuid::ResourceId;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Root aggregate: one patient with their encounters and family history.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CanonicalRecord {
    /// Patient resource id; assigned at assembly, read back on reduction.
    pub id: Option<ResourceId>,
    pub patient: PatientInfo,
    pub encounters: Vec<Encounter>,
    pub family_history: FamilyHistory,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PatientInfo {
    pub first_name: Option<NonEmptyText>,
    pub second_name: Option<NonEmptyText>,
    pub gender: Gender,
    /// ISO date string as given.
    pub birth_date: Option<NonEmptyText>,
    pub address: PatientAddress,
}

impl PatientInfo {
    /// `"<first> <second>"` from whichever parts are present.
    pub fn full_name(&self) -> Option<String> {
        let parts: Vec<&str> = [&self.first_name, &self.second_name]
            .into_iter()
            .flatten()
            .map(NonEmptyText::as_str)
            .collect();
        (!parts.is_empty()).then(|| parts.join(" "))
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PatientAddress {
    pub text: Option<NonEmptyText>,
    pub city: Option<NonEmptyText>,
    pub state: Option<NonEmptyText>,
    pub country: Option<NonEmptyText>,
}

impl PatientAddress {
    pub fn is_empty(&self) -> bool {
        self.text.is_none() && self.city.is_none() && self.state.is_none() && self.country.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Encounter {
    /// ISO date or date-time.
    pub date: Option<NonEmptyText>,
    pub reason: Option<NonEmptyText>,
    pub observations: Observations,
    pub medications: Vec<Medication>,
}

/// The three disjoint observation buckets of an encounter.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Observations {
    pub laboratory: Vec<LabObservation>,
    pub symptom: Vec<SymptomObservation>,
    pub vital_sign: Vec<VitalSign>,
}

impl Observations {
    pub fn is_empty(&self) -> bool {
        self.laboratory.is_empty() && self.symptom.is_empty() && self.vital_sign.is_empty()
    }

    pub fn len(&self) -> usize {
        self.laboratory.len() + self.symptom.len() + self.vital_sign.len()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabObservation {
    pub test_name: String,
    pub value: Option<f64>,
    pub unit: Option<NonEmptyText>,
    pub interpretation: Interpretation,
    pub status: ObservationStatus,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SymptomObservation {
    pub symptom_name: String,
    pub present: bool,
    pub interpretation: Interpretation,
    pub status: ObservationStatus,
}

impl Default for SymptomObservation {
    fn default() -> Self {
        Self {
            symptom_name: String::new(),
            present: true,
            interpretation: Interpretation::Abnormal,
            status: ObservationStatus::Final,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct VitalSign {
    pub vital_type: String,
    pub value: Option<f64>,
    pub unit: Option<NonEmptyText>,
    pub interpretation: Interpretation,
    pub status: ObservationStatus,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Medication {
    pub name: String,
    pub note: Option<NonEmptyText>,
    pub dosage_text: Option<NonEmptyText>,
    pub frequency: Option<u32>,
    pub period: Option<f64>,
    pub period_unit: PeriodUnit,
    pub adherence: Adherence,
    pub reason: Option<NonEmptyText>,
}

impl Default for Medication {
    fn default() -> Self {
        Self {
            name: String::new(),
            note: None,
            dosage_text: None,
            frequency: None,
            period: None,
            period_unit: PeriodUnit::Day,
            adherence: Adherence::Taking,
            reason: NonEmptyText::new(crate::constants::DEFAULT_MEDICATION_REASON).ok(),
        }
    }
}

impl Medication {
    /// `(frequency, period)` when both are present and positive.
    pub fn schedule(&self) -> Option<(u32, f64)> {
        match (self.frequency, self.period) {
            (Some(frequency), Some(period)) if frequency > 0 && period > 0.0 => {
                Some((frequency, period))
            }
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FamilyHistory {
    pub members: Vec<FamilyMember>,
    pub note: Option<NonEmptyText>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FamilyMember {
    pub relationship: String,
    pub deceased: bool,
    pub conditions: Vec<FamilyCondition>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct FamilyCondition {
    pub name: String,
    pub outcome: Option<NonEmptyText>,
}

// ============================================================================
// Serialisation to the record JSON shape
// ============================================================================

// Hand-written so the emitted keys come from `schema::keys`, the same constants the parser
// reads.

impl Serialize for CanonicalRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(id) = &self.id {
            map.serialize_entry("id", id)?;
        }
        map.serialize_entry(keys::PATIENT, &self.patient)?;
        map.serialize_entry(keys::ENCOUNTERS, &self.encounters)?;
        map.serialize_entry(keys::FAMILY_HISTORY, &self.family_history)?;
        map.end()
    }
}

impl Serialize for PatientInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry(keys::FIRST_NAME, &self.first_name)?;
        map.serialize_entry(keys::SECOND_NAME, &self.second_name)?;
        map.serialize_entry(keys::GENDER, &self.gender)?;
        map.serialize_entry(keys::BIRTH_DATE, &self.birth_date)?;
        map.serialize_entry(keys::ADDRESS, &self.address)?;
        map.end()
    }
}

impl Serialize for PatientAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry(keys::ADDRESS_TEXT, &self.text)?;
        map.serialize_entry(keys::CITY, &self.city)?;
        map.serialize_entry(keys::STATE, &self.state)?;
        map.serialize_entry(keys::COUNTRY, &self.country)?;
        map.end()
    }
}

impl Serialize for Encounter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry(keys::ENCOUNTER_DATE, &self.date)?;
        map.serialize_entry(keys::REASON, &self.reason)?;
        map.serialize_entry(keys::OBSERVATION, &self.observations)?;
        map.serialize_entry(keys::MEDICATION, &self.medications)?;
        map.end()
    }
}

impl Serialize for Observations {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry(keys::LABORATORY, &self.laboratory)?;
        map.serialize_entry(keys::SYMPTOM, &self.symptom)?;
        map.serialize_entry(keys::VITAL_SIGN, &self.vital_sign)?;
        map.end()
    }
}

impl Serialize for LabObservation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry(keys::TEST_NAME, &self.test_name)?;
        map.serialize_entry(keys::VALUE, &self.value)?;
        map.serialize_entry(keys::UNIT, &self.unit)?;
        map.serialize_entry(keys::INTERPRETATION, &self.interpretation)?;
        map.serialize_entry(keys::STATUS, &self.status)?;
        map.end()
    }
}

impl Serialize for SymptomObservation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry(keys::SYMPTOM_NAME, &self.symptom_name)?;
        map.serialize_entry(keys::PRESENT, &self.present)?;
        map.serialize_entry(keys::INTERPRETATION, &self.interpretation)?;
        map.serialize_entry(keys::STATUS, &self.status)?;
        map.end()
    }
}

impl Serialize for VitalSign {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(5))?;
        map.serialize_entry(keys::VITAL_TYPE, &self.vital_type)?;
        map.serialize_entry(keys::VALUE, &self.value)?;
        map.serialize_entry(keys::UNIT, &self.unit)?;
        map.serialize_entry(keys::INTERPRETATION, &self.interpretation)?;
        map.serialize_entry(keys::STATUS, &self.status)?;
        map.end()
    }
}

impl Serialize for Medication {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(8))?;
        map.serialize_entry(keys::NAME, &self.name)?;
        map.serialize_entry(keys::NOTE, &self.note)?;
        map.serialize_entry(keys::DOSAGE_TEXT, &self.dosage_text)?;
        map.serialize_entry(keys::FREQUENCY, &self.frequency)?;
        map.serialize_entry(keys::PERIOD, &self.period)?;
        map.serialize_entry(keys::PERIOD_UNIT, &self.period_unit)?;
        map.serialize_entry(keys::ADHERENCE, &self.adherence)?;
        map.serialize_entry(keys::REASON, &self.reason)?;
        map.end()
    }
}

impl Serialize for FamilyHistory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(keys::MEMBERS, &self.members)?;
        map.serialize_entry(keys::NOTE, &self.note)?;
        map.end()
    }
}

impl Serialize for FamilyMember {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry(keys::RELATIONSHIP, &self.relationship)?;
        map.serialize_entry(keys::DECEASED, &self.deceased)?;
        map.serialize_entry(keys::CONDITIONS, &self.conditions)?;
        map.end()
    }
}

impl Serialize for FamilyCondition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(keys::CONDITION_NAME, &self.name)?;
        map.serialize_entry(keys::OUTCOME, &self.outcome)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{collect_keys, record_schema};
    use std::collections::BTreeSet;

    fn text(s: &str) -> Option<NonEmptyText> {
        NonEmptyText::new(s).ok()
    }

    fn full_record() -> CanonicalRecord {
        CanonicalRecord {
            id: None,
            patient: PatientInfo {
                first_name: text("Jane"),
                second_name: text("Doe"),
                gender: Gender::Female,
                birth_date: text("1990-01-01"),
                address: PatientAddress {
                    city: text("Leeds"),
                    ..PatientAddress::default()
                },
            },
            encounters: vec![Encounter {
                date: text("2024-03-01"),
                reason: text("fatigue"),
                observations: Observations {
                    laboratory: vec![LabObservation {
                        test_name: "Hemoglobin A1c".into(),
                        value: Some(6.1),
                        unit: text("%"),
                        ..LabObservation::default()
                    }],
                    symptom: vec![SymptomObservation::default()],
                    vital_sign: vec![VitalSign::default()],
                },
                medications: vec![Medication::default()],
            }],
            family_history: FamilyHistory {
                members: vec![FamilyMember {
                    relationship: "Mother".into(),
                    deceased: false,
                    conditions: vec![FamilyCondition::default()],
                }],
                note: None,
            },
        }
    }

    #[test]
    fn serialised_keys_match_the_schema() {
        let json = serde_json::to_value(full_record()).unwrap();

        let mut emitted = BTreeSet::new();
        collect_keys(&json, &mut emitted);
        let mut described = BTreeSet::new();
        collect_keys(&record_schema(), &mut described);

        assert_eq!(emitted, described);
    }

    #[test]
    fn record_id_is_emitted_only_when_set() {
        let mut record = full_record();
        assert!(serde_json::to_value(&record).unwrap().get("id").is_none());

        let id = ResourceId::new();
        record.id = Some(id.clone());
        assert_eq!(serde_json::to_value(&record).unwrap()["id"], id.to_string());
    }

    #[test]
    fn medication_defaults_and_schedule() {
        let medication = Medication::default();
        assert_eq!(medication.period_unit, PeriodUnit::Day);
        assert_eq!(medication.adherence, Adherence::Taking);
        assert_eq!(
            medication.reason.as_ref().map(NonEmptyText::as_str),
            Some("Drugs not taken/completed")
        );
        assert_eq!(medication.schedule(), None);

        let scheduled = Medication {
            frequency: Some(3),
            period: Some(1.0),
            ..Medication::default()
        };
        assert_eq!(scheduled.schedule(), Some((3, 1.0)));

        let zero = Medication {
            frequency: Some(0),
            period: Some(1.0),
            ..Medication::default()
        };
        assert_eq!(zero.schedule(), None);
    }

    #[test]
    fn full_name_joins_present_parts() {
        let mut patient = PatientInfo::default();
        assert_eq!(patient.full_name(), None);
        patient.first_name = text("Jane");
        assert_eq!(patient.full_name().as_deref(), Some("Jane"));
        patient.second_name = text("Doe");
        assert_eq!(patient.full_name().as_deref(), Some("Jane Doe"));
    }
}
