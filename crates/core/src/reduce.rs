//! Transaction bundle → canonical record.
//!
//! A single pass over the bundle entries dispatches on resource type into a [`Reduction`]
//! build context. Encounters become builders in an arena (discovery order) indexed by id;
//! observations and medication statements are queued with their encounter reference and
//! attached when the pass is finalised, so children may appear before their Encounter.
//!
//! Encounter dates are not read from the Encounter: each encounter takes the earliest
//! effective instant of its observations. ISO 8601 strings are compared as text.
//!
//! Children with a missing or unknown encounter reference are dropped and reported as
//! [`ReferenceError`] diagnostics; reduction itself never fails.

use crate::constants::DEFAULT_MEDICATION_REASON;
use crate::enums::{Adherence, Gender, Interpretation, ObservationStatus, PeriodUnit};
use crate::error::ReferenceError;
use crate::record::{
    CanonicalRecord, Encounter, FamilyCondition, FamilyHistory, FamilyMember, LabObservation,
    Medication, Observations, PatientAddress, PatientInfo, SymptomObservation, VitalSign,
};
use agent_types::NonEmptyText;
use agent_uuid::ResourceId;
use fhir::{
    Bundle, CodeableConcept, FamilyMemberHistory, List, MedicationStatement, Observation,
    Patient, Reference, Resource,
};
use std::collections::HashMap;

/// Reduced record plus the reference diagnostics collected on the way.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reduction {
    pub record: CanonicalRecord,
    pub diagnostics: Vec<ReferenceError>,
}

/// Reduce a bundle to a canonical record, discarding diagnostics.
pub fn reduce_bundle(bundle: &Bundle) -> CanonicalRecord {
    reduce_bundle_reporting(bundle).record
}

/// Reduce a bundle to a canonical record, keeping reference diagnostics.
pub fn reduce_bundle_reporting(bundle: &Bundle) -> Reduction {
    let mut context = ReductionContext::default();
    for resource in bundle.resources() {
        context.visit(resource);
    }
    context.finish()
}

// ============================================================================
// Build context
// ============================================================================

#[derive(Default)]
struct EncounterBuilder {
    reason: Option<NonEmptyText>,
    date: Option<String>,
    observations: Observations,
    medications: Vec<Medication>,
}

impl EncounterBuilder {
    fn observe_date(&mut self, effective: Option<&str>) {
        let Some(effective) = effective else {
            return;
        };
        match &self.date {
            Some(current) if current.as_str() <= effective => {}
            _ => self.date = Some(effective.to_string()),
        }
    }

    fn build(self) -> Encounter {
        Encounter {
            date: NonEmptyText::from_optional(self.date.as_deref()),
            reason: self.reason,
            observations: self.observations,
            medications: self.medications,
        }
    }
}

/// A child resource waiting for its encounter.
enum Child<'b> {
    Observation(&'b Observation),
    Medication(&'b MedicationStatement),
}

impl Child<'_> {
    fn resource_type(&self) -> &'static str {
        match self {
            Child::Observation(_) => Observation::RESOURCE_TYPE,
            Child::Medication(_) => MedicationStatement::RESOURCE_TYPE,
        }
    }

    fn id(&self) -> Option<String> {
        match self {
            Child::Observation(o) => o.id.clone(),
            Child::Medication(m) => m.id.clone(),
        }
    }

    fn encounter(&self) -> Option<&Reference> {
        match self {
            Child::Observation(o) => o.encounter.as_ref(),
            Child::Medication(m) => m.encounter.as_ref(),
        }
    }
}

#[derive(Default)]
struct ReductionContext<'b> {
    id: Option<ResourceId>,
    patient: Option<PatientInfo>,
    encounters: Vec<EncounterBuilder>,
    encounter_index: HashMap<String, usize>,
    children: Vec<Child<'b>>,
    family_history: FamilyHistory,
}

impl<'b> ReductionContext<'b> {
    fn visit(&mut self, resource: &'b Resource) {
        match resource {
            Resource::Patient(patient) => self.patient(patient),
            Resource::Encounter(encounter) => self.encounter(encounter),
            Resource::Observation(obs) => self.children.push(Child::Observation(obs)),
            Resource::MedicationStatement(statement) => {
                self.children.push(Child::Medication(statement))
            }
            Resource::List(list) => self.list(list),
            Resource::FamilyMemberHistory(member) => {
                self.family_history.members.push(family_member(member))
            }
            Resource::Invalid {
                resource_type,
                reason,
                ..
            } => {
                tracing::warn!(
                    resource_type = %resource_type,
                    id = resource.id().unwrap_or("<none>"),
                    reason = %reason,
                    "skipping resource that failed to decode"
                );
            }
            Resource::Other { resource_type, .. } => {
                tracing::debug!(resource_type = %resource_type, "ignoring unsupported resource");
            }
        }
    }

    fn patient(&mut self, patient: &Patient) {
        if self.patient.is_some() {
            tracing::warn!(id = patient.id.as_deref().unwrap_or("<none>"), "ignoring additional Patient");
            return;
        }

        self.id = patient.id.as_deref().and_then(|id| match ResourceId::parse(id) {
            Ok(id) => Some(id),
            Err(err) => {
                tracing::debug!(id, error = %err, "patient id is not a UUID; record id left unset");
                None
            }
        });

        let address = patient
            .primary_address()
            .map(|a| PatientAddress {
                text: NonEmptyText::from_optional(a.text.as_deref()),
                city: NonEmptyText::from_optional(a.city.as_deref()),
                state: NonEmptyText::from_optional(a.state.as_deref()),
                country: NonEmptyText::from_optional(a.country.as_deref()),
            })
            .unwrap_or_default();

        self.patient = Some(PatientInfo {
            first_name: NonEmptyText::from_optional(patient.first_given()),
            second_name: NonEmptyText::from_optional(patient.family()),
            gender: patient
                .gender
                .as_deref()
                .map(Gender::from_wire)
                .unwrap_or_default(),
            birth_date: NonEmptyText::from_optional(patient.birth_date.as_deref()),
            address,
        });
    }

    fn encounter(&mut self, encounter: &fhir::Encounter) {
        let builder = EncounterBuilder {
            reason: NonEmptyText::from_optional(encounter.reason_text()),
            ..EncounterBuilder::default()
        };

        match encounter.id.as_deref().filter(|id| !id.trim().is_empty()) {
            Some(id) if self.encounter_index.contains_key(id) => {
                tracing::warn!(id, "duplicate Encounter id; keeping the first");
            }
            Some(id) => {
                self.encounter_index.insert(id.to_string(), self.encounters.len());
                self.encounters.push(builder);
            }
            // Unreferenceable, but still an encounter of the record.
            None => self.encounters.push(builder),
        }
    }

    fn list(&mut self, list: &List) {
        self.family_history
            .members
            .extend(list.family_members().map(family_member));
        if self.family_history.note.is_none() {
            self.family_history.note = NonEmptyText::from_optional(list.note_text());
        }
    }

    fn finish(mut self) -> Reduction {
        let mut diagnostics = Vec::new();

        for child in std::mem::take(&mut self.children) {
            let encounter_id = child.encounter().and_then(Reference::target_id);
            let Some(encounter_id) = encounter_id else {
                let diagnostic = ReferenceError::Missing {
                    resource_type: child.resource_type().to_string(),
                    resource_id: child.id(),
                };
                tracing::warn!(%diagnostic, "dropping resource");
                diagnostics.push(diagnostic);
                continue;
            };

            let Some(&index) = self.encounter_index.get(encounter_id) else {
                let diagnostic = ReferenceError::Unresolved {
                    resource_type: child.resource_type().to_string(),
                    resource_id: child.id(),
                    encounter_id: encounter_id.to_string(),
                };
                tracing::warn!(%diagnostic, "dropping resource");
                diagnostics.push(diagnostic);
                continue;
            };

            let builder = &mut self.encounters[index];
            match child {
                Child::Observation(obs) => attach_observation(builder, obs),
                Child::Medication(statement) => builder.medications.push(medication(statement)),
            }
        }

        let record = CanonicalRecord {
            id: self.id,
            patient: self.patient.unwrap_or_default(),
            encounters: self.encounters.into_iter().map(EncounterBuilder::build).collect(),
            family_history: self.family_history,
        };

        tracing::debug!(
            encounters = record.encounters.len(),
            dropped = diagnostics.len(),
            "reduced bundle"
        );

        Reduction {
            record,
            diagnostics,
        }
    }
}

// ============================================================================
// Resource readers
// ============================================================================

fn attach_observation(builder: &mut EncounterBuilder, obs: &Observation) {
    builder.observe_date(obs.effective());

    let status = obs
        .status
        .as_deref()
        .map(ObservationStatus::from_wire)
        .unwrap_or_default();
    let interpretation = obs
        .interpretation_code()
        .map(Interpretation::from_v3_code)
        .unwrap_or_default();
    let code = obs.code.as_ref();
    let quantity = obs.value_quantity.as_ref();
    let value = quantity.and_then(|q| q.value);
    let unit = quantity.and_then(|q| NonEmptyText::from_optional(q.unit.as_deref()));

    match obs.category_code().as_str() {
        "laboratory" => builder.observations.laboratory.push(LabObservation {
            test_name: concept_string(code, CodeableConcept::display_or_text),
            value,
            unit,
            interpretation,
            status,
        }),
        "vital-signs" => builder.observations.vital_sign.push(VitalSign {
            vital_type: concept_string(code, CodeableConcept::text_or_display),
            value,
            unit,
            interpretation,
            status,
        }),
        _ => builder.observations.symptom.push(SymptomObservation {
            symptom_name: concept_string(code, CodeableConcept::text_or_display),
            present: obs.value_boolean.unwrap_or(true),
            interpretation,
            status,
        }),
    }
}

fn medication(statement: &MedicationStatement) -> Medication {
    let dosage = statement.first_dosage();
    let repeat = dosage.and_then(fhir::Dosage::repeat);
    let adherence = statement.adherence.as_ref();

    Medication {
        name: concept_string(
            statement.medication_concept(),
            CodeableConcept::text_or_display,
        ),
        note: NonEmptyText::from_optional(statement.note.first().map(|n| n.text.as_str())),
        dosage_text: NonEmptyText::from_optional(dosage.and_then(|d| d.text.as_deref())),
        frequency: repeat.and_then(|r| r.frequency),
        period: repeat.and_then(|r| r.period),
        period_unit: repeat
            .and_then(|r| r.period_unit.as_deref())
            .map(PeriodUnit::from_wire)
            .unwrap_or(PeriodUnit::Unset),
        adherence: adherence
            .and_then(|a| a.code.as_ref())
            .and_then(CodeableConcept::first_code)
            .map(Adherence::from_wire)
            .unwrap_or(Adherence::Unset),
        reason: NonEmptyText::from_optional(
            adherence
                .and_then(|a| a.reason.as_ref())
                .and_then(CodeableConcept::display_or_text),
        )
        .or_else(|| NonEmptyText::new(DEFAULT_MEDICATION_REASON).ok()),
    }
}

/// Outcome is not read back.
fn family_member(member: &FamilyMemberHistory) -> FamilyMember {
    FamilyMember {
        relationship: concept_string(
            member.relationship.as_ref(),
            CodeableConcept::display_or_text,
        ),
        deceased: member.deceased_boolean.unwrap_or(false),
        conditions: member
            .condition
            .iter()
            .map(|c| FamilyCondition {
                name: concept_string(c.code.as_ref(), CodeableConcept::display_or_text),
                outcome: None,
            })
            .collect(),
    }
}

fn concept_string(
    concept: Option<&CodeableConcept>,
    pick: fn(&CodeableConcept) -> Option<&str>,
) -> String {
    concept.and_then(pick).unwrap_or_default().to_string()
}
