//! Canonical record → transaction bundle.
//!
//! Responsibilities:
//! - Mint a resource id per created resource (the Patient reuses `record.id` when set)
//! - Resolve terminology codes for observations, medications and family history
//! - Link every child to the Patient and to its Encounter
//!
//! Entry order is fixed: Patient, Encounters, Observations, family history List,
//! MedicationStatements. Each entry carries `fullUrl: urn:uuid:<id>` and a `POST` request.
//!
//! Assembly is all-or-nothing: a terminology error aborts before any bundle is returned.

use crate::constants::{
    CATEGORY_EXAM, CATEGORY_LABORATORY, CATEGORY_VITAL_SIGNS, DEFAULT_MEDICATION_REASON,
    ENCOUNTER_IDENTIFIER_USE, ENCOUNTER_PRIORITY_CODE, ENCOUNTER_PRIORITY_DISPLAY,
    ENCOUNTER_STATUS, ENCOUNTER_TYPE_CODE, ENCOUNTER_TYPE_DISPLAY, FAMILY_HISTORY_CODE,
    FAMILY_HISTORY_DISPLAY, MEDICATION_STATEMENT_STATUS, NOT_TAKING_REASON_CODE,
};
use crate::enums::{Interpretation, ObservationStatus};
use crate::error::CoreResult;
use crate::parse::parse_record;
use crate::record::{self, CanonicalRecord, FamilyMember, Medication};
use crate::terminology::{ResolvedCode, TerminologyResolver, TerminologySearch, Vocabulary};
use agent_types::NonEmptyText;
use agent_uuid::{IdentifierStamp, ResourceId};
use chrono::{DateTime, SecondsFormat, Utc};
use fhir::{
    systems, Address, Annotation, Bundle, BundleEntry, CodeableConcept, CodeableReference,
    Coding, Dosage, EncounterReason, FamilyMemberCondition, FamilyMemberHistory, HumanName,
    Identifier, List, ListEntry, MedicationAdherence, MedicationStatement, Observation, Patient,
    Period, Quantity, Reference, Resource, Timing, TimingRepeat,
};
use serde_json::Value;

/// An assembled bundle and the id of its Patient resource.
#[derive(Clone, Debug, PartialEq)]
pub struct AssembledBundle {
    pub bundle: Bundle,
    pub patient_id: ResourceId,
}

/// Builds transaction bundles from canonical records.
pub struct Assembler<'a> {
    resolver: TerminologyResolver<'a>,
    now: DateTime<Utc>,
}

/// Shared per-record linking context.
struct Links {
    patient_reference: String,
    patient_display: Option<String>,
}

impl<'a> Assembler<'a> {
    pub fn new(search: &'a dyn TerminologySearch) -> Self {
        Self {
            resolver: TerminologyResolver::new(search),
            now: Utc::now(),
        }
    }

    /// Pin the assembly timestamp (identifier stamps and undated effective times).
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    /// Parse an extracted JSON value and assemble it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Validation`] from parsing or
    /// [`crate::CoreError::Resolution`] from terminology lookup.
    pub fn assemble_value(&self, value: &Value) -> CoreResult<AssembledBundle> {
        let record = parse_record(value)?;
        self.assemble(&record)
    }

    /// Assemble a transaction bundle from a canonical record.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::Resolution`] if a LOINC lookup fails hard.
    pub fn assemble(&self, record: &CanonicalRecord) -> CoreResult<AssembledBundle> {
        let patient_id = record.id.clone().unwrap_or_default();
        let links = Links {
            patient_reference: patient_id.reference(Patient::RESOURCE_TYPE),
            patient_display: record.patient.full_name(),
        };

        let mut encounters = Vec::with_capacity(record.encounters.len());
        let mut observations = Vec::new();
        let mut medications = Vec::new();

        for encounter in &record.encounters {
            let encounter_id = ResourceId::new();
            let effective = encounter
                .date
                .as_ref()
                .map(|d| d.as_str().to_string())
                .unwrap_or_else(|| self.now.to_rfc3339_opts(SecondsFormat::Secs, true));
            let child = Child {
                links: &links,
                encounter_reference: encounter_id.reference(fhir::Encounter::RESOURCE_TYPE),
                effective: &effective,
            };

            encounters.push(entry(
                &encounter_id,
                Resource::Encounter(self.encounter(&encounter_id, encounter, &links, &patient_id)),
            ));

            for lab in &encounter.observations.laboratory {
                let (id, obs) = self.laboratory(lab, &child)?;
                observations.push(entry(&id, Resource::Observation(Box::new(obs))));
            }
            for symptom in &encounter.observations.symptom {
                let (id, obs) = self.symptom(symptom, &child)?;
                observations.push(entry(&id, Resource::Observation(Box::new(obs))));
            }
            for vital in &encounter.observations.vital_sign {
                let (id, obs) = self.vital_sign(vital, &child)?;
                observations.push(entry(&id, Resource::Observation(Box::new(obs))));
            }
            for medication in &encounter.medications {
                let (id, statement) = self.medication(medication, &child)?;
                medications.push(entry(&id, Resource::MedicationStatement(Box::new(statement))));
            }
        }

        let mut bundle = Bundle::transaction();
        bundle.entry.push(entry(&patient_id, Resource::Patient(patient(record, &patient_id))));
        bundle.entry.extend(encounters);
        bundle.entry.extend(observations);
        if let Some((id, list)) = self.family_history(record, &links)? {
            bundle.entry.push(entry(&id, Resource::List(list)));
        }
        bundle.entry.extend(medications);

        tracing::info!(
            patient_id = %patient_id,
            entries = bundle.entry.len(),
            "assembled bundle"
        );

        Ok(AssembledBundle { bundle, patient_id })
    }

    // ========================================================================
    // Encounter
    // ========================================================================

    fn encounter(
        &self,
        id: &ResourceId,
        encounter: &record::Encounter,
        links: &Links,
        patient_id: &ResourceId,
    ) -> fhir::Encounter {
        let label = links
            .patient_display
            .clone()
            .unwrap_or_else(|| patient_id.to_string());

        let mut subject = Reference::to(&links.patient_reference);
        subject.display = links.patient_display.clone();

        let mut resource = fhir::Encounter::new(id.to_string());
        resource.identifier = vec![Identifier {
            use_type: Some(ENCOUNTER_IDENTIFIER_USE.to_string()),
            value: Some(format!(
                "Encounter_{label}_{}",
                IdentifierStamp::at(self.now)
            )),
        }];
        resource.status = Some(ENCOUNTER_STATUS.to_string());
        resource.priority = Some(CodeableConcept::coded(Coding::new(
            systems::SNOMED_CT,
            ENCOUNTER_PRIORITY_CODE,
            ENCOUNTER_PRIORITY_DISPLAY,
        )));
        resource.encounter_type = vec![CodeableConcept::coded(Coding::new(
            systems::SNOMED_CT,
            ENCOUNTER_TYPE_CODE,
            ENCOUNTER_TYPE_DISPLAY,
        ))];
        resource.subject = Some(subject);
        if let Some(reason) = &encounter.reason {
            resource.reason = vec![EncounterReason::text(reason.as_str())];
        }
        resource
    }

    // ========================================================================
    // Observations
    // ========================================================================

    fn laboratory(
        &self,
        lab: &record::LabObservation,
        child: &Child<'_>,
    ) -> CoreResult<(ResourceId, Observation)> {
        let code = self.resolver.resolve_or_unknown(&lab.test_name, Vocabulary::Loinc)?;
        let (id, mut obs) = child.observation(CATEGORY_LABORATORY, &code, &lab.test_name, lab.status);
        obs.effective_date_time = Some(child.effective.to_string());
        obs.value_quantity = quantity(lab.value, lab.unit.as_ref());
        obs.interpretation = interpretation(lab.interpretation, false);
        Ok((id, obs))
    }

    fn vital_sign(
        &self,
        vital: &record::VitalSign,
        child: &Child<'_>,
    ) -> CoreResult<(ResourceId, Observation)> {
        let code = self.resolver.resolve_or_unknown(&vital.vital_type, Vocabulary::Loinc)?;
        let (id, mut obs) =
            child.observation(CATEGORY_VITAL_SIGNS, &code, &vital.vital_type, vital.status);
        obs.effective_date_time = Some(child.effective.to_string());
        obs.value_quantity = quantity(vital.value, vital.unit.as_ref());
        obs.interpretation = interpretation(vital.interpretation, true);
        Ok((id, obs))
    }

    fn symptom(
        &self,
        symptom: &record::SymptomObservation,
        child: &Child<'_>,
    ) -> CoreResult<(ResourceId, Observation)> {
        let code = self
            .resolver
            .resolve_or_unknown(&symptom.symptom_name, Vocabulary::SnomedCt)?;
        let (id, mut obs) =
            child.observation(CATEGORY_EXAM, &code, &symptom.symptom_name, symptom.status);
        obs.effective_period = Some(Period {
            start: Some(child.effective.to_string()),
            end: None,
        });
        obs.value_boolean = Some(symptom.present);
        obs.interpretation = interpretation(symptom.interpretation, true);
        Ok((id, obs))
    }

    // ========================================================================
    // Medication
    // ========================================================================

    fn medication(
        &self,
        medication: &Medication,
        child: &Child<'_>,
    ) -> CoreResult<(ResourceId, MedicationStatement)> {
        let code = self
            .resolver
            .resolve_or_unknown(&medication.name, Vocabulary::SnomedCt)?;
        let id = ResourceId::new();

        let mut statement = MedicationStatement::new(id.to_string());
        statement.status = Some(MEDICATION_STATEMENT_STATUS.to_string());
        statement.medication = Some(CodeableReference {
            concept: Some(concept(&code, &medication.name)),
            reference: None,
        });
        statement.subject = Some(Reference::to(&child.links.patient_reference));
        statement.encounter = Some(Reference::to(&child.encounter_reference));
        statement.effective_date_time = Some(child.effective.to_string());
        statement.information_source = vec![Reference::to(&child.links.patient_reference)];

        if let Some(note) = &medication.note {
            statement.note = vec![Annotation::new(note.as_str())];
        }

        let schedule = medication.schedule();
        if medication.dosage_text.is_some() || schedule.is_some() {
            statement.dosage = vec![Dosage {
                text: medication.dosage_text.as_ref().map(|t| t.as_str().to_string()),
                timing: schedule.map(|(frequency, period)| Timing {
                    repeat: Some(TimingRepeat {
                        frequency: Some(frequency),
                        period: Some(period),
                        period_unit: medication.period_unit.code().map(str::to_string),
                    }),
                }),
            }];
        }

        if let (Some(adherence_code), Some(display)) =
            (medication.adherence.code(), medication.adherence.display())
        {
            let reason = (!medication.adherence.is_taking()).then(|| {
                let display = medication
                    .reason
                    .as_ref()
                    .map(NonEmptyText::as_str)
                    .unwrap_or(DEFAULT_MEDICATION_REASON);
                CodeableConcept::coded(Coding::new(
                    systems::SNOMED_CT,
                    NOT_TAKING_REASON_CODE,
                    display,
                ))
            });
            statement.adherence = Some(MedicationAdherence {
                code: Some(CodeableConcept::coded(Coding::new(
                    systems::MEDICATION_STATEMENT_ADHERENCE,
                    adherence_code,
                    display,
                ))),
                reason,
            });
        }

        Ok((id, statement))
    }

    // ========================================================================
    // Family history
    // ========================================================================

    fn family_history(
        &self,
        record: &CanonicalRecord,
        links: &Links,
    ) -> CoreResult<Option<(ResourceId, List)>> {
        let history = &record.family_history;
        if history.members.is_empty() {
            return Ok(None);
        }

        let id = ResourceId::new();
        let mut list = List::new(id.to_string());
        list.status = Some("current".to_string());
        list.mode = Some("snapshot".to_string());
        list.code = Some(CodeableConcept::coded(Coding::new(
            systems::LOINC,
            FAMILY_HISTORY_CODE,
            FAMILY_HISTORY_DISPLAY,
        )));
        list.subject = vec![Reference::to(&links.patient_reference)];
        if let Some(note) = &history.note {
            list.note = vec![Annotation::new(note.as_str())];
        }

        for (index, member) in history.members.iter().enumerate() {
            let local_id = format!("fmh-{}", index + 1);
            let resource = self.family_member(member, &local_id, links)?;
            list.contained.push(Resource::FamilyMemberHistory(resource));
            list.entry.push(ListEntry {
                item: Reference::to(format!("#{local_id}")),
            });
        }

        Ok(Some((id, list)))
    }

    fn family_member(
        &self,
        member: &FamilyMember,
        local_id: &str,
        links: &Links,
    ) -> CoreResult<FamilyMemberHistory> {
        let relationship = self
            .resolver
            .resolve_or_unknown(&member.relationship, Vocabulary::SnomedCt)?;

        let mut resource = FamilyMemberHistory::new(local_id);
        resource.status = Some("completed".to_string());
        resource.patient = Some(Reference::to(&links.patient_reference));
        resource.relationship = Some(CodeableConcept::coded(relationship.coding()));
        resource.deceased_boolean = Some(member.deceased);

        for condition in &member.conditions {
            let code = self
                .resolver
                .resolve_or_unknown(&condition.name, Vocabulary::SnomedCt)?;
            let outcome = match &condition.outcome {
                Some(outcome) => Some(CodeableConcept::coded(
                    self.resolver
                        .resolve_or_unknown(outcome.as_str(), Vocabulary::SnomedCt)?
                        .coding(),
                )),
                None => None,
            };
            resource.condition.push(FamilyMemberCondition {
                code: Some(CodeableConcept::coded(code.coding())),
                outcome,
            });
        }

        Ok(resource)
    }
}

/// Linking context for the children of one encounter.
struct Child<'l> {
    links: &'l Links,
    encounter_reference: String,
    effective: &'l str,
}

impl Child<'_> {
    /// Observation skeleton shared by the three observation kinds.
    fn observation(
        &self,
        (category_code, category_display): (&str, &str),
        code: &ResolvedCode,
        name: &str,
        status: ObservationStatus,
    ) -> (ResourceId, Observation) {
        let id = ResourceId::new();
        let mut obs = Observation::new(id.to_string());
        obs.status = Some(status.as_str().to_string());
        obs.category = vec![CodeableConcept::coded(Coding::new(
            systems::OBSERVATION_CATEGORY,
            category_code,
            category_display,
        ))
        .with_text(category_display)];
        obs.code = Some(concept(code, name));
        obs.subject = Some(Reference::to(&self.links.patient_reference));
        obs.encounter = Some(Reference::to(&self.encounter_reference));
        if let Some(note) = code.definition_note() {
            obs.note = vec![Annotation::new(note)];
        }
        (id, obs)
    }
}

fn entry(id: &ResourceId, resource: Resource) -> BundleEntry {
    let url = resource.resource_type().to_string();
    BundleEntry::post(id.urn(), resource, url)
}

fn patient(record: &CanonicalRecord, id: &ResourceId) -> Patient {
    let info = &record.patient;
    let mut patient = Patient::new(id.to_string());

    let name = HumanName {
        family: info.second_name.as_ref().map(|n| n.as_str().to_string()),
        given: info
            .first_name
            .iter()
            .map(|n| n.as_str().to_string())
            .collect(),
    };
    if name.family.is_some() || !name.given.is_empty() {
        patient.name = vec![name];
    }

    patient.gender = info.gender.code().map(str::to_string);
    patient.birth_date = info.birth_date.as_ref().map(|d| d.as_str().to_string());

    if !info.address.is_empty() {
        let part = |p: &Option<NonEmptyText>| p.as_ref().map(|t| t.as_str().to_string());
        patient.address = vec![Address {
            text: part(&info.address.text),
            city: part(&info.address.city),
            state: part(&info.address.state),
            country: part(&info.address.country),
        }];
    }

    patient
}

/// Coded concept with the source term as text (omitted when blank).
fn concept(code: &ResolvedCode, term: &str) -> CodeableConcept {
    let concept = CodeableConcept::coded(code.coding());
    if term.trim().is_empty() {
        concept
    } else {
        concept.with_text(term)
    }
}

fn quantity(value: Option<f64>, unit: Option<&NonEmptyText>) -> Option<Quantity> {
    let (value, unit) = (value?, unit?);
    Some(Quantity {
        value: Some(value),
        unit: Some(unit.as_str().to_string()),
        system: Some(systems::UCUM.to_string()),
        code: Some(unit.as_str().to_string()),
    })
}

fn interpretation(interpretation: Interpretation, with_text: bool) -> Vec<CodeableConcept> {
    let (Some(code), Some(display)) = (interpretation.v3_code(), interpretation.display()) else {
        return Vec::new();
    };
    let concept =
        CodeableConcept::coded(Coding::new(systems::OBSERVATION_INTERPRETATION, code, display));
    vec![if with_text {
        concept.with_text(display)
    } else {
        concept
    }]
}
