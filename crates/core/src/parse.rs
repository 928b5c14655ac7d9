//! Tolerant validation of extracted JSON into a [`CanonicalRecord`].
//!
//! Leniency rules:
//! - unknown keys are ignored; absent or `null` leaves stay empty
//! - a single object where a list is expected counts as a one-element list
//! - numeric strings (`"6.1"`) and boolean spellings (`"yes"`, `0`/`1`) are coerced
//! - vocabulary fields never fail; see [`crate::enums`]
//!
//! Structural mismatches (an object where text is expected, a non-numeric string for a number,
//! a scalar where an object or list is expected) fail with [`CoreError::Validation`] carrying
//! the dotted path of the offending value, e.g. `encounters.0.observation.laboratory.1.value`.

use crate::enums::{Adherence, Gender, Interpretation, ObservationStatus, PeriodUnit};
use crate::error::{CoreError, CoreResult};
use crate::record::{
    CanonicalRecord, Encounter, FamilyCondition, FamilyHistory, FamilyMember, LabObservation,
    Medication, Observations, PatientAddress, PatientInfo, SymptomObservation, VitalSign,
};
use crate::schema::keys;
use agent_types::NonEmptyText;
use serde_json::{Map, Value};

type Object = Map<String, Value>;

/// Validate and normalise an extracted JSON value into a canonical record.
///
/// The returned record has no id; one is assigned at assembly.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] on a structural mismatch.
pub fn parse_record(value: &Value) -> CoreResult<CanonicalRecord> {
    let root = match value {
        Value::Object(map) => map,
        other => {
            return Err(CoreError::validation(
                "",
                format!("expected an object, found {}", kind(other)),
            ))
        }
    };

    let patient = match object(root.get(keys::PATIENT), keys::PATIENT)? {
        Some(obj) => parse_patient(obj, keys::PATIENT)?,
        None => PatientInfo::default(),
    };

    let encounters = objects(root.get(keys::ENCOUNTERS), keys::ENCOUNTERS)?
        .into_iter()
        .map(|(path, obj)| parse_encounter(obj, &path))
        .collect::<CoreResult<Vec<_>>>()?;

    let family_history = match object(root.get(keys::FAMILY_HISTORY), keys::FAMILY_HISTORY)? {
        Some(obj) => parse_family_history(obj, keys::FAMILY_HISTORY)?,
        None => FamilyHistory::default(),
    };

    Ok(CanonicalRecord {
        id: None,
        patient,
        encounters,
        family_history,
    })
}

// ============================================================================
// Sections
// ============================================================================

fn parse_patient(obj: &Object, path: &str) -> CoreResult<PatientInfo> {
    let address_path = join(path, keys::ADDRESS);
    let address = match obj.get(keys::ADDRESS) {
        // Some extractions give the address as a single line.
        Some(Value::String(line)) => PatientAddress {
            text: NonEmptyText::new(line).ok(),
            ..PatientAddress::default()
        },
        other => match object(other, &address_path)? {
            Some(addr) => PatientAddress {
                text: text(addr, keys::ADDRESS_TEXT, &address_path)?,
                city: text(addr, keys::CITY, &address_path)?,
                state: text(addr, keys::STATE, &address_path)?,
                country: text(addr, keys::COUNTRY, &address_path)?,
            },
            None => PatientAddress::default(),
        },
    };

    Ok(PatientInfo {
        first_name: text(obj, keys::FIRST_NAME, path)?,
        second_name: text(obj, keys::SECOND_NAME, path)?,
        gender: vocabulary(obj, keys::GENDER, Gender::Unset, Gender::from_wire),
        birth_date: text(obj, keys::BIRTH_DATE, path)?,
        address,
    })
}

fn parse_encounter(obj: &Object, path: &str) -> CoreResult<Encounter> {
    let observation_path = join(path, keys::OBSERVATION);
    let observations = match object(obj.get(keys::OBSERVATION), &observation_path)? {
        Some(observation) => parse_observations(observation, &observation_path)?,
        None => Observations::default(),
    };

    let medications = objects(obj.get(keys::MEDICATION), &join(path, keys::MEDICATION))?
        .into_iter()
        .map(|(item_path, item)| parse_medication(item, &item_path))
        .collect::<CoreResult<Vec<_>>>()?;

    Ok(Encounter {
        date: text(obj, keys::ENCOUNTER_DATE, path)?,
        reason: text(obj, keys::REASON, path)?,
        observations,
        medications,
    })
}

fn parse_observations(obj: &Object, path: &str) -> CoreResult<Observations> {
    let laboratory = objects(obj.get(keys::LABORATORY), &join(path, keys::LABORATORY))?
        .into_iter()
        .map(|(p, item)| {
            Ok(LabObservation {
                test_name: name(item, keys::TEST_NAME, &p)?,
                value: number(item, keys::VALUE, &p)?,
                unit: text(item, keys::UNIT, &p)?,
                interpretation: vocabulary(
                    item,
                    keys::INTERPRETATION,
                    Interpretation::Unset,
                    Interpretation::from_wire,
                ),
                status: status(item),
            })
        })
        .collect::<CoreResult<Vec<_>>>()?;

    let symptom = objects(obj.get(keys::SYMPTOM), &join(path, keys::SYMPTOM))?
        .into_iter()
        .map(|(p, item)| {
            Ok(SymptomObservation {
                symptom_name: name(item, keys::SYMPTOM_NAME, &p)?,
                present: boolean(item, keys::PRESENT, &p)?.unwrap_or(true),
                interpretation: vocabulary(
                    item,
                    keys::INTERPRETATION,
                    Interpretation::Abnormal,
                    Interpretation::from_wire,
                ),
                status: status(item),
            })
        })
        .collect::<CoreResult<Vec<_>>>()?;

    let vital_sign = objects(obj.get(keys::VITAL_SIGN), &join(path, keys::VITAL_SIGN))?
        .into_iter()
        .map(|(p, item)| {
            Ok(VitalSign {
                vital_type: name(item, keys::VITAL_TYPE, &p)?,
                value: number(item, keys::VALUE, &p)?,
                unit: text(item, keys::UNIT, &p)?,
                interpretation: vocabulary(
                    item,
                    keys::INTERPRETATION,
                    Interpretation::Unset,
                    Interpretation::from_wire,
                ),
                status: status(item),
            })
        })
        .collect::<CoreResult<Vec<_>>>()?;

    Ok(Observations {
        laboratory,
        symptom,
        vital_sign,
    })
}

fn parse_medication(obj: &Object, path: &str) -> CoreResult<Medication> {
    let defaults = Medication::default();
    let reason = match obj.get(keys::REASON) {
        None => defaults.reason,
        Some(_) => text(obj, keys::REASON, path)?,
    };

    Ok(Medication {
        name: name(obj, keys::NAME, path)?,
        note: text(obj, keys::NOTE, path)?,
        dosage_text: text(obj, keys::DOSAGE_TEXT, path)?,
        frequency: integer(obj, keys::FREQUENCY, path)?,
        period: number(obj, keys::PERIOD, path)?,
        period_unit: vocabulary(
            obj,
            keys::PERIOD_UNIT,
            defaults.period_unit,
            PeriodUnit::from_wire,
        ),
        adherence: vocabulary(obj, keys::ADHERENCE, defaults.adherence, Adherence::from_wire),
        reason,
    })
}

fn parse_family_history(obj: &Object, path: &str) -> CoreResult<FamilyHistory> {
    let members = objects(obj.get(keys::MEMBERS), &join(path, keys::MEMBERS))?
        .into_iter()
        .map(|(member_path, member)| {
            let conditions = objects(
                member.get(keys::CONDITIONS),
                &join(&member_path, keys::CONDITIONS),
            )?
            .into_iter()
            .map(|(p, condition)| {
                Ok(FamilyCondition {
                    name: name(condition, keys::CONDITION_NAME, &p)?,
                    outcome: text(condition, keys::OUTCOME, &p)?,
                })
            })
            .collect::<CoreResult<Vec<_>>>()?;

            Ok(FamilyMember {
                relationship: name(member, keys::RELATIONSHIP, &member_path)?,
                deceased: boolean(member, keys::DECEASED, &member_path)?.unwrap_or(false),
                conditions,
            })
        })
        .collect::<CoreResult<Vec<_>>>()?;

    Ok(FamilyHistory {
        members,
        note: text(obj, keys::NOTE, path)?,
    })
}

// ============================================================================
// Leaf readers
// ============================================================================

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn object<'a>(value: Option<&'a Value>, path: &str) -> CoreResult<Option<&'a Object>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Object(map)) => Ok(Some(map)),
        Some(other) => Err(CoreError::validation(
            path,
            format!("expected an object, found {}", kind(other)),
        )),
    }
}

/// The objects of a list field, each paired with its path. `null` items are skipped.
fn objects<'a>(value: Option<&'a Value>, path: &str) -> CoreResult<Vec<(String, &'a Object)>> {
    let items: Vec<&Value> = match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single @ Value::Object(_)) => vec![single],
        Some(other) => {
            return Err(CoreError::validation(
                path,
                format!("expected an array, found {}", kind(other)),
            ))
        }
    };

    let mut out = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let item_path = join(path, &index.to_string());
        if let Some(obj) = object(Some(item), &item_path)? {
            out.push((item_path, obj));
        }
    }
    Ok(out)
}

fn text(obj: &Object, key: &str, path: &str) -> CoreResult<Option<NonEmptyText>> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(NonEmptyText::new(s).ok()),
        Some(Value::Number(n)) => Ok(NonEmptyText::new(n.to_string()).ok()),
        Some(Value::Bool(b)) => Ok(NonEmptyText::new(b.to_string()).ok()),
        Some(other) => Err(CoreError::validation(
            &join(path, key),
            format!("expected a string, found {}", kind(other)),
        )),
    }
}

/// Required name field: empty when missing.
fn name(obj: &Object, key: &str, path: &str) -> CoreResult<String> {
    Ok(text(obj, key, path)?
        .map(NonEmptyText::into_string)
        .unwrap_or_default())
}

fn number(obj: &Object, key: &str, path: &str) -> CoreResult<Option<f64>> {
    let invalid = |found: String| {
        CoreError::validation(&join(path, key), format!("expected a number, found {found}"))
    };

    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            match trimmed.parse::<f64>() {
                Ok(parsed) if parsed.is_finite() => Ok(Some(parsed)),
                _ => Err(invalid(format!("{s:?}"))),
            }
        }
        Some(other) => Err(invalid(kind(other).to_string())),
    }
}

fn integer(obj: &Object, key: &str, path: &str) -> CoreResult<Option<u32>> {
    match number(obj, key, path)? {
        None => Ok(None),
        Some(n) if n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX) => Ok(Some(n as u32)),
        Some(n) => Err(CoreError::validation(
            &join(path, key),
            format!("expected a non-negative whole number, found {n}"),
        )),
    }
}

fn boolean(obj: &Object, key: &str, path: &str) -> CoreResult<Option<bool>> {
    let invalid = |found: String| {
        CoreError::validation(&join(path, key), format!("expected a boolean, found {found}"))
    };

    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(v) if v == 0.0 => Ok(Some(false)),
            Some(v) if v == 1.0 => Ok(Some(true)),
            _ => Err(invalid(n.to_string())),
        },
        Some(Value::String(s)) => match s.trim().to_lowercase().as_str() {
            "" => Ok(None),
            "true" | "yes" | "y" | "1" | "present" => Ok(Some(true)),
            "false" | "no" | "n" | "0" | "absent" => Ok(Some(false)),
            _ => Err(invalid(format!("{s:?}"))),
        },
        Some(other) => Err(invalid(kind(other).to_string())),
    }
}

/// Vocabulary field: `when_absent` if the key is missing, the type default (unset) for `null`
/// or non-string values, otherwise the normalised text.
fn vocabulary<T: Default>(obj: &Object, key: &str, when_absent: T, from_wire: fn(&str) -> T) -> T {
    match obj.get(key) {
        None => when_absent,
        Some(Value::String(s)) => from_wire(s),
        Some(_) => T::default(),
    }
}

fn status(obj: &Object) -> ObservationStatus {
    vocabulary(
        obj,
        keys::STATUS,
        ObservationStatus::Final,
        ObservationStatus::from_wire,
    )
}
