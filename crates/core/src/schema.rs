//! The canonical record JSON schema.
//!
//! One description serves two readers: the extraction prompt embeds [`record_schema`] so the
//! generator knows which keys to emit, and the parser reads exactly the keys in [`keys`].

use serde_json::{Map, Value};

/// JSON keys of the canonical record.
pub mod keys {
    pub const PATIENT: &str = "patient";
    pub const FIRST_NAME: &str = "first_name";
    pub const SECOND_NAME: &str = "second_name";
    pub const GENDER: &str = "gender";
    pub const BIRTH_DATE: &str = "birthDate";
    pub const ADDRESS: &str = "address";
    pub const ADDRESS_TEXT: &str = "text";
    pub const CITY: &str = "city";
    pub const STATE: &str = "state";
    pub const COUNTRY: &str = "country";

    pub const ENCOUNTERS: &str = "encounters";
    pub const ENCOUNTER_DATE: &str = "encounter_date";
    pub const REASON: &str = "reason";
    pub const OBSERVATION: &str = "observation";
    pub const LABORATORY: &str = "laboratory";
    pub const SYMPTOM: &str = "symptom";
    pub const VITAL_SIGN: &str = "vital_sign";
    pub const TEST_NAME: &str = "test_name";
    pub const SYMPTOM_NAME: &str = "symptom_name";
    pub const VITAL_TYPE: &str = "vital_type";
    pub const VALUE: &str = "value";
    pub const UNIT: &str = "unit";
    pub const PRESENT: &str = "present";
    pub const INTERPRETATION: &str = "interpretation";
    pub const STATUS: &str = "status";

    pub const MEDICATION: &str = "medication";
    pub const NAME: &str = "name";
    pub const NOTE: &str = "note";
    pub const DOSAGE_TEXT: &str = "dosage_text";
    pub const FREQUENCY: &str = "frequency";
    pub const PERIOD: &str = "period";
    pub const PERIOD_UNIT: &str = "period_unit";
    pub const ADHERENCE: &str = "adherence";

    pub const FAMILY_HISTORY: &str = "family_history";
    pub const MEMBERS: &str = "members";
    pub const RELATIONSHIP: &str = "relationship";
    pub const DECEASED: &str = "deceased";
    pub const CONDITIONS: &str = "conditions";
    pub const CONDITION_NAME: &str = "condition_name";
    pub const OUTCOME: &str = "outcome";

    /// Every key above.
    pub const ALL: &[&str] = &[
        PATIENT,
        FIRST_NAME,
        SECOND_NAME,
        GENDER,
        BIRTH_DATE,
        ADDRESS,
        ADDRESS_TEXT,
        CITY,
        STATE,
        COUNTRY,
        ENCOUNTERS,
        ENCOUNTER_DATE,
        REASON,
        OBSERVATION,
        LABORATORY,
        SYMPTOM,
        VITAL_SIGN,
        TEST_NAME,
        SYMPTOM_NAME,
        VITAL_TYPE,
        VALUE,
        UNIT,
        PRESENT,
        INTERPRETATION,
        STATUS,
        MEDICATION,
        NAME,
        NOTE,
        DOSAGE_TEXT,
        FREQUENCY,
        PERIOD,
        PERIOD_UNIT,
        ADHERENCE,
        FAMILY_HISTORY,
        MEMBERS,
        RELATIONSHIP,
        DECEASED,
        CONDITIONS,
        CONDITION_NAME,
        OUTCOME,
    ];
}

const INTERPRETATIONS: &str =
    "string | None - one of 'high', 'low', 'normal', 'abnormal', 'critical'; None if none apply";
const STATUSES: &str = "string - one of 'registered', 'preliminary', 'final', 'amended', \
     'corrected', 'cancelled', 'entered-in-error', 'unknown'; default 'final'";

fn object(fields: Vec<(&str, Value)>) -> Value {
    Value::Object(
        fields
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .collect::<Map<String, Value>>(),
    )
}

fn leaf(description: &str) -> Value {
    Value::String(description.to_string())
}

fn list_of(item: Value) -> Value {
    Value::Array(vec![item])
}

/// The record schema as a JSON description tree: objects for nested records, one-element
/// arrays for sequences, and description strings for leaves.
pub fn record_schema() -> Value {
    use keys::*;

    let address = object(vec![
        (ADDRESS_TEXT, leaf("string | None - full address as written")),
        (CITY, leaf("string | None - city or locality")),
        (STATE, leaf("string | None - state or region")),
        (COUNTRY, leaf("string | None - country name or ISO code")),
    ]);

    let patient = object(vec![
        (FIRST_NAME, leaf("string - given name of the patient (e.g. 'John')")),
        (SECOND_NAME, leaf("string | None - family name of the patient (e.g. 'Doe')")),
        (GENDER, leaf("string | None - one of 'male', 'female', 'other', 'unknown'")),
        (
            BIRTH_DATE,
            leaf(
                "string | None - 'YYYY-MM-DD'; when only an age is given, subtract it from the \
                 current year; None if no year can be inferred",
            ),
        ),
        (ADDRESS, address),
    ]);

    let laboratory = object(vec![
        (TEST_NAME, leaf("string - laboratory test name, as a LOINC term (e.g. 'Hemoglobin A1c')")),
        (VALUE, leaf("float | None - numeric result")),
        (UNIT, leaf("string | None - measurement unit (e.g. 'mmol/L', '%')")),
        (INTERPRETATION, leaf(INTERPRETATIONS)),
        (STATUS, leaf(STATUSES)),
    ]);

    let symptom = object(vec![
        (SYMPTOM_NAME, leaf("string - symptom or finding, as a SNOMED CT term (e.g. 'Insomnia')")),
        (PRESENT, leaf("boolean - true if present, false if explicitly absent")),
        (INTERPRETATION, leaf(INTERPRETATIONS)),
        (STATUS, leaf(STATUSES)),
    ]);

    let vital_sign = object(vec![
        (VITAL_TYPE, leaf("string - type of vital sign (e.g. 'Body temperature', 'Body weight')")),
        (VALUE, leaf("float | None - numeric value")),
        (UNIT, leaf("string | None - unit of measurement (e.g. 'kg', 'Cel', '%')")),
        (INTERPRETATION, leaf(INTERPRETATIONS)),
        (STATUS, leaf(STATUSES)),
    ]);

    let medication = object(vec![
        (NAME, leaf("string - medication name (e.g. 'Amoxicillin')")),
        (NOTE, leaf("string | None - free-text note (e.g. 'sometimes misses doses')")),
        (DOSAGE_TEXT, leaf("string | None - dosage as written (e.g. 'one capsule three times daily')")),
        (FREQUENCY, leaf("integer | None - doses per period (e.g. 3)")),
        (PERIOD, leaf("number | None - length of the period (e.g. 1 for 'per day')")),
        (
            PERIOD_UNIT,
            leaf("string | None - one of 's', 'min', 'h', 'd', 'wk', 'mo', 'a'"),
        ),
        (
            ADHERENCE,
            leaf(
                "string | None - one of 'taking', 'taking-as-directed', 'taking-not-as-directed', \
                 'not-taking', 'on-hold', 'on-hold-as-directed', 'on-hold-not-as-directed', \
                 'stopped', 'stopped-as-directed', 'stopped-not-as-directed', 'unknown'",
            ),
        ),
        (REASON, leaf("string | None - reason for taking or not taking the medication")),
    ]);

    let encounter = object(vec![
        (
            ENCOUNTER_DATE,
            leaf("string | None - 'YYYY-MM-DD' or 'YYYY-MM-DDTHH:MM:SSZ'; today for the current encounter"),
        ),
        (REASON, leaf("string | None - reason for the encounter")),
        (
            OBSERVATION,
            object(vec![
                (LABORATORY, list_of(laboratory)),
                (SYMPTOM, list_of(symptom)),
                (VITAL_SIGN, list_of(vital_sign)),
            ]),
        ),
        (MEDICATION, list_of(medication)),
    ]);

    let member = object(vec![
        (RELATIONSHIP, leaf("string - relationship to the patient (e.g. 'Mother')")),
        (DECEASED, leaf("boolean - true only if explicitly stated deceased")),
        (
            CONDITIONS,
            list_of(object(vec![
                (CONDITION_NAME, leaf("string - condition or disease name")),
                (OUTCOME, leaf("string | None - 'Died', 'Recovered' or None")),
            ])),
        ),
    ]);

    object(vec![
        (PATIENT, patient),
        (ENCOUNTERS, list_of(encounter)),
        (
            FAMILY_HISTORY,
            object(vec![
                (MEMBERS, list_of(member)),
                (NOTE, leaf("string | None - general note about the family history")),
            ]),
        ),
    ])
}

/// [`record_schema`] rendered as indented JSON for prompts.
pub fn schema_text() -> String {
    // A `Value` built from string keys always serialises.
    serde_json::to_string_pretty(&record_schema()).unwrap_or_default()
}

#[cfg(test)]
pub(crate) fn collect_keys(value: &Value, out: &mut std::collections::BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                out.insert(key.clone());
                collect_keys(child, out);
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_keys(item, out)),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn schema_tree_and_key_constants_agree() {
        let mut in_tree = BTreeSet::new();
        collect_keys(&record_schema(), &mut in_tree);
        let constants: BTreeSet<String> = keys::ALL.iter().map(|k| k.to_string()).collect();

        assert_eq!(in_tree, constants);
    }

    #[test]
    fn sequences_are_single_item_arrays() {
        let schema = record_schema();
        assert_eq!(schema[keys::ENCOUNTERS].as_array().map(Vec::len), Some(1));
        assert!(schema[keys::ENCOUNTERS][0][keys::OBSERVATION][keys::LABORATORY].is_array());
        assert!(schema[keys::FAMILY_HISTORY][keys::MEMBERS][0][keys::CONDITIONS].is_array());
    }

    #[test]
    fn schema_text_keeps_declaration_order() {
        let text = schema_text();
        let patient = text.find("\"patient\"").unwrap();
        let encounters = text.find("\"encounters\"").unwrap();
        let family = text.find("\"family_history\"").unwrap();
        assert!(patient < encounters && encounters < family);
    }
}
