//! Plain-text patient summary of a canonical record.
//!
//! Output is deterministic for a given record and reference date. Missing values render as
//! `N/A`; numbers use their shortest form (`1`, not `1.0`).

use crate::constants::UNKNOWN_NAME;
use crate::enums::PeriodUnit;
use crate::record::{CanonicalRecord, Encounter, Medication, PatientAddress};
use agent_types::NonEmptyText;
use chrono::{Datelike, NaiveDate, Utc};

const NOT_AVAILABLE: &str = "N/A";

/// Render a summary, computing the age against today's date (UTC).
pub fn render_summary(record: &CanonicalRecord) -> String {
    render_summary_at(record, Utc::now().date_naive())
}

/// Render a summary, computing the age against `today`.
pub fn render_summary_at(record: &CanonicalRecord, today: NaiveDate) -> String {
    let patient = &record.patient;
    let mut lines = vec![
        "Patient Summary".to_string(),
        "---------------".to_string(),
        format!(
            "Patient ID: {}",
            record
                .id
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        ),
        format!(
            "Name: {}",
            patient.full_name().unwrap_or_else(|| NOT_AVAILABLE.to_string())
        ),
        format!("Gender: {}", patient.gender.code().unwrap_or(NOT_AVAILABLE)),
        format!(
            "Age: {}",
            patient
                .birth_date
                .as_ref()
                .and_then(|d| age(d.as_str(), today))
                .map(|a| a.to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        ),
        format!("Birth Date: {}", or_na(patient.birth_date.as_ref())),
    ];
    lines.extend(address(&patient.address));

    lines.push(String::new());
    lines.push("Encounters:".to_string());
    for (index, encounter) in record.encounters.iter().enumerate() {
        lines.push(String::new());
        encounter_block(&mut lines, index + 1, encounter);
    }

    lines.push(String::new());
    lines.push("Family History:".to_string());
    for member in &record.family_history.members {
        lines.push(format!(
            "  - {} (Deceased: {})",
            name_or_unknown(&member.relationship),
            if member.deceased { "Yes" } else { "No" }
        ));
        for condition in &member.conditions {
            lines.push(format!("    • Condition: {}", name_or_unknown(&condition.name)));
        }
    }
    if let Some(note) = &record.family_history.note {
        lines.push(format!("  Note: {note}"));
    }

    lines.join("\n")
}

/// Whole years between `birth_date` (ISO date, optionally with a time part) and `today`.
fn age(birth_date: &str, today: NaiveDate) -> Option<i32> {
    let date_part = birth_date.get(..10).unwrap_or(birth_date);
    let born = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    let had_birthday = (today.month(), today.day()) >= (born.month(), born.day());
    let years = today.year() - born.year() - i32::from(!had_birthday);
    (years >= 0).then_some(years)
}

fn name_or_unknown(name: &str) -> &str {
    let name = name.trim();
    if name.is_empty() {
        UNKNOWN_NAME
    } else {
        name
    }
}

fn address(address: &PatientAddress) -> Vec<String> {
    if address.is_empty() {
        return vec![format!("Address: {NOT_AVAILABLE}")];
    }
    vec![
        format!("Address: {}", or_na(address.text.as_ref())),
        format!("  City: {}", or_na(address.city.as_ref())),
        format!("  State: {}", or_na(address.state.as_ref())),
        format!("  Country: {}", or_na(address.country.as_ref())),
    ]
}

fn encounter_block(lines: &mut Vec<String>, number: usize, encounter: &Encounter) {
    lines.push(format!("Encounter {number}:"));
    lines.push(format!("  Date: {}", or_na(encounter.date.as_ref())));
    lines.push(format!("  Reason: {}", or_na(encounter.reason.as_ref())));

    let observations = &encounter.observations;
    lines.push("  Symptoms:".to_string());
    for symptom in &observations.symptom {
        lines.push(format!(
            "    - {}: {}",
            name_or_unknown(&symptom.symptom_name),
            if symptom.present { "Present" } else { "Absent" }
        ));
    }

    lines.push("  Vital Signs:".to_string());
    for vital in &observations.vital_sign {
        if let (Some(value), Some(unit)) = (vital.value, &vital.unit) {
            lines.push(format!("    - {}: {value} {unit}", name_or_unknown(&vital.vital_type)));
        }
    }

    lines.push("  Laboratory Results:".to_string());
    for lab in &observations.laboratory {
        lines.push(format!("    - {}:", name_or_unknown(&lab.test_name)));
        match lab.value {
            Some(value) => {
                lines.push(format!("      Value: {value}"));
                lines.push(format!("      Unit: {}", or_na(lab.unit.as_ref())));
            }
            None => lines.push("      Not available".to_string()),
        }
    }

    lines.push("  Medications:".to_string());
    for medication in &encounter.medications {
        lines.push(format!("    - {}:", name_or_unknown(&medication.name)));
        lines.push(format!("      Dosage: {}", or_na(medication.dosage_text.as_ref())));
        lines.push(format!("      Frequency: {}", frequency_phrase(medication)));
        lines.push(format!("      Reason: {}", or_na(medication.reason.as_ref())));
    }
}

/// `"<frequency>x every <period> <unit>"`, or `"as needed"` without a full schedule.
pub fn frequency_phrase(medication: &Medication) -> String {
    match (medication.frequency, medication.period) {
        (Some(frequency), Some(period)) if frequency > 0 && period > 0.0 => {
            match medication.period_unit {
                PeriodUnit::Unset => format!("{frequency}x every {period} (unit N/A)"),
                unit => format!(
                    "{frequency}x every {period} {}",
                    unit.code().unwrap_or(NOT_AVAILABLE)
                ),
            }
        }
        _ => "as needed".to_string(),
    }
}

fn or_na(value: Option<&NonEmptyText>) -> &str {
    value.map(NonEmptyText::as_str).unwrap_or(NOT_AVAILABLE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::Gender;
    use crate::record::{
        FamilyCondition, FamilyHistory, FamilyMember, LabObservation, Observations, PatientInfo,
        SymptomObservation, VitalSign,
    };

    fn text(s: &str) -> Option<NonEmptyText> {
        NonEmptyText::new(s).ok()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn frequency_phrase_variants() {
        let scheduled = Medication {
            frequency: Some(3),
            period: Some(1.0),
            ..Medication::default()
        };
        assert_eq!(frequency_phrase(&scheduled), "3x every 1 d");

        let half = Medication {
            frequency: Some(1),
            period: Some(0.5),
            period_unit: PeriodUnit::Week,
            ..Medication::default()
        };
        assert_eq!(frequency_phrase(&half), "1x every 0.5 wk");

        let unitless = Medication {
            period_unit: PeriodUnit::Unset,
            ..scheduled.clone()
        };
        assert_eq!(frequency_phrase(&unitless), "3x every 1 (unit N/A)");

        let no_period = Medication {
            frequency: Some(2),
            ..Medication::default()
        };
        assert_eq!(frequency_phrase(&no_period), "as needed");
    }

    #[test]
    fn age_accounts_for_birthday_not_yet_reached() {
        assert_eq!(age("1990-06-15", date(2024, 6, 14)), Some(33));
        assert_eq!(age("1990-06-15", date(2024, 6, 15)), Some(34));
        assert_eq!(age("1990-06-15T00:00:00Z", date(2024, 12, 1)), Some(34));
        assert_eq!(age("15/06/1990", date(2024, 12, 1)), None);
        assert_eq!(age("2030-01-01", date(2024, 12, 1)), None);
    }

    #[test]
    fn renders_full_record() {
        let record = CanonicalRecord {
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
                    laboratory: vec![
                        LabObservation {
                            test_name: "Hemoglobin A1c".into(),
                            value: Some(6.1),
                            unit: text("%"),
                            ..LabObservation::default()
                        },
                        LabObservation {
                            test_name: "Ferritin".into(),
                            ..LabObservation::default()
                        },
                    ],
                    symptom: vec![SymptomObservation {
                        symptom_name: "Thirst".into(),
                        present: false,
                        ..SymptomObservation::default()
                    }],
                    vital_sign: vec![
                        VitalSign {
                            vital_type: "Heart rate".into(),
                            value: Some(72.0),
                            unit: text("bpm"),
                            ..VitalSign::default()
                        },
                        VitalSign {
                            vital_type: "Temperature".into(),
                            value: Some(37.2),
                            ..VitalSign::default()
                        },
                    ],
                },
                medications: vec![Medication {
                    name: "Metformin".into(),
                    dosage_text: text("500 mg"),
                    frequency: Some(2),
                    period: Some(1.0),
                    ..Medication::default()
                }],
            }],
            family_history: FamilyHistory {
                members: vec![FamilyMember {
                    relationship: "Mother".into(),
                    deceased: true,
                    conditions: vec![FamilyCondition {
                        name: "Type 2 diabetes".into(),
                        outcome: None,
                    }],
                }],
                note: None,
            },
        };

        let expected = "\
Patient Summary
---------------
Patient ID: N/A
Name: Jane Doe
Gender: female
Age: 34
Birth Date: 1990-01-01
Address: N/A
  City: Leeds
  State: N/A
  Country: N/A

Encounters:

Encounter 1:
  Date: 2024-03-01
  Reason: fatigue
  Symptoms:
    - Thirst: Absent
  Vital Signs:
    - Heart rate: 72 bpm
  Laboratory Results:
    - Hemoglobin A1c:
      Value: 6.1
      Unit: %
    - Ferritin:
      Not available
  Medications:
    - Metformin:
      Dosage: 500 mg
      Frequency: 2x every 1 d
      Reason: Drugs not taken/completed

Family History:
  - Mother (Deceased: Yes)
    • Condition: Type 2 diabetes";

        assert_eq!(render_summary_at(&record, date(2024, 6, 1)), expected);
    }

    #[test]
    fn blank_names_render_as_unknown() {
        let record = CanonicalRecord {
            encounters: vec![Encounter {
                observations: Observations {
                    laboratory: vec![LabObservation::default()],
                    symptom: vec![SymptomObservation {
                        symptom_name: " ".into(),
                        ..SymptomObservation::default()
                    }],
                    vital_sign: vec![VitalSign {
                        value: Some(37.0),
                        unit: NonEmptyText::new("C").ok(),
                        ..VitalSign::default()
                    }],
                },
                medications: vec![Medication::default()],
                ..Encounter::default()
            }],
            family_history: FamilyHistory {
                members: vec![FamilyMember {
                    conditions: vec![FamilyCondition::default()],
                    ..FamilyMember::default()
                }],
                note: None,
            },
            ..CanonicalRecord::default()
        };

        let summary = render_summary_at(&record, date(2024, 1, 1));
        assert!(summary.contains("    - Unknown: Present"));
        assert!(summary.contains("    - Unknown: 37 C"));
        assert!(summary.contains("  Laboratory Results:\n    - Unknown:"));
        assert!(summary.contains("  Medications:\n    - Unknown:"));
        assert!(summary.contains("  - Unknown (Deceased: No)"));
        assert!(summary.contains("    • Condition: Unknown"));
        assert!(!summary.contains("- :"));
    }

    #[test]
    fn empty_record_renders_placeholders() {
        let summary = render_summary_at(&CanonicalRecord::default(), date(2024, 1, 1));
        assert!(summary.contains("Name: N/A"));
        assert!(summary.contains("Age: N/A"));
        assert!(summary.contains("Address: N/A"));
        assert!(summary.ends_with("Family History:"));
    }
}
