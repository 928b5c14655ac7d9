//! Controlled vocabularies of the canonical record.
//!
//! Normalisation is total: every input string maps to a variant. Matching is case-insensitive
//! and treats `_` and spaces like `-`, so `"Taking as directed"` and `"TAKING_AS_DIRECTED"`
//! both read as [`Adherence::TakingAsDirected`]. Inputs that match nothing become the `Unset`
//! variant (or the documented default for [`ObservationStatus`]).

use serde::{Serialize, Serializer};
use std::fmt;

fn normalise(input: &str) -> String {
    input
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == '_' || c == ' ' { '-' } else { c })
        .collect()
}

fn serialize_code<S: Serializer>(code: Option<&str>, serializer: S) -> Result<S::Ok, S::Error> {
    match code {
        Some(code) => serializer.serialize_str(code),
        None => serializer.serialize_none(),
    }
}

// ============================================================================
// Gender
// ============================================================================

/// Administrative gender.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
    Other,
    Unknown,
    #[default]
    Unset,
}

impl Gender {
    pub fn from_wire(input: &str) -> Self {
        match normalise(input).as_str() {
            "male" | "m" => Self::Male,
            "female" | "f" => Self::Female,
            "other" => Self::Other,
            "unknown" => Self::Unknown,
            _ => Self::Unset,
        }
    }

    pub const fn code(self) -> Option<&'static str> {
        match self {
            Self::Male => Some("male"),
            Self::Female => Some("female"),
            Self::Other => Some("other"),
            Self::Unknown => Some("unknown"),
            Self::Unset => None,
        }
    }
}

impl Serialize for Gender {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_code(self.code(), serializer)
    }
}

// ============================================================================
// Interpretation
// ============================================================================

/// Qualitative interpretation of an observation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Interpretation {
    High,
    Low,
    Normal,
    Abnormal,
    Critical,
    #[default]
    Unset,
}

impl Interpretation {
    pub fn from_wire(input: &str) -> Self {
        match normalise(input).as_str() {
            "high" => Self::High,
            "low" => Self::Low,
            "normal" => Self::Normal,
            "abnormal" => Self::Abnormal,
            "critical" => Self::Critical,
            _ => Self::Unset,
        }
    }

    /// Reverse of [`Interpretation::v3_code`]. Names are accepted as well as codes.
    pub fn from_v3_code(code: &str) -> Self {
        match code.trim() {
            "H" => Self::High,
            "L" => Self::Low,
            "N" => Self::Normal,
            "A" => Self::Abnormal,
            "HH" => Self::Critical,
            other => Self::from_wire(other),
        }
    }

    pub const fn code(self) -> Option<&'static str> {
        match self {
            Self::High => Some("high"),
            Self::Low => Some("low"),
            Self::Normal => Some("normal"),
            Self::Abnormal => Some("abnormal"),
            Self::Critical => Some("critical"),
            Self::Unset => None,
        }
    }

    /// HL7 v3 ObservationInterpretation code.
    pub const fn v3_code(self) -> Option<&'static str> {
        match self {
            Self::High => Some("H"),
            Self::Low => Some("L"),
            Self::Normal => Some("N"),
            Self::Abnormal => Some("A"),
            Self::Critical => Some("HH"),
            Self::Unset => None,
        }
    }

    pub const fn display(self) -> Option<&'static str> {
        match self {
            Self::High => Some("High"),
            Self::Low => Some("Low"),
            Self::Normal => Some("Normal"),
            Self::Abnormal => Some("Abnormal"),
            Self::Critical => Some("Critical"),
            Self::Unset => None,
        }
    }
}

impl Serialize for Interpretation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_code(self.code(), serializer)
    }
}

// ============================================================================
// Observation status
// ============================================================================

/// Observation status. Unrecognised input reads as `Final`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ObservationStatus {
    Registered,
    Preliminary,
    #[default]
    Final,
    Amended,
    Corrected,
    Cancelled,
    EnteredInError,
    Unknown,
}

impl ObservationStatus {
    pub fn from_wire(input: &str) -> Self {
        match normalise(input).as_str() {
            "registered" => Self::Registered,
            "preliminary" => Self::Preliminary,
            "final" => Self::Final,
            "amended" => Self::Amended,
            "corrected" => Self::Corrected,
            "cancelled" => Self::Cancelled,
            "entered-in-error" => Self::EnteredInError,
            "unknown" => Self::Unknown,
            _ => Self::Final,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Preliminary => "preliminary",
            Self::Final => "final",
            Self::Amended => "amended",
            Self::Corrected => "corrected",
            Self::Cancelled => "cancelled",
            Self::EnteredInError => "entered-in-error",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ObservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ObservationStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

// ============================================================================
// Medication adherence
// ============================================================================

/// Medication adherence status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Adherence {
    Taking,
    TakingAsDirected,
    TakingNotAsDirected,
    NotTaking,
    OnHold,
    OnHoldAsDirected,
    OnHoldNotAsDirected,
    Stopped,
    StoppedAsDirected,
    StoppedNotAsDirected,
    Unknown,
    #[default]
    Unset,
}

impl Adherence {
    pub fn from_wire(input: &str) -> Self {
        match normalise(input).as_str() {
            "taking" => Self::Taking,
            "taking-as-directed" => Self::TakingAsDirected,
            "taking-not-as-directed" => Self::TakingNotAsDirected,
            "not-taking" => Self::NotTaking,
            "on-hold" => Self::OnHold,
            "on-hold-as-directed" => Self::OnHoldAsDirected,
            "on-hold-not-as-directed" => Self::OnHoldNotAsDirected,
            "stopped" => Self::Stopped,
            "stopped-as-directed" => Self::StoppedAsDirected,
            "stopped-not-as-directed" => Self::StoppedNotAsDirected,
            "unknown" => Self::Unknown,
            _ => Self::Unset,
        }
    }

    pub const fn code(self) -> Option<&'static str> {
        match self {
            Self::Taking => Some("taking"),
            Self::TakingAsDirected => Some("taking-as-directed"),
            Self::TakingNotAsDirected => Some("taking-not-as-directed"),
            Self::NotTaking => Some("not-taking"),
            Self::OnHold => Some("on-hold"),
            Self::OnHoldAsDirected => Some("on-hold-as-directed"),
            Self::OnHoldNotAsDirected => Some("on-hold-not-as-directed"),
            Self::Stopped => Some("stopped"),
            Self::StoppedAsDirected => Some("stopped-as-directed"),
            Self::StoppedNotAsDirected => Some("stopped-not-as-directed"),
            Self::Unknown => Some("unknown"),
            Self::Unset => None,
        }
    }

    /// Title-cased display, e.g. `Taking As Directed`.
    pub fn display(self) -> Option<String> {
        let code = self.code()?;
        let words: Vec<String> = code
            .split('-')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => String::new(),
                }
            })
            .collect();
        Some(words.join(" "))
    }

    /// Whether the patient is taking the medication in some form.
    pub const fn is_taking(self) -> bool {
        matches!(
            self,
            Self::Taking | Self::TakingAsDirected | Self::TakingNotAsDirected
        )
    }
}

impl Serialize for Adherence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_code(self.code(), serializer)
    }
}

// ============================================================================
// Period unit
// ============================================================================

/// UCUM unit of a dosing period.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PeriodUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Year,
    #[default]
    Unset,
}

impl PeriodUnit {
    /// Accepts UCUM codes and spelled-out names (`"days"`, `"Week"`).
    pub fn from_wire(input: &str) -> Self {
        match normalise(input).as_str() {
            "s" | "sec" | "second" | "seconds" => Self::Second,
            "min" | "minute" | "minutes" => Self::Minute,
            "h" | "hr" | "hour" | "hours" => Self::Hour,
            "d" | "day" | "days" | "daily" => Self::Day,
            "wk" | "week" | "weeks" | "weekly" => Self::Week,
            "mo" | "month" | "months" | "monthly" => Self::Month,
            "a" | "y" | "yr" | "year" | "years" | "yearly" => Self::Year,
            _ => Self::Unset,
        }
    }

    pub const fn code(self) -> Option<&'static str> {
        match self {
            Self::Second => Some("s"),
            Self::Minute => Some("min"),
            Self::Hour => Some("h"),
            Self::Day => Some("d"),
            Self::Week => Some("wk"),
            Self::Month => Some("mo"),
            Self::Year => Some("a"),
            Self::Unset => None,
        }
    }
}

impl Serialize for PeriodUnit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serialize_code(self.code(), serializer)
    }
}
