//! Internal implementation of resource identifiers and identifier stamps.

use crate::{UuidError, UuidResult};
use chrono::{DateTime, NaiveDateTime, Utc};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

const URN_PREFIX: &str = "urn:uuid:";
const STAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Canonical resource identifier (hyphenated lowercase UUID).
///
/// Once constructed, the contained UUID is guaranteed to render in canonical form, so callers
/// can derive references from it without re-validating.
///
/// # Construction
/// - [`ResourceId::new`] generates a fresh random identifier.
/// - [`ResourceId::parse`] validates an externally supplied identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceId(Uuid);

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceId {
    /// Generates a new random (v4) identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be in canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not canonical.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(format!(
                "identifier must be a lowercase hyphenated UUID, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(format!("invalid identifier '{input}': {e}")))
    }

    /// Returns the UUID as a `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is a lowercase hyphenated UUID (8-4-4-4-12).
    ///
    /// Purely syntactic; fast enough to use as a pre-check.
    pub fn is_canonical(input: &str) -> bool {
        const GROUPS: [usize; 5] = [8, 4, 4, 4, 12];

        input.len() == 36
            && input
                .split('-')
                .map(str::len)
                .eq(GROUPS.iter().copied())
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f' | b'-'))
    }

    /// Temporary in-bundle reference (`urn:uuid:<id>`), used as an entry `fullUrl`.
    pub fn urn(&self) -> String {
        format!("{URN_PREFIX}{}", self)
    }

    /// Relative literal reference, e.g. `Patient/<id>`.
    pub fn reference(&self, resource_type: &str) -> String {
        format!("{resource_type}/{}", self)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for ResourceId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceId::parse(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for ResourceId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for ResourceId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ResourceId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Second-resolution UTC timestamp rendered as `YYYYMMDDHHMMSS`.
///
/// Used only inside human-readable identifiers; it carries no ordering guarantee.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct IdentifierStamp(DateTime<Utc>);

impl IdentifierStamp {
    /// Stamp for the given instant (sub-second precision is dropped on display).
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    /// Stamp for the current instant.
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Returns the instant this stamp was created from.
    pub fn instant(&self) -> DateTime<Utc> {
        self.0
    }
}

impl fmt::Display for IdentifierStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(STAMP_FORMAT))
    }
}

impl FromStr for IdentifierStamp {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 14 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(UuidError::InvalidInput(format!(
                "identifier stamp must be 14 digits (YYYYMMDDHHMMSS), got: '{}'",
                s
            )));
        }
        let naive = NaiveDateTime::parse_from_str(s, STAMP_FORMAT).map_err(|e| {
            UuidError::InvalidInput(format!("Invalid identifier stamp '{}': {}", s, e))
        })?;
        Ok(Self(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_new_generates_canonical_id() {
        let id = ResourceId::new();
        let rendered = id.to_string();

        assert_eq!(rendered.len(), 36);
        assert!(ResourceId::is_canonical(&rendered));
    }

    #[test]
    fn test_new_ids_are_distinct() {
        assert_ne!(ResourceId::new(), ResourceId::new());
    }

    #[test]
    fn test_parse_valid_canonical_id() {
        let canonical = "550e8400-e29b-41d4-a716-446655440000";
        let id = ResourceId::parse(canonical).expect("canonical id");

        assert_eq!(id.to_string(), canonical);
    }

    #[test]
    fn test_parse_rejects_non_canonical_forms() {
        for input in [
            "550e8400e29b41d4a716446655440000",
            "550E8400-E29B-41D4-A716-446655440000",
            "urn:uuid:550e8400-e29b-41d4-a716-446655440000",
            "{550e8400-e29b-41d4-a716-446655440000}",
            "550e8400-e29b41d4-a716-446655440000-",
            "",
        ] {
            let err = ResourceId::parse(input).expect_err("should reject");
            match err {
                UuidError::InvalidInput(msg) => assert!(msg.contains("lowercase hyphenated")),
            }
        }
    }

    #[test]
    fn test_urn_and_reference_share_the_id() {
        let id = ResourceId::parse("550e8400-e29b-41d4-a716-446655440000").unwrap();

        assert_eq!(id.urn(), "urn:uuid:550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(
            id.reference("Encounter"),
            "Encounter/550e8400-e29b-41d4-a716-446655440000"
        );
    }

    #[test]
    fn test_from_str_round_trip() {
        let original = ResourceId::new();
        let parsed: ResourceId = original.to_string().parse().unwrap();

        assert_eq!(original, parsed);
    }

    #[test]
    fn test_serde_uses_canonical_string() {
        let id = ResourceId::parse("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let json = serde_json::to_string(&id).unwrap();

        assert_eq!(json, "\"550e8400-e29b-41d4-a716-446655440000\"");
        assert!(serde_json::from_str::<ResourceId>("\"not-an-id\"").is_err());
    }

    #[test]
    fn test_identifier_stamp_display_format() {
        let instant = Utc.with_ymd_and_hms(2026, 1, 11, 14, 35, 22).unwrap();
        let stamp = IdentifierStamp::at(instant);

        assert_eq!(stamp.to_string(), "20260111143522");
    }

    #[test]
    fn test_identifier_stamp_parse_round_trip() {
        let stamp: IdentifierStamp = "20260111143522".parse().unwrap();

        assert_eq!(
            stamp.instant(),
            Utc.with_ymd_and_hms(2026, 1, 11, 14, 35, 22).unwrap()
        );
        assert_eq!(stamp.to_string(), "20260111143522");
    }

    #[test]
    fn test_identifier_stamp_rejects_bad_input() {
        assert!("2026011114352".parse::<IdentifierStamp>().is_err());
        assert!("2026011114352Z".parse::<IdentifierStamp>().is_err());
        assert!("20261311143522".parse::<IdentifierStamp>().is_err());
    }
}
