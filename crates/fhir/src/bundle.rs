//! Bundle wire model and the tolerant `Resource` dispatcher.
//!
//! Responsibilities:
//! - Parse a bundle document, surfacing the failing path on shape errors
//! - Render a bundle as pretty JSON
//! - Decode each entry resource by `resourceType` without letting one malformed resource fail
//!   the whole bundle
//!
//! Notes:
//! - Resource types outside the modelled subset are kept verbatim as [`Resource::Other`]
//! - Modelled resource types whose body does not match the wire struct become
//!   [`Resource::Invalid`] with the decode error, so callers can log and skip them

use crate::encounter::Encounter;
use crate::family_history::{FamilyMemberHistory, List};
use crate::medication_statement::MedicationStatement;
use crate::observation::Observation;
use crate::patient::Patient;
use crate::{FhirError, FhirResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

// ============================================================================
// Bundle
// ============================================================================

/// Wire representation of a Bundle.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub bundle_type: Option<String>,

    #[serde(default)]
    pub entry: Vec<BundleEntry>,
}

/// One bundle entry.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource: Option<Resource>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<BundleEntryRequest>,
}

/// Transaction request attached to an entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct BundleEntryRequest {
    pub method: String,
    pub url: String,
}

impl BundleEntry {
    /// `POST` entry for a resource with the given `urn:uuid:` full URL.
    pub fn post(full_url: impl Into<String>, resource: Resource, url: impl Into<String>) -> Self {
        Self {
            full_url: Some(full_url.into()),
            resource: Some(resource),
            request: Some(BundleEntryRequest {
                method: "POST".to_string(),
                url: url.into(),
            }),
        }
    }
}

impl Bundle {
    pub const RESOURCE_TYPE: &'static str = "Bundle";

    /// Empty transaction bundle.
    pub fn transaction() -> Self {
        Self {
            resource_type: Self::RESOURCE_TYPE.to_string(),
            id: None,
            bundle_type: Some("transaction".to_string()),
            entry: Vec::new(),
        }
    }

    /// Parse a bundle from JSON text.
    ///
    /// Individual entry resources never fail the parse (see [`Resource`]); only the bundle
    /// envelope must match.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - [`FhirError::InvalidJson`] if the text is not JSON,
    /// - [`FhirError::Translation`] if the envelope does not match, with the failing path,
    /// - [`FhirError::InvalidInput`] if `resourceType` is not `Bundle`.
    pub fn parse(json_text: &str) -> FhirResult<Self> {
        let value: Value = serde_json::from_str(json_text)?;
        Self::from_value(&value)
    }

    /// Decode a bundle from an already parsed JSON value.
    ///
    /// # Errors
    ///
    /// As [`Bundle::parse`], minus the JSON syntax case.
    pub fn from_value(value: &Value) -> FhirResult<Self> {
        let bundle: Bundle = serde_path_to_error::deserialize(value).map_err(|err| {
            let path = err.path().to_string();
            let path = if path.is_empty() || path == "." {
                "<root>".to_string()
            } else {
                path
            };
            FhirError::Translation(format!(
                "Bundle schema mismatch at {path}: {}",
                err.into_inner()
            ))
        })?;

        if bundle.resource_type != Self::RESOURCE_TYPE {
            return Err(FhirError::InvalidInput(format!(
                "expected resourceType Bundle, found {:?}",
                bundle.resource_type
            )));
        }

        Ok(bundle)
    }

    /// Render the bundle as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::InvalidJson`] if serialisation fails.
    pub fn render(&self) -> FhirResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Entry resources in bundle order, skipping entries without a resource.
    pub fn resources(&self) -> impl Iterator<Item = &Resource> {
        self.entry.iter().filter_map(|e| e.resource.as_ref())
    }
}

// ============================================================================
// Resource dispatch
// ============================================================================

/// A bundle entry resource, decoded by `resourceType`.
#[derive(Clone, Debug, PartialEq)]
pub enum Resource {
    Patient(Patient),
    Encounter(Encounter),
    Observation(Box<Observation>),
    MedicationStatement(Box<MedicationStatement>),
    List(List),
    FamilyMemberHistory(FamilyMemberHistory),
    /// A resource type outside the modelled subset, kept verbatim.
    Other { resource_type: String, value: Value },
    /// A modelled resource type whose body failed to decode.
    Invalid {
        resource_type: String,
        reason: String,
        value: Value,
    },
}

impl Resource {
    /// The declared `resourceType`.
    pub fn resource_type(&self) -> &str {
        match self {
            Resource::Patient(_) => Patient::RESOURCE_TYPE,
            Resource::Encounter(_) => Encounter::RESOURCE_TYPE,
            Resource::Observation(_) => Observation::RESOURCE_TYPE,
            Resource::MedicationStatement(_) => MedicationStatement::RESOURCE_TYPE,
            Resource::List(_) => List::RESOURCE_TYPE,
            Resource::FamilyMemberHistory(_) => FamilyMemberHistory::RESOURCE_TYPE,
            Resource::Other { resource_type, .. } | Resource::Invalid { resource_type, .. } => {
                resource_type
            }
        }
    }

    /// The resource id, if present.
    pub fn id(&self) -> Option<&str> {
        match self {
            Resource::Patient(r) => r.id.as_deref(),
            Resource::Encounter(r) => r.id.as_deref(),
            Resource::Observation(r) => r.id.as_deref(),
            Resource::MedicationStatement(r) => r.id.as_deref(),
            Resource::List(r) => r.id.as_deref(),
            Resource::FamilyMemberHistory(r) => r.id.as_deref(),
            Resource::Other { value, .. } | Resource::Invalid { value, .. } => {
                value.get("id").and_then(Value::as_str)
            }
        }
    }

    /// Decode a resource from a JSON value. Never fails.
    pub fn from_value(value: Value) -> Self {
        let resource_type = value
            .get("resourceType")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        match resource_type.as_str() {
            Patient::RESOURCE_TYPE => typed(value, resource_type, Resource::Patient),
            Encounter::RESOURCE_TYPE => typed(value, resource_type, Resource::Encounter),
            Observation::RESOURCE_TYPE => typed(value, resource_type, |o| {
                Resource::Observation(Box::new(o))
            }),
            MedicationStatement::RESOURCE_TYPE => typed(value, resource_type, |m| {
                Resource::MedicationStatement(Box::new(m))
            }),
            List::RESOURCE_TYPE => typed(value, resource_type, Resource::List),
            FamilyMemberHistory::RESOURCE_TYPE => {
                typed(value, resource_type, Resource::FamilyMemberHistory)
            }
            _ => Resource::Other {
                resource_type,
                value,
            },
        }
    }
}

fn typed<T, F>(value: Value, resource_type: String, wrap: F) -> Resource
where
    T: DeserializeOwned,
    F: FnOnce(T) -> Resource,
{
    match serde_path_to_error::deserialize::<_, T>(&value) {
        Ok(parsed) => wrap(parsed),
        Err(err) => {
            let reason = format!("{} at {}", err.inner(), err.path());
            Resource::Invalid {
                resource_type,
                reason,
                value,
            }
        }
    }
}

impl<'de> Deserialize<'de> for Resource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Value::deserialize(deserializer).map(Resource::from_value)
    }
}

impl Serialize for Resource {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Resource::Patient(r) => r.serialize(serializer),
            Resource::Encounter(r) => r.serialize(serializer),
            Resource::Observation(r) => r.serialize(serializer),
            Resource::MedicationStatement(r) => r.serialize(serializer),
            Resource::List(r) => r.serialize(serializer),
            Resource::FamilyMemberHistory(r) => r.serialize(serializer),
            Resource::Other { value, .. } | Resource::Invalid { value, .. } => {
                value.serialize(serializer)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::Reference;

    #[test]
    fn parse_dispatches_by_resource_type() {
        let input = r#"{
  "resourceType": "Bundle",
  "type": "collection",
  "entry": [
    {"fullUrl": "urn:uuid:p1", "resource": {"resourceType": "Patient", "id": "p1"}},
    {"resource": {"resourceType": "Observation", "id": "o1", "status": "final"}},
    {"resource": {"resourceType": "Condition", "id": "c1"}},
    {"request": {"method": "DELETE", "url": "Patient/x"}}
  ]
}"#;

        let bundle = Bundle::parse(input).expect("parse bundle");
        let types: Vec<_> = bundle.resources().map(Resource::resource_type).collect();
        assert_eq!(types, vec!["Patient", "Observation", "Condition"]);
        assert!(matches!(bundle.entry[1].resource, Some(Resource::Observation(_))));
        assert!(matches!(
            bundle.entry[2].resource,
            Some(Resource::Other { .. })
        ));
        assert_eq!(bundle.entry[2].resource.as_ref().and_then(Resource::id), Some("c1"));
    }

    #[test]
    fn malformed_resource_becomes_invalid_without_failing_bundle() {
        let input = r#"{
  "resourceType": "Bundle",
  "entry": [
    {"resource": {"resourceType": "Observation", "id": "o1", "category": "lab"}},
    {"resource": {"resourceType": "Patient", "id": "p1"}}
  ]
}"#;

        let bundle = Bundle::parse(input).expect("parse bundle");
        match &bundle.entry[0].resource {
            Some(Resource::Invalid {
                resource_type,
                reason,
                ..
            }) => {
                assert_eq!(resource_type, "Observation");
                assert!(reason.contains("category"), "reason: {reason}");
            }
            other => panic!("expected Invalid, got {other:?}"),
        }
        assert!(matches!(bundle.entry[1].resource, Some(Resource::Patient(_))));
    }

    #[test]
    fn parse_rejects_non_bundle_and_reports_envelope_path() {
        let err = Bundle::parse(r#"{"resourceType": "Patient"}"#).expect_err("not a bundle");
        assert!(matches!(err, FhirError::InvalidInput(_)));

        let err = Bundle::parse(r#"{"resourceType": "Bundle", "entry": {"x": 1}}"#)
            .expect_err("entry must be an array");
        match err {
            FhirError::Translation(msg) => assert!(msg.contains("entry"), "msg: {msg}"),
            other => panic!("expected Translation error, got {other:?}"),
        }

        let err = Bundle::parse("{not json").expect_err("syntax error");
        assert!(matches!(err, FhirError::InvalidJson(_)));
    }

    #[test]
    fn render_writes_transaction_entries() {
        let mut bundle = Bundle::transaction();
        let mut obs = Observation::new("o1");
        obs.subject = Some(Reference::to("Patient/p1"));
        bundle.entry.push(BundleEntry::post(
            "urn:uuid:o1",
            Resource::Observation(Box::new(obs)),
            "Observation",
        ));

        let text = bundle.render().expect("render");
        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["type"], "transaction");
        assert_eq!(json["entry"][0]["fullUrl"], "urn:uuid:o1");
        assert_eq!(json["entry"][0]["request"]["method"], "POST");
        assert_eq!(json["entry"][0]["request"]["url"], "Observation");
        assert_eq!(json["entry"][0]["resource"]["subject"]["reference"], "Patient/p1");

        let reparsed = Bundle::parse(&text).expect("reparse");
        assert_eq!(reparsed, bundle);
    }
}
