//! Family history wire models: a `List` whose entries point at contained
//! `FamilyMemberHistory` resources.
//!
//! Notes:
//! - `List.subject` is 0..1 in R4 and 0..* in R5; both shapes are accepted on input and the
//!   array form is written on output.
//! - Contained members are referenced as `#<local id>`.

use crate::bundle::Resource;
use crate::datatypes::{one_or_many, Annotation, CodeableConcept, Reference};
use serde::{Deserialize, Serialize};

/// Wire representation of a List resource.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contained: Vec<Resource>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,

    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub subject: Vec<Reference>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub note: Vec<Annotation>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entry: Vec<ListEntry>,
}

/// One List entry.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ListEntry {
    pub item: Reference,
}

impl List {
    pub const RESOURCE_TYPE: &'static str = "List";

    /// Empty List with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            resource_type: Self::RESOURCE_TYPE.to_string(),
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// Contained family member histories, in contained order.
    pub fn family_members(&self) -> impl Iterator<Item = &FamilyMemberHistory> {
        self.contained.iter().filter_map(|r| match r {
            Resource::FamilyMemberHistory(member) => Some(member),
            _ => None,
        })
    }

    /// Text of the first note.
    pub fn note_text(&self) -> Option<&str> {
        self.note
            .first()
            .map(|n| n.text.as_str())
            .filter(|t| !t.trim().is_empty())
    }
}

/// Wire representation of a FamilyMemberHistory resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyMemberHistory {
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<Reference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub relationship: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deceased_boolean: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub condition: Vec<FamilyMemberCondition>,
}

/// A condition suffered by a family member.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FamilyMemberCondition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<CodeableConcept>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<CodeableConcept>,
}

impl FamilyMemberHistory {
    pub const RESOURCE_TYPE: &'static str = "FamilyMemberHistory";

    /// Empty FamilyMemberHistory with the given (local) id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            resource_type: Self::RESOURCE_TYPE.to_string(),
            id: Some(id.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_single_subject_and_contained_members() {
        let input = r##"{
  "resourceType": "List",
  "status": "current",
  "mode": "snapshot",
  "subject": {"reference": "Patient/p1"},
  "note": [{"text": "adopted"}],
  "contained": [
    {"resourceType": "FamilyMemberHistory", "id": "fmh-1", "deceasedBoolean": true,
     "relationship": {"coding": [{"display": "Father"}]},
     "condition": [{"code": {"text": "Diabetes"}}]},
    {"resourceType": "Basic", "id": "b1"}
  ],
  "entry": [{"item": {"reference": "#fmh-1"}}]
}"##;

        let list: List = serde_json::from_str(input).expect("parse list");
        assert_eq!(list.subject.len(), 1);
        assert_eq!(list.note_text(), Some("adopted"));
        assert_eq!(list.contained.len(), 2);

        let members: Vec<_> = list.family_members().collect();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].deceased_boolean, Some(true));
        assert_eq!(
            members[0].relationship.as_ref().and_then(|r| r.first_display()),
            Some("Father")
        );
    }

    #[test]
    fn renders_subject_as_array_and_contained_member() {
        let mut list = List::new("l1");
        list.subject = vec![Reference::to("Patient/p1")];
        let mut member = FamilyMemberHistory::new("fmh-1");
        member.deceased_boolean = Some(false);
        list.contained = vec![Resource::FamilyMemberHistory(member)];

        let json = serde_json::to_value(&list).unwrap();
        assert_eq!(json["subject"][0]["reference"], "Patient/p1");
        assert_eq!(json["contained"][0]["resourceType"], "FamilyMemberHistory");
        assert_eq!(json["contained"][0]["deceasedBoolean"], false);
    }
}
