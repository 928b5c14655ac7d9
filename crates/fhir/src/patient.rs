//! FHIR Patient wire model.
//!
//! Responsibilities:
//! - Define the wire struct for serialisation/deserialisation
//! - Provide read helpers for the elements the codec flattens (first name, first address)
//!
//! Notes:
//! - Gender is kept as a string on the wire; normalisation to an enum happens in the core
//!   model so that unexpected codes never fail decoding

use crate::datatypes::{Address, HumanName};
use serde::{Deserialize, Serialize};

/// Wire representation of a Patient resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub resource_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name: Vec<HumanName>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<Address>,
}

impl Patient {
    pub const RESOURCE_TYPE: &'static str = "Patient";

    /// Empty Patient with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            resource_type: Self::RESOURCE_TYPE.to_string(),
            id: Some(id.into()),
            ..Self::default()
        }
    }

    /// First recorded name.
    pub fn primary_name(&self) -> Option<&HumanName> {
        self.name.first()
    }

    /// First given name of the first recorded name.
    pub fn first_given(&self) -> Option<&str> {
        self.primary_name()
            .and_then(|n| n.given.first())
            .map(String::as_str)
    }

    /// Family name of the first recorded name.
    pub fn family(&self) -> Option<&str> {
        self.primary_name().and_then(|n| n.family.as_deref())
    }

    /// First recorded address.
    pub fn primary_address(&self) -> Option<&Address> {
        self.address.first()
    }
}
