// models/src/medical/emergency_contact.rs

use serde::{Deserialize, Serialize};

use crate::errors::{require, ValidationResult};
use crate::identifiers::PhoneNumber;

/// A family or emergency contact attached to a patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub id: i64,
    pub patient_phone: String,
    pub name: String,
    pub relation: String,
    pub phone_number: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEmergencyContact {
    pub name: Option<String>,
    pub relation: Option<String>,
    pub phone_number: Option<String>,
}

impl NewEmergencyContact {
    pub fn validate(&self) -> ValidationResult<(String, String, PhoneNumber)> {
        let name = require("name", self.name.as_deref())?;
        let relation = require("relation", self.relation.as_deref())?;
        let phone = PhoneNumber::new(&require("phoneNumber", self.phone_number.as_deref())?)?;
        Ok((name, relation, phone))
    }
}
