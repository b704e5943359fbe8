// models/src/medical/patient.rs

use serde::{Deserialize, Serialize};

use crate::errors::{ValidationError, ValidationResult};
use crate::identifiers::PhoneNumber;

pub const DEFAULT_PATIENT_NAME: &str = "Patient";
pub const UNKNOWN_REGION: &str = "Unknown";

/// A patient, keyed by phone number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub phone_number: String,
    pub name: String,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub city: Option<String>,
    pub state: String,
    pub country: String,
}

/// Patient fields submitted with a prescription. The diagnosis travels here
/// too because the prescription form collects it next to the patient.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientDetails {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
    pub diagnosis: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl PatientDetails {
    pub fn validate(&self) -> ValidationResult<()> {
        if let Some(age) = self.age {
            if !(0..=150).contains(&age) {
                return Err(ValidationError::invalid("patientDetails.age", "must be between 0 and 150"));
            }
        }
        Ok(())
    }

    /// Row to insert when no patient exists for `phone`. Blank fields fall back
    /// to the defaults used by the claim flow.
    pub fn to_patient(&self, phone: &PhoneNumber) -> Patient {
        Patient {
            phone_number: phone.to_string(),
            name: non_blank(&self.name).unwrap_or_else(|| DEFAULT_PATIENT_NAME.to_string()),
            age: self.age,
            gender: non_blank(&self.gender),
            city: non_blank(&self.city),
            state: non_blank(&self.state).unwrap_or_else(|| UNKNOWN_REGION.to_string()),
            country: non_blank(&self.country).unwrap_or_else(|| UNKNOWN_REGION.to_string()),
        }
    }

    pub fn diagnosis(&self) -> Option<String> {
        non_blank(&self.diagnosis)
    }
}

/// Optional paging for the admin patient list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    pub const MAX_LIMIT: i64 = 500;

    /// Limit and offset clamped to sane bounds. No limit means everything.
    pub fn bounds(&self) -> (i64, i64) {
        let limit = self.limit.map(|l| l.clamp(1, Self::MAX_LIMIT)).unwrap_or(-1);
        let offset = self.offset.unwrap_or(0).max(0);
        (limit, offset)
    }
}

/// Row created when a patient first claims a prescription by phone.
pub fn claimant(phone: &PhoneNumber) -> Patient {
    PatientDetails::default().to_patient(phone)
}
