// models/src/medical/prescription.rs

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::doctor::DoctorSummary;
use super::medicine::Medicine;
use super::patient::{Patient, PatientDetails};
use crate::errors::{ValidationError, ValidationResult};
use crate::identifiers::{PatientAssociation, PhoneNumber};

/// Unit a medicine entry is dosed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DosageType {
    Tablet,
    Ml,
    Drop,
}

impl DosageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DosageType::Tablet => "tablet",
            DosageType::Ml => "ml",
            DosageType::Drop => "drop",
        }
    }
}

impl FromStr for DosageType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tablet" => Ok(DosageType::Tablet),
            "ml" => Ok(DosageType::Ml),
            "drop" => Ok(DosageType::Drop),
            other => Err(ValidationError::invalid("dosageType", format!("unknown dosage type '{}'", other))),
        }
    }
}

impl fmt::Display for DosageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Night => "night",
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "morning" => Ok(TimeOfDay::Morning),
            "afternoon" => Ok(TimeOfDay::Afternoon),
            "evening" => Ok(TimeOfDay::Evening),
            "night" => Ok(TimeOfDay::Night),
            other => Err(ValidationError::invalid("timeOfDay", format!("unknown time of day '{}'", other))),
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One time-of-day slot of a medicine entry.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineTiming {
    pub time_of_day: TimeOfDay,
    pub dosage: f64,
}

/// A medicine entry as submitted by the prescription form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicineEntryInput {
    pub medicine_id: i64,
    pub dosage_type: DosageType,
    pub duration: i64,
    #[serde(default)]
    pub instruction: Option<String>,
    #[serde(default)]
    pub times: Vec<MedicineTiming>,
}

/// Body of create and update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionInput {
    pub patient_contact: Option<String>,
    #[serde(default)]
    pub patient_details: PatientDetails,
    #[serde(default)]
    pub medicines: Vec<MedicineEntryInput>,
}

impl PrescriptionInput {
    /// Checks everything that does not need the catalog. Unknown medicine ids
    /// are rejected later by the store, inside the write transaction.
    pub fn validate(&self) -> ValidationResult<PhoneNumber> {
        let contact = match self.patient_contact.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c,
            _ => return Err(ValidationError::missing("patientContact")),
        };
        let phone = PhoneNumber::new(contact)
            .map_err(|_| ValidationError::invalid("patientContact", "not a valid phone number"))?;
        self.patient_details.validate()?;
        validate_entries(&self.medicines)?;
        Ok(phone)
    }
}

/// Shape rules for an entry list: at least one entry, positive duration, at
/// least one timing per entry, positive and finite dosages, no repeated slot.
pub fn validate_entries(entries: &[MedicineEntryInput]) -> ValidationResult<()> {
    if entries.is_empty() {
        return Err(ValidationError::missing("medicines"));
    }
    for (i, entry) in entries.iter().enumerate() {
        if entry.duration <= 0 {
            return Err(ValidationError::invalid(format!("medicines[{}].duration", i), "must be a positive number of days"));
        }
        if entry.times.is_empty() {
            return Err(ValidationError::missing(format!("medicines[{}].times", i)));
        }
        for (j, timing) in entry.times.iter().enumerate() {
            if !timing.dosage.is_finite() || timing.dosage <= 0.0 {
                return Err(ValidationError::invalid(
                    format!("medicines[{}].times[{}].dosage", i, j),
                    "must be a positive number",
                ));
            }
            if entry.times[..j].iter().any(|t| t.time_of_day == timing.time_of_day) {
                return Err(ValidationError::invalid(
                    format!("medicines[{}].times[{}].timeOfDay", i, j),
                    format!("{} listed twice", timing.time_of_day),
                ));
            }
        }
    }
    Ok(())
}

/// A prescription row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: String,
    pub doctor_reg_no: String,
    /// Patient association: a phone number, a `temp_` placeholder, or nothing.
    pub is_used_by: Option<String>,
    pub diagnosis: Option<String>,
    pub created_on: DateTime<Utc>,
    pub signature: Option<String>,
}

impl Prescription {
    /// Fresh prescription id, also what the QR code encodes.
    pub fn new_id() -> String {
        Uuid::new_v4().to_string()
    }

    pub fn association(&self) -> PatientAssociation {
        PatientAssociation::from_stored(self.is_used_by.as_deref())
    }
}

/// A stored medicine entry with its catalog row and timings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionEntry {
    pub id: i64,
    pub medicine: Medicine,
    pub dosage_type: DosageType,
    pub duration: i64,
    pub instruction: Option<String>,
    pub times: Vec<MedicineTiming>,
}

impl PrescriptionEntry {
    /// The entry as form input, used when cloning a prescription.
    pub fn to_input(&self) -> MedicineEntryInput {
        MedicineEntryInput {
            medicine_id: self.medicine.serial_no,
            dosage_type: self.dosage_type,
            duration: self.duration,
            instruction: self.instruction.clone(),
            times: self.times.clone(),
        }
    }
}

/// Everything a prescription page or QR scan needs in one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionDetails {
    #[serde(flatten)]
    pub prescription: Prescription,
    pub doctor: DoctorSummary,
    pub patient: Option<Patient>,
    pub medicine_list: Vec<PrescriptionEntry>,
}

/// Patient-side claim body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub prescription_id: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignatureRequest {
    pub signature: Option<String>,
}
