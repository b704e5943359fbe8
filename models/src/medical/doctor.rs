// models/src/medical/doctor.rs

use serde::{Deserialize, Serialize};

use crate::errors::{require, ValidationError, ValidationResult};

/// A registered doctor. The registration number is the primary key.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub registration_no: String,
    pub name: String,
    pub specialisation: String,
    pub contact_number: String,
    pub email: String,
    // Never leaves the server.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub license_image_url: Option<String>,
    pub is_verified: bool,
}

impl Doctor {
    pub fn summary(&self) -> DoctorSummary {
        DoctorSummary {
            registration_no: self.registration_no.clone(),
            name: self.name.clone(),
            specialisation: self.specialisation.clone(),
            contact_number: self.contact_number.clone(),
        }
    }
}

/// The doctor fields shown on a prescription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSummary {
    pub registration_no: String,
    pub name: String,
    pub specialisation: String,
    pub contact_number: String,
}

/// Registration form as submitted. Every field is optional at the wire level so
/// missing fields surface as `ValidationError::MissingField` instead of a JSON error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDoctor {
    pub name: Option<String>,
    pub specialisation: Option<String>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub confirm_password: Option<String>,
    pub registration_no: Option<String>,
    pub license_image_url: Option<String>,
}

/// A registration that passed validation. The password is still plaintext here.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRegistration {
    pub registration_no: String,
    pub name: String,
    pub specialisation: String,
    pub contact_number: String,
    pub email: String,
    pub password: String,
    pub license_image_url: Option<String>,
}

impl NewDoctor {
    pub fn validate(&self) -> ValidationResult<ValidatedRegistration> {
        let name = require("name", self.name.as_deref())?;
        let specialisation = require("specialisation", self.specialisation.as_deref())?;
        let contact_number = require("contactNumber", self.contact_number.as_deref())?;
        let email = validate_email(self.email.as_deref())?;
        let registration_no = require("registrationNo", self.registration_no.as_deref())?;

        // Passwords are compared untrimmed.
        let password = match self.password.as_deref() {
            Some(p) if !p.is_empty() => p.to_string(),
            _ => return Err(ValidationError::missing("password")),
        };
        match self.confirm_password.as_deref() {
            None | Some("") => return Err(ValidationError::missing("confirmPassword")),
            Some(confirm) if confirm != password => return Err(ValidationError::PasswordMismatch),
            Some(_) => {}
        }

        let license_image_url = self
            .license_image_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string);

        Ok(ValidatedRegistration {
            registration_no,
            name,
            specialisation,
            contact_number,
            email,
            password,
            license_image_url,
        })
    }
}

/// Partial profile edit. Registration number and verification cannot change here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorUpdate {
    pub name: Option<String>,
    pub specialisation: Option<String>,
    pub contact_number: Option<String>,
    pub email: Option<String>,
}

impl DoctorUpdate {
    /// Trims provided values and rejects blank ones. Absent fields stay `None`.
    pub fn validate(&self) -> ValidationResult<DoctorUpdate> {
        let present = |field: &str, value: &Option<String>| -> ValidationResult<Option<String>> {
            match value {
                None => Ok(None),
                Some(v) => require(field, Some(v.as_str())).map(Some),
            }
        };
        Ok(DoctorUpdate {
            name: present("name", &self.name)?,
            specialisation: present("specialisation", &self.specialisation)?,
            contact_number: present("contactNumber", &self.contact_number)?,
            email: match &self.email {
                None => None,
                Some(v) => Some(validate_email(Some(v.as_str()))?),
            },
        })
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.specialisation.is_none() && self.contact_number.is_none() && self.email.is_none()
    }

    /// Applies the edit to a loaded doctor.
    pub fn apply_to(&self, doctor: &mut Doctor) {
        if let Some(name) = &self.name {
            doctor.name = name.clone();
        }
        if let Some(specialisation) = &self.specialisation {
            doctor.specialisation = specialisation.clone();
        }
        if let Some(contact_number) = &self.contact_number {
            doctor.contact_number = contact_number.clone();
        }
        if let Some(email) = &self.email {
            doctor.email = email.clone();
        }
    }
}

/// Minimal shape check, the address is confirmed by the OTP mail anyway.
pub fn validate_email(value: Option<&str>) -> ValidationResult<String> {
    let email = require("email", value)?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') && !domain.starts_with('.') => {
            Ok(email.to_lowercase())
        }
        _ => Err(ValidationError::invalid("email", "not a valid email address")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> NewDoctor {
        NewDoctor {
            name: Some("Dr. X".into()),
            specialisation: Some("Cardiology".into()),
            contact_number: Some("9876543210".into()),
            email: Some("Dr.X@Example.com".into()),
            password: Some("s3cret!".into()),
            confirm_password: Some("s3cret!".into()),
            registration_no: Some("REG-001".into()),
            license_image_url: Some("https://img.example/license.png".into()),
        }
    }

    #[test]
    fn valid_registration_normalises_email() {
        let registration = form().validate().unwrap();
        assert_eq!(registration.email, "dr.x@example.com");
        assert_eq!(registration.registration_no, "REG-001");
    }

    #[test]
    fn registration_requires_every_field() {
        let mut missing_name = form();
        missing_name.name = None;
        assert_eq!(missing_name.validate(), Err(ValidationError::missing("name")));

        let mut blank_reg = form();
        blank_reg.registration_no = Some("  ".into());
        assert_eq!(blank_reg.validate(), Err(ValidationError::missing("registrationNo")));
    }

    #[test]
    fn registration_rejects_mismatched_confirmation() {
        let mut mismatch = form();
        mismatch.confirm_password = Some("other".into());
        assert_eq!(mismatch.validate(), Err(ValidationError::PasswordMismatch));
    }

    #[test]
    fn update_rejects_blank_values_and_keeps_absent_ones() {
        let update = DoctorUpdate {
            name: Some(" Dr. Y ".into()),
            ..Default::default()
        };
        let validated = update.validate().unwrap();
        assert_eq!(validated.name.as_deref(), Some("Dr. Y"));
        assert!(validated.email.is_none());

        let blank = DoctorUpdate {
            specialisation: Some("".into()),
            ..Default::default()
        };
        assert_eq!(blank.validate(), Err(ValidationError::missing("specialisation")));
        assert!(DoctorUpdate::default().is_empty());
    }

    #[test]
    fn doctor_json_never_contains_password_hash() {
        let doctor = Doctor {
            registration_no: "REG-001".into(),
            name: "Dr. X".into(),
            specialisation: "Cardiology".into(),
            contact_number: "9876543210".into(),
            email: "x@example.com".into(),
            password_hash: "$argon2id$...".into(),
            license_image_url: None,
            is_verified: false,
        };
        let json = serde_json::to_value(&doctor).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["isVerified"], false);
    }
}
