// models/src/identifiers.rs

use core::ops::Deref;
use std::{fmt, str::FromStr};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::{ValidationError, ValidationResult};

/// Prefix of the sentinel stored in a prescription's patient association
/// while nobody has claimed it yet.
pub const PLACEHOLDER_PREFIX: &str = "temp_";

/// A patient phone number, the natural key of the patients table.
///
/// Phone numbers are 1 to 20 characters of digits, optionally with a leading
/// `+` and `-` or space separators. They can never look like a placeholder.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize, PartialOrd, Ord)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Creates a new phone number.
    ///
    /// # Errors
    /// Returns a `ValidationError` when the value is blank, too long or holds
    /// characters other than digits, `+`, `-` and spaces.
    pub fn new(value: &str) -> ValidationResult<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ValidationError::missing("phoneNumber"));
        }
        if value.len() > 20 {
            return Err(ValidationError::invalid("phoneNumber", "must be at most 20 characters"));
        }
        let valid = value
            .char_indices()
            .all(|(i, c)| c.is_ascii_digit() || c == '-' || c == ' ' || (c == '+' && i == 0));
        if !valid || !value.chars().any(|c| c.is_ascii_digit()) {
            return Err(ValidationError::invalid("phoneNumber", "must contain only digits"));
        }
        Ok(Self(value.to_string()))
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for PhoneNumber {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromStr for PhoneNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> ValidationResult<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = ValidationError;

    fn try_from(value: String) -> ValidationResult<Self> {
        Self::new(&value)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<PhoneNumber> for String {
    fn from(value: PhoneNumber) -> Self {
        value.0
    }
}

/// Who a prescription belongs to on the patient side.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatientAssociation {
    /// No association stored at all.
    Unclaimed,
    /// `temp_<millis>` sentinel written by the reuse flow.
    Placeholder(String),
    /// A real patient phone number.
    Claimed(String),
}

impl PatientAssociation {
    /// Fresh placeholder value, `temp_` followed by the current unix millis.
    pub fn placeholder_now() -> Self {
        PatientAssociation::Placeholder(format!("{}{}", PLACEHOLDER_PREFIX, Utc::now().timestamp_millis()))
    }

    /// Interprets a stored column value.
    pub fn from_stored(value: Option<&str>) -> Self {
        match value {
            None => PatientAssociation::Unclaimed,
            Some(v) if v.is_empty() => PatientAssociation::Unclaimed,
            Some(v) if v.starts_with(PLACEHOLDER_PREFIX) => PatientAssociation::Placeholder(v.to_string()),
            Some(v) => PatientAssociation::Claimed(v.to_string()),
        }
    }

    /// Value to persist, `None` for `Unclaimed`.
    pub fn as_stored(&self) -> Option<&str> {
        match self {
            PatientAssociation::Unclaimed => None,
            PatientAssociation::Placeholder(v) | PatientAssociation::Claimed(v) => Some(v),
        }
    }

    /// A claim may only overwrite an empty or placeholder association.
    pub fn is_claimable(&self) -> bool {
        !matches!(self, PatientAssociation::Claimed(_))
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, PatientAssociation::Placeholder(_))
    }
}
