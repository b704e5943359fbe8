// models/src/lib.rs

pub mod errors;
pub mod identifiers;
pub mod medical;

pub use self::errors::{require, MedipalError, MedipalResult, ValidationError, ValidationResult};
pub use self::identifiers::{PatientAssociation, PhoneNumber, PLACEHOLDER_PREFIX};
pub use self::medical::*;
