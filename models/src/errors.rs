// models/src/errors.rs

pub use thiserror::Error;

/// Error taxonomy shared by every Medipal crate.
#[derive(Debug, Error)]
pub enum MedipalError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} was not found")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Authentication required")]
    Unauthorized,

    // Same message whether or not the account exists.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Already exists: {0}")]
    DuplicateEntity(String),

    #[error("Upstream service failure: {0}")]
    Upstream(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("An internal error occurred: {0}")]
    Internal(String),

    #[cfg(feature = "sqlx-errors")]
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl MedipalError {
    pub fn not_found(what: impl Into<String>) -> Self {
        MedipalError::NotFound(what.into())
    }

    pub fn forbidden(reason: impl Into<String>) -> Self {
        MedipalError::Forbidden(reason.into())
    }

    /// True for errors the caller can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            MedipalError::Validation(_)
                | MedipalError::NotFound(_)
                | MedipalError::Forbidden(_)
                | MedipalError::Unauthorized
                | MedipalError::InvalidCredentials
                | MedipalError::DuplicateEntity(_)
        )
    }
}

/// A validation error. Each variant carries the offending field where there is one.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A required field was absent or blank.
    #[error("field `{0}` is required")]
    MissingField(String),
    /// A field was present but its value is unusable.
    #[error("field `{field}` is invalid: {reason}")]
    InvalidValue { field: String, reason: String },
    /// Password and confirmation differ.
    #[error("password and confirm password do not match")]
    PasswordMismatch,
    /// A medicine entry references a serial number that is not in the catalog.
    #[error("medicine with serial number {0} does not exist")]
    UnknownMedicine(i64),
    /// The one-time password is wrong, expired or already used.
    #[error("invalid or expired OTP")]
    InvalidOrExpiredOtp,
}

impl ValidationError {
    pub fn missing(field: impl Into<String>) -> Self {
        ValidationError::MissingField(field.into())
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// The field this error is about, for field-level detail in responses.
    pub fn field(&self) -> Option<&str> {
        match self {
            ValidationError::MissingField(field) => Some(field),
            ValidationError::InvalidValue { field, .. } => Some(field),
            ValidationError::PasswordMismatch => Some("confirmPassword"),
            ValidationError::UnknownMedicine(_) => Some("medicines"),
            ValidationError::InvalidOrExpiredOtp => Some("otp"),
        }
    }
}

/// A type alias for a `Result` that returns a `MedipalError` on failure.
pub type MedipalResult<T> = Result<T, MedipalError>;

/// A type alias for a `Result` that returns a `ValidationError` on failure.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Returns the trimmed value, or `MissingField` when it is absent or blank.
pub fn require(field: &str, value: Option<&str>) -> ValidationResult<String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ValidationError::missing(field)),
    }
}
