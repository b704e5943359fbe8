// models/src/medical/login.rs

use serde::{Deserialize, Serialize};

use super::role::Role;

/// Doctor sign-in form. The registration number is the login identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorLogin {
    pub registration_no: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdminLogin {
    pub username: Option<String>,
    pub password: Option<String>,
}

/// What a successful login hands back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGrant {
    pub token: String,
    pub role: Role,
    pub subject: String,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

/// Password reset, step one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OtpRequest {
    pub email: Option<String>,
}

/// Password reset, step two.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtpVerification {
    pub email: Option<String>,
    pub otp: Option<String>,
    pub new_password: Option<String>,
}
