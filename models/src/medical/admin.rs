// models/src/medical/admin.rs

use serde::Serialize;

/// The dashboard administrator account.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Admin {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
}

/// Default email for an admin created without one.
pub fn default_admin_email(username: &str) -> String {
    format!("{}@medipal.com", username)
}
