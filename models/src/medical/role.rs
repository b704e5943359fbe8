// models/src/medical/role.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Role carried by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A verified doctor with full authoring access.
    Doctor,
    /// A doctor whose account is still pending admin review.
    Unverified,
    Admin,
}

impl Role {
    pub fn for_doctor(is_verified: bool) -> Self {
        if is_verified { Role::Doctor } else { Role::Unverified }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Doctor => "doctor",
            Role::Unverified => "unverified",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "doctor" => Ok(Role::Doctor),
            "unverified" => Ok(Role::Unverified),
            "admin" => Ok(Role::Admin),
            other => Err(ValidationError::invalid("role", format!("unknown role '{}'", other))),
        }
    }
}
