// security/src/reset.rs

use chrono::{Duration, Utc};
use models::errors::{require, MedipalError, MedipalResult, ValidationError};
use models::medical::{validate_email, OtpRequest, OtpVerification};
use notifications_service::{templates, Mailer};
use rand::Rng;
use sha2::{Digest, Sha256};
use storage::Storage;
use tracing::{info, warn};

use crate::hash_password;

pub const OTP_VALID_MINUTES: i64 = 10;

/// A six digit numeric code.
pub fn generate_otp() -> String {
    format!("{:06}", rand::thread_rng().gen_range(100_000..1_000_000))
}

/// SHA-256 of `email:otp`. Only the digest is stored.
pub fn otp_digest(email: &str, otp: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(email.as_bytes());
    hasher.update(b":");
    hasher.update(otp.trim().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Issues a reset code for a registered doctor and mails it. A newer request
/// replaces any earlier code. When the mail cannot be sent the code is
/// withdrawn and the call fails with `Upstream`.
pub async fn request_password_reset(request: &OtpRequest, storage: &Storage, mailer: &dyn Mailer) -> MedipalResult<()> {
    let email = validate_email(request.email.as_deref())?;
    let doctor = storage
        .find_doctor_by_email(&email)
        .await?
        .ok_or_else(|| MedipalError::not_found(format!("doctor with email {}", email)))?;

    let otp = generate_otp();
    let expires_at = Utc::now() + Duration::minutes(OTP_VALID_MINUTES);
    storage.store_otp(&doctor.email, &otp_digest(&doctor.email, &otp), expires_at).await?;

    if let Err(e) = mailer.send(templates::password_reset_otp(&doctor.email, &otp, OTP_VALID_MINUTES)).await {
        warn!("Could not deliver reset code to {}: {}", doctor.email, e);
        storage.delete_otp(&doctor.email).await?;
        return Err(match e {
            MedipalError::Upstream(_) => e,
            other => MedipalError::Upstream(other.to_string()),
        });
    }

    info!("Reset code sent to {}", doctor.email);
    Ok(())
}

/// Consumes a reset code and sets the new password.
pub async fn reset_password(verification: &OtpVerification, storage: &Storage) -> MedipalResult<()> {
    let email = validate_email(verification.email.as_deref())?;
    let otp = require("otp", verification.otp.as_deref())?;
    let new_password = match verification.new_password.as_deref() {
        Some(p) if !p.is_empty() => p,
        _ => return Err(ValidationError::missing("newPassword").into()),
    };

    let new_hash = hash_password(new_password)?;
    storage
        .reset_password_with_otp(&email, &otp_digest(&email, &otp), Utc::now(), &new_hash)
        .await
}
