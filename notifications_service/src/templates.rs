// notifications_service/src/templates.rs

use models::medical::Doctor;

use crate::Email;

pub fn verification_status(doctor: &Doctor, is_verified: bool) -> Email {
    let body = if is_verified {
        format!(
            "Dear {},\n\nYour Medipal account ({}) has been verified. You can now sign in and issue prescriptions.\n\nMedipal",
            doctor.name, doctor.registration_no
        )
    } else {
        format!(
            "Dear {},\n\nYour Medipal account ({}) is no longer verified. Contact the administrator if you think this is a mistake.\n\nMedipal",
            doctor.name, doctor.registration_no
        )
    };
    Email {
        to: doctor.email.clone(),
        subject: if is_verified {
            "Your Medipal account is verified".to_string()
        } else {
            "Your Medipal account verification was revoked".to_string()
        },
        body,
    }
}

pub fn password_reset_otp(email: &str, otp: &str, valid_minutes: i64) -> Email {
    Email {
        to: email.to_string(),
        subject: "Password Reset OTP".to_string(),
        body: format!(
            "Your OTP for password reset is: {}. This OTP will expire in {} minutes.",
            otp, valid_minutes
        ),
    }
}
