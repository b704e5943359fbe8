// security/src/lib.rs

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, SaltString},
    Argon2, PasswordHash, PasswordVerifier,
};
use chrono::{Duration, Utc};
use models::errors::{require, MedipalError, MedipalResult};
use models::medical::{default_admin_email, Admin, AdminLogin, Doctor, DoctorLogin, NewDoctor, Role, SessionGrant};
use storage::{SessionRecord, Storage};
use tracing::{debug, info, warn};

pub mod reset;
pub mod tokens;

pub use reset::{request_password_reset, reset_password};
pub use tokens::{Claims, Principal, SessionKeys};

/// Lifetime of a doctor session.
pub fn doctor_session_ttl() -> Duration {
    Duration::days(30)
}

/// Lifetime of an admin session.
pub fn admin_session_ttl() -> Duration {
    Duration::days(1)
}

/// Hashes a password using Argon2 into a PHC string.
pub fn hash_password(password: &str) -> MedipalResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| MedipalError::Internal(format!("Failed to hash password with Argon2: {}", e)))
}

/// Verifies a password against a stored PHC string. A malformed stored hash
/// never matches.
pub fn verify_password(password: &str, hashed_password: &str) -> bool {
    match PasswordHash::new(hashed_password) {
        Ok(parsed) => Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok(),
        Err(e) => {
            warn!("Stored password hash could not be parsed: {}", e);
            false
        }
    }
}

/// Registers a doctor. The account starts unverified and only the Argon2
/// hash of the password is stored.
pub async fn register_doctor(form: &NewDoctor, storage: &Storage) -> MedipalResult<Doctor> {
    let registration = form.validate()?;
    let password_hash = hash_password(&registration.password)?;
    storage.insert_doctor(&registration, &password_hash).await
}

fn credentials(identifier: Option<&str>, password: Option<&str>) -> MedipalResult<(String, String)> {
    let identifier = require("identifier", identifier).map_err(|_| MedipalError::InvalidCredentials)?;
    match password {
        Some(p) if !p.is_empty() => Ok((identifier, p.to_string())),
        _ => Err(MedipalError::InvalidCredentials),
    }
}

async fn open_session(subject: &str, role: Role, ttl: Duration, storage: &Storage, keys: &SessionKeys) -> MedipalResult<SessionGrant> {
    let purged = storage.delete_expired_sessions(Utc::now()).await?;
    if purged > 0 {
        debug!("Purged {} expired sessions", purged);
    }

    let (token, claims) = keys.issue(subject, role, ttl)?;
    let expires_at = chrono::DateTime::from_timestamp(claims.exp, 0)
        .ok_or_else(|| MedipalError::Internal("session expiry out of range".into()))?;
    storage
        .insert_session(&SessionRecord {
            jti: claims.jti,
            subject: subject.to_string(),
            role,
            expires_at,
        })
        .await?;

    Ok(SessionGrant {
        token,
        role,
        subject: subject.to_string(),
        expires_at,
    })
}

/// Logs a doctor in by registration number. Unverified doctors get a session
/// with the `unverified` role.
pub async fn login_doctor(login: &DoctorLogin, storage: &Storage, keys: &SessionKeys) -> MedipalResult<SessionGrant> {
    let (registration_no, password) = credentials(login.registration_no.as_deref(), login.password.as_deref())?;
    let doctor = storage
        .get_doctor(&registration_no)
        .await?
        .ok_or(MedipalError::InvalidCredentials)?;
    if !verify_password(&password, &doctor.password_hash) {
        debug!("Wrong password for doctor {}", registration_no);
        return Err(MedipalError::InvalidCredentials);
    }

    let role = Role::for_doctor(doctor.is_verified);
    info!("Doctor {} signed in as {}", registration_no, role);
    open_session(&doctor.registration_no, role, doctor_session_ttl(), storage, keys).await
}

pub async fn login_admin(login: &AdminLogin, storage: &Storage, keys: &SessionKeys) -> MedipalResult<SessionGrant> {
    let (username, password) = credentials(login.username.as_deref(), login.password.as_deref())?;
    let admin = storage.find_admin(&username).await?.ok_or(MedipalError::InvalidCredentials)?;
    if !verify_password(&password, &admin.password_hash) {
        debug!("Wrong password for admin {}", username);
        return Err(MedipalError::InvalidCredentials);
    }
    info!("Admin {} signed in", username);
    open_session(&admin.username, Role::Admin, admin_session_ttl(), storage, keys).await
}

/// Ends the session behind `token`. Succeeds for a missing, unknown, expired
/// or already revoked token.
pub async fn logout(token: Option<&str>, storage: &Storage, keys: &SessionKeys) -> MedipalResult<()> {
    let Some(token) = token else {
        return Ok(());
    };
    match keys.decode_ignoring_expiry(token) {
        Ok(claims) => {
            if storage.delete_session(&claims.jti).await? {
                info!("{} signed out", claims.sub);
            }
            Ok(())
        }
        Err(_) => Ok(()),
    }
}

/// Resolves a token to its caller. The token must verify, be unexpired and
/// still have a session row. Doctor roles follow the current verification
/// flag, so an admin toggle applies to open sessions too.
pub async fn authenticate(token: &str, storage: &Storage, keys: &SessionKeys) -> MedipalResult<Principal> {
    let claims = keys.decode(token)?;
    let session = storage.find_session(&claims.jti).await?.ok_or(MedipalError::Unauthorized)?;
    if session.expires_at <= Utc::now() {
        storage.delete_session(&session.jti).await?;
        return Err(MedipalError::Unauthorized);
    }
    if session.subject != claims.sub {
        return Err(MedipalError::Unauthorized);
    }

    let role = match session.role {
        Role::Admin => {
            storage.find_admin(&session.subject).await?.ok_or(MedipalError::Unauthorized)?;
            Role::Admin
        }
        Role::Doctor | Role::Unverified => {
            let doctor = storage.get_doctor(&session.subject).await?.ok_or(MedipalError::Unauthorized)?;
            Role::for_doctor(doctor.is_verified)
        }
    };

    Ok(Principal {
        subject: session.subject,
        role,
        jti: session.jti,
    })
}

/// Creates the admin account or resets its password. Returns the account and
/// whether it was created.
pub async fn setup_admin(
    username: &str,
    password: &str,
    email: Option<&str>,
    storage: &Storage,
) -> MedipalResult<(Admin, bool)> {
    let username = require("username", Some(username))?;
    if password.is_empty() {
        return Err(models::errors::ValidationError::missing("password").into());
    }
    let password_hash = hash_password(password)?;
    storage
        .upsert_admin(&username, email, &default_admin_email(&username), &password_hash)
        .await
}
