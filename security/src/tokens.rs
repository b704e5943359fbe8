// security/src/tokens.rs

use std::fmt;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use models::errors::{MedipalError, MedipalResult};
use models::medical::Role;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// Claims carried by a session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Doctor registration number or admin username.
    pub sub: String,
    pub role: Role,
    /// Session row id.
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// The authenticated caller of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
    pub role: Role,
    pub jti: String,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Registration number of a verified doctor, `Forbidden` for anyone else.
    pub fn verified_doctor(&self) -> MedipalResult<&str> {
        match self.role {
            Role::Doctor => Ok(&self.subject),
            Role::Unverified => Err(MedipalError::forbidden("doctor account is pending verification")),
            Role::Admin => Err(MedipalError::forbidden("doctor access required")),
        }
    }
}

/// HS256 signing and verification keys derived from the session secret.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKeys(..)")
    }
}

impl SessionKeys {
    pub fn new(secret: &str) -> MedipalResult<Self> {
        if secret.is_empty() {
            return Err(MedipalError::Internal("session secret must not be empty".into()));
        }
        if secret.len() < 32 {
            warn!("Session secret is shorter than 32 bytes");
        }
        Ok(SessionKeys {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        })
    }

    /// Signs a new token for `subject` valid for `ttl`.
    pub fn issue(&self, subject: &str, role: Role, ttl: Duration) -> MedipalResult<(String, Claims)> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            role,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| MedipalError::Internal(format!("failed to sign session token: {}", e)))?;
        Ok((token, claims))
    }

    /// Verifies signature and expiry. Any failure is `Unauthorized`.
    pub fn decode(&self, token: &str) -> MedipalResult<Claims> {
        self.decode_with(token, true)
    }

    /// Verifies the signature only. Used by logout, which must accept expired tokens.
    pub fn decode_ignoring_expiry(&self, token: &str) -> MedipalResult<Claims> {
        self.decode_with(token, false)
    }

    fn decode_with(&self, token: &str, validate_exp: bool) -> MedipalResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = validate_exp;
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("Rejected session token: {}", e);
                MedipalError::Unauthorized
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_decodes_to_the_same_claims() {
        let keys = SessionKeys::new("a-test-secret-that-is-long-enough-123").unwrap();
        let (token, claims) = keys.issue("REG-1", Role::Doctor, Duration::days(30)).unwrap();
        assert_eq!(keys.decode(&token).unwrap(), claims);
        assert_eq!(claims.exp - claims.iat, Duration::days(30).num_seconds());
    }

    #[test]
    fn foreign_or_tampered_tokens_are_unauthorized() {
        let keys = SessionKeys::new("a-test-secret-that-is-long-enough-123").unwrap();
        let other = SessionKeys::new("another-secret-that-is-long-enough-456").unwrap();
        let (token, _) = other.issue("REG-1", Role::Admin, Duration::hours(1)).unwrap();
        assert!(matches!(keys.decode(&token), Err(MedipalError::Unauthorized)));
        assert!(matches!(keys.decode("not.a.token"), Err(MedipalError::Unauthorized)));
    }

    #[test]
    fn expired_tokens_only_decode_for_logout() {
        let keys = SessionKeys::new("a-test-secret-that-is-long-enough-123").unwrap();
        let (token, _) = keys.issue("REG-1", Role::Doctor, Duration::minutes(-5)).unwrap();
        assert!(keys.decode(&token).is_err());
        assert_eq!(keys.decode_ignoring_expiry(&token).unwrap().sub, "REG-1");
    }

    #[test]
    fn only_verified_doctors_pass_the_doctor_gate() {
        let principal = |role| Principal {
            subject: "REG-1".into(),
            role,
            jti: "j".into(),
        };
        assert_eq!(principal(Role::Doctor).verified_doctor().unwrap(), "REG-1");
        assert!(matches!(
            principal(Role::Unverified).verified_doctor(),
            Err(MedipalError::Forbidden(_))
        ));
        assert!(principal(Role::Admin).verified_doctor().is_err());
        assert!(principal(Role::Admin).is_admin());
    }

    #[test]
    fn empty_secret_is_rejected() {
        assert!(SessionKeys::new("").is_err());
    }
}
