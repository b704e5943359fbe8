// rest_api/src/session.rs

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{
        header::{AUTHORIZATION, COOKIE, SET_COOKIE},
        request::Parts,
        HeaderMap, HeaderValue,
    },
};
use chrono::{DateTime, Utc};
use models::errors::MedipalError;
use models::medical::Role;
use security::Principal;
use tracing::debug;

use crate::errors::ApiError;
use crate::AppState;

pub const SESSION_COOKIE: &str = "medipal_session";

/// Session token from the request. The bearer header wins over the cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value carrying a freshly issued token.
pub fn session_cookie(token: &str, expires_at: DateTime<Utc>) -> Option<HeaderValue> {
    let max_age = (expires_at - Utc::now()).num_seconds().max(0);
    HeaderValue::from_str(&format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age
    ))
    .ok()
}

/// `Set-Cookie` value that removes the session cookie.
pub fn cleared_cookie() -> HeaderValue {
    HeaderValue::from_static("medipal_session=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0")
}

pub fn with_cookie(mut headers: HeaderMap, cookie: Option<HeaderValue>) -> HeaderMap {
    if let Some(cookie) = cookie {
        headers.insert(SET_COOKIE, cookie);
    }
    headers
}

async fn principal_from(parts: &Parts, state: &AppState) -> Result<Principal, ApiError> {
    let token = token_from_headers(&parts.headers).ok_or(MedipalError::Unauthorized)?;
    Ok(security::authenticate(&token, &state.storage, &state.keys).await?)
}

/// Any signed-in caller.
#[derive(Debug, Clone)]
pub struct Caller(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        principal_from(parts, state).await.map(Caller)
    }
}

/// The caller if the request carries a valid session, anonymous otherwise.
#[derive(Debug, Clone)]
pub struct MaybeCaller(pub Option<Principal>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeCaller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if token_from_headers(&parts.headers).is_none() {
            return Ok(MaybeCaller(None));
        }
        match principal_from(parts, state).await {
            Ok(principal) => Ok(MaybeCaller(Some(principal))),
            Err(ApiError(MedipalError::Unauthorized)) => {
                debug!("Stale session on {}, treating caller as anonymous", parts.uri.path());
                Ok(MaybeCaller(None))
            }
            Err(e) => Err(e),
        }
    }
}

impl MaybeCaller {
    /// Registration number when the caller is a doctor, verified or not.
    pub fn doctor(&self) -> Option<&str> {
        self.0
            .as_ref()
            .filter(|p| p.role != Role::Admin)
            .map(|p| p.subject.as_str())
    }
}

/// A doctor whose account is verified. Holds the registration number.
#[derive(Debug, Clone)]
pub struct VerifiedDoctor(pub String);

#[async_trait]
impl FromRequestParts<AppState> for VerifiedDoctor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let principal = principal_from(parts, state).await?;
        Ok(VerifiedDoctor(principal.verified_doctor()?.to_string()))
    }
}

/// A doctor, verified or not. Used for the doctor's own profile.
#[derive(Debug, Clone)]
pub struct AnyDoctor(pub String);

#[async_trait]
impl FromRequestParts<AppState> for AnyDoctor {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let principal = principal_from(parts, state).await?;
        if principal.is_admin() {
            return Err(MedipalError::forbidden("doctor access required").into());
        }
        Ok(AnyDoctor(principal.subject))
    }
}

#[derive(Debug, Clone)]
pub struct AdminUser(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let principal = principal_from(parts, state).await?;
        if !principal.is_admin() {
            return Err(MedipalError::forbidden("admin access required").into());
        }
        Ok(AdminUser(principal))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; medipal_session=from-cookie"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("from-cookie"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("from-header"));
    }

    #[test]
    fn empty_values_are_no_token() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        headers.insert(COOKIE, HeaderValue::from_static("medipal_session="));
        assert!(token_from_headers(&headers).is_none());
    }

    #[test]
    fn cookie_is_http_only() {
        let cookie = session_cookie("abc", Utc::now() + chrono::Duration::days(1)).unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("medipal_session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cleared_cookie().to_str().unwrap().contains("Max-Age=0"));
    }
}
