// rest_api/src/errors.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use models::errors::{MedipalError, ValidationError};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

/// Error returned by every handler. Wraps the domain error and renders it as
/// `{"status":"error","message":...}`.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] pub MedipalError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError(err.into())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            MedipalError::Validation(_) => StatusCode::BAD_REQUEST,
            MedipalError::NotFound(_) => StatusCode::NOT_FOUND,
            MedipalError::Forbidden(_) => StatusCode::FORBIDDEN,
            MedipalError::Unauthorized | MedipalError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            MedipalError::DuplicateEntity(_) => StatusCode::CONFLICT,
            MedipalError::Upstream(_) => StatusCode::BAD_GATEWAY,
            MedipalError::Storage(_) | MedipalError::Internal(_) | MedipalError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self.0 {
            MedipalError::Validation(e) => json!({
                "status": "error",
                "message": e.to_string(),
                "field": e.field(),
            }),
            MedipalError::Upstream(reason) => {
                warn!("Upstream failure: {}", reason);
                json!({ "status": "error", "message": self.0.to_string() })
            }
            e if status == StatusCode::INTERNAL_SERVER_ERROR => {
                error!("Request failed: {}", e);
                json!({ "status": "error", "message": "Internal server error" })
            }
            e => json!({ "status": "error", "message": e.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_error_kind_has_its_status() {
        let cases = [
            (MedipalError::from(ValidationError::missing("name")), StatusCode::BAD_REQUEST),
            (MedipalError::not_found("doctor REG-1"), StatusCode::NOT_FOUND),
            (MedipalError::forbidden("not yours"), StatusCode::FORBIDDEN),
            (MedipalError::Unauthorized, StatusCode::UNAUTHORIZED),
            (MedipalError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (MedipalError::DuplicateEntity("x".into()), StatusCode::CONFLICT),
            (MedipalError::Upstream("smtp".into()), StatusCode::BAD_GATEWAY),
            (MedipalError::Storage("disk".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (MedipalError::Internal("bug".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).into_response().status(), status);
        }
    }

    #[test]
    fn displays_the_wrapped_error() {
        let err = ApiError::from(MedipalError::not_found("doctor REG-1"));
        assert_eq!(err.to_string(), MedipalError::not_found("doctor REG-1").to_string());
    }
}
