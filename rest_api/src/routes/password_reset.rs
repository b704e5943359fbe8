// rest_api/src/routes/password_reset.rs

use axum::{extract::State, routing::post, Json, Router};
use models::medical::{OtpRequest, OtpVerification};
use serde_json::{json, Value};

use crate::errors::ApiResult;
use crate::extract::JsonBody;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/password-reset", post(request_code).put(verify_code))
}

async fn request_code(State(state): State<AppState>, JsonBody(request): JsonBody<OtpRequest>) -> ApiResult<Json<Value>> {
    security::request_password_reset(&request, &state.storage, state.mailer.as_ref()).await?;
    Ok(Json(json!({ "status": "success", "message": "OTP sent to your email" })))
}

async fn verify_code(State(state): State<AppState>, JsonBody(verification): JsonBody<OtpVerification>) -> ApiResult<Json<Value>> {
    security::reset_password(&verification, &state.storage).await?;
    Ok(Json(json!({ "status": "success", "message": "Password updated successfully" })))
}
