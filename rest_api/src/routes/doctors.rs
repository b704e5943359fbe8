// rest_api/src/routes/doctors.rs

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};
use models::medical::{Doctor, DoctorLogin, DoctorUpdate, NewDoctor};
use serde_json::{json, Value};

use crate::errors::ApiResult;
use crate::extract::JsonBody;
use crate::session::{cleared_cookie, session_cookie, token_from_headers, with_cookie, AnyDoctor, Caller};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/session", get(current_session))
        .route("/doctors/me", patch(update_me))
}

async fn register(State(state): State<AppState>, JsonBody(form): JsonBody<NewDoctor>) -> ApiResult<(StatusCode, Json<Doctor>)> {
    let doctor = security::register_doctor(&form, &state.storage).await?;
    Ok((StatusCode::CREATED, Json(doctor)))
}

async fn login(State(state): State<AppState>, JsonBody(form): JsonBody<DoctorLogin>) -> ApiResult<impl IntoResponse> {
    let grant = security::login_doctor(&form, &state.storage, &state.keys).await?;
    let headers = with_cookie(HeaderMap::new(), session_cookie(&grant.token, grant.expires_at));
    Ok((headers, Json(grant)))
}

/// Shared by doctors and admins. Always succeeds and clears the cookie.
pub(crate) async fn logout(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<impl IntoResponse> {
    let token = token_from_headers(&headers);
    security::logout(token.as_deref(), &state.storage, &state.keys).await?;
    let headers = with_cookie(HeaderMap::new(), Some(cleared_cookie()));
    Ok((headers, Json(json!({ "status": "success", "message": "Logged out" }))))
}

async fn current_session(Caller(principal): Caller) -> Json<Value> {
    Json(json!({
        "role": principal.role,
        "subject": principal.subject,
    }))
}

async fn update_me(
    State(state): State<AppState>,
    AnyDoctor(registration_no): AnyDoctor,
    JsonBody(update): JsonBody<DoctorUpdate>,
) -> ApiResult<Json<Doctor>> {
    Ok(Json(state.storage.update_doctor(&registration_no, &update).await?))
}
