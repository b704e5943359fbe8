// rest_api/src/routes/admin.rs

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use models::errors::MedipalError;
use models::medical::{
    AdminLogin, Doctor, DoctorUpdate, EmergencyContact, Medicine, NewEmergencyContact, NewMedicine, Pagination, Patient,
};
use notifications_service::templates;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::errors::ApiResult;
use crate::extract::JsonBody;
use crate::routes::doctors::logout;
use crate::session::{session_cookie, with_cookie, AdminUser};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin/login", post(login))
        .route("/admin/logout", post(logout))
        .route("/admin/doctors", get(list_doctors))
        .route(
            "/admin/doctors/:id",
            get(get_doctor).patch(update_doctor).delete(delete_doctor),
        )
        .route("/admin/doctors/:id/verify", post(toggle_verification))
        .route("/admin/patients", get(list_patients))
        .route("/admin/patients/:id", axum::routing::delete(delete_patient))
        .route("/admin/patients/:id/contacts", get(list_contacts).post(add_contact))
        .route("/admin/medicines", post(add_medicine))
}

async fn login(State(state): State<AppState>, JsonBody(form): JsonBody<AdminLogin>) -> ApiResult<impl IntoResponse> {
    let grant = security::login_admin(&form, &state.storage, &state.keys).await?;
    let headers = with_cookie(HeaderMap::new(), session_cookie(&grant.token, grant.expires_at));
    Ok((headers, Json(grant)))
}

async fn list_doctors(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<Doctor>>> {
    Ok(Json(state.storage.list_doctors(page).await?))
}

async fn get_doctor(State(state): State<AppState>, _admin: AdminUser, Path(id): Path<String>) -> ApiResult<Json<Doctor>> {
    let doctor = state
        .storage
        .get_doctor(&id)
        .await?
        .ok_or_else(|| MedipalError::not_found(format!("doctor {}", id)))?;
    Ok(Json(doctor))
}

async fn update_doctor(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    JsonBody(update): JsonBody<DoctorUpdate>,
) -> ApiResult<Json<Doctor>> {
    Ok(Json(state.storage.update_doctor(&id, &update).await?))
}

async fn delete_doctor(State(state): State<AppState>, AdminUser(admin): AdminUser, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    state.storage.delete_doctor(&id).await?;
    info!("Admin {} deleted doctor {}", admin.subject, id);
    Ok(Json(json!({ "status": "success", "message": format!("Doctor {} deleted", id) })))
}

/// Mails the doctor their new verification status. The toggle has already
/// committed, so every failure here is only logged.
async fn notify_verification(state: &AppState, id: &str, is_verified: bool) {
    let doctor = match state.storage.get_doctor(id).await {
        Ok(Some(doctor)) => doctor,
        Ok(None) => {
            warn!("Doctor {} vanished before the verification notice was sent", id);
            return;
        }
        Err(e) => {
            warn!("Could not load doctor {} for the verification notice: {}", id, e);
            return;
        }
    };
    if let Err(e) = state.mailer.send(templates::verification_status(&doctor, is_verified)).await {
        warn!("Verification notice for {} was not delivered: {}", id, e);
    }
}

/// Flips verification, then tells the doctor by mail.
async fn toggle_verification(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let is_verified = state.storage.toggle_doctor_verification(&id).await?;
    info!("Admin {} set verification of {} to {}", admin.subject, id, is_verified);

    notify_verification(&state, &id, is_verified).await;

    Ok(Json(json!({
        "message": format!(
            "Doctor verification status updated to {}",
            if is_verified { "verified" } else { "unverified" }
        ),
        "isVerified": is_verified,
    })))
}

async fn list_patients(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<Patient>>> {
    Ok(Json(state.storage.list_patients(page).await?))
}

async fn delete_patient(State(state): State<AppState>, AdminUser(admin): AdminUser, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    state.storage.delete_patient(&id).await?;
    info!("Admin {} deleted patient {}", admin.subject, id);
    Ok(Json(json!({ "status": "success", "message": format!("Patient {} deleted", id) })))
}

async fn list_contacts(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<EmergencyContact>>> {
    Ok(Json(state.storage.list_emergency_contacts(&id).await?))
}

async fn add_contact(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    JsonBody(contact): JsonBody<NewEmergencyContact>,
) -> ApiResult<(StatusCode, Json<EmergencyContact>)> {
    let contact = state.storage.add_emergency_contact(&id, &contact).await?;
    Ok((StatusCode::CREATED, Json(contact)))
}

async fn add_medicine(
    State(state): State<AppState>,
    _admin: AdminUser,
    JsonBody(medicine): JsonBody<NewMedicine>,
) -> ApiResult<(StatusCode, Json<Medicine>)> {
    let medicine = state.storage.add_medicine(&medicine).await?;
    Ok((StatusCode::CREATED, Json(medicine)))
}
