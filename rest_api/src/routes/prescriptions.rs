// rest_api/src/routes/prescriptions.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use models::errors::ValidationError;
use models::medical::{ClaimRequest, Medicine, Prescription, PrescriptionDetails, PrescriptionInput, SignatureRequest};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::ApiResult;
use crate::extract::JsonBody;
use crate::session::{MaybeCaller, VerifiedDoctor};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/medicines", get(list_medicines))
        .route("/prescriptions", post(create).get(list))
        .route("/prescriptions/claim", post(claim))
        .route(
            "/prescriptions/:id",
            get(get_one).put(update).delete(delete),
        )
        .route("/prescriptions/:id/reuse", post(reuse))
        .route("/prescriptions/:id/signature", post(sign))
}

#[derive(Debug, Default, Deserialize)]
struct ListQuery {
    phone: Option<String>,
}

async fn list_medicines(State(state): State<AppState>, _doctor: VerifiedDoctor) -> ApiResult<Json<Vec<Medicine>>> {
    Ok(Json(state.storage.list_medicines().await?))
}

async fn create(
    State(state): State<AppState>,
    VerifiedDoctor(doctor): VerifiedDoctor,
    JsonBody(input): JsonBody<PrescriptionInput>,
) -> ApiResult<(StatusCode, Json<PrescriptionDetails>)> {
    let created = state.storage.create_prescription(&doctor, &input).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `?phone=` lists a patient's prescriptions. Without it a doctor gets
/// their own.
async fn list(
    State(state): State<AppState>,
    caller: MaybeCaller,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<PrescriptionDetails>>> {
    if let Some(phone) = query.phone.as_deref() {
        return Ok(Json(state.storage.list_prescriptions_for_patient(phone).await?));
    }
    match caller.0 {
        Some(principal) => {
            let doctor = principal.verified_doctor()?;
            Ok(Json(state.storage.list_prescriptions_for_doctor(doctor).await?))
        }
        None => Err(ValidationError::missing("phone").into()),
    }
}

async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<PrescriptionDetails>> {
    Ok(Json(state.storage.get_prescription(&id).await?))
}

async fn update(
    State(state): State<AppState>,
    VerifiedDoctor(doctor): VerifiedDoctor,
    Path(id): Path<String>,
    JsonBody(input): JsonBody<PrescriptionInput>,
) -> ApiResult<Json<PrescriptionDetails>> {
    Ok(Json(state.storage.update_prescription(&id, &doctor, &input).await?))
}

/// Anyone may delete a prescription nobody has claimed yet.
async fn delete(State(state): State<AppState>, caller: MaybeCaller, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    state.storage.delete_prescription(&id, caller.doctor()).await?;
    Ok(Json(json!({ "status": "success", "message": "Prescription deleted" })))
}

async fn reuse(
    State(state): State<AppState>,
    VerifiedDoctor(doctor): VerifiedDoctor,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<PrescriptionDetails>)> {
    let copy = state.storage.reuse_prescription(&id, &doctor).await?;
    Ok((StatusCode::CREATED, Json(copy)))
}

async fn sign(
    State(state): State<AppState>,
    VerifiedDoctor(doctor): VerifiedDoctor,
    Path(id): Path<String>,
    JsonBody(body): JsonBody<SignatureRequest>,
) -> ApiResult<Json<Prescription>> {
    Ok(Json(state.storage.sign_prescription(&id, &doctor, body.signature.as_deref()).await?))
}

async fn claim(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<ClaimRequest>,
) -> ApiResult<Json<PrescriptionDetails>> {
    let prescription_id = body.prescription_id.as_deref().unwrap_or_default();
    let phone_number = body.phone_number.as_deref().unwrap_or_default();
    Ok(Json(state.storage.claim_prescription(prescription_id, phone_number).await?))
}
