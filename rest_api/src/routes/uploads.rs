// rest_api/src/routes/uploads.rs

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use models::errors::{MedipalError, ValidationError};
use serde_json::{json, Value};
use tracing::debug;

use crate::errors::{ApiError, ApiResult};
use crate::file_host::{UploadedFile, LICENSE_FOLDER, UPLOADS_FOLDER};
use crate::AppState;

pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/uploads", post(upload))
        .route("/uploads/license", post(upload_license))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// The first `file` field of the form.
async fn file_field(mut multipart: Multipart) -> ApiResult<UploadedFile> {
    let invalid = |e: axum::extract::multipart::MultipartError| -> ApiError {
        ValidationError::invalid("file", e.body_text()).into()
    };
    while let Some(field) = multipart.next_field().await.map_err(invalid)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(invalid)?;
        if bytes.is_empty() {
            break;
        }
        debug!("Received {} ({} bytes)", file_name, bytes.len());
        return Ok(UploadedFile {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }
    Err(ValidationError::missing("file").into())
}

async fn store(state: &AppState, folder: &str, multipart: Multipart) -> ApiResult<Json<Value>> {
    let file = file_field(multipart).await?;
    let url = state.file_host.upload(folder, file).await?;
    if url.is_empty() {
        return Err(MedipalError::Upstream("image host returned no URL".into()).into());
    }
    Ok(Json(json!({ "url": url })))
}

async fn upload(State(state): State<AppState>, multipart: Multipart) -> ApiResult<Json<Value>> {
    store(&state, UPLOADS_FOLDER, multipart).await
}

/// Used by the registration form, before the doctor has an account.
async fn upload_license(State(state): State<AppState>, multipart: Multipart) -> ApiResult<Json<Value>> {
    store(&state, LICENSE_FOLDER, multipart).await
}
