// rest_api/src/extract.rs

use axum::extract::{rejection::JsonRejection, FromRequest};
use models::errors::ValidationError;

use crate::errors::ApiError;

/// JSON request body. A body that is not JSON, or does not fit `T`, is a
/// validation error on the `body` field instead of axum's plain-text 422.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct JsonBody<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ValidationError::invalid("body", rejection.body_text()).into()
    }
}
