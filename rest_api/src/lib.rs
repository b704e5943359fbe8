// rest_api/src/lib.rs

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Error as AnyhowError};
use axum::{
    extract::State,
    http::{header, Method},
    routing::get,
    Json, Router,
};
use notifications_service::{LogMailer, Mailer, SmtpMailer};
use security::SessionKeys;
use serde_json::{json, Value};
use storage::Storage;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub mod config;
pub mod errors;
pub mod extract;
pub mod file_host;
pub mod routes;
pub mod session;

pub use crate::config::{load_app_config, AppConfig};
pub use crate::errors::{ApiError, ApiResult};
pub use crate::extract::JsonBody;
pub use crate::file_host::{CloudinaryHost, FileHost, UnconfiguredHost, UploadedFile};

/// Shared state for the Axum application.
#[derive(Clone)]
pub struct AppState {
    pub storage: Storage,
    pub keys: SessionKeys,
    pub mailer: Arc<dyn Mailer>,
    pub file_host: Arc<dyn FileHost>,
}

impl AppState {
    /// Connects the database and picks the mail and upload backends. Missing
    /// SMTP or image host settings select stand-ins that fail each call.
    pub async fn from_config(config: &AppConfig) -> Result<Self, AnyhowError> {
        let storage = Storage::connect(&config.database_url)
            .await
            .with_context(|| format!("Failed to open database {}", config.database_url))?;
        let keys = SessionKeys::new(&config.session_secret).context("Invalid session secret")?;

        let mailer: Arc<dyn Mailer> = match config.smtp_settings() {
            Some(settings) => Arc::new(SmtpMailer::new(&settings).context("Invalid SMTP settings")?),
            None => {
                warn!("SMTP is not configured, outgoing mail will be logged and dropped");
                Arc::new(LogMailer)
            }
        };
        let file_host: Arc<dyn FileHost> = match config.cloudinary_settings() {
            Some(settings) => Arc::new(CloudinaryHost::new(settings).context("Invalid image host settings")?),
            None => {
                warn!("Image host is not configured, uploads will fail");
                Arc::new(UnconfiguredHost)
            }
        };

        Ok(AppState {
            storage,
            keys,
            mailer,
            file_host,
        })
    }
}

async fn health_check_handler(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    state.storage.ping().await?;
    Ok(Json(json!({ "status": "ok", "message": "Medipal API is healthy" })))
}

/// Every route of the API, without transport layers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check_handler))
        .merge(routes::doctors::router())
        .merge(routes::admin::router())
        .merge(routes::prescriptions::router())
        .merge(routes::password_reset::router())
        .merge(routes::uploads::router())
        .with_state(state)
}

/// Serves the API on `bind_address` until `shutdown` resolves.
pub async fn start_server(
    state: AppState,
    bind_address: &str,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), AnyhowError> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_origin(Any);

    let app = router(state).layer(TraceLayer::new_for_http()).layer(cors);

    let listener = TcpListener::bind(bind_address)
        .await
        .context(format!("Failed to bind to address: {}", bind_address))?;
    info!("Medipal API listening on {}", bind_address);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
        .context("Medipal API server failed")?;

    info!("Medipal API stopped");
    Ok(())
}
