use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use bucketwatch_core::{mask_secret, S3Settings};
use bucketwatch_s3::{ObjectStore, S3Client};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{info, warn};

/// The resolved connection settings with the secret masked, plus a
/// live probe of the endpoint they point at.
pub async fn get_settings_handler(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let saved = state.config.load_settings()?;
    let resolved = S3Settings::resolve(saved.as_ref());

    let connection = probe(&resolved).await;

    Ok(Json(json!({
        "endpoint_url": resolved.endpoint_url,
        "access_key": resolved.access_key,
        "secret_key": mask_secret(&resolved.secret_key),
        "region": resolved.region,
        "connection": connection,
    })))
}

#[derive(Debug, Deserialize)]
pub struct SettingsRequest {
    pub endpoint_url: String,
    pub access_key: String,
    pub secret_key: String,
    #[serde(default)]
    pub region: String,
}

/// Persists new connection settings, then swaps the live client if the
/// endpoint answers. Settings are saved even when the probe fails, the
/// same way the configuration screen always worked: fix the endpoint
/// later without retyping credentials.
pub async fn put_settings_handler(
    State(state): State<AppState>,
    Json(request): Json<SettingsRequest>,
) -> Result<Json<Value>, ApiError> {
    if request.endpoint_url.trim().is_empty()
        || request.access_key.trim().is_empty()
        || request.secret_key.trim().is_empty()
    {
        return Err(ApiError::bad_request(
            "endpoint_url, access_key and secret_key are required.",
        ));
    }

    let settings = S3Settings {
        endpoint_url: request.endpoint_url.trim().to_string(),
        access_key: request.access_key.trim().to_string(),
        secret_key: request.secret_key.trim().to_string(),
        region: if request.region.trim().is_empty() {
            "us-east-1".to_string()
        } else {
            request.region.trim().to_string()
        },
    };

    state.config.save_settings(&settings)?;
    info!(endpoint = %settings.endpoint_url, "connection settings saved");

    let connection = match S3Client::connect(&settings).await {
        Ok(client) => {
            state.replace_store(Arc::new(client) as Arc<dyn ObjectStore>).await;
            json!({ "status": "connected" })
        }
        Err(e) => {
            warn!(error = %e, "saved settings do not connect");
            json!({ "status": "failed", "error": e.to_string() })
        }
    };

    Ok(Json(json!({ "saved": true, "connection": connection })))
}

async fn probe(settings: &S3Settings) -> Value {
    match S3Client::connect(settings).await {
        Ok(_) => json!({ "status": "connected" }),
        Err(e) => json!({ "status": "failed", "error": e.to_string() }),
    }
}
