use crate::state::AppState;
use crate::{SERVICE_NAME, VERSION};
use axum::extract::State;
use axum::Json;
use bucketwatch_s3::ObjectStore;
use serde_json::{json, Value};

pub async fn landing_handler() -> Json<Value> {
    Json(json!({
        "name": SERVICE_NAME,
        "version": VERSION,
    }))
}

/// Process liveness plus a live probe of the configured endpoint.
pub async fn healthz_handler(State(state): State<AppState>) -> Json<Value> {
    let s3 = match state.store_if_configured().await {
        None => json!({ "status": "unconfigured" }),
        Some(store) => match store.check().await {
            Ok(()) => json!({ "status": "connected" }),
            Err(e) => json!({ "status": "error", "error": e.to_string() }),
        },
    };

    Json(json!({
        "status": "ok",
        "s3": s3,
    }))
}
