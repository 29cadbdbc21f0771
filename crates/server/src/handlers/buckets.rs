use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use bucketwatch_s3::ObjectStore;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct CreateBucketRequest {
    pub name: String,
}

pub async fn list_buckets_handler(
    State(state): State<AppState>,
) -> Result<Json<Value>, ApiError> {
    let store = state.store().await?;
    let buckets = store.list_buckets().await?;
    Ok(Json(json!({ "buckets": buckets })))
}

pub async fn create_bucket_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateBucketRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::bad_request("Bucket name cannot be empty."));
    }

    let store = state.store().await?;
    store.create_bucket(name).await?;
    info!(bucket = name, "bucket created");

    Ok((StatusCode::CREATED, Json(json!({ "bucket": name }))))
}

pub async fn delete_bucket_handler(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> Result<StatusCode, ApiError> {
    let store = state.store().await?;
    store.delete_bucket(&bucket).await?;
    info!(bucket = %bucket, "bucket deleted");

    Ok(StatusCode::NO_CONTENT)
}
