use crate::content_type::guess_content_type;
use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bucketwatch_core::sanitize_object_key;
use bucketwatch_s3::ObjectStore;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub prefix: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Breadcrumb {
    pub name: String,
    pub prefix: String,
}

/// Builds the navigation trail for a prefix: the bucket root followed
/// by one crumb per path segment, each carrying the prefix that lists
/// it.
pub fn breadcrumbs(bucket: &str, prefix: &str) -> Vec<Breadcrumb> {
    let mut crumbs = vec![Breadcrumb {
        name: bucket.to_string(),
        prefix: String::new(),
    }];

    let mut current = String::new();
    for part in prefix.trim_matches('/').split('/') {
        if part.is_empty() {
            continue;
        }
        current.push_str(part);
        current.push('/');
        crumbs.push(Breadcrumb {
            name: part.to_string(),
            prefix: current.clone(),
        });
    }

    crumbs
}

pub async fn list_objects_handler(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let store = state.store().await?;
    let listing = store.list_dir(&bucket, &query.prefix).await?;

    Ok(Json(json!({
        "bucket": bucket,
        "prefix": query.prefix,
        "folders": listing.folders,
        "objects": listing.objects,
        "breadcrumbs": breadcrumbs(&bucket, &query.prefix),
    })))
}

pub async fn upload_handler(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let clean_key = sanitize_object_key(&key)?;

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_else(|| guess_content_type(&clean_key))
        .to_string();

    let size = body.len();
    let store = state.store().await?;
    store
        .put_object(&bucket, &clean_key, body, &content_type)
        .await?;

    info!(
        bucket = %bucket,
        key = %clean_key,
        bytes = size,
        content_type = %content_type,
        "object uploaded"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({ "key": clean_key, "bytes": size })),
    ))
}

pub async fn download_handler(
    State(state): State<AppState>,
    Path((bucket, key)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let store = state.store().await?;
    let object = store.get_object(&bucket, &key).await?;

    let content_type = object
        .content_type
        .unwrap_or_else(|| guess_content_type(&key).to_string());
    let filename = key.rsplit('/').next().unwrap_or(&key).to_string();

    let headers = [
        (header::CONTENT_TYPE, content_type),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        ),
    ];

    Ok((headers, object.body).into_response())
}

#[derive(Debug, Deserialize)]
pub struct DeleteObjectsRequest {
    pub keys: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteItemError {
    pub key: String,
    pub message: String,
}

/// Deletes a mixed selection: keys ending in `/` are treated as
/// folders and removed recursively, the rest as single objects. Each
/// item fails independently; the response reports the total removed
/// plus per-item errors.
pub async fn delete_objects_handler(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
    Json(request): Json<DeleteObjectsRequest>,
) -> Result<Json<Value>, ApiError> {
    let store = state.store().await?;

    let mut deleted = 0usize;
    let mut errors: Vec<DeleteItemError> = Vec::new();

    for key in &request.keys {
        if key.ends_with('/') {
            match store.delete_prefix(&bucket, key).await {
                Ok(count) => deleted += count,
                Err(e) => errors.push(DeleteItemError {
                    key: key.clone(),
                    message: format!("Failed to delete folder '{}': {}", key, e),
                }),
            }
        } else {
            match store.delete_object(&bucket, key).await {
                Ok(()) => deleted += 1,
                Err(e) => errors.push(DeleteItemError {
                    key: key.clone(),
                    message: format!("Failed to delete file '{}': {}", key, e),
                }),
            }
        }
    }

    if deleted > 0 {
        info!(bucket = %bucket, deleted, "objects deleted");
    }

    Ok(Json(json!({ "deleted": deleted, "errors": errors })))
}
