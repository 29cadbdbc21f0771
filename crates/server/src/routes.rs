use crate::handlers;
use crate::state::AppState;
use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, post, put};
use axum::Router;
use tracing::debug;
use uuid::Uuid;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::landing_handler))
        .route("/healthz", get(handlers::health::healthz_handler))
        .route(
            "/api/buckets",
            get(handlers::buckets::list_buckets_handler)
                .post(handlers::buckets::create_bucket_handler),
        )
        .route(
            "/api/buckets/:bucket",
            delete(handlers::buckets::delete_bucket_handler),
        )
        .route(
            "/api/buckets/:bucket/objects",
            get(handlers::objects::list_objects_handler),
        )
        .route(
            "/api/buckets/:bucket/objects/*key",
            put(handlers::objects::upload_handler).get(handlers::objects::download_handler),
        )
        .route(
            "/api/buckets/:bucket/delete",
            post(handlers::objects::delete_objects_handler),
        )
        .route(
            "/api/settings/s3",
            get(handlers::settings::get_settings_handler)
                .put(handlers::settings::put_settings_handler),
        )
        .route(
            "/api/notifications",
            get(handlers::notifications::list_rules_handler),
        )
        .route(
            "/api/notifications/:bucket",
            get(handlers::notifications::get_rule_handler)
                .put(handlers::notifications::put_rule_handler)
                .delete(handlers::notifications::disable_rule_handler),
        )
        .layer(middleware::from_fn(request_id_middleware))
        .with_state(state)
}

/// Tags every request with an id (honoring one the caller sent) and
/// echoes it back on the response.
async fn request_id_middleware(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    debug!(
        request_id = %request_id,
        method = %request.method(),
        path = %request.uri().path(),
        "request received"
    );

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}
