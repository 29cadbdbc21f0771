use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use bucketwatch_core::PollingRule;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

pub async fn list_rules_handler(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let table = state.config.load_polling()?;
    Ok(Json(json!(table)))
}

pub async fn get_rule_handler(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> Result<Json<PollingRule>, ApiError> {
    let table = state.config.load_polling()?;
    table
        .get(&bucket)
        .cloned()
        .map(Json)
        .ok_or_else(|| rule_not_found(&bucket))
}

#[derive(Debug, Deserialize)]
pub struct RuleRequest {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub webhook_url: String,
}

fn default_enabled() -> bool {
    true
}

pub async fn put_rule_handler(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
    Json(request): Json<RuleRequest>,
) -> Result<Json<PollingRule>, ApiError> {
    if request.webhook_url.trim().is_empty() {
        return Err(ApiError::bad_request("Webhook URL cannot be empty."));
    }

    let rule = PollingRule {
        enabled: request.enabled,
        webhook_url: request.webhook_url.trim().to_string(),
    };

    let mut table = state.config.load_polling()?;
    table.insert(bucket.clone(), rule.clone());
    state.config.save_polling(&table)?;

    info!(bucket = %bucket, enabled = rule.enabled, "notification rule saved");
    Ok(Json(rule))
}

/// Disabling keeps the rule (and its webhook URL) so re-enabling is a
/// one-field change.
pub async fn disable_rule_handler(
    State(state): State<AppState>,
    Path(bucket): Path<String>,
) -> Result<Json<PollingRule>, ApiError> {
    let mut table = state.config.load_polling()?;

    let rule = table.get_mut(&bucket).ok_or_else(|| rule_not_found(&bucket))?;
    rule.enabled = false;
    let disabled = rule.clone();
    state.config.save_polling(&table)?;

    info!(bucket = %bucket, "notification rule disabled");
    Ok(Json(disabled))
}

fn rule_not_found(bucket: &str) -> ApiError {
    ApiError::not_found(
        "RuleNotFound",
        format!("No notification rule for bucket '{}'", bucket),
    )
}
