// ==========================================
// LUCI 线索编排系统 - HTTP 路由
// ==========================================
// 路由:
// - POST /api/luci/orchestrate        enrich / push
// - POST /api/webhook/skip-trace      批量反查回填
// - GET  /api/leads/:lead_id/attempts 触达历史
// - GET  /health                      存活检查
// 错误体统一为 {"error": string}，状态码由 ApiError 决定
// ==========================================

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, warn};

use crate::api::{ApiError, BulkWebhookPayload};
use crate::app::state::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!(code = self.error_code(), error = %self, "请求处理失败");
        } else {
            warn!(code = self.error_code(), error = %self, "请求被拒绝");
        }
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}

fn parse_json(body: &Bytes) -> Result<Value, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::InvalidInput(format!("请求体不是合法 JSON: {}", e)))
}

/// POST /api/luci/orchestrate
async fn orchestrate(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Json<Value>, ApiError> {
    let body = parse_json(&body)?;
    let response = state.orchestrate_api.orchestrate(body).await?;
    Ok(Json(response))
}

/// POST /api/webhook/skip-trace
async fn skip_trace_webhook(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Response, ApiError> {
    let body = parse_json(&body)?;
    let payload: BulkWebhookPayload = serde_json::from_value(body)
        .map_err(|e| ApiError::InvalidInput(format!("webhook 负载格式错误: {}", e)))?;
    let response = state.orchestrate_api.resolve_bulk_job(payload).await?;
    Ok(Json(response).into_response())
}

/// GET /api/leads/:lead_id/attempts
async fn lead_attempts(
    State(state): State<Arc<AppState>>,
    Path(lead_id): Path<String>,
) -> Result<Response, ApiError> {
    let response = state.orchestrate_api.attempt_history(&lead_id)?;
    Ok(Json(response).into_response())
}

/// GET /health
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": crate::VERSION }))
}

/// 构建路由
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/luci/orchestrate", post(orchestrate))
        .route("/api/webhook/skip-trace", post(skip_trace_webhook))
        .route("/api/leads/:lead_id/attempts", get(lead_attempts))
        .route("/health", get(health))
        .with_state(state)
}
