use axum::{
    body::Bytes,
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use http::{
    header::{ALLOW, CONTENT_TYPE},
    HeaderName, StatusCode,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

use super::jsonrpc::{self, Request, RpcError, INVALID_REQUEST, PARSE_ERROR};
use super::{mcp, AppState};
use crate::metrics::gather_metrics;

pub const SESSION_HEADER: &str = "mcp-session-id";

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

pub async fn metrics() -> Response {
    match gather_metrics() {
        Ok(text) => ([(CONTENT_TYPE, "text/plain; version=0.0.4")], text).into_response(),
        Err(e) => {
            error!("Failed to gather metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// The server never opens a stream of its own.
pub async fn mcp_stream() -> Response {
    (StatusCode::METHOD_NOT_ALLOWED, [(ALLOW, "POST")]).into_response()
}

fn rejected(status: StatusCode, id: Value, error: RpcError) -> Response {
    (status, Json(jsonrpc::Response::failure(id, error))).into_response()
}

pub async fn mcp_message(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            return rejected(
                StatusCode::BAD_REQUEST,
                Value::Null,
                RpcError::new(PARSE_ERROR, format!("Parse error: {}", e)),
            )
        }
    };

    if value.is_array() {
        return rejected(
            StatusCode::BAD_REQUEST,
            Value::Null,
            RpcError::new(INVALID_REQUEST, "Batch requests are not supported"),
        );
    }

    let request: Request = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => {
            return rejected(
                StatusCode::BAD_REQUEST,
                Value::Null,
                RpcError::new(INVALID_REQUEST, format!("Invalid request: {}", e)),
            )
        }
    };

    if request.jsonrpc != "2.0" {
        return rejected(
            StatusCode::BAD_REQUEST,
            request.id.unwrap_or(Value::Null),
            RpcError::new(INVALID_REQUEST, "jsonrpc must be \"2.0\""),
        );
    }

    if request.is_notification() {
        debug!("Notification {}", request.method);
        return StatusCode::ACCEPTED.into_response();
    }

    let id = request.id.unwrap_or(Value::Null);
    let result = mcp::dispatch(&state.registry, &request.method, request.params).await;
    let initialized = request.method == "initialize" && result.is_ok();
    let response = Json(jsonrpc::Response::from_result(id, result));

    if initialized {
        let session = Uuid::new_v4().to_string();
        info!("Started session {}", session);
        return ([(HeaderName::from_static(SESSION_HEADER), session)], response).into_response();
    }
    response.into_response()
}
