// src/logging_middleware.rs
//! Middleware for logging request and response bodies in debug mode.
//! Token fields are masked before they are logged.

use axum::body::to_bytes;
use axum::{body::Body, extract::Request, http::StatusCode, middleware::Next, response::Response};
use tracing::{debug, enabled, Level};

use crate::common::helpers::redact_tokens;

/// Middleware to log request and response bodies in debug mode
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    if !enabled!(Level::DEBUG) {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if let Some(logged) = loggable_body(&bytes) {
        debug!(
            method = %parts.method,
            uri = %parts.uri,
            request_body = %logged,
            "📥 Request"
        );
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if let Some(logged) = loggable_body(&bytes) {
        debug!(
            status = %parts.status,
            response_body = %logged,
            "📤 Response"
        );
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}

/// Pretty-printed JSON with credentials masked. Non-JSON bodies are not
/// logged since they cannot be redacted.
fn loggable_body(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    let mut json = serde_json::from_slice::<serde_json::Value>(bytes).ok()?;
    redact_tokens(&mut json);
    serde_json::to_string_pretty(&json).ok()
}
