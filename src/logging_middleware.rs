// src/logging_middleware.rs
//! Middleware for logging request and response bodies in debug mode

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tracing::debug;

/// Paths whose bodies and query strings carry credentials or login artifacts.
/// These are never logged.
const SENSITIVE_PATHS: &[&str] = &["/login", "/callback", "/logout"];

fn is_sensitive(path: &str) -> bool {
    SENSITIVE_PATHS.iter().any(|p| path == *p)
}

/// Log request and response bodies at debug level, skipping the login
/// handshake endpoints entirely
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    let path = request.uri().path().to_string();
    if is_sensitive(&path) {
        debug!(method = %request.method(), path = %path, "Request (body not logged)");
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if !bytes.is_empty() {
        if let Ok(body_str) = std::str::from_utf8(&bytes) {
            debug!(
                method = %parts.method,
                uri = %parts.uri,
                request_body = %body_str,
                "Request"
            );
        }
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if !bytes.is_empty() {
        if let Ok(body_str) = std::str::from_utf8(&bytes) {
            debug!(
                status = %parts.status,
                path = %path,
                response_body = %body_str,
                "Response"
            );
        }
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}
