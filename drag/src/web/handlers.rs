//! Webhook endpoint handler.
//!
//! One handler serves every path. It bounds the body by `Content-Length`,
//! authenticates the raw bytes, then runs the configured command through the
//! execution gate and reports the outcome as a status code.

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use hyper::ext::ReasonPhrase;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::exec::{ExecutionGate, Trigger};
use crate::web::signature::verify_webhook;
use crate::Config;

/// Largest accepted request body.
pub const MAX_REQUEST_LEN: usize = 100 * 1024;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gate: Arc<ExecutionGate>,
}

impl AppState {
    pub fn new(config: Config, gate: Arc<ExecutionGate>) -> Self {
        Self {
            config: Arc::new(config),
            gate,
        }
    }
}

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: &'static str,
}

fn respond(code: StatusCode, status: &'static str) -> Response {
    let mut response = (code, Json(WebhookResponse { status })).into_response();
    if let Some(reason) = reason_phrase(code) {
        response.extensions_mut().insert(reason);
    }
    response
}

/// Status-line phrases webhook senders show in their delivery logs.
fn reason_phrase(code: StatusCode) -> Option<ReasonPhrase> {
    match code {
        StatusCode::FORBIDDEN => Some(ReasonPhrase::from_static(b"Invalid token")),
        StatusCode::INTERNAL_SERVER_ERROR => Some(ReasonPhrase::from_static(b"Command failed")),
        _ => None,
    }
}

/// Webhook endpoint.
///
/// This endpoint:
/// 1. Rejects bodies without a usable `Content-Length` or above [`MAX_REQUEST_LEN`]
/// 2. Reads exactly `Content-Length` bytes
/// 3. Verifies the GitLab token or GitHub signature
/// 4. Runs the command under the gate and returns 200 or 500
pub async fn webhook(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    info!(method = %parts.method, path = %parts.uri.path(), "hook_received");

    let body_length = match content_length(&parts.headers) {
        Some(len) => len,
        None => {
            warn!("hook_content_length_missing");
            return respond(StatusCode::LENGTH_REQUIRED, "length_required");
        }
    };

    if body_length > MAX_REQUEST_LEN {
        warn!(
            body_length = body_length,
            max_length = MAX_REQUEST_LEN,
            "hook_body_too_large"
        );
        return respond(StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large");
    }

    let payload = match read_body(body, body_length).await {
        Ok(payload) => payload,
        Err(e) => {
            warn!(body_length = body_length, error = %e, "hook_body_read_failed");
            return respond(StatusCode::BAD_REQUEST, "bad_request");
        }
    };

    let scheme = match verify_webhook(&state.config.secret, &parts.headers, &payload) {
        Ok(scheme) => scheme,
        Err(e) => {
            error!(error = %e, body_length = payload.len(), "hook_rejected");
            return respond(StatusCode::FORBIDDEN, "invalid_token");
        }
    };
    info!(scheme = ?scheme, body_length = payload.len(), "hook_authenticated");

    // Run on a detached task so a dropped connection cannot cancel the
    // command while it still holds the gate.
    let gate = Arc::clone(&state.gate);
    let config = Arc::clone(&state.config);
    let outcome =
        tokio::spawn(async move { gate.run(&config.command, Trigger::Webhook).await }).await;

    match outcome {
        Ok(Ok(())) => {
            info!(command = %state.config.command, "hook_ran");
            respond(StatusCode::OK, "ok")
        }
        Ok(Err(_)) => {
            error!(command = %state.config.command, "hook_failed");
            respond(StatusCode::INTERNAL_SERVER_ERROR, "command_failed")
        }
        Err(e) => {
            error!(command = %state.config.command, error = %e, "hook_task_aborted");
            respond(StatusCode::INTERNAL_SERVER_ERROR, "command_failed")
        }
    }
}

fn content_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Collect exactly `expected` bytes; anything else is an error.
async fn read_body(body: Body, expected: usize) -> Result<axum::body::Bytes, String> {
    let bytes = to_bytes(body, expected).await.map_err(|e| e.to_string())?;
    if bytes.len() != expected {
        return Err(format!(
            "body length {} does not match Content-Length {}",
            bytes.len(),
            expected
        ));
    }
    Ok(bytes)
}
