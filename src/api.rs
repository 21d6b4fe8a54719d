//! HTTP API exposing the IMEI check to other services.
//!
//! `POST /api/check-imei` with `{"imei": "...", "token": "..."}`. The token
//! is compared against the configured shared secret before anything else;
//! the verification service's answer is relayed as-is with status 200.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::imei::Imei;
use crate::verifier::ImeiChecker;

pub struct ApiState {
    auth_token: String,
    checker: Arc<dyn ImeiChecker>,
}

impl ApiState {
    pub fn new(auth_token: impl Into<String>, checker: Arc<dyn ImeiChecker>) -> Self {
        Self {
            auth_token: auth_token.into(),
            checker,
        }
    }
}

// Fields are loose JSON so wrong types reach the checks below instead of
// failing deserialization.
#[derive(Debug, Deserialize)]
struct CheckImeiRequest {
    #[serde(default)]
    imei: Value,
    #[serde(default)]
    token: Value,
}

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message })))
}

async fn check_imei(
    State(state): State<Arc<ApiState>>,
    payload: Result<Json<CheckImeiRequest>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let Json(body) = match payload {
        Ok(body) => body,
        Err(rejection) => {
            warn!("Rejected /api/check-imei body: {}", rejection.body_text());
            return error_response(StatusCode::BAD_REQUEST, "Invalid request body");
        }
    };

    if body.token.as_str() != Some(state.auth_token.as_str()) {
        warn!("Rejected /api/check-imei call with bad token");
        return error_response(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    let imei = match body.imei.as_str().and_then(Imei::parse) {
        Some(imei) => imei,
        None => return error_response(StatusCode::BAD_REQUEST, "Invalid IMEI"),
    };

    info!("API check for IMEI {}", imei);
    let result = state.checker.check(&imei).await;
    (StatusCode::OK, Json(result.to_json()))
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/check-imei", post(check_imei))
        .with_state(state)
}

/// Bind `addr` and serve the API until the process exits.
pub async fn serve(state: Arc<ApiState>, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind HTTP listener on {}", addr))?;

    info!("HTTP API listening on {}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .await
        .context("HTTP server error")
}
