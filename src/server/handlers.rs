//! Request handlers for the notification API.

use super::{error::ApiError, AppState};
use crate::dispatch::DispatchOutcome;
use crate::notifier::{ConnectionCheck, Platform};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::instrument;

/// Body of `POST /notify`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct NotifyRequest {
    /// The text to send. Required and non-empty.
    #[serde(default)]
    pub message: Option<String>,
    /// Target platforms. Every registered platform when omitted.
    #[serde(default)]
    pub platforms: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub enabled_platforms: Vec<Platform>,
    pub version: &'static str,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        enabled_platforms: state.dispatcher.registry().platforms(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn test_connections(
    State(state): State<AppState>,
) -> Json<BTreeMap<Platform, ConnectionCheck>> {
    Json(state.dispatcher.test_connections().await)
}

#[instrument(skip_all)]
pub async fn notify(
    State(state): State<AppState>,
    payload: Result<Json<NotifyRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::MalformedBody(rejection.body_text()))?;
    let message = request.message.unwrap_or_default();

    let outcome = state
        .dispatcher
        .notify(&message, request.platforms.as_deref())
        .await?;

    let status = match outcome {
        DispatchOutcome::Delivered(_) => StatusCode::OK,
        DispatchOutcome::AllFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    Ok((status, Json(outcome.into_report())).into_response())
}

pub async fn metrics(State(state): State<AppState>) -> Result<String, ApiError> {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .ok_or(ApiError::NotFound)
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
