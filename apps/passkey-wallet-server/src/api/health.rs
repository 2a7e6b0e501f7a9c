// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    /// Network backend in use ("real" or "mock").
    pub backend: String,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    /// Whether the service process is running.
    pub service: String,
    /// Wallet registry availability.
    pub registry: String,
    /// Ceremonies waiting for a browser response.
    pub pending_ceremonies: usize,
}

/// Health check endpoint handler.
///
/// Returns 200 when the registry is readable, 503 otherwise.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 503, description = "Service is unhealthy", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let registry_ok = state.registry.check().is_ok();

    let response = HealthResponse {
        status: if registry_ok { "ok" } else { "degraded" }.to_string(),
        backend: state.backend.to_string(),
        checks: HealthChecks {
            service: "ok".to_string(),
            registry: if registry_ok { "ok" } else { "unavailable" }.to_string(),
            pending_ceremonies: state.bridge.pending(),
        },
    };

    let status = if registry_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(response))
}
