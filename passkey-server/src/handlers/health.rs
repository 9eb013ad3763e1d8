//! Health check handlers
//!
//! Provides health and readiness endpoints for monitoring and orchestration.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    #[schema(example = "healthy")]
    pub status: String,
    /// Server version from Cargo.toml
    #[schema(example = "0.1.0")]
    pub version: String,
    /// Service name
    #[schema(example = "passkey-server")]
    pub service: String,
    /// Relying Party ID served
    #[schema(example = "localhost")]
    pub rp_id: String,
    /// Challenges awaiting a finish call
    pub pending_challenges: usize,
}

/// GET /health - Health check endpoint
///
/// Returns JSON with service status, version, and challenge store occupancy.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let stats = state.engine.challenge_stats();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        service: "passkey-server".to_string(),
        rp_id: state.engine.relying_party().id().to_string(),
        pending_challenges: stats.pending,
    })
}

/// Readiness response for Kubernetes
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ReadyResponse {
    /// Whether the service is ready to accept traffic
    pub ready: bool,
    /// Optional message explaining status
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// GET /ready - Kubernetes readiness check
///
/// Not ready until at least one user is provisioned, since no ceremony can
/// succeed without one.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses((status = 200, description = "Readiness status", body = ReadyResponse))
)]
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let users = state.engine.repository().user_count();
    Json(ReadyResponse {
        ready: users > 0,
        message: (users == 0).then(|| "no users provisioned".to_string()),
    })
}
