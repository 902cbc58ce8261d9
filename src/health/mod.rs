/*!
 * # Health Check Module
 *
 * Endpoints for monitoring the tracker:
 *
 * - Basic health check (`/health`) reports store connectivity
 * - Readiness check (`/health/ready`) fails while the store is unreachable
 * - Liveness check (`/health/live`) only says the process is running
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::AppState;

/// Basic health status
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
    Degraded,
}

/// Health check detail
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthDetail {
    pub status: HealthStatus,
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Overall health information
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub details: HashMap<String, HealthDetail>,
}

impl HealthInfo {
    fn status_code(&self) -> StatusCode {
        match self.status {
            HealthStatus::Up | HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Collects the current health of the store and the advisor.
pub async fn collect(state: &AppState) -> HealthInfo {
    let now = Utc::now();
    let mut details = HashMap::new();

    let connection = state.store.status().await;
    if !connection.connected {
        warn!(message = %connection.message, "store health check failed");
    }
    details.insert(
        "store".to_string(),
        HealthDetail {
            status: if connection.connected {
                HealthStatus::Up
            } else {
                HealthStatus::Down
            },
            message: Some(connection.message),
            timestamp: now,
        },
    );

    details.insert(
        "advisor".to_string(),
        HealthDetail {
            status: if state.services.advisor.is_enabled() {
                HealthStatus::Up
            } else {
                HealthStatus::Degraded
            },
            message: (!state.services.advisor.is_enabled())
                .then(|| "no api key configured".to_string()),
            timestamp: now,
        },
    );

    let status = if details.values().any(|d| d.status == HealthStatus::Down) {
        HealthStatus::Down
    } else if details.values().any(|d| d.status == HealthStatus::Degraded) {
        HealthStatus::Degraded
    } else {
        HealthStatus::Up
    };

    HealthInfo {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: now,
        uptime_seconds: state.started_at.elapsed().as_secs(),
        details,
    }
}

/// Basic health check endpoint
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    debug!("Health check endpoint called");
    let health = collect(&state).await;
    (health.status_code(), Json(health))
}

/// Readiness check endpoint
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let health = collect(&state).await;
    let ready = health.status != HealthStatus::Down;
    (
        health.status_code(),
        Json(json!({
            "ready": ready,
            "timestamp": health.timestamp,
        })),
    )
}

/// Liveness check endpoint
pub async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "alive": true,
            "timestamp": Utc::now(),
        })),
    )
}

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/ready", get(readiness_check))
        .route("/health/live", get(liveness_check))
}
