//! Lubetrack API Library
//!
//! Core functionality for the lubrication maintenance tracker: equipment
//! schedules, service history, the lubricant stock ledger and SOP documents.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod health;
pub mod migrator;
pub mod models;
pub mod schedule;
pub mod services;
pub mod store;

use axum::{response::Json, routing::get, Router};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::events::{ChangeFeed, WorkingSet};
use crate::schedule::SharedClock;
use crate::services::advisor::MaintenanceAdvisor;
use crate::store::StoreHandle;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::AppConfig>,
    pub store: StoreHandle,
    pub feed: ChangeFeed,
    pub working_set: Arc<WorkingSet>,
    pub services: handlers::AppServices,
    pub started_at: Instant,
}

impl AppState {
    /// Wires services, the change feed and the working set over `store`.
    /// The working set refresh loop is not started here.
    pub fn new(
        config: config::AppConfig,
        store: StoreHandle,
        clock: SharedClock,
        advisor: MaintenanceAdvisor,
    ) -> Self {
        let feed = ChangeFeed::new(config.event_channel_capacity);
        let working_set = WorkingSet::new(store.clone());
        let services = handlers::AppServices::new(store.clone(), feed.clone(), clock, advisor);
        Self {
            config: Arc::new(config),
            store,
            feed,
            working_set,
            services,
            started_at: Instant::now(),
        }
    }
}

// Common response wrappers
#[derive(Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize)]
pub struct ResponseMeta {
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Routes mounted under `/api/v1`
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(api_status))
        .merge(handlers::equipment::equipment_routes())
        .merge(handlers::records::record_routes())
        .merge(handlers::inventory::inventory_routes())
        .merge(handlers::sop::sop_routes())
        .merge(handlers::settings::settings_routes())
        .merge(handlers::advisor::advisor_routes())
}

/// Full application router with middleware applied.
pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(health::health_routes())
        .nest("/api/v1", api_v1_routes())
        .layer(axum::middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn api_status() -> ApiResult<Value> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "lubetrack-api",
        "timestamp": Utc::now().to_rfc3339(),
    });
    Ok(Json(ApiResponse::success(status_data)))
}

// Request logging middleware
async fn request_logging_middleware(
    request: axum::http::Request<axum::body::Body>,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    tracing::debug!(method = %method, uri = %uri, "Incoming request");

    let response = next.run(request).await;

    tracing::info!(
        method = %method,
        uri = %uri,
        status = response.status().as_u16(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );

    response
}
