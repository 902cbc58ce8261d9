use axum::{extract::State, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::common::success_response;
use crate::errors::ServiceError;
use crate::models::AppSettings;
use crate::store::Backend;
use crate::AppState;

/// Connection state plus what the working set currently holds
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub connected: bool,
    pub backend: Option<Backend>,
    pub message: String,
    pub loaded_at: Option<DateTime<Utc>>,
    pub equipment: usize,
    pub records: usize,
    pub inventory: usize,
    pub transactions: usize,
    pub sop_categories: usize,
    pub sop_documents: usize,
}

pub fn settings_routes() -> Router<AppState> {
    Router::new()
        .route("/settings", get(get_settings).put(update_settings))
        .route("/sync/status", get(sync_status))
}

pub async fn get_settings(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.settings.get_settings().await?))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Json(payload): Json<AppSettings>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.settings.update_settings(payload).await?,
    ))
}

pub async fn sync_status(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let connection = state.store.status().await;
    let snapshot = state.working_set.snapshot().await;
    Ok(success_response(SyncStatus {
        connected: connection.connected,
        backend: connection.backend,
        message: connection.message,
        loaded_at: snapshot.loaded_at,
        equipment: snapshot.equipment.len(),
        records: snapshot.records.len(),
        inventory: snapshot.inventory.len(),
        transactions: snapshot.transactions.len(),
        sop_categories: snapshot.sop_categories.len(),
        sop_documents: snapshot.sop_documents.len(),
    }))
}
