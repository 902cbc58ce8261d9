use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::common::{no_content_response, success_response, ConfirmParams};
use crate::errors::ServiceError;
use crate::models::{RecordFilter, RecordUpdate};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeRequest {
    /// Falls back to the stored retention setting
    pub retention_days: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurgeResponse {
    pub photos_removed: usize,
}

pub fn record_routes() -> Router<AppState> {
    Router::new()
        .route("/records", get(list_records))
        .route("/records/purge-photos", post(purge_photos))
        .route("/records/:id", put(edit_record).delete(delete_record))
}

pub async fn list_records(
    State(state): State<AppState>,
    Query(filter): Query<RecordFilter>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.maintenance.list_records(filter).await?,
    ))
}

pub async fn edit_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<RecordUpdate>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.maintenance.edit_record(&id, payload).await?,
    ))
}

pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(confirm): Query<ConfirmParams>,
) -> Result<impl IntoResponse, ServiceError> {
    confirm.require("deleting a service record")?;
    state.services.maintenance.delete_record(&id).await?;
    Ok(no_content_response())
}

pub async fn purge_photos(
    State(state): State<AppState>,
    Query(confirm): Query<ConfirmParams>,
    payload: Option<Json<PurgeRequest>>,
) -> Result<impl IntoResponse, ServiceError> {
    confirm.require("purging photos")?;
    let maintenance = &state.services.maintenance;
    let photos_removed = match payload.and_then(|Json(p)| p.retention_days) {
        Some(days) => maintenance.purge_expired_photos(days).await?,
        None => maintenance.run_retention_sweep().await?,
    };
    Ok(success_response(PurgeResponse { photos_removed }))
}
