use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use super::common::{created_response, no_content_response, success_response, ConfirmParams};
use crate::errors::ServiceError;
use crate::models::{CompleteTaskInput, EquipmentInput};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct EquipmentSearch {
    /// Matches name, location or type
    pub q: Option<String>,
}

pub fn equipment_routes() -> Router<AppState> {
    Router::new()
        .route("/equipment", get(list_equipment).post(create_equipment))
        .route(
            "/equipment/:id",
            put(update_equipment).delete(delete_equipment),
        )
        .route("/equipment/:id/complete", post(complete_task))
        .route("/schedule/due", get(due_items))
        .route("/schedule/summary", get(status_summary))
}

pub async fn list_equipment(
    State(state): State<AppState>,
    Query(search): Query<EquipmentSearch>,
) -> Result<impl IntoResponse, ServiceError> {
    let maintenance = &state.services.maintenance;
    let equipment = match search.q.as_deref() {
        Some(term) => maintenance.search_equipment(term).await?,
        None => maintenance.list_equipment().await?,
    };
    Ok(success_response(equipment))
}

pub async fn create_equipment(
    State(state): State<AppState>,
    Json(payload): Json<EquipmentInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let equipment = state.services.maintenance.save_equipment(payload).await?;
    info!(equipment_id = %equipment.id, "equipment created via api");
    Ok(created_response(equipment))
}

pub async fn update_equipment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut payload): Json<EquipmentInput>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.id = Some(id);
    let equipment = state.services.maintenance.save_equipment(payload).await?;
    Ok(success_response(equipment))
}

pub async fn delete_equipment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(confirm): Query<ConfirmParams>,
) -> Result<impl IntoResponse, ServiceError> {
    confirm.require("deleting equipment")?;
    state.services.maintenance.delete_equipment(&id).await?;
    Ok(no_content_response())
}

pub async fn complete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CompleteTaskInput>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state.services.maintenance.complete_task(&id, payload).await?;
    Ok(created_response(record))
}

pub async fn due_items(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.maintenance.due_items().await?))
}

pub async fn status_summary(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.maintenance.status_summary().await?,
    ))
}
