use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::common::{created_response, success_response, ConfirmParams};
use crate::errors::ServiceError;
use crate::models::{SopCategoryInput, SopDocumentInput};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentQuery {
    pub category_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDeleted {
    pub documents_removed: usize,
}

pub fn sop_routes() -> Router<AppState> {
    Router::new()
        .route("/sop/categories", get(list_categories).post(upsert_category))
        .route("/sop/categories/:id", delete(delete_category))
        .route("/sop/documents", get(list_documents).post(upsert_document))
        .route("/sop/documents/:id", delete(delete_document))
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.sop.list_categories().await?))
}

pub async fn upsert_category(
    State(state): State<AppState>,
    Json(payload): Json<SopCategoryInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(created_response(
        state.services.sop.upsert_category(payload).await?,
    ))
}

/// Removes the category together with its documents.
pub async fn delete_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(confirm): Query<ConfirmParams>,
) -> Result<impl IntoResponse, ServiceError> {
    confirm.require("deleting a category")?;
    let documents_removed = state.services.sop.delete_category(&id).await?;
    Ok(success_response(CategoryDeleted { documents_removed }))
}

pub async fn list_documents(
    State(state): State<AppState>,
    Query(query): Query<DocumentQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state
            .services
            .sop
            .list_documents(query.category_id.as_deref())
            .await?,
    ))
}

pub async fn upsert_document(
    State(state): State<AppState>,
    Json(payload): Json<SopDocumentInput>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(created_response(
        state.services.sop.upsert_document(payload).await?,
    ))
}

pub async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(confirm): Query<ConfirmParams>,
) -> Result<impl IntoResponse, ServiceError> {
    confirm.require("deleting a document")?;
    state.services.sop.delete_document(&id).await?;
    Ok(super::common::no_content_response())
}
