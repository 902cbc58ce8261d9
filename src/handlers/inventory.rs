use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};

use super::common::{created_response, no_content_response, success_response, ConfirmParams};
use crate::errors::ServiceError;
use crate::models::{ItemUpdate, NewItem, NewTransaction, TransactionFilter};
use crate::AppState;

/// Inventory items and the stock transaction ledger
pub fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/inventory", get(list_items).post(create_item))
        .route("/inventory/low-stock", get(low_stock_items))
        .route("/inventory/:id", put(update_item).delete(delete_item))
        .route("/inventory/:id/reconcile", get(reconcile_item))
        .route(
            "/transactions",
            get(list_transactions).post(record_transaction),
        )
        .route(
            "/transactions/:id",
            put(edit_transaction).delete(delete_transaction),
        )
}

pub async fn list_items(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.ledger.list_items().await?))
}

pub async fn low_stock_items(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.ledger.low_stock_items().await?,
    ))
}

pub async fn create_item(
    State(state): State<AppState>,
    Json(payload): Json<NewItem>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state.services.ledger.create_item(payload).await?;
    Ok(created_response(item))
}

pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<ItemUpdate>,
) -> Result<impl IntoResponse, ServiceError> {
    let item = state.services.ledger.update_item(&id, payload).await?;
    Ok(success_response(item))
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(confirm): Query<ConfirmParams>,
) -> Result<impl IntoResponse, ServiceError> {
    confirm.require("deleting an inventory item")?;
    state.services.ledger.delete_item(&id).await?;
    Ok(no_content_response())
}

pub async fn reconcile_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(state.services.ledger.reconcile(&id).await?))
}

pub async fn list_transactions(
    State(state): State<AppState>,
    Query(filter): Query<TransactionFilter>,
) -> Result<impl IntoResponse, ServiceError> {
    Ok(success_response(
        state.services.ledger.list_transactions(filter).await?,
    ))
}

pub async fn record_transaction(
    State(state): State<AppState>,
    Json(payload): Json<NewTransaction>,
) -> Result<impl IntoResponse, ServiceError> {
    let tx = state.services.ledger.record_transaction(payload).await?;
    Ok(created_response(tx))
}

pub async fn edit_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<NewTransaction>,
) -> Result<impl IntoResponse, ServiceError> {
    let tx = state.services.ledger.edit_transaction(&id, payload).await?;
    Ok(success_response(tx))
}

pub async fn delete_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(confirm): Query<ConfirmParams>,
) -> Result<impl IntoResponse, ServiceError> {
    confirm.require("deleting a transaction")?;
    state.services.ledger.delete_transaction(&id).await?;
    Ok(no_content_response())
}
