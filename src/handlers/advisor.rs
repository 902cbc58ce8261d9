use axum::{extract::State, response::IntoResponse, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::common::success_response;
use crate::errors::ServiceError;
use crate::services::advisor::Locale;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct AdviceRequest {
    #[validate(length(min = 1, max = 2000))]
    pub query: String,
    #[serde(default)]
    pub locale: Locale,
}

#[derive(Debug, Default, Deserialize)]
pub struct RiskRequest {
    #[serde(default)]
    pub locale: Locale,
}

#[derive(Debug, Serialize)]
pub struct AdvisorReply {
    pub text: String,
}

pub fn advisor_routes() -> Router<AppState> {
    Router::new()
        .route("/advisor/advice", post(get_advice))
        .route("/advisor/risk", post(summarize_risk))
}

pub async fn get_advice(
    State(state): State<AppState>,
    Json(payload): Json<AdviceRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    payload.validate()?;
    if payload.query.trim().is_empty() {
        return Err(ServiceError::ValidationError("query is required".into()));
    }
    let equipment = state.services.maintenance.list_equipment().await?;
    let text = state
        .services
        .advisor
        .get_advice(&payload.query, &equipment, payload.locale)
        .await;
    Ok(success_response(AdvisorReply { text }))
}

pub async fn summarize_risk(
    State(state): State<AppState>,
    payload: Option<Json<RiskRequest>>,
) -> Result<impl IntoResponse, ServiceError> {
    let locale = payload.map(|Json(p)| p.locale).unwrap_or_default();
    let equipment = state.services.maintenance.list_equipment().await?;
    let text = state
        .services
        .advisor
        .summarize_risk(&equipment, locale)
        .await;
    Ok(success_response(AdvisorReply { text }))
}
