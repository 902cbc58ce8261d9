use crate::errors::ServiceError;
use crate::ApiResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Standard success response
pub fn success_response<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

/// Standard created response
pub fn created_response<T: Serialize>(data: T) -> Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

/// Standard no content response
pub fn no_content_response() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// `?confirm=true` guard for destructive endpoints
#[derive(Debug, Default, Deserialize)]
pub struct ConfirmParams {
    #[serde(default)]
    pub confirm: bool,
}

impl ConfirmParams {
    pub fn require(&self, action: &str) -> Result<(), ServiceError> {
        if self.confirm {
            Ok(())
        } else {
            Err(ServiceError::ValidationError(format!(
                "{} requires confirm=true",
                action
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn unconfirmed_destructive_action_is_rejected() {
        assert_matches!(
            ConfirmParams::default().require("delete equipment"),
            Err(ServiceError::ValidationError(msg)) if msg.contains("confirm=true")
        );
        assert!(ConfirmParams { confirm: true }.require("delete equipment").is_ok());
    }
}
