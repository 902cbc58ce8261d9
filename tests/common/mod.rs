#![allow(dead_code)]

pub mod faults;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use chrono::NaiveDate;
use lubetrack_api::{
    config::AppConfig,
    db::DbConfig,
    schedule::{FixedClock, SharedClock},
    services::advisor::{MaintenanceAdvisor, TextCompletion},
    store::{LocalStore, SqlStore, StoreHandle},
    AppState,
};
use serde_json::Value;
use tower::ServiceExt;

pub fn date(text: &str) -> NaiveDate {
    lubetrack_api::schedule::parse_date(text).expect("valid test date")
}

pub fn clock_on(today: &str) -> SharedClock {
    Arc::new(FixedClock::on(date(today)))
}

/// In-memory local backing
pub fn local_handle() -> StoreHandle {
    StoreHandle::connected(LocalStore::in_memory())
}

/// SQLite in-memory backing with the schema migrated
pub async fn sqlite_handle() -> StoreHandle {
    let store = SqlStore::connect(&DbConfig::single("sqlite::memory:"), true)
        .await
        .expect("failed to open sqlite test store");
    StoreHandle::connected(store)
}

/// Helper harness driving the full router without binding a socket.
pub struct TestApp {
    router: Router,
    pub state: AppState,
}

impl TestApp {
    pub fn with_store(store: StoreHandle, today: &str) -> Self {
        Self::build(store, today, None)
    }

    pub fn with_advisor(
        store: StoreHandle,
        today: &str,
        completion: Arc<dyn TextCompletion>,
    ) -> Self {
        Self::build(store, today, Some(completion))
    }

    fn build(store: StoreHandle, today: &str, completion: Option<Arc<dyn TextCompletion>>) -> Self {
        let cfg = AppConfig::new("127.0.0.1".to_string(), 18_080, "test".to_string());
        let clock = clock_on(today);
        let advisor = MaintenanceAdvisor::new(completion, clock.clone());
        let state = AppState::new(cfg, store, clock, advisor);
        let router = lubetrack_api::app_router(state.clone());
        Self { router, state }
    }

    /// Send a request against the router.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }
}

pub async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body is not json")
}
