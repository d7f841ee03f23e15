//! REST API handlers.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};

use super::types::{ErrorResponse, ListSessionsResponse, SessionSummary};
use crate::console::SessionDriver;
use crate::session::SessionRegistry;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub driver: Arc<dyn SessionDriver>,
}

impl AppState {
    pub fn new(registry: Arc<SessionRegistry>, driver: Arc<dyn SessionDriver>) -> Self {
        Self { registry, driver }
    }
}

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

/// API information endpoint.
pub async fn api_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "console-bridge",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

/// List all live console sessions.
pub async fn list_sessions(
    State(state): State<AppState>,
) -> Result<Json<ListSessionsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let ids = state.registry.list_ids().map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::internal_error(e.to_string())),
        )
    })?;

    let mut sessions = Vec::with_capacity(ids.len());
    for id in ids {
        if let Ok(Some(session)) = state.registry.get(&id) {
            sessions.push(SessionSummary::from_session(&session));
        }
    }

    Ok(Json(ListSessionsResponse {
        count: sessions.len(),
        sessions,
    }))
}
