use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl HealthResponse {
    pub fn up() -> Self {
        Self {
            status: "UP".to_string(),
            reason: None,
        }
    }

    pub fn down(reason: impl Into<String>) -> Self {
        Self {
            status: "DOWN".to_string(),
            reason: Some(reason.into()),
        }
    }
}

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    match state.cache().health_check().await {
        Ok(()) => (StatusCode::OK, Json(HealthResponse::up())),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, Json(HealthResponse::down(e.to_string())))
        },
    }
}
