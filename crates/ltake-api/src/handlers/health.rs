//! Health check handlers.

use axum::Json;
use serde::Serialize;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Health check endpoint (liveness probe).
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Ping response.
#[derive(Serialize)]
pub struct PingResponse {
    pub status: String,
    pub message: String,
}

/// Ping endpoint.
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok".to_string(),
        message: "FFmpeg server is alive!".to_string(),
    })
}
