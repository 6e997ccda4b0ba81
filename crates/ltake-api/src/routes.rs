//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::concat::concat;
use crate::handlers::health::{health, ping};
use crate::handlers::render::render;
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let job_routes = Router::new()
        .route("/render", post(render))
        .route("/concat", post(concat));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ping", get(ping));

    // Metrics endpoint (if enabled)
    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .merge(job_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        // Media uploads are large; both limits track the configured size.
        .layer(DefaultBodyLimit::max(state.config.max_body_size))
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use ltake_drive::{DriveClient, DriveConfig, StaticTokenSource};

    use crate::config::ApiConfig;

    fn test_router() -> Router {
        let drive = DriveClient::new(
            DriveConfig::default(),
            Arc::new(StaticTokenSource::new("test-token")),
        )
        .unwrap();
        let state = AppState {
            config: ApiConfig::default(),
            drive: Arc::new(drive),
        };
        create_router(state, None)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = test_router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_ping() {
        let response = test_router()
            .oneshot(Request::get("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["message"], "FFmpeg server is alive!");
    }

    #[tokio::test]
    async fn test_render_missing_parts_is_400() {
        // A multipart body carrying only the filename field: no external
        // process may be invoked, just a validation failure.
        let boundary = "X-LTAKE-BOUNDARY";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"filename\"\r\n\r\nt.mp4\r\n--{b}--\r\n",
            b = boundary
        );

        let request = Request::post("/render")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(body))
            .unwrap();

        let response = test_router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Validation error: Missing image or audio file");
    }

    #[tokio::test]
    async fn test_concat_empty_list_is_400() {
        let request = Request::post("/concat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"concatList": "   "}"#))
            .unwrap();

        let response = test_router().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("concat list"));
    }
}
