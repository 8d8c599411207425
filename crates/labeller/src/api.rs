//! HTTP API for health checks, Prometheus metrics and labeller status

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use labeller_lib::{
    health::{ComponentStatus, HealthRegistry},
    reconcile::LabellerStatus,
};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub status: Arc<RwLock<LabellerStatus>>,
}

impl AppState {
    pub fn new(health_registry: HealthRegistry, status: Arc<RwLock<LabellerStatus>>) -> Self {
        Self {
            health_registry,
            status,
        }
    }
}

/// 200 while operational (healthy or degraded), 503 otherwise
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(health))
}

/// 200 once the first pass has completed, 503 before
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Last reconcile time, labelled count and conditions
async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let status = state.status.read().await.clone();
    Json(status)
}

/// Prometheus metrics endpoint
async fn metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            e.to_string().into_bytes(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/status", get(status))
        .with_state(state)
}

/// Start the API server
pub async fn serve(port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use labeller_lib::health::components;
    use labeller_lib::observability::LabellerMetrics;
    use tower::ServiceExt;

    async fn setup_test_app() -> (Router, Arc<AppState>) {
        let health_registry = HealthRegistry::new();
        health_registry.register(components::CATALOG).await;
        health_registry.register(components::LABELLER).await;

        let state = Arc::new(AppState::new(
            health_registry,
            Arc::new(RwLock::new(LabellerStatus::default())),
        ));
        (create_router(state.clone()), state)
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_healthz_returns_ok_when_healthy() {
        let (app, _state) = setup_test_app().await;

        let (code, health) = get_json(app, "/healthz").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(health["status"], "healthy");
        assert!(health["components"].get("catalog").is_some());
    }

    #[tokio::test]
    async fn test_healthz_returns_ok_when_degraded() {
        let (app, state) = setup_test_app().await;
        state
            .health_registry
            .set_degraded(components::LABELLER, "1 resources could not be labeled")
            .await;

        let (code, health) = get_json(app, "/healthz").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(health["status"], "degraded");
    }

    #[tokio::test]
    async fn test_healthz_returns_503_when_unhealthy() {
        let (app, state) = setup_test_app().await;
        state
            .health_registry
            .set_unhealthy(components::LABELLER, "Invalid selector")
            .await;

        let (code, health) = get_json(app, "/healthz").await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(health["status"], "unhealthy");
    }

    #[tokio::test]
    async fn test_readyz_follows_registry() {
        let (app, state) = setup_test_app().await;

        let (code, readiness) = get_json(app.clone(), "/readyz").await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(readiness["ready"], false);

        state.health_registry.set_ready(true).await;
        let (code, readiness) = get_json(app, "/readyz").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(readiness["ready"], true);
    }

    #[tokio::test]
    async fn test_status_reports_conditions() {
        let (app, state) = setup_test_app().await;
        state
            .status
            .write()
            .await
            .record_success(4, &[], Utc::now());

        let (code, status) = get_json(app, "/status").await;
        assert_eq!(code, StatusCode::OK);
        assert_eq!(status["resourcesLabeled"], 4);
        assert_eq!(status["conditions"][0]["type"], "Ready");
        assert_eq!(status["conditions"][0]["reason"], "ReconciliationSucceeded");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let (app, _state) = setup_test_app().await;
        LabellerMetrics::new().inc_labels_applied();

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("styx_labeller_labels_applied_total"));
    }
}
