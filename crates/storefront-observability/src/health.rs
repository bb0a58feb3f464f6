//! Health endpoints
//!
//! - `/healthz` - Liveness probe (200 OK while the process is serving)
//! - `/readyz` - Readiness probe (tenant registry loaded and non-empty)
//! - `/metrics` - Prometheus metrics endpoint

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::TextEncoder;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::metrics::Metrics;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Readiness check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<ComponentStatus>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// State of one dependency reported by `/readyz`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentStatus {
    /// Component name, e.g. `tenant_registry`
    pub name: String,
    /// `ok` or `unavailable`
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ComponentStatus {
    pub fn ok(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "ok".to_string(),
            detail: None,
        }
    }

    pub fn unavailable(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: "unavailable".to_string(),
            detail: Some(detail.into()),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Readiness checker trait
pub trait ReadinessChecker: Send + Sync {
    /// Check if the service is ready to render pages
    fn is_ready(&self) -> bool;

    /// Per-component breakdown shown in the readiness body
    fn components(&self) -> Vec<ComponentStatus>;
}

/// Health check state
#[derive(Clone)]
pub struct HealthState {
    pub metrics: Arc<Metrics>,
    pub readiness_checker: Option<Arc<dyn ReadinessChecker>>,
}

impl HealthState {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            metrics,
            readiness_checker: None,
        }
    }

    pub fn with_readiness_checker(
        metrics: Arc<Metrics>,
        readiness_checker: Arc<dyn ReadinessChecker>,
    ) -> Self {
        Self {
            metrics,
            readiness_checker: Some(readiness_checker),
        }
    }
}

/// Create health check router
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: None,
    })
}

/// Returns 503 Service Unavailable until the checker reports ready
async fn readyz(State(state): State<HealthState>) -> Response {
    let Some(checker) = &state.readiness_checker else {
        return (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready".to_string(),
                components: None,
                message: None,
            }),
        )
            .into_response();
    };

    let components = checker.components();
    if checker.is_ready() {
        (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready".to_string(),
                components: Some(components),
                message: None,
            }),
        )
            .into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadinessResponse {
                status: "not_ready".to_string(),
                components: Some(components),
                message: Some("One or more components are unavailable".to_string()),
            }),
        )
            .into_response()
    }
}

/// Prometheus text exposition
async fn metrics_handler(State(state): State<HealthState>) -> Response {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics.registry().gather();

    match encoder.encode_to_string(&metric_families) {
        Ok(body) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", err),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt; // for oneshot

    struct StaticChecker {
        tenants: usize,
    }

    impl ReadinessChecker for StaticChecker {
        fn is_ready(&self) -> bool {
            self.tenants > 0
        }

        fn components(&self) -> Vec<ComponentStatus> {
            if self.tenants > 0 {
                vec![ComponentStatus::ok("tenant_registry").with_detail(format!("{} tenants", self.tenants))]
            } else {
                vec![ComponentStatus::unavailable("tenant_registry", "no tenants loaded")]
            }
        }
    }

    fn router(checker: Option<StaticChecker>) -> Router {
        let metrics = Arc::new(Metrics::new().unwrap());
        let state = match checker {
            Some(checker) => HealthState::with_readiness_checker(metrics, Arc::new(checker)),
            None => HealthState::new(metrics),
        };
        health_router(state)
    }

    async fn get_status(app: Router, uri: &str) -> StatusCode {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_healthz() {
        assert_eq!(get_status(router(None), "/healthz").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readyz_ready() {
        let app = router(Some(StaticChecker { tenants: 3 }));
        assert_eq!(get_status(app, "/readyz").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_readyz_not_ready() {
        let app = router(Some(StaticChecker { tenants: 0 }));
        assert_eq!(
            get_status(app, "/readyz").await,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[tokio::test]
    async fn test_readyz_no_checker() {
        assert_eq!(get_status(router(None), "/readyz").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_metrics() {
        let response = router(None)
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/plain; version=0.0.4"
        );
    }

    #[test]
    fn test_readiness_response_serialization() {
        let response = ReadinessResponse {
            status: "not_ready".to_string(),
            components: Some(vec![ComponentStatus::unavailable(
                "tenant_registry",
                "no tenants loaded",
            )]),
            message: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"not_ready\""));
        assert!(json.contains("\"detail\":\"no tenants loaded\""));
        assert!(!json.contains("\"message\""));
    }

    #[test]
    fn test_component_status_ok_has_no_detail() {
        let json = serde_json::to_string(&ComponentStatus::ok("backend")).unwrap();
        assert_eq!(json, r#"{"name":"backend","status":"ok"}"#);
    }
}
