use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use gradeflow::academic::{academic_router, CohortService};
use gradeflow::cie::{cie_router, CieService};
use gradeflow::repository::{AssessmentRepository, CieConfigurationRepository, CohortRepository};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_platform_routes<A, C, R>(
    cie_service: Arc<CieService<A, C>>,
    cohort_service: Arc<CohortService<R>>,
) -> axum::Router
where
    A: AssessmentRepository + 'static,
    C: CieConfigurationRepository + 'static,
    R: CohortRepository + 'static,
{
    cie_router(cie_service)
        .merge(academic_router(cohort_service))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
