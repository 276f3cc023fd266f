use crate::cli::ServeArgs;
use crate::infra::{seed_demo_department, AppState, InMemoryStore};
use crate::routes::with_platform_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use gradeflow::academic::CohortService;
use gradeflow::cie::CieService;
use gradeflow::config::{AppConfig, AppEnvironment};
use gradeflow::error::AppError;
use gradeflow::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = InMemoryStore::default();
    if config.environment != AppEnvironment::Production {
        match seed_demo_department(&store, &config.cie_defaults) {
            Ok(report) => info!(
                department_id = %report.department_id,
                components = report.components.len(),
                section_id = %report.section.id,
                "seeded demo department"
            ),
            Err(err) => warn!(error = %err, "demo department was not seeded"),
        }
    }

    let cie_service = Arc::new(CieService::with_template(
        store.assessments.clone(),
        store.configurations.clone(),
        config.cie_defaults.clone(),
    ));
    let cohort_service = Arc::new(CohortService::new(store.cohorts.clone()));

    let app = with_platform_routes(cie_service, cohort_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "gradeflow service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
