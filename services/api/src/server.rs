use crate::cli::ServeArgs;
use crate::infra::{seed_demo_catalog, AppState, EmailLogTransport, InMemoryAdmissionsRepository};
use crate::routes::with_admissions_routes;
use admissions::config::AppConfig;
use admissions::error::AppError;
use admissions::telemetry;
use admissions::workflows::admissions::{
    AdmissionsService, InMemoryAuditSink, InMemoryRateLimiter, QueuedPublisher,
};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

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

    let repository = Arc::new(InMemoryAdmissionsRepository::default());
    seed_demo_catalog(&repository);
    let notifier = Arc::new(QueuedPublisher::spawn(Arc::new(EmailLogTransport)));
    let admissions_service = Arc::new(AdmissionsService::new(
        repository,
        notifier,
        Arc::new(InMemoryRateLimiter::new()),
        Arc::new(InMemoryAuditSink::new()),
        config.rate_limits,
    ));

    let app = with_admissions_routes(admissions_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "admissions workflow service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
