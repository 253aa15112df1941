use crate::cli::ServeArgs;
use crate::infra::{
    default_verification_policy, seed_sample_tenants, AppState, InMemoryConsentRepository,
    InMemoryNotificationGateway, InMemoryReferenceRepository, InMemoryTenantDirectory,
};
use crate::routes::with_verification_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tenant_trust::config::AppConfig;
use tenant_trust::error::AppError;
use tenant_trust::telemetry;
use tenant_trust::verification::VerificationService;
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

    let references = Arc::new(InMemoryReferenceRepository::default());
    let consents = Arc::new(InMemoryConsentRepository::default());
    let directory = Arc::new(InMemoryTenantDirectory::default());
    if !config.environment.is_production() {
        seed_sample_tenants(&directory);
    }
    let gateway = Arc::new(InMemoryNotificationGateway::default());
    let verification_service = Arc::new(VerificationService::new(
        references,
        consents,
        directory,
        gateway,
        default_verification_policy(),
    ));

    let app = with_verification_routes(verification_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "reference verification service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
