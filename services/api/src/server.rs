use crate::cli::ServeArgs;
use crate::demo::load_financials;
use crate::infra::{AppState, InMemoryChangeLog, InMemoryRecordStore};
use crate::routes::with_reconciliation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use facility_ops::config::AppConfig;
use facility_ops::error::AppError;
use facility_ops::telemetry;
use facility_ops::workflows::import::WorkItemImporter;
use facility_ops::workflows::reconciliation::{ReconciliationService, RetryPolicy};
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

    let work_items = match args.work_items.take() {
        Some(path) => WorkItemImporter::from_path(path)?,
        None => Vec::new(),
    };
    let businesses = match args.financials.take() {
        Some(path) => load_financials(&path)?,
        None => Vec::new(),
    };
    info!(
        work_items = work_items.len(),
        businesses = businesses.len(),
        "seeding in-memory record store"
    );

    let store = Arc::new(InMemoryRecordStore::seeded(work_items, businesses));
    let change_log = Arc::new(InMemoryChangeLog::default());
    let retry_policy = RetryPolicy::from_config(&config.change_log);
    info!(
        max_retries = retry_policy.max_retries,
        worst_case_backoff_ms = retry_policy.worst_case_backoff().as_millis() as u64,
        "change recording runs inline with cost changes"
    );
    let service = Arc::new(ReconciliationService::new(store, change_log, retry_policy));

    let app = with_reconciliation_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "reconciliation service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
