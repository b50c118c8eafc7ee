use crate::cli::ServeArgs;
use crate::infra::{accrual_policy, AppState};
use crate::routes::with_dataverse_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use dataverse::config::AppConfig;
use dataverse::error::AppError;
use dataverse::store::{DatasetRepository, JsonFileRepository, MemoryRepository};
use dataverse::{telemetry, DataverseService};
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

    match config.storage.data_path.clone() {
        Some(path) => {
            let repository = JsonFileRepository::open(&path)?;
            info!(path = %path.display(), "dataset snapshot opened");
            serve(config, repository).await
        }
        None => {
            warn!("DATAVERSE_DATA_PATH not set; records live in memory only");
            serve(config, MemoryRepository::default()).await
        }
    }
}

async fn serve<R>(config: AppConfig, repository: R) -> Result<(), AppError>
where
    R: DatasetRepository + 'static,
{
    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let service = Arc::new(DataverseService::new(
        Arc::new(repository),
        accrual_policy(&config),
    ));

    let app = with_dataverse_routes(service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        overdue_days = config.ledger.overdue_days,
        "dataverse service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
