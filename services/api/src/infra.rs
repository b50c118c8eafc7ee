use chrono::{DateTime, NaiveDate, Utc};
use dataverse::config::AppConfig;
use dataverse::contracts::AccrualPolicy;
use dataverse::error::AppError;
use dataverse::service::{DataverseService, FixedClock, SystemClock};
use dataverse::store::{DatasetRepository, JsonFileRepository};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn accrual_policy(config: &AppConfig) -> AccrualPolicy {
    AccrualPolicy::with_overdue_days(config.ledger.overdue_days)
}

/// Build a service whose clock is pinned to `at`, or follows the system clock.
pub(crate) fn build_service<R>(
    repository: R,
    policy: AccrualPolicy,
    at: Option<DateTime<Utc>>,
) -> DataverseService<R>
where
    R: DatasetRepository + 'static,
{
    match at {
        Some(at) => DataverseService::with_clock(Arc::new(repository), policy, Arc::new(FixedClock(at))),
        None => DataverseService::with_clock(Arc::new(repository), policy, Arc::new(SystemClock)),
    }
}

/// Open the JSON snapshot named on the command line or in the environment.
pub(crate) fn open_data_file(
    explicit: Option<PathBuf>,
    config: &AppConfig,
) -> Result<JsonFileRepository, AppError> {
    let path = explicit
        .or_else(|| config.storage.data_path.clone())
        .ok_or_else(|| {
            AppError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "no data file: pass --data or set DATAVERSE_DATA_PATH",
            ))
        })?;
    Ok(JsonFileRepository::open(path)?)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

/// RFC 3339 instant, or a calendar date taken at midnight UTC.
pub(crate) fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    let trimmed = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(instant.with_timezone(&Utc));
    }
    parse_date(trimmed)?
        .and_hms_opt(0, 0, 0)
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("'{raw}' has no midnight"))
}
