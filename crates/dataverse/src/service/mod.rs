//! Application service: transactional operations over a `DatasetRepository`
//! returning read models with their derived statuses.

mod clock;
mod contracts;
mod records;
mod threads;

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::contracts::AccrualPolicy;
use crate::import::AccrualImportError;
use crate::store::{DataError, Dataset, DatasetRepository, RepositoryError};
use crate::views::DataverseSummary;

pub use clock::{Clock, FixedClock, SystemClock};

/// Service composing the repository, the accrual policy and a clock.
pub struct DataverseService<R> {
    repository: Arc<R>,
    policy: AccrualPolicy,
    clock: Arc<dyn Clock>,
}

impl<R> DataverseService<R>
where
    R: DatasetRepository + 'static,
{
    pub fn new(repository: Arc<R>, policy: AccrualPolicy) -> Self {
        Self::with_clock(repository, policy, Arc::new(SystemClock))
    }

    pub fn with_clock(repository: Arc<R>, policy: AccrualPolicy, clock: Arc<dyn Clock>) -> Self {
        Self {
            repository,
            policy,
            clock,
        }
    }

    pub fn policy(&self) -> &AccrualPolicy {
        &self.policy
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Portfolio counts per derived status plus outstanding money per currency.
    pub fn summary(&self, at: Option<DateTime<Utc>>) -> Result<DataverseSummary, ServiceError> {
        let now = self.instant(at);
        self.read(|data| DataverseSummary::build(data, &self.policy, now))
    }

    fn instant(&self, at: Option<DateTime<Utc>>) -> DateTime<Utc> {
        at.unwrap_or_else(|| self.clock.now())
    }

    fn read<T>(&self, f: impl FnOnce(&Dataset) -> T) -> Result<T, ServiceError> {
        Ok(self.repository.read(f)?)
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut Dataset) -> Result<T, DataError>,
    ) -> Result<T, ServiceError> {
        self.repository
            .write(|data| f(data).map_err(ServiceError::from))
    }
}

/// Error raised by the dataverse service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Import(#[from] AccrualImportError),
    #[error("ledger row {row}: {source}")]
    LedgerRow { row: usize, source: DataError },
}

impl ServiceError {
    /// The store-level violation behind this error, if any.
    pub fn data_error(&self) -> Option<&DataError> {
        match self {
            ServiceError::Data(source) | ServiceError::LedgerRow { source, .. } => Some(source),
            ServiceError::Repository(_) | ServiceError::Import(_) => None,
        }
    }
}

#[cfg(test)]
mod tests;
