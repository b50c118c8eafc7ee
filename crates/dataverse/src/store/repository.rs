use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::Dataset;

/// Storage abstraction so the service can be exercised in isolation.
///
/// `write` is transactional: the closure works on a copy of the dataset and
/// the copy replaces the stored state only when the closure succeeds.
pub trait DatasetRepository: Send + Sync {
    fn read<T, F>(&self, f: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&Dataset) -> T;

    fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Dataset) -> Result<T, E>,
        E: From<RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("snapshot io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot is not valid json: {0}")]
    Snapshot(#[from] serde_json::Error),
}

/// Writes only ever commit a finished draft, so a panic while the lock is held
/// cannot leave a partial change behind and a poisoned guard is still sound.
fn lock(dataset: &Mutex<Dataset>) -> MutexGuard<'_, Dataset> {
    dataset.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
pub struct MemoryRepository {
    dataset: Mutex<Dataset>,
}

impl MemoryRepository {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset: Mutex::new(dataset),
        }
    }
}

impl DatasetRepository for MemoryRepository {
    fn read<T, F>(&self, f: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&Dataset) -> T,
    {
        let guard = lock(&self.dataset);
        Ok(f(&guard))
    }

    fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Dataset) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut guard = lock(&self.dataset);
        let mut draft = guard.clone();
        let value = f(&mut draft)?;
        *guard = draft;
        Ok(value)
    }
}

/// Keeps the dataset in memory and mirrors every committed write to a JSON
/// snapshot on disk.
#[derive(Debug)]
pub struct JsonFileRepository {
    path: PathBuf,
    dataset: Mutex<Dataset>,
}

impl JsonFileRepository {
    /// Open the snapshot at `path`, starting empty when the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RepositoryError> {
        let path = path.into();
        let dataset = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Dataset::default(),
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            path,
            dataset: Mutex::new(dataset),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, dataset: &Dataset) -> Result<(), RepositoryError> {
        let bytes = serde_json::to_vec_pretty(dataset)?;
        let staging = self.path.with_extension("json.tmp");

        let mut file = fs::File::create(&staging)?;
        file.write_all(&bytes)?;
        file.sync_all()?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

impl DatasetRepository for JsonFileRepository {
    fn read<T, F>(&self, f: F) -> Result<T, RepositoryError>
    where
        F: FnOnce(&Dataset) -> T,
    {
        let guard = lock(&self.dataset);
        Ok(f(&guard))
    }

    fn write<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Dataset) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut guard = lock(&self.dataset);
        let mut draft = guard.clone();
        let value = f(&mut draft)?;
        self.persist(&draft)?;
        *guard = draft;
        Ok(value)
    }
}
