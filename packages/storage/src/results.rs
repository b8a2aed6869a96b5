//! One JSON object per finished job.

use job_core::JobId;
use serde_json::Value;

use crate::{Storage, StorageConfig, StorageError};

/// Durable per-job result storage keyed by job id.
///
/// Each job is written by exactly one worker, so writes for different jobs
/// never contend.
#[derive(Debug, Clone)]
pub struct ResultStore {
    storage: Storage,
}

impl ResultStore {
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// In-memory store, used by tests.
    pub fn memory() -> Result<Self, StorageError> {
        Ok(Self::new(Storage::new(StorageConfig::memory())?))
    }

    fn key(job_id: JobId) -> String {
        format!("{job_id}.json")
    }

    pub async fn write(&self, job_id: JobId, result: &Value) -> Result<(), StorageError> {
        self.storage.put_json_value(&Self::key(job_id), result).await?;
        tracing::debug!(%job_id, "Result written");
        Ok(())
    }

    /// Read a job's result. Only valid once the job is done.
    pub async fn read(&self, job_id: JobId) -> Result<Value, StorageError> {
        self.storage.get_json_value(&Self::key(job_id)).await
    }
}
