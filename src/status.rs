//! Durable status sink
//!
//! The orchestrator writes one record per `(job id, target)` and one
//! `(job id, "_summary")` record per job. Writes are best effort: a failing
//! recorder is logged and never stops a job.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::types::{JobId, StatusRecord};

/// Key/value sink for job status
#[async_trait]
pub trait StatusRecorder: Send + Sync {
    /// Insert or replace the record for `(job_id, target)`
    async fn record(&self, job_id: &JobId, target: &str, record: &StatusRecord) -> Result<()>;
}

/// In-process recorder, useful for embedding without a database
#[derive(Default)]
pub struct MemoryStatusRecorder {
    records: Mutex<HashMap<(JobId, String), StatusRecord>>,
}

impl MemoryStatusRecorder {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Record for `(job_id, target)`
    pub fn get(&self, job_id: &JobId, target: &str) -> Option<StatusRecord> {
        self.records
            .lock()
            .ok()?
            .get(&(job_id.clone(), target.to_string()))
            .cloned()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Whether nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl StatusRecorder for MemoryStatusRecorder {
    async fn record(&self, job_id: &JobId, target: &str, record: &StatusRecord) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| Error::Other("status recorder lock poisoned".to_string()))?;
        records.insert((job_id.clone(), target.to_string()), record.clone());
        Ok(())
    }
}
