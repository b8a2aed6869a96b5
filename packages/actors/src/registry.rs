//! Job registry: id allocation and lifecycle state for every job.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use job_core::{JobId, JobState, StatRequest};

/// One registered job.
#[derive(Debug, Clone, PartialEq)]
pub struct JobEntry {
    pub id: JobId,
    pub request: StatRequest,
    pub state: JobState,
    pub submitted_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Entry for `job_id_<n>` lives at index `n - 1`.
    jobs: Vec<JobEntry>,
}

/// Registry of every job accepted during the process lifetime.
///
/// The id counter and the entry table sit behind one lock, so an id is never
/// observable without its entry. Entries are never removed.
#[derive(Debug, Default)]
pub struct JobRegistry {
    inner: Mutex<Inner>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate the next id and record the job as running.
    pub fn allocate(&self, request: StatRequest) -> JobId {
        let mut inner = self.lock();
        let id = inner.jobs.last().map_or(JobId::FIRST, |last| last.id.next());
        inner.jobs.push(JobEntry {
            id,
            request,
            state: JobState::Running,
            submitted_at: Utc::now(),
            completed_at: None,
        });
        id
    }

    pub fn is_valid(&self, id: JobId) -> bool {
        self.state(id).is_some()
    }

    /// State of a job, or `None` if the id was never allocated.
    pub fn state(&self, id: JobId) -> Option<JobState> {
        self.lock().jobs.get(index(id)).map(|entry| entry.state)
    }

    /// Flip a running job to done. Each job completes exactly once.
    pub fn mark_done(&self, id: JobId) -> Result<JobEntry, RegistryError> {
        let mut inner = self.lock();
        let entry = inner
            .jobs
            .get_mut(index(id))
            .ok_or(RegistryError::UnknownJob(id))?;
        if entry.state.is_done() {
            return Err(RegistryError::AlreadyDone(id));
        }
        entry.state = JobState::Done;
        entry.completed_at = Some(Utc::now());
        Ok(entry.clone())
    }

    /// Every job with its state, in id order.
    pub fn snapshot(&self) -> Vec<(JobId, JobState)> {
        self.lock()
            .jobs
            .iter()
            .map(|entry| (entry.id, entry.state))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn running_count(&self) -> usize {
        self.lock()
            .jobs
            .iter()
            .filter(|entry| !entry.state.is_done())
            .count()
    }
}

fn index(id: JobId) -> usize {
    (id.seq() - 1) as usize
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("job {0} was never allocated")]
    UnknownJob(JobId),

    #[error("job {0} is already done")]
    AlreadyDone(JobId),
}
