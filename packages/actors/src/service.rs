//! Handle used by request handlers to submit and query jobs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use job_core::{Compute, JobId, JobState, StatRequest};
use ractor::{Actor, ActorRef};
use serde_json::Value;
use storage::{ResultStore, StorageError};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::config::PoolConfig;
use crate::messages::{QueueMessage, QueueStats, SubmitError, SupervisorMessage};
use crate::queue_actor::{TaskQueueActor, TaskQueueState};
use crate::registry::JobRegistry;
use crate::supervisor::{PoolState, Supervisor, SupervisorArgs};

/// What a status query found.
#[derive(Debug, Clone, PartialEq)]
pub enum JobLookup {
    NotFound,
    Running,
    Done(Value),
}

struct Inner {
    queue: ActorRef<QueueMessage>,
    supervisor: ActorRef<SupervisorMessage>,
    registry: Arc<JobRegistry>,
    results: ResultStore,
    accepting: AtomicBool,
    state_rx: watch::Receiver<PoolState>,
    spawned: Arc<AtomicUsize>,
    pool_size: usize,
}

/// Cloneable handle to the running job system.
#[derive(Clone)]
pub struct JobService {
    inner: Arc<Inner>,
}

impl JobService {
    /// Start the task queue and spawn the pool's workers.
    ///
    /// The returned handle completes once the pool has stopped.
    pub async fn start(
        config: PoolConfig,
        compute: Arc<dyn Compute>,
        results: ResultStore,
    ) -> Result<(Self, JoinHandle<()>), ServiceError> {
        let registry = Arc::new(JobRegistry::new());
        let (queue, queue_handle) =
            Actor::spawn(None, TaskQueueActor, TaskQueueState::new(registry.clone())).await?;

        let (state_tx, state_rx) = watch::channel(PoolState::Accepting);
        let spawned = Arc::new(AtomicUsize::new(0));
        let args = SupervisorArgs {
            workers: config.workers.get(),
            queue: queue.clone(),
            compute,
            results: results.clone(),
            registry: registry.clone(),
            spawned: spawned.clone(),
            state_tx,
        };

        let (supervisor, supervisor_handle) = match Actor::spawn(None, Supervisor, args).await {
            Ok(spawned) => spawned,
            Err(e) => {
                queue.stop(None);
                return Err(e.into());
            }
        };

        let handle = tokio::spawn(async move {
            let _ = supervisor_handle.await;
            let _ = queue_handle.await;
        });

        let service = Self {
            inner: Arc::new(Inner {
                queue,
                supervisor,
                registry,
                results,
                accepting: AtomicBool::new(true),
                state_rx,
                spawned,
                pool_size: config.workers.get(),
            }),
        };
        Ok((service, handle))
    }

    /// Register a job and enqueue it. Returns without waiting for the result.
    pub async fn submit(&self, request: StatRequest) -> Result<JobId, SubmitError> {
        if !self.inner.accepting.load(Ordering::SeqCst) {
            return Err(SubmitError::ShuttingDown);
        }

        let (tx, rx) = ractor::concurrency::oneshot();
        self.inner
            .queue
            .send_message(QueueMessage::Submit {
                request,
                reply: tx.into(),
            })
            .map_err(|_| SubmitError::ShuttingDown)?;

        rx.await.map_err(|_| SubmitError::ShuttingDown)?
    }

    pub fn state(&self, id: JobId) -> Option<JobState> {
        self.inner.registry.state(id)
    }

    /// Current state of a job, with its result once done.
    pub async fn lookup(&self, id: JobId) -> Result<JobLookup, StorageError> {
        match self.inner.registry.state(id) {
            None => Ok(JobLookup::NotFound),
            Some(JobState::Running) => Ok(JobLookup::Running),
            Some(JobState::Done) => Ok(JobLookup::Done(self.inner.results.read(id).await?)),
        }
    }

    /// Every job with its state, in id order.
    pub fn snapshot(&self) -> Vec<(JobId, JobState)> {
        self.inner.registry.snapshot()
    }

    pub fn running_jobs(&self) -> usize {
        self.inner.registry.running_count()
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.inner.registry
    }

    /// Refuse new submissions and let the pool drain. Does not wait.
    pub fn shutdown(&self) {
        if self.inner.accepting.swap(false, Ordering::SeqCst) {
            tracing::info!("Graceful shutdown requested");
        }
        // The queue sees Drain before any submission sent after this call.
        let _ = self.inner.queue.send_message(QueueMessage::Drain);
        let _ = self.inner.supervisor.send_message(SupervisorMessage::Shutdown);
    }

    pub fn is_accepting(&self) -> bool {
        self.inner.accepting.load(Ordering::SeqCst)
    }

    pub fn pool_state(&self) -> PoolState {
        *self.inner.state_rx.borrow()
    }

    /// Wait until every worker has exited.
    pub async fn wait_stopped(&self) {
        let mut rx = self.inner.state_rx.clone();
        let _ = rx.wait_for(|state| *state == PoolState::Stopped).await;
    }

    pub fn pool_size(&self) -> usize {
        self.inner.pool_size
    }

    /// Workers started since the pool was created.
    pub fn workers_spawned(&self) -> usize {
        self.inner.spawned.load(Ordering::SeqCst)
    }

    /// Queue snapshot, or `None` once the queue has stopped.
    pub async fn queue_stats(&self) -> Option<QueueStats> {
        let (tx, rx) = ractor::concurrency::oneshot();
        self.inner
            .queue
            .send_message(QueueMessage::GetStats { reply: tx.into() })
            .ok()?;
        rx.await.ok()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid pool config: {0}")]
    InvalidConfig(String),

    #[error("failed to spawn actor: {0}")]
    Spawn(#[from] ractor::SpawnErr),
}
