//! Worker actor for executing tasks.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use job_core::{Compute, ComputeError, Task};
use ractor::{Actor, ActorProcessingErr, ActorRef};
use serde_json::Value;
use storage::ResultStore;

use crate::messages::{QueueMessage, WorkerMessage};
use crate::registry::JobRegistry;

/// State for the worker actor.
pub struct WorkerActorState {
    /// Unique worker ID.
    pub worker_id: String,
    /// Task queue reference.
    pub queue: ActorRef<QueueMessage>,
    /// Statistics collaborator, shared by every worker.
    pub compute: Arc<dyn Compute>,
    /// Where results are written.
    pub results: ResultStore,
    /// Job registry.
    pub registry: Arc<JobRegistry>,
    /// Tasks this worker has finished.
    pub completed: u64,
}

/// Worker actor arguments.
pub struct WorkerArgs {
    pub worker_id: String,
    pub queue: ActorRef<QueueMessage>,
    pub compute: Arc<dyn Compute>,
    pub results: ResultStore,
    pub registry: Arc<JobRegistry>,
    /// Incremented once per worker start.
    pub spawned: Arc<AtomicUsize>,
}

/// Worker actor that executes tasks one at a time.
pub struct WorkerActor;

impl Actor for WorkerActor {
    type Msg = WorkerMessage;
    type State = WorkerActorState;
    type Arguments = WorkerArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting worker: {}", args.worker_id);
        args.spawned.fetch_add(1, Ordering::SeqCst);

        Ok(WorkerActorState {
            worker_id: args.worker_id,
            queue: args.queue,
            compute: args.compute,
            results: args.results,
            registry: args.registry,
            completed: 0,
        })
    }

    async fn post_start(
        &self,
        myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        state.queue.send_message(QueueMessage::WorkerIdle { worker: myself })?;
        Ok(())
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            WorkerMessage::Execute { task } => {
                execute(state, *task).await?;
                state
                    .queue
                    .send_message(QueueMessage::WorkerIdle { worker: myself })?;
            }

            WorkerMessage::Stop => {
                tracing::info!(
                    "Shutting down worker: {} ({} tasks completed)",
                    state.worker_id,
                    state.completed
                );
                myself.stop(None);
            }
        }

        Ok(())
    }
}

/// Run one task: compute, persist, then publish `done`.
///
/// A failed computation is stored as the job's result. A failed write leaves
/// the job running, since `done` must imply a readable result.
async fn execute(state: &mut WorkerActorState, task: Task) -> Result<(), ActorProcessingErr> {
    let job_id = task.job_id;
    let request_type = task.request.kind();
    let started = Instant::now();

    let result = match run_compute(state.compute.as_ref(), &task) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!(%job_id, %request_type, worker_id = %state.worker_id, "Computation failed: {}", e);
            e.to_result()
        }
    };

    if let Err(e) = state.results.write(job_id, &result).await {
        tracing::error!(%job_id, worker_id = %state.worker_id, "Failed to persist result, job stays running: {}", e);
        return Ok(());
    }

    state.registry.mark_done(job_id)?;
    state.completed += 1;
    tracing::info!(
        %job_id,
        %request_type,
        worker_id = %state.worker_id,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Job done"
    );
    Ok(())
}

fn run_compute(compute: &dyn Compute, task: &Task) -> Result<Value, ComputeError> {
    match catch_unwind(AssertUnwindSafe(|| compute.compute(&task.request))) {
        Ok(result) => result,
        Err(panic) => {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ComputeError::Panicked(message))
        }
    }
}
