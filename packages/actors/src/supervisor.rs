//! Supervisor actor owning the worker pool lifecycle.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;

use job_core::Compute;
use ractor::{Actor, ActorProcessingErr, ActorRef, SupervisionEvent};
use storage::ResultStore;
use tokio::sync::watch;

use crate::messages::{QueueMessage, SupervisorMessage};
use crate::registry::JobRegistry;
use crate::worker_actor::{WorkerActor, WorkerArgs};

/// Lifecycle of the worker pool. Moves forward only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum PoolState {
    /// Submissions are accepted.
    #[default]
    Accepting,
    /// Submissions are refused; queued and in-flight tasks still run.
    Draining,
    /// Every worker has exited.
    Stopped,
}

impl PoolState {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoolState::Accepting => "accepting",
            PoolState::Draining => "draining",
            PoolState::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for PoolState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Supervisor actor arguments.
pub struct SupervisorArgs {
    pub workers: usize,
    pub queue: ActorRef<QueueMessage>,
    pub compute: Arc<dyn Compute>,
    pub results: ResultStore,
    pub registry: Arc<JobRegistry>,
    pub spawned: Arc<AtomicUsize>,
    pub state_tx: watch::Sender<PoolState>,
}

/// State for the supervisor actor.
pub struct SupervisorState {
    /// Task queue the workers pull from.
    queue: ActorRef<QueueMessage>,
    /// Workers that have not exited yet.
    live_workers: usize,
    /// Published pool lifecycle.
    state_tx: watch::Sender<PoolState>,
}

impl SupervisorState {
    fn pool_state(&self) -> PoolState {
        *self.state_tx.borrow()
    }

    fn begin_draining(&mut self) {
        if self.pool_state() == PoolState::Accepting {
            tracing::info!(live_workers = self.live_workers, "Worker pool draining");
            self.state_tx.send_replace(PoolState::Draining);
        }
        let _ = self.queue.send_message(QueueMessage::Drain);
    }

    fn worker_exited(&mut self, myself: &ActorRef<SupervisorMessage>) {
        self.live_workers = self.live_workers.saturating_sub(1);
        if self.live_workers > 0 {
            return;
        }

        if self.pool_state() == PoolState::Accepting {
            tracing::error!("Every worker has exited; refusing further submissions");
            self.begin_draining();
        }
        self.finish(myself);
    }

    fn finish(&mut self, myself: &ActorRef<SupervisorMessage>) {
        tracing::info!("Worker pool stopped");
        self.state_tx.send_replace(PoolState::Stopped);
        self.queue.stop(None);
        myself.stop(None);
    }
}

/// Supervisor actor that spawns the workers once and tracks them until they
/// all exit.
pub struct Supervisor;

impl Actor for Supervisor {
    type Msg = SupervisorMessage;
    type State = SupervisorState;
    type Arguments = SupervisorArgs;

    async fn pre_start(
        &self,
        myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!(workers = args.workers, "Starting worker pool supervisor");

        for index in 0..args.workers {
            let worker = WorkerArgs {
                worker_id: format!("worker-{}", index + 1),
                queue: args.queue.clone(),
                compute: args.compute.clone(),
                results: args.results.clone(),
                registry: args.registry.clone(),
                spawned: args.spawned.clone(),
            };

            Actor::spawn_linked(None, WorkerActor, worker, myself.get_cell())
                .await
                .map_err(|e| ActorProcessingErr::from(format!("Failed to spawn worker: {}", e)))?;
        }

        Ok(SupervisorState {
            queue: args.queue,
            live_workers: args.workers,
            state_tx: args.state_tx,
        })
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SupervisorMessage::Shutdown => {
                state.begin_draining();
                if state.live_workers == 0 && state.pool_state() != PoolState::Stopped {
                    state.finish(&myself);
                }
            }
        }

        Ok(())
    }

    async fn handle_supervisor_evt(
        &self,
        myself: ActorRef<Self::Msg>,
        message: SupervisionEvent,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            SupervisionEvent::ActorTerminated(cell, _, _) => {
                tracing::debug!("Worker {} exited", cell.get_id());
                state.worker_exited(&myself);
            }
            SupervisionEvent::ActorFailed(cell, err) => {
                tracing::error!("Worker {} failed: {}", cell.get_id(), err);
                state.worker_exited(&myself);
            }
            _ => {}
        }
        Ok(())
    }
}
