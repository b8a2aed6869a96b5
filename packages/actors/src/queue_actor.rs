//! Task queue actor: FIFO handoff between submitters and workers.

use std::collections::VecDeque;
use std::sync::Arc;

use job_core::Task;
use ractor::{Actor, ActorProcessingErr, ActorRef};

use crate::messages::{QueueMessage, QueueStats, SubmitError, WorkerMessage};
use crate::registry::JobRegistry;

/// State for the task queue actor.
///
/// Idle workers park here instead of polling; a worker is woken by being
/// handed a task, or told to stop once the queue has drained.
pub struct TaskQueueState {
    /// Tasks waiting for a worker, oldest first.
    pending: VecDeque<Task>,
    /// Workers waiting for a task, longest-waiting first.
    idle: VecDeque<ActorRef<WorkerMessage>>,
    /// Shared job registry.
    registry: Arc<JobRegistry>,
    /// Set once shutdown begins; never cleared.
    draining: bool,
}

impl TaskQueueState {
    /// Create a new task queue state.
    pub fn new(registry: Arc<JobRegistry>) -> Self {
        Self {
            pending: VecDeque::new(),
            idle: VecDeque::new(),
            registry,
            draining: false,
        }
    }

    fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.pending.len(),
            idle_workers: self.idle.len(),
            draining: self.draining,
        }
    }

    /// Hand `task` to the first idle worker that is still alive, or queue it.
    fn dispatch(&mut self, task: Task) {
        let mut task = Box::new(task);
        while let Some(worker) = self.idle.pop_front() {
            match hand_off(&worker, task) {
                Ok(()) => return,
                Err(returned) => task = returned,
            }
        }
        self.pending.push_back(*task);
    }

    fn release_idle_workers(&mut self) {
        for worker in self.idle.drain(..) {
            let _ = worker.send_message(WorkerMessage::Stop);
        }
    }
}

/// Send `task` to `worker`, giving it back if the worker has stopped.
fn hand_off(worker: &ActorRef<WorkerMessage>, task: Box<Task>) -> Result<(), Box<Task>> {
    let job_id = task.job_id;
    match worker.send_message(WorkerMessage::Execute { task }) {
        Ok(()) => Ok(()),
        Err(ractor::MessagingErr::SendErr(WorkerMessage::Execute { task })) => {
            tracing::warn!(%job_id, worker = %worker.get_id(), "Worker is gone, requeueing task");
            Err(task)
        }
        Err(e) => {
            tracing::error!(%job_id, worker = %worker.get_id(), "Failed to hand task to worker: {}", e);
            Ok(())
        }
    }
}

/// Task queue actor. The mailbox serializes submissions with shutdown, so
/// every accepted task is enqueued before draining starts.
pub struct TaskQueueActor;

impl Actor for TaskQueueActor {
    type Msg = QueueMessage;
    type State = TaskQueueState;
    type Arguments = TaskQueueState;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> Result<Self::State, ActorProcessingErr> {
        tracing::info!("Starting task queue");
        Ok(args)
    }

    async fn handle(
        &self,
        _myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> Result<(), ActorProcessingErr> {
        match message {
            QueueMessage::Submit { request, reply } => {
                if state.draining {
                    let _ = reply.send(Err(SubmitError::ShuttingDown));
                    return Ok(());
                }

                let request_type = request.kind();
                let job_id = state.registry.allocate(request.clone());
                tracing::info!(%job_id, %request_type, "Job submitted");

                state.dispatch(Task::new(job_id, request));
                let _ = reply.send(Ok(job_id));
            }

            QueueMessage::WorkerIdle { worker } => {
                if let Some(task) = state.pending.pop_front() {
                    if let Err(task) = hand_off(&worker, Box::new(task)) {
                        state.pending.push_front(*task);
                    }
                } else if state.draining {
                    let _ = worker.send_message(WorkerMessage::Stop);
                } else {
                    state.idle.push_back(worker);
                }
            }

            QueueMessage::Drain => {
                if !state.draining {
                    tracing::info!(pending = state.pending.len(), "Task queue draining");
                    state.draining = true;
                }
                if state.pending.is_empty() {
                    state.release_idle_workers();
                }
            }

            QueueMessage::GetStats { reply } => {
                let _ = reply.send(state.stats());
            }
        }

        Ok(())
    }
}
