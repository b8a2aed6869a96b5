//! Message types for actor communication.

use job_core::{JobId, StatRequest, Task};
use ractor::{ActorRef, RpcReplyPort};

/// Messages for the TaskQueueActor.
#[derive(Debug)]
pub enum QueueMessage {
    /// Register a new job and enqueue its task.
    Submit {
        request: StatRequest,
        reply: RpcReplyPort<Result<JobId, SubmitError>>,
    },

    /// A worker is ready for its next task.
    WorkerIdle { worker: ActorRef<WorkerMessage> },

    /// Stop accepting submissions and release workers once the queue is empty.
    Drain,

    /// Get queue stats.
    GetStats { reply: RpcReplyPort<QueueStats> },
}

/// Messages for the WorkerActor.
#[derive(Debug)]
pub enum WorkerMessage {
    /// Execute a task, then ask the queue for the next one.
    Execute { task: Box<Task> },

    /// No more work will arrive; exit.
    Stop,
}

/// Messages for the Supervisor.
#[derive(Debug)]
pub enum SupervisorMessage {
    /// Begin draining the pool.
    Shutdown,
}

/// Snapshot of the task queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Tasks waiting for a worker.
    pub pending: usize,
    /// Workers parked waiting for a task.
    pub idle_workers: usize,
    /// Whether submissions are being refused.
    pub draining: bool,
}

/// Why a submission was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("shutting down")]
    ShuttingDown,
}
