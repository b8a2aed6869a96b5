//! Actor system for asynchronous job execution.
//!
//! This crate provides the Ractor-based actors that run submitted jobs
//! on a fixed pool of workers.
//!
//! # Architecture
//!
//! - `TaskQueueActor` - FIFO of pending tasks; parks idle workers until work arrives
//! - `WorkerActor` - Computes one task at a time, persists the result, marks the job done
//! - `Supervisor` - Spawns the workers once and tracks them through shutdown
//! - `JobRegistry` - Id allocation and job state, shared behind a lock
//!
//! # Usage
//!
//! ```ignore
//! use actors::{JobService, PoolConfig};
//!
//! let (service, _handle) = JobService::start(PoolConfig::default(), compute, results).await?;
//! let job_id = service.submit(request).await?;
//! service.shutdown();
//! service.wait_stopped().await;
//! ```

mod config;
mod messages;
mod queue_actor;
mod registry;
mod service;
mod supervisor;
mod worker_actor;

pub use config::{PoolConfig, WORKERS_ENV};
pub use messages::{QueueMessage, QueueStats, SubmitError, SupervisorMessage, WorkerMessage};
pub use queue_actor::TaskQueueActor;
pub use registry::{JobEntry, JobRegistry, RegistryError};
pub use service::{JobLookup, JobService, ServiceError};
pub use supervisor::{PoolState, Supervisor};
pub use worker_actor::WorkerActor;
