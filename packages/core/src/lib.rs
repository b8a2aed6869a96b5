//! Core domain types for the statistics job service.
//!
//! This crate contains shared types used across all packages:
//! - JobId, JobState and Task for submitted work
//! - RequestKind and StatRequest for the statistics a client can ask for
//! - The Compute trait workers call to answer a request

mod compute;
mod job;
mod request;

pub use compute::{Compute, ComputeError};
pub use job::{JobId, JobState, Task};
pub use request::{RequestError, RequestKind, StatRequest};
