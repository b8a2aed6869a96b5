#![allow(clippy::disallowed_methods, dead_code)]

use std::error::Error;
use std::num::NonZeroUsize;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use actors::{JobLookup, JobService, PoolConfig};
use job_core::{Compute, JobId, StatRequest};
use serde_json::Value;
use stats::{Dataset, Row, StatsEngine};
use storage::ResultStore;

pub const TIMEOUT: Duration = Duration::from_secs(10);

pub const OBESITY: &str = "Percent of adults aged 18 years and older who have obesity";

pub fn pool(workers: usize) -> PoolConfig {
    PoolConfig::new(NonZeroUsize::new(workers).unwrap_or(NonZeroUsize::MIN))
}

pub fn engine() -> Arc<dyn Compute> {
    Arc::new(StatsEngine::new(Dataset::from_rows(vec![
        Row::new("Alabama", OBESITY, 10.0),
        Row::new("Alabama", OBESITY, 20.0),
        Row::new("Alaska", OBESITY, 30.0),
    ])))
}

pub fn global_mean() -> StatRequest {
    StatRequest::GlobalMean {
        question: OBESITY.to_string(),
    }
}

pub async fn start(workers: usize, compute: Arc<dyn Compute>) -> Result<JobService, Box<dyn Error>> {
    let (service, _handle) = JobService::start(pool(workers), compute, ResultStore::memory()?).await?;
    Ok(service)
}

/// Poll until `id` is done and return its result.
pub async fn wait_done(service: &JobService, id: JobId) -> Result<Value, Box<dyn Error>> {
    tokio::time::timeout(TIMEOUT, poll_done(service, id)).await?
}

async fn poll_done(service: &JobService, id: JobId) -> Result<Value, Box<dyn Error>> {
    loop {
        match service.lookup(id).await? {
            JobLookup::Done(value) => return Ok(value),
            JobLookup::NotFound => return Err(format!("{id} is not a known job").into()),
            JobLookup::Running => tokio::time::sleep(Duration::from_millis(5)).await,
        }
    }
}

/// Blocks computations until opened.
#[derive(Default)]
pub struct Gate {
    open: Mutex<bool>,
    cv: Condvar,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn open(&self) {
        let mut open = self.open.lock().unwrap();
        *open = true;
        self.cv.notify_all();
    }

    pub fn wait(&self) {
        let open = self.open.lock().unwrap();
        let _ = self.cv.wait_timeout_while(open, TIMEOUT, |open| !*open).unwrap();
    }
}

/// Wrap `inner` so every computation waits on `gate` first.
pub fn gated(gate: Arc<Gate>, inner: Arc<dyn Compute>) -> Arc<dyn Compute> {
    Arc::new(move |request: &StatRequest| {
        gate.wait();
        inner.compute(request)
    })
}
