//! Worker pool configuration.

use std::num::NonZeroUsize;

use crate::service::ServiceError;

/// Environment variable overriding the worker count.
pub const WORKERS_ENV: &str = "TP_NUM_OF_THREADS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of long-lived workers. Never exceeded.
    pub workers: NonZeroUsize,
}

impl PoolConfig {
    pub fn new(workers: NonZeroUsize) -> Self {
        Self { workers }
    }

    /// Pool sized by `TP_NUM_OF_THREADS`, or the host's available parallelism.
    pub fn from_env() -> Result<Self, ServiceError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same rules as [`PoolConfig::from_env`], reading from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ServiceError> {
        match lookup(WORKERS_ENV) {
            Some(raw) if !raw.trim().is_empty() => {
                let workers = raw.trim().parse::<NonZeroUsize>().map_err(|_| {
                    ServiceError::InvalidConfig(format!(
                        "{WORKERS_ENV}={raw} (expected a positive integer)"
                    ))
                })?;
                Ok(Self::new(workers))
            }
            _ => Ok(Self::default()),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        let workers = std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN);
        Self { workers }
    }
}
