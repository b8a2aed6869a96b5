//! Process configuration, read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use actors::{PoolConfig, ServiceError};
use storage::{StorageConfig, StorageError};

pub const BIND_ADDR_ENV: &str = "STATS_BIND_ADDR";
pub const DATASET_ENV: &str = "STATS_DATASET";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
const DEFAULT_DATASET: &str = "./nutrition_activity_obesity_usa_subset.csv";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// CSV file loaded once at startup.
    pub dataset: PathBuf,
    pub pool: PoolConfig,
    pub storage: StorageConfig,
}

impl ServerConfig {
    /// Build a config from environment variables.
    ///
    /// - `STATS_BIND_ADDR`: listen address (default: `127.0.0.1:5000`)
    /// - `STATS_DATASET`: path to the survey CSV
    /// - `TP_NUM_OF_THREADS`: worker count
    /// - `RESULTS_BACKEND`, `RESULTS_DIR`, `RESULTS_PREFIX`: result storage
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_addr = lookup(BIND_ADDR_ENV)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(raw_addr.clone()))?;

        let dataset = lookup(DATASET_ENV)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET));

        Ok(Self {
            bind_addr,
            dataset,
            pool: PoolConfig::from_lookup(&lookup)?,
            storage: StorageConfig::from_lookup(&lookup)?,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid STATS_BIND_ADDR: {0}")]
    InvalidBindAddr(String),

    #[error(transparent)]
    Pool(#[from] ServiceError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
