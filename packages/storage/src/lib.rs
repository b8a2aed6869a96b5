//! Object storage for computed job results.
//!
//! Goal:
//! - On-disk storage (one file per job) for running servers
//! - In-memory storage for tests
//!
//! Implementation note:
//! This is a small wrapper around `object_store`, whose local filesystem
//! backend writes through a temporary file and renames it into place, so a
//! reader never sees a partially written result.

mod results;

pub use results::ResultStore;

use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use object_store::ObjectStore;
use object_store::ObjectStoreExt;
use object_store::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("invalid storage config: {0}")]
    InvalidConfig(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object_store error: {0}")]
    ObjectStore(#[from] object_store::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Filesystem,
    Memory,
}

impl StorageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StorageKind::Filesystem => "filesystem",
            StorageKind::Memory => "memory",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackendConfig {
    Filesystem { root: PathBuf },
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub backend: StorageBackendConfig,
    /// Optional key prefix applied to all object keys.
    pub prefix: Option<String>,
}

const DEFAULT_RESULTS_DIR: &str = "./results";

impl StorageConfig {
    pub fn memory() -> Self {
        Self {
            backend: StorageBackendConfig::Memory,
            prefix: None,
        }
    }

    pub fn filesystem(root: impl Into<PathBuf>) -> Self {
        Self {
            backend: StorageBackendConfig::Filesystem { root: root.into() },
            prefix: None,
        }
    }

    /// Build a config from environment variables.
    ///
    /// - `RESULTS_BACKEND`: `filesystem` (default, alias `fs`) or `memory` (alias `mem`)
    /// - `RESULTS_DIR`: filesystem root (default: `./results`)
    /// - `RESULTS_PREFIX`: optional key prefix
    pub fn from_env() -> Result<Self, StorageError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same rules as [`StorageConfig::from_env`], reading from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, StorageError> {
        let backend = lookup("RESULTS_BACKEND").and_then(non_empty);
        let prefix = lookup("RESULTS_PREFIX").and_then(non_empty);

        let cfg = match backend.as_deref() {
            None | Some("filesystem") | Some("fs") => {
                let root = lookup("RESULTS_DIR")
                    .and_then(non_empty)
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_DIR));
                Self::filesystem(root)
            }
            Some("memory") | Some("mem") => Self::memory(),
            Some(other) => {
                return Err(StorageError::InvalidConfig(format!(
                    "unsupported RESULTS_BACKEND={other} (expected filesystem|memory)"
                )));
            }
        };

        Ok(Self { prefix, ..cfg })
    }
}

#[derive(Clone)]
pub struct Storage {
    kind: StorageKind,
    store: Arc<dyn ObjectStore>,
    prefix: Option<String>,
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("kind", &self.kind)
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl Storage {
    pub fn new(cfg: StorageConfig) -> Result<Self, StorageError> {
        let (kind, store) = match cfg.backend {
            StorageBackendConfig::Filesystem { root } => {
                ensure_dir(&root)?;
                let fs = object_store::local::LocalFileSystem::new_with_prefix(&root)?;
                (StorageKind::Filesystem, Arc::new(fs) as _)
            }
            StorageBackendConfig::Memory => {
                let mem = object_store::memory::InMemory::new();
                (StorageKind::Memory, Arc::new(mem) as _)
            }
        };

        tracing::info!(backend = kind.as_str(), "Result storage ready");

        Ok(Self {
            kind,
            store,
            prefix: cfg.prefix.and_then(non_empty),
        })
    }

    fn to_path(&self, key: &str) -> Result<Path, StorageError> {
        let key = key.trim_start_matches('/');
        if key.is_empty() {
            return Err(StorageError::InvalidConfig(
                "object key must not be empty".to_string(),
            ));
        }

        let joined = match self.prefix.as_deref() {
            Some(prefix) => {
                let prefix = prefix.trim_matches('/');
                if prefix.is_empty() {
                    key.to_string()
                } else {
                    format!("{prefix}/{key}")
                }
            }
            None => key.to_string(),
        };

        Ok(Path::from(joined))
    }

    pub async fn put_bytes(&self, key: &str, bytes: Bytes) -> Result<(), StorageError> {
        let path = self.to_path(key)?;
        self.store
            .put(&path, object_store::PutPayload::from(bytes))
            .await?;
        Ok(())
    }

    pub async fn get_bytes(&self, key: &str) -> Result<Bytes, StorageError> {
        let path = self.to_path(key)?;
        let res = match self.store.get(&path).await {
            Ok(res) => res,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(StorageError::NotFound(key.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(res.bytes().await?)
    }

    pub async fn put_json_value(
        &self,
        key: &str,
        value: &serde_json::Value,
    ) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec(value)?;
        self.put_bytes(key, Bytes::from(bytes)).await
    }

    pub async fn get_json_value(&self, key: &str) -> Result<serde_json::Value, StorageError> {
        let bytes = self.get_bytes(key).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn ensure_dir(root: &FsPath) -> Result<(), StorageError> {
    std::fs::create_dir_all(root)?;
    Ok(())
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::disallowed_methods)]

    use super::*;

    fn lookup<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |name| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
        }
    }

    #[tokio::test]
    async fn in_memory_round_trip() -> Result<(), StorageError> {
        let storage = Storage::new(StorageConfig::memory())?;
        storage.put_bytes("hello.txt", Bytes::from("hi")).await?;
        let got = storage.get_bytes("hello.txt").await?;
        assert_eq!(got, Bytes::from("hi"));
        Ok(())
    }

    #[tokio::test]
    async fn missing_key_is_not_found() -> Result<(), StorageError> {
        let storage = Storage::new(StorageConfig::memory())?;
        let missing = storage.get_bytes("nope.json").await;
        assert!(matches!(missing, Err(StorageError::NotFound(key)) if key == "nope.json"));
        Ok(())
    }

    #[tokio::test]
    async fn prefix_is_applied_to_keys() -> Result<(), StorageError> {
        let dir = tempfile::tempdir()?;
        let mut cfg = StorageConfig::filesystem(dir.path());
        cfg.prefix = Some("/run-1/".to_string());
        let storage = Storage::new(cfg)?;

        storage.put_bytes("a.json", Bytes::from("{}")).await?;
        assert!(dir.path().join("run-1").join("a.json").exists());
        Ok(())
    }

    #[test]
    fn config_from_lookup() -> Result<(), StorageError> {
        let cfg = StorageConfig::from_lookup(lookup(&[]))?;
        assert_eq!(cfg, StorageConfig::filesystem(DEFAULT_RESULTS_DIR));

        let cfg = StorageConfig::from_lookup(lookup(&[
            ("RESULTS_BACKEND", "mem"),
            ("RESULTS_PREFIX", "  "),
        ]))?;
        assert_eq!(cfg, StorageConfig::memory());

        let cfg = StorageConfig::from_lookup(lookup(&[
            ("RESULTS_BACKEND", "fs"),
            ("RESULTS_DIR", "/tmp/out"),
        ]))?;
        assert_eq!(cfg.backend, StorageBackendConfig::Filesystem { root: "/tmp/out".into() });

        let bad = StorageConfig::from_lookup(lookup(&[("RESULTS_BACKEND", "s3")]));
        assert!(matches!(bad, Err(StorageError::InvalidConfig(_))));
        Ok(())
    }
}
