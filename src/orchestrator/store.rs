//! Result Store - writes completed simulation batches to disk
//!
//! The artifact is a pretty-printed JSON array of
//! `{persona, question, response}` objects. Every save overwrites the file.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::info;

use crate::orchestrator::{ResponseRecord, SimulationBatch};

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[async_trait]
pub trait ResultStore: Send + Sync {
    async fn save(&self, batch: &SimulationBatch) -> Result<(), PersistenceError>;

    /// The most recently saved records, empty when nothing was saved yet.
    async fn load(&self) -> Result<Vec<ResponseRecord>, PersistenceError>;
}

pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ResultStore for JsonFileStore {
    async fn save(&self, batch: &SimulationBatch) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(batch.records())?;

        fs::write(&self.path, json).await
            .map_err(|source| PersistenceError::Write { path: self.path.clone(), source })?;

        info!("Saved {} results to {}", batch.len(), self.path.display());
        Ok(())
    }

    async fn load(&self) -> Result<Vec<ResponseRecord>, PersistenceError> {
        let json = match fs::read_to_string(&self.path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(PersistenceError::Read { path: self.path.clone(), source }),
        };
        Ok(serde_json::from_str(&json)?)
    }
}
