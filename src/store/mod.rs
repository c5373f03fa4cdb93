//! Flat per-id JSON persistence for visits and finalized results.
//!
//! Layout under the data directory:
//! `visits/<id>.json`, `results/<id>.json`, `results/<id>.obj`.
//! No locking: concurrent writers to one id are last-write-wins.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;

pub mod helpers;
pub mod models;
pub mod repositories;

pub use models::{FinalizedResult, NewVisit, Visit};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("invalid id {0:?}")]
    InvalidId(String),
    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed JSON in {}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone)]
pub struct Storage {
    visits_dir: Arc<PathBuf>,
    results_dir: Arc<PathBuf>,
}

impl Storage {
    pub fn new(data_dir: &Path) -> Result<Self> {
        let visits_dir = data_dir.join("visits");
        let results_dir = data_dir.join("results");
        for dir in [&visits_dir, &results_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
        }
        info!("Storage ready at {}", data_dir.display());

        Ok(Self {
            visits_dir: Arc::new(visits_dir),
            results_dir: Arc::new(results_dir),
        })
    }

    fn visit_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        helpers::validate_id(id)?;
        Ok(self.visits_dir.join(format!("{id}.json")))
    }

    fn result_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        helpers::validate_id(id)?;
        Ok(self.results_dir.join(format!("{id}.json")))
    }

    fn mesh_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        helpers::validate_id(id)?;
        Ok(self.results_dir.join(format!("{id}.obj")))
    }
}
