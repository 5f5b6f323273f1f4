//! Local filesystem seen-set storage.
//!
//! The seen file is a flat JSON array of listing ids (numbers or strings),
//! read at start and overwritten wholesale at persist time. Writes go
//! through a temp file and rename so a crash mid-write never corrupts the
//! previous ledger.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::ListingId;
use crate::storage::{SeenSet, SeenStorage};

/// Seen-set store backed by a single JSON file.
#[derive(Debug, Clone)]
pub struct LocalSeenStore {
    path: PathBuf,
}

impl LocalSeenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn read_bytes(&self) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl SeenStorage for LocalSeenStore {
    async fn load(&self) -> Result<SeenSet> {
        let Some(bytes) = self.read_bytes().await? else {
            log::info!("No seen file at {}; starting empty", self.path.display());
            return Ok(SeenSet::new());
        };

        match serde_json::from_slice::<Vec<ListingId>>(&bytes) {
            Ok(ids) => {
                let seen = SeenSet::from_ids(ids);
                log::info!(
                    "Loaded {} seen ids from {}",
                    seen.len(),
                    self.path.display()
                );
                Ok(seen)
            }
            Err(e) => {
                log::warn!(
                    "Seen file {} is corrupted ({}). Starting with an empty set.",
                    self.path.display(),
                    e
                );
                Ok(SeenSet::new())
            }
        }
    }

    async fn persist(&self, seen: &SeenSet) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(&seen.sorted_ids())?;
        self.write_bytes(&bytes).await?;
        log::debug!("Persisted {} seen ids to {}", seen.len(), self.path.display());
        Ok(())
    }
}
