use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tracing::debug;

use super::{decode, JobStore, StoreError};
use crate::models::{JobCategory, PostingSet};

/// One JSON document per category under `data_dir`, written via temp file
/// plus rename so a reader never observes a partial write.
#[derive(Debug, Clone)]
pub struct FileJobStore {
    data_dir: PathBuf,
}

impl FileJobStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    pub fn path_for(&self, category: &JobCategory) -> PathBuf {
        self.data_dir
            .join(format!("scraped_{}.json", category.cache_key()))
    }
}

fn write_atomic(dir: &Path, target: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

#[async_trait]
impl JobStore for FileJobStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn load(&self, category: &JobCategory) -> Result<Option<PostingSet>, StoreError> {
        let path = self.path_for(category);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        debug!("Read {} bytes from {}", bytes.len(), path.display());
        decode(category, &bytes).map(Some)
    }

    async fn save(&self, category: &JobCategory, set: &PostingSet) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(set)?;
        let dir = self.data_dir.clone();
        let target = self.path_for(category);

        tokio::task::spawn_blocking(move || write_atomic(&dir, &target, &bytes))
            .await
            .map_err(|e| StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
    }
}
