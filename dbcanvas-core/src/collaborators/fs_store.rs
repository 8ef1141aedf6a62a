use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::CanvasStore;
use crate::errors::{StoreError, StoreResult};

/// One JSON document per canvas at `<root>/<owner_key>/<canvas_id>.json`.
#[derive(Debug, Clone)]
pub struct FsCanvasStore {
    root: PathBuf,
}

impl FsCanvasStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn canvas_path(&self, owner_key: &str, canvas_id: &str) -> StoreResult<PathBuf> {
        Ok(self
            .root
            .join(path_segment(owner_key)?)
            .join(format!("{}.json", path_segment(canvas_id)?)))
    }
}

fn path_segment(value: &str) -> StoreResult<&str> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains(['/', '\\'])
    {
        return Err(StoreError::Backend(format!(
            "'{}' is not a valid storage key",
            value
        )));
    }
    Ok(value)
}

#[async_trait]
impl CanvasStore for FsCanvasStore {
    async fn get(&self, owner_key: &str, canvas_id: &str) -> StoreResult<Option<String>> {
        let path = self.canvas_path(owner_key, canvas_id)?;
        match fs::read_to_string(&path).await {
            Ok(json) => Ok(Some(json)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn put(&self, owner_key: &str, canvas_id: &str, json: &str) -> StoreResult<()> {
        let path = self.canvas_path(owner_key, canvas_id)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, json).await?;
        debug!("Wrote canvas {} to {}", canvas_id, path.display());
        Ok(())
    }

    async fn delete(&self, owner_key: &str, canvas_id: &str) -> StoreResult<()> {
        let path = self.canvas_path(owner_key, canvas_id)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Err(StoreError::NotFound {
                owner_key: owner_key.to_string(),
                canvas_id: canvas_id.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }
}
