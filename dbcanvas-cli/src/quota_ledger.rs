use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::debug;

use dbcanvas::collaborators::QuotaService;
use dbcanvas::errors::{QuotaError, QuotaResult};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct OwnerEntry {
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub unlimited: bool,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default)]
    owners: BTreeMap<String, OwnerEntry>,
}

/// Canvas counts kept in a JSON file beside the canvas store. Owners missing
/// from the file start at zero.
pub struct FileQuotaLedger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileQuotaLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> QuotaResult<LedgerFile> {
        match fs::read_to_string(&self.path).await {
            Ok(json) => serde_json::from_str(&json).map_err(|e| {
                QuotaError::Backend(format!("{} is not a quota ledger: {}", self.path.display(), e))
            }),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(LedgerFile::default()),
            Err(err) => Err(QuotaError::Backend(err.to_string())),
        }
    }

    async fn write(&self, ledger: &LedgerFile) -> QuotaResult<()> {
        let json = serde_json::to_string_pretty(ledger)
            .map_err(|e| QuotaError::Backend(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| QuotaError::Backend(e.to_string()))?;
        }
        fs::write(&self.path, json)
            .await
            .map_err(|e| QuotaError::Backend(e.to_string()))
    }

    async fn entry(&self, owner_id: &str) -> QuotaResult<OwnerEntry> {
        let _guard = self.lock.lock().await;
        Ok(self
            .read()
            .await?
            .owners
            .get(owner_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl QuotaService for FileQuotaLedger {
    async fn owner_canvas_count(&self, owner_id: &str) -> QuotaResult<u32> {
        Ok(self.entry(owner_id).await?.count)
    }

    async fn is_unlimited(&self, owner_id: &str) -> QuotaResult<bool> {
        Ok(self.entry(owner_id).await?.unlimited)
    }

    async fn increment_owner_canvas_count(&self, owner_id: &str) -> QuotaResult<()> {
        let _guard = self.lock.lock().await;
        let mut ledger = self.read().await?;
        let entry = ledger.owners.entry(owner_id.to_string()).or_default();
        entry.count += 1;
        debug!("Owner {} now holds {} canvases", owner_id, entry.count);
        self.write(&ledger).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbcanvas_test_utils::TempDir;

    #[tokio::test]
    async fn test_missing_ledger_starts_at_zero() {
        let temp = TempDir::new().unwrap();
        let ledger = FileQuotaLedger::new(temp.join("quota.json"));

        assert_eq!(ledger.owner_canvas_count("owner-1").await.unwrap(), 0);
        assert!(!ledger.is_unlimited("owner-1").await.unwrap());

        ledger.increment_owner_canvas_count("owner-1").await.unwrap();
        ledger.increment_owner_canvas_count("owner-1").await.unwrap();
        assert_eq!(ledger.owner_canvas_count("owner-1").await.unwrap(), 2);
        assert_eq!(ledger.owner_canvas_count("owner-2").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reads_unlimited_flag() {
        let temp = TempDir::new().unwrap();
        let path = temp.join("quota.json");
        std::fs::write(
            &path,
            r#"{"owners": {"premium": {"count": 40, "unlimited": true}}}"#,
        )
        .unwrap();

        let ledger = FileQuotaLedger::new(path);
        assert!(ledger.is_unlimited("premium").await.unwrap());
        assert_eq!(ledger.owner_canvas_count("premium").await.unwrap(), 40);
    }

    #[tokio::test]
    async fn test_corrupt_ledger_is_backend_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.join("quota.json");
        std::fs::write(&path, "not json").unwrap();

        let err = FileQuotaLedger::new(path)
            .owner_canvas_count("owner-1")
            .await
            .unwrap_err();
        assert!(matches!(err, QuotaError::Backend(_)));
    }
}
