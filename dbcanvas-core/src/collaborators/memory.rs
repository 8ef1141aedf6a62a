use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::CanvasStore;
use crate::errors::{StoreError, StoreResult};

/// Process-local canvas store keyed by `(owner_key, canvas_id)`.
#[derive(Debug, Default)]
pub struct InMemoryCanvasStore {
    documents: RwLock<HashMap<(String, String), String>>,
}

impl InMemoryCanvasStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    pub async fn canvas_ids(&self, owner_key: &str) -> Vec<String> {
        let mut ids: Vec<String> = self
            .documents
            .read()
            .await
            .keys()
            .filter(|(owner, _)| owner == owner_key)
            .map(|(_, canvas_id)| canvas_id.clone())
            .collect();
        ids.sort();
        ids
    }
}

fn key(owner_key: &str, canvas_id: &str) -> (String, String) {
    (owner_key.to_string(), canvas_id.to_string())
}

#[async_trait]
impl CanvasStore for InMemoryCanvasStore {
    async fn get(&self, owner_key: &str, canvas_id: &str) -> StoreResult<Option<String>> {
        Ok(self
            .documents
            .read()
            .await
            .get(&key(owner_key, canvas_id))
            .cloned())
    }

    async fn put(&self, owner_key: &str, canvas_id: &str, json: &str) -> StoreResult<()> {
        self.documents
            .write()
            .await
            .insert(key(owner_key, canvas_id), json.to_string());
        Ok(())
    }

    async fn delete(&self, owner_key: &str, canvas_id: &str) -> StoreResult<()> {
        match self.documents.write().await.remove(&key(owner_key, canvas_id)) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound {
                owner_key: owner_key.to_string(),
                canvas_id: canvas_id.to_string(),
            }),
        }
    }
}
