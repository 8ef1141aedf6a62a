use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use dbcanvas::collaborators::{
    CanvasStore, ExternalPropertyRef, ExternalRef, ExternalSchemaApi, QuotaService,
};
use dbcanvas::errors::{
    ExternalApiError, ExternalApiResult, QuotaError, QuotaResult, StoreError, StoreResult,
};
use dbcanvas::export::PropertyDefinition;

/// In-memory store that records every call and can be told to fail.
#[derive(Default)]
pub struct RecordingCanvasStore {
    documents: Mutex<HashMap<(String, String), String>>,
    puts: Mutex<Vec<String>>,
    deletes: Mutex<Vec<String>>,
    fail_put: AtomicBool,
    fail_delete: AtomicBool,
}

impl RecordingCanvasStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_put(self) -> Self {
        self.fail_put.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_delete(self) -> Self {
        self.fail_delete.store(true, Ordering::SeqCst);
        self
    }

    /// Canvas ids passed to `put`, in call order.
    pub async fn puts(&self) -> Vec<String> {
        self.puts.lock().await.clone()
    }

    /// Canvas ids passed to `delete`, in call order.
    pub async fn deletes(&self) -> Vec<String> {
        self.deletes.lock().await.clone()
    }

    pub async fn stored_count(&self) -> usize {
        self.documents.lock().await.len()
    }
}

#[async_trait]
impl CanvasStore for RecordingCanvasStore {
    async fn get(&self, owner_key: &str, canvas_id: &str) -> StoreResult<Option<String>> {
        Ok(self
            .documents
            .lock()
            .await
            .get(&(owner_key.to_string(), canvas_id.to_string()))
            .cloned())
    }

    async fn put(&self, owner_key: &str, canvas_id: &str, json: &str) -> StoreResult<()> {
        self.puts.lock().await.push(canvas_id.to_string());
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("put refused".to_string()));
        }
        self.documents
            .lock()
            .await
            .insert((owner_key.to_string(), canvas_id.to_string()), json.to_string());
        Ok(())
    }

    async fn delete(&self, owner_key: &str, canvas_id: &str) -> StoreResult<()> {
        self.deletes.lock().await.push(canvas_id.to_string());
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("delete refused".to_string()));
        }
        self.documents
            .lock()
            .await
            .remove(&(owner_key.to_string(), canvas_id.to_string()))
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                owner_key: owner_key.to_string(),
                canvas_id: canvas_id.to_string(),
            })
    }
}

/// Quota service with a fixed starting count.
pub struct StaticQuota {
    count: AtomicU32,
    unlimited: bool,
    fail_increment: bool,
    increments: AtomicU32,
}

impl StaticQuota {
    pub fn with_count(count: u32) -> Self {
        Self {
            count: AtomicU32::new(count),
            unlimited: false,
            fail_increment: false,
            increments: AtomicU32::new(0),
        }
    }

    pub fn unlimited(mut self) -> Self {
        self.unlimited = true;
        self
    }

    pub fn failing_increment(mut self) -> Self {
        self.fail_increment = true;
        self
    }

    pub fn count(&self) -> u32 {
        self.count.load(Ordering::SeqCst)
    }

    pub fn increments(&self) -> u32 {
        self.increments.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuotaService for StaticQuota {
    async fn owner_canvas_count(&self, _owner_id: &str) -> QuotaResult<u32> {
        Ok(self.count())
    }

    async fn is_unlimited(&self, _owner_id: &str) -> QuotaResult<bool> {
        Ok(self.unlimited)
    }

    async fn increment_owner_canvas_count(&self, owner_id: &str) -> QuotaResult<()> {
        self.increments.fetch_add(1, Ordering::SeqCst);
        if self.fail_increment {
            return Err(QuotaError::Backend(format!(
                "counter for {} unavailable",
                owner_id
            )));
        }
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SchemaApiCall {
    CreateContainer(String),
    CreateProperty {
        container_id: String,
        definition: PropertyDefinition,
    },
    LinkProperties(ExternalPropertyRef, ExternalPropertyRef),
}

/// External schema API that fails exactly the requests it is told to.
#[derive(Default)]
pub struct ScriptedSchemaApi {
    failing_containers: HashSet<String>,
    failing_properties: HashSet<String>,
    fail_links: bool,
    latency: Option<Duration>,
    next_id: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    calls: Mutex<Vec<SchemaApiCall>>,
}

impl ScriptedSchemaApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails `create_container` for the database with this name.
    pub fn fail_container(mut self, name: &str) -> Self {
        self.failing_containers.insert(name.to_string());
        self
    }

    /// Fails `create_property` for properties with this name.
    pub fn fail_property(mut self, name: &str) -> Self {
        self.failing_properties.insert(name.to_string());
        self
    }

    pub fn fail_links(mut self) -> Self {
        self.fail_links = true;
        self
    }

    /// Holds every request open for `latency` so overlapping requests can
    /// be observed through [`Self::peak_in_flight`].
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Most requests that were in flight at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub async fn calls(&self) -> Vec<SchemaApiCall> {
        self.calls.lock().await.clone()
    }

    pub async fn created_properties(&self, container_id: &str) -> Vec<PropertyDefinition> {
        self.calls
            .lock()
            .await
            .iter()
            .filter_map(|call| match call {
                SchemaApiCall::CreateProperty {
                    container_id: id,
                    definition,
                } if id == container_id => Some(definition.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn link_calls(&self) -> usize {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| matches!(call, SchemaApiCall::LinkProperties(..)))
            .count()
    }

    async fn record(&self, call: SchemaApiCall) {
        self.calls.lock().await.push(call);
        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(in_flight, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ExternalSchemaApi for ScriptedSchemaApi {
    async fn create_container(
        &self,
        _parent_ref: &str,
        name: &str,
    ) -> ExternalApiResult<ExternalRef> {
        self.record(SchemaApiCall::CreateContainer(name.to_string()))
            .await;
        if self.failing_containers.contains(name) {
            return Err(ExternalApiError::Rejected {
                status: 400,
                message: format!("cannot create {}", name),
            });
        }
        let external_id = format!("ext-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        Ok(ExternalRef {
            url: format!("https://workspace.test/{}", external_id),
            external_id,
        })
    }

    async fn create_property(
        &self,
        container_id: &str,
        definition: &PropertyDefinition,
    ) -> ExternalApiResult<()> {
        self.record(SchemaApiCall::CreateProperty {
            container_id: container_id.to_string(),
            definition: definition.clone(),
        })
        .await;
        if self.failing_properties.contains(&definition.name) {
            return Err(ExternalApiError::Unavailable(format!(
                "property {} timed out",
                definition.name
            )));
        }
        Ok(())
    }

    async fn link_properties(
        &self,
        a: &ExternalPropertyRef,
        b: &ExternalPropertyRef,
    ) -> ExternalApiResult<()> {
        self.record(SchemaApiCall::LinkProperties(a.clone(), b.clone()))
            .await;
        if self.fail_links {
            return Err(ExternalApiError::RateLimited("slow down".to_string()));
        }
        Ok(())
    }
}
