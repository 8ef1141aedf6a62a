//! Seams to the systems the engine drives but does not own: canvas
//! persistence, per-owner quota accounting and the external schema API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::{ExternalApiResult, QuotaResult, StoreResult};
use crate::export::PropertyDefinition;

pub mod dry_run;
pub mod fs_store;
pub mod memory;

pub use dry_run::{DryRunCall, DryRunSchemaApi};
pub use fs_store::FsCanvasStore;
pub use memory::InMemoryCanvasStore;

/// Identifier and address the external system assigned to a created container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalRef {
    pub external_id: String,
    pub url: String,
}

/// External properties have no id of their own; they are addressed by their
/// container and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalPropertyRef {
    pub container_id: String,
    pub property_name: String,
}

/// Stores serialized canvas documents, partitioned by owner.
#[async_trait]
pub trait CanvasStore: Send + Sync {
    async fn get(&self, owner_key: &str, canvas_id: &str) -> StoreResult<Option<String>>;

    async fn put(&self, owner_key: &str, canvas_id: &str, json: &str) -> StoreResult<()>;

    async fn delete(&self, owner_key: &str, canvas_id: &str) -> StoreResult<()>;
}

/// Per-owner canvas accounting.
#[async_trait]
pub trait QuotaService: Send + Sync {
    async fn owner_canvas_count(&self, owner_id: &str) -> QuotaResult<u32>;

    /// Premium or trial owners are not subject to the canvas limit.
    async fn is_unlimited(&self, owner_id: &str) -> QuotaResult<bool>;

    async fn increment_owner_canvas_count(&self, owner_id: &str) -> QuotaResult<()>;
}

/// The external workspace the schema is exported into.
#[async_trait]
pub trait ExternalSchemaApi: Send + Sync {
    async fn create_container(&self, parent_ref: &str, name: &str)
        -> ExternalApiResult<ExternalRef>;

    async fn create_property(
        &self,
        container_id: &str,
        definition: &PropertyDefinition,
    ) -> ExternalApiResult<()>;

    async fn link_properties(
        &self,
        a: &ExternalPropertyRef,
        b: &ExternalPropertyRef,
    ) -> ExternalApiResult<()>;
}
