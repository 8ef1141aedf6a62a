use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Mutex;

use super::{ExternalPropertyRef, ExternalRef, ExternalSchemaApi};
use crate::errors::ExternalApiResult;
use crate::export::PropertyDefinition;

/// A request the dry-run API accepted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum DryRunCall {
    CreateContainer {
        parent_ref: String,
        name: String,
        external_id: String,
    },
    CreateProperty {
        container_id: String,
        definition: PropertyDefinition,
    },
    LinkProperties {
        a: ExternalPropertyRef,
        b: ExternalPropertyRef,
    },
}

/// Accepts every request, minting sequential container ids, and records the
/// calls so an export can be previewed without touching the external system.
#[derive(Debug, Default)]
pub struct DryRunSchemaApi {
    calls: Mutex<Vec<DryRunCall>>,
}

impl DryRunSchemaApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn calls(&self) -> Vec<DryRunCall> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl ExternalSchemaApi for DryRunSchemaApi {
    async fn create_container(
        &self,
        parent_ref: &str,
        name: &str,
    ) -> ExternalApiResult<ExternalRef> {
        let mut calls = self.calls.lock().await;
        let ordinal = calls
            .iter()
            .filter(|call| matches!(call, DryRunCall::CreateContainer { .. }))
            .count()
            + 1;
        let external_id = format!("dry-run-{}", ordinal);
        calls.push(DryRunCall::CreateContainer {
            parent_ref: parent_ref.to_string(),
            name: name.to_string(),
            external_id: external_id.clone(),
        });
        Ok(ExternalRef {
            url: format!("dry-run://{}/{}", parent_ref, external_id),
            external_id,
        })
    }

    async fn create_property(
        &self,
        container_id: &str,
        definition: &PropertyDefinition,
    ) -> ExternalApiResult<()> {
        self.calls.lock().await.push(DryRunCall::CreateProperty {
            container_id: container_id.to_string(),
            definition: definition.clone(),
        });
        Ok(())
    }

    async fn link_properties(
        &self,
        a: &ExternalPropertyRef,
        b: &ExternalPropertyRef,
    ) -> ExternalApiResult<()> {
        self.calls.lock().await.push(DryRunCall::LinkProperties {
            a: a.clone(),
            b: b.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::PropertySpec;

    #[tokio::test]
    async fn test_records_calls_with_sequential_ids() {
        let api = DryRunSchemaApi::new();
        let first = api.create_container("page-1", "Orders").await.unwrap();
        api.create_property(
            &first.external_id,
            &PropertyDefinition {
                name: "Name".to_string(),
                spec: PropertySpec::Title,
            },
        )
        .await
        .unwrap();
        let second = api.create_container("page-1", "Customers").await.unwrap();

        assert_eq!(first.external_id, "dry-run-1");
        assert_eq!(second.external_id, "dry-run-2");
        assert_eq!(api.calls().await.len(), 3);
    }
}
