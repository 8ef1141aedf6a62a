use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use crate::collaborators::{CanvasStore, QuotaService};
use crate::config::EngineConfig;
use crate::errors::{DuplicationError, DuplicationResult};
use crate::owner::OwnerContext;
use crate::remap::IdentifierRemapper;
use crate::schema::{validate, Canvas};

#[derive(Debug, Clone)]
pub struct DuplicateOutcome {
    pub canvas_id: String,
    pub canvas: Canvas,
}

/// Quota-gated canvas duplication with a compensating delete when the
/// owner's counter cannot be updated.
#[derive(Clone)]
pub struct DuplicationService {
    store: Arc<dyn CanvasStore>,
    quota: Arc<dyn QuotaService>,
    remapper: IdentifierRemapper,
    config: EngineConfig,
}

impl DuplicationService {
    pub fn new(
        store: Arc<dyn CanvasStore>,
        quota: Arc<dyn QuotaService>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            quota,
            remapper: IdentifierRemapper::default(),
            config,
        }
    }

    pub fn with_remapper(mut self, remapper: IdentifierRemapper) -> Self {
        self.remapper = remapper;
        self
    }

    #[instrument(skip_all, fields(source = %source.id, owner = %owner.owner_id))]
    pub async fn duplicate(
        &self,
        source: &Canvas,
        owner: &OwnerContext,
    ) -> DuplicationResult<DuplicateOutcome> {
        self.check_quota(owner).await?;

        let source_violations = validate(&source.graph);
        if !source_violations.is_empty() {
            warn!(
                "Duplicating canvas {} with {} existing violation(s)",
                source.id,
                source_violations.len()
            );
        }

        let canvas = self.remapper.clone_canvas(source, owner, &self.config);
        let json = canvas.to_json_string()?;

        self.store
            .put(&owner.owner_key, &canvas.id, &json)
            .await
            .map_err(DuplicationError::WriteFailed)?;

        if let Err(source_err) = self.quota.increment_owner_canvas_count(&owner.owner_id).await {
            error!(
                "Failed to increment canvas count for {}: {}",
                owner.owner_id, source_err
            );
            let compensated = match self.store.delete(&owner.owner_key, &canvas.id).await {
                Ok(()) => true,
                Err(delete_err) => {
                    error!(
                        "Compensating delete of canvas {} failed: {}",
                        canvas.id, delete_err
                    );
                    false
                }
            };
            return Err(DuplicationError::CounterUpdateFailed {
                compensated,
                source: source_err,
            });
        }

        info!("Duplicated canvas {} as {}", source.id, canvas.id);
        Ok(DuplicateOutcome {
            canvas_id: canvas.id.clone(),
            canvas,
        })
    }

    async fn check_quota(&self, owner: &OwnerContext) -> DuplicationResult<()> {
        let unlimited = self
            .quota
            .is_unlimited(&owner.owner_id)
            .await
            .map_err(DuplicationError::QuotaCheckFailed)?;
        if unlimited {
            return Ok(());
        }

        let count = self
            .quota
            .owner_canvas_count(&owner.owner_id)
            .await
            .map_err(DuplicationError::QuotaCheckFailed)?;
        let limit = owner.effective_limit(self.config.default_canvas_limit);
        if count >= limit {
            warn!(
                "Owner {} reached the canvas limit ({}/{})",
                owner.owner_id, count, limit
            );
            return Err(DuplicationError::LimitReached { count, limit });
        }
        Ok(())
    }
}
