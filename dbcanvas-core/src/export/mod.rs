//! Dependency-ordered export of a schema graph to an external schema API.
//!
//! Containers are created first, then properties (plain and relations of every
//! database, then rollups, then formulas), then dual pairs are linked. Each stage finishes before the next
//! starts. Every collaborator failure is recorded in the [`ExportResult`];
//! nothing is retried and nothing already created is rolled back.

pub mod definition;
pub mod ledger;
pub mod plan;

use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, instrument, warn};

use crate::collaborators::{ExternalPropertyRef, ExternalSchemaApi};
use crate::config::EngineConfig;
use crate::errors::ExternalApiResult;
use crate::schema::{Database, Property, SchemaGraph};

pub use definition::{is_supported, rollup_function, PropertyDefinition, PropertySpec};
pub use ledger::{
    ExportAnalysis, ExportIssue, ExportLedger, ExportProgress, ExportResult, ExportStage,
    UnitOutcome,
};
pub use plan::{
    analyze, DatabasePlan, ExportPlan, LinkEnd, PlannedLink, PlannedRollup, SkippedLink,
};

pub struct ExportTranslator {
    api: Arc<dyn ExternalSchemaApi>,
    config: EngineConfig,
    progress: Option<UnboundedSender<ExportProgress>>,
}

impl ExportTranslator {
    pub fn new(api: Arc<dyn ExternalSchemaApi>, config: EngineConfig) -> Self {
        Self {
            api,
            config,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: UnboundedSender<ExportProgress>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn analyze(&self, graph: &SchemaGraph) -> ExportAnalysis {
        analyze(graph)
    }

    pub fn plan<'g>(&self, graph: &'g SchemaGraph) -> ExportPlan<'g> {
        ExportPlan::build(graph)
    }

    /// Exports `graph` under the external parent `parent_ref`. Never fails;
    /// the result carries every error and warning.
    #[instrument(skip_all, fields(parent = %parent_ref, databases = graph.databases.len()))]
    pub async fn export(&self, graph: &SchemaGraph, parent_ref: &str) -> ExportResult {
        let plan = self.plan(graph);
        let mut ledger = ExportLedger::new();

        self.create_databases(&plan, parent_ref, &mut ledger).await;

        let created = self.create_properties(&plan, &mut ledger).await;

        self.link_relations(&plan, &created, &mut ledger).await;

        let completed = ledger.completed();
        let result = ledger.finish(plan.analysis);
        self.report(result.stage, 0);
        if result.success {
            info!(
                "Export finished: {} databases, {} properties and links, {} warnings",
                result.results.len(),
                completed,
                result.warnings.len()
            );
        } else {
            warn!(
                "Export finished with {} errors and {} warnings",
                result.errors.len(),
                result.warnings.len()
            );
        }
        result
    }

    async fn create_databases(
        &self,
        plan: &ExportPlan<'_>,
        parent_ref: &str,
        ledger: &mut ExportLedger,
    ) {
        self.report(ExportStage::CreatingDatabases, plan.databases.len());
        let api = &self.api;

        let outcomes: Vec<(&Database, _)> = stream::iter(plan.databases.iter())
            .map(move |db_plan| async move {
                let database = db_plan.database;
                (database, api.create_container(parent_ref, &database.name).await)
            })
            .buffered(self.config.export_concurrency.max(1))
            .collect()
            .await;

        for (database, outcome) in outcomes {
            match outcome {
                Ok(external) => {
                    debug!("Created container {} for {}", external.external_id, database.id);
                    ledger.record(UnitOutcome::Created {
                        internal_id: database.id.clone(),
                        external,
                    });
                }
                Err(err) => {
                    warn!("Failed to create container for {}: {}", database.id, err);
                    ledger.error(
                        database.name.clone(),
                        format!("Failed to create database: {}", err),
                    );
                }
            }
        }
    }

    /// Returns the ids of properties created externally.
    ///
    /// Plain and relation properties of every database go first, so that
    /// rollups and formulas only run once everything they can reference in
    /// any database has been attempted.
    async fn create_properties(
        &self,
        plan: &ExportPlan<'_>,
        ledger: &mut ExportLedger,
    ) -> HashSet<String> {
        self.report(ExportStage::CreatingProperties, plan.property_count());
        let mut created = HashSet::new();

        for db_plan in &plan.databases {
            let database = db_plan.database;
            let Some(container) = ledger.external(&database.id).map(|r| r.external_id.clone())
            else {
                for property in database.properties_in_order() {
                    ledger.warning(
                        property_scope(database, property),
                        "Skipped: database was not created",
                    );
                }
                continue;
            };

            for property in &db_plan.unsupported {
                ledger.warning(
                    property_scope(database, property),
                    format!(
                        "Skipped: property type '{}' is not supported",
                        property.property_type()
                    ),
                );
            }

            let api = &self.api;
            let container_ref = container.as_str();
            let plain: Vec<(&Property, _)> = stream::iter(db_plan.plain.iter())
                .map(move |planned| async move {
                    (
                        planned.property,
                        api.create_property(container_ref, &planned.definition).await,
                    )
                })
                .buffered(self.config.export_concurrency.max(1))
                .collect()
                .await;
            for (property, outcome) in plain {
                self.record_property(database, property, outcome, ledger, &mut created);
            }

            for planned in &db_plan.relations {
                let property = planned.property;
                let target = match ledger.external(&planned.target_database_id) {
                    Some(target) => target.external_id.clone(),
                    None => {
                        let reason = if plan
                            .databases
                            .iter()
                            .any(|d| d.database.id == planned.target_database_id)
                        {
                            "target database was not created"
                        } else {
                            "target database does not exist"
                        };
                        ledger.warning(
                            property_scope(database, property),
                            format!("Skipped: {}", reason),
                        );
                        continue;
                    }
                };
                let definition = PropertyDefinition {
                    name: property.name.clone(),
                    spec: PropertySpec::Relation {
                        database_id: target,
                        dual: planned.dual,
                    },
                };
                let outcome = self.api.create_property(&container, &definition).await;
                self.record_property(database, property, outcome, ledger, &mut created);
            }
        }

        self.create_rollups(plan, ledger, &mut created).await;
        self.create_formulas(plan, ledger, &mut created).await;

        created
    }

    /// Rollups whose target is another rollup wait for that rollup; a rollup
    /// left waiting on a cycle is skipped.
    async fn create_rollups(
        &self,
        plan: &ExportPlan<'_>,
        ledger: &mut ExportLedger,
        created: &mut HashSet<String>,
    ) {
        let mut pending: Vec<(&Database, String, &PlannedRollup<'_>)> = Vec::new();
        for db_plan in &plan.databases {
            if let Some(container) = ledger.external(&db_plan.database.id) {
                let container = container.external_id.clone();
                for planned in &db_plan.rollups {
                    pending.push((db_plan.database, container.clone(), planned));
                }
            }
        }

        while !pending.is_empty() {
            let waiting: HashSet<String> = pending
                .iter()
                .map(|(_, _, planned)| planned.property.id.clone())
                .collect();
            let (blocked, ready): (Vec<_>, Vec<_>) = pending
                .into_iter()
                .partition(|(_, _, planned)| waiting.contains(&planned.target_property_id));

            if ready.is_empty() {
                for (database, container, planned) in blocked {
                    self.create_rollup(database, &container, planned, ledger, created)
                        .await;
                }
                break;
            }
            for (database, container, planned) in ready {
                self.create_rollup(database, &container, planned, ledger, created)
                    .await;
            }
            pending = blocked;
        }
    }

    async fn create_rollup(
        &self,
        database: &Database,
        container: &str,
        planned: &PlannedRollup<'_>,
        ledger: &mut ExportLedger,
        created: &mut HashSet<String>,
    ) {
        let property = planned.property;
        if !created.contains(&planned.relation_property_id) {
            ledger.warning(
                property_scope(database, property),
                "Skipped: rollup relation property was not created",
            );
            return;
        }
        let (Some(relation_name), Some(target_name)) = (
            planned.relation_property_name.clone(),
            planned.target_property_name.clone(),
        ) else {
            ledger.warning(
                property_scope(database, property),
                "Skipped: rollup target property does not exist",
            );
            return;
        };
        if !created.contains(&planned.target_property_id) {
            ledger.warning(
                property_scope(database, property),
                "Skipped: rollup target property was not created",
            );
            return;
        }
        let definition = PropertyDefinition {
            name: property.name.clone(),
            spec: PropertySpec::Rollup {
                relation_property_name: relation_name,
                rollup_property_name: target_name,
                function: planned.function.to_string(),
            },
        };
        let outcome = self.api.create_property(container, &definition).await;
        self.record_property(database, property, outcome, ledger, created);
    }

    async fn create_formulas(
        &self,
        plan: &ExportPlan<'_>,
        ledger: &mut ExportLedger,
        created: &mut HashSet<String>,
    ) {
        for db_plan in &plan.databases {
            let database = db_plan.database;
            let Some(container) = ledger.external(&database.id).map(|r| r.external_id.clone())
            else {
                continue;
            };

            for planned in &db_plan.formulas {
                if !planned.missing_references.is_empty() {
                    ledger.warning(
                        property_scope(database, planned.property),
                        format!(
                            "Formula references unknown properties: {}",
                            planned.missing_references.join(", ")
                        ),
                    );
                }
                let outcome = self
                    .api
                    .create_property(&container, &planned.definition)
                    .await;
                self.record_property(database, planned.property, outcome, ledger, created);
            }
        }
    }

    async fn link_relations(
        &self,
        plan: &ExportPlan<'_>,
        created: &HashSet<String>,
        ledger: &mut ExportLedger,
    ) {
        self.report(ExportStage::LinkingRelations, plan.links.len());

        for skipped in &plan.skipped_links {
            ledger.warning(
                skipped.scope.clone(),
                format!("Skipped link: {}", skipped.reason),
            );
        }

        for link in &plan.links {
            let scope = format!("{} <-> {}", link.a.property_name, link.b.property_name);
            let ends = (
                external_property(ledger, created, &link.a),
                external_property(ledger, created, &link.b),
            );
            let (Some(a), Some(b)) = ends else {
                ledger.warning(scope, "Skipped link: both sides must be created first");
                continue;
            };

            match self.api.link_properties(&a, &b).await {
                Ok(()) => ledger.record(UnitOutcome::Completed),
                Err(err) => {
                    warn!("Failed to link {}: {}", scope, err);
                    ledger.warning(scope, format!("Failed to link dual relation: {}", err));
                }
            }
        }
    }

    fn record_property(
        &self,
        database: &Database,
        property: &Property,
        outcome: ExternalApiResult<()>,
        ledger: &mut ExportLedger,
        created: &mut HashSet<String>,
    ) {
        match outcome {
            Ok(()) => {
                created.insert(property.id.clone());
                ledger.record(UnitOutcome::Completed);
            }
            Err(err) => {
                warn!(
                    "Failed to create property {} in {}: {}",
                    property.id, database.id, err
                );
                ledger.error(
                    property_scope(database, property),
                    format!("Failed to create property: {}", err),
                );
            }
        }
    }

    fn report(&self, stage: ExportStage, units: usize) {
        debug!("Export stage {:?} ({} units)", stage, units);
        if let Some(progress) = &self.progress {
            if progress.send(ExportProgress { stage, units }).is_err() {
                debug!("Export progress listener dropped");
            }
        }
    }
}

fn property_scope(database: &Database, property: &Property) -> String {
    format!("{}.{}", database.name, property.name)
}

fn external_property(
    ledger: &ExportLedger,
    created: &HashSet<String>,
    end: &LinkEnd,
) -> Option<ExternalPropertyRef> {
    if !created.contains(&end.property_id) {
        return None;
    }
    ledger
        .external(&end.database_id)
        .map(|container| ExternalPropertyRef {
            container_id: container.external_id.clone(),
            property_name: end.property_name.clone(),
        })
}
