use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use super::database::Database;
use super::formula::resolve_references;
use super::graph::SchemaGraph;
use super::property::{Property, PropertyKind};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    DuplicateDatabaseId,
    DuplicatePropertyId,
    RelationDatabaseMissing,
    RelationPropertyMissing,
    DualPairIncomplete,
    DualPropertyNotRelation,
    DualLinkMismatch,
    DualTargetMismatch,
    RelationTargetMissing,
    RollupRelationMissing,
    RollupRelationNotRelation,
    RollupTargetMissing,
    FormulaReferenceMissing,
}

impl ViolationKind {
    pub fn code(&self) -> &'static str {
        match self {
            ViolationKind::DuplicateDatabaseId => "DUPLICATE_DATABASE_ID",
            ViolationKind::DuplicatePropertyId => "DUPLICATE_PROPERTY_ID",
            ViolationKind::RelationDatabaseMissing => "RELATION_DATABASE_MISSING",
            ViolationKind::RelationPropertyMissing => "RELATION_PROPERTY_MISSING",
            ViolationKind::DualPairIncomplete => "DUAL_PAIR_INCOMPLETE",
            ViolationKind::DualPropertyNotRelation => "DUAL_PROPERTY_NOT_RELATION",
            ViolationKind::DualLinkMismatch => "DUAL_LINK_MISMATCH",
            ViolationKind::DualTargetMismatch => "DUAL_TARGET_MISMATCH",
            ViolationKind::RelationTargetMissing => "RELATION_TARGET_MISSING",
            ViolationKind::RollupRelationMissing => "ROLLUP_RELATION_MISSING",
            ViolationKind::RollupRelationNotRelation => "ROLLUP_RELATION_NOT_RELATION",
            ViolationKind::RollupTargetMissing => "ROLLUP_TARGET_MISSING",
            ViolationKind::FormulaReferenceMissing => "FORMULA_REFERENCE_MISSING",
        }
    }

    /// Dangling references, as opposed to structural identity problems.
    pub fn is_referential(&self) -> bool {
        !matches!(
            self,
            ViolationKind::DuplicateDatabaseId | ViolationKind::DuplicatePropertyId
        )
    }
}

/// A single broken graph invariant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    pub kind: ViolationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation_id: Option<String>,
    pub message: String,
}

impl Violation {
    fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            database_id: None,
            property_id: None,
            relation_id: None,
            message: message.into(),
        }
    }

    fn on_property(mut self, database: &Database, property: &Property) -> Self {
        self.database_id = Some(database.id.clone());
        self.property_id = Some(property.id.clone());
        self
    }

    fn on_relation(mut self, relation_id: &str) -> Self {
        self.relation_id = Some(relation_id.to_string());
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.code(), self.message)
    }
}

/// Checks every graph invariant and reports all violations found.
///
/// Never fails and never repairs anything; callers decide whether a non-empty
/// result blocks their operation.
pub fn validate(graph: &SchemaGraph) -> Vec<Violation> {
    let mut violations = Vec::new();

    check_unique_ids(graph, &mut violations);
    check_relation_endpoints(graph, &mut violations);
    check_dual_relations(graph, &mut violations);
    for database in &graph.databases {
        for property in &database.properties {
            check_property(graph, database, property, &mut violations);
        }
    }

    if violations.is_empty() {
        debug!(
            "Schema graph valid: {} databases, {} properties, {} relations",
            graph.databases.len(),
            graph.property_count(),
            graph.relations.len()
        );
    } else {
        warn!("Schema graph has {} violation(s)", violations.len());
    }

    violations
}

fn check_unique_ids(graph: &SchemaGraph, violations: &mut Vec<Violation>) {
    let mut database_ids = HashSet::new();
    let mut property_ids = HashSet::new();

    for database in &graph.databases {
        if !database_ids.insert(database.id.as_str()) {
            let mut violation = Violation::new(
                ViolationKind::DuplicateDatabaseId,
                format!("Duplicate database id: {}", database.id),
            );
            violation.database_id = Some(database.id.clone());
            violations.push(violation);
        }

        for property in &database.properties {
            if !property_ids.insert(property.id.as_str()) {
                violations.push(
                    Violation::new(
                        ViolationKind::DuplicatePropertyId,
                        format!("Duplicate property id: {}", property.id),
                    )
                    .on_property(database, property),
                );
            }
        }
    }
}

fn check_relation_endpoints(graph: &SchemaGraph, violations: &mut Vec<Violation>) {
    for relation in &graph.relations {
        let endpoints = [
            ("from", &relation.from_database_id, &relation.from_property_id),
            ("to", &relation.to_database_id, &relation.to_property_id),
        ];

        for (side, database_id, property_id) in endpoints {
            let Some(database) = graph.find_database(database_id) else {
                violations.push(
                    Violation::new(
                        ViolationKind::RelationDatabaseMissing,
                        format!(
                            "Relation id:[{}] {} database {:?} not found",
                            relation.id, side, database_id
                        ),
                    )
                    .on_relation(&relation.id),
                );
                continue;
            };

            if let Some(property_id) = property_id {
                if !database.has_property(property_id) {
                    violations.push(
                        Violation::new(
                            ViolationKind::RelationPropertyMissing,
                            format!(
                                "Relation id:[{}] {} property {:?} not found in database {:?}",
                                relation.id, side, property_id, database.id
                            ),
                        )
                        .on_relation(&relation.id),
                    );
                }
            }
        }
    }
}

fn check_dual_relations(graph: &SchemaGraph, violations: &mut Vec<Violation>) {
    for relation in graph.relations.iter().filter(|r| r.is_dual()) {
        let (Some(from_id), Some(to_id)) = (
            relation.from_property_id.as_deref(),
            relation.to_property_id.as_deref(),
        ) else {
            violations.push(
                Violation::new(
                    ViolationKind::DualPairIncomplete,
                    format!(
                        "Dual relation id:[{}] does not name both paired properties",
                        relation.id
                    ),
                )
                .on_relation(&relation.id),
            );
            continue;
        };

        // Missing endpoints were already reported by check_relation_endpoints.
        let (Some(from), Some(to)) = (graph.find_property(from_id), graph.find_property(to_id))
        else {
            continue;
        };

        let mut both_relations = true;
        for property in [from, to] {
            if !property.is_relation() {
                both_relations = false;
                violations.push(
                    Violation::new(
                        ViolationKind::DualPropertyNotRelation,
                        format!(
                            "Dual relation id:[{}] property {:?} has type {}",
                            relation.id,
                            property.id,
                            property.property_type()
                        ),
                    )
                    .on_relation(&relation.id),
                );
            }
        }

        if both_relations
            && (from.linked_property_id() != Some(to_id) || to.linked_property_id() != Some(from_id))
        {
            violations.push(
                Violation::new(
                    ViolationKind::DualLinkMismatch,
                    format!(
                        "Dual relation id:[{}] properties {:?} and {:?} are not linked to each other",
                        relation.id, from_id, to_id
                    ),
                )
                .on_relation(&relation.id),
            );
        }
    }
}

fn check_property(
    graph: &SchemaGraph,
    database: &Database,
    property: &Property,
    violations: &mut Vec<Violation>,
) {
    match &property.kind {
        PropertyKind::Relation { relation_config } => {
            if graph
                .find_database(&relation_config.target_database_id)
                .is_none()
            {
                violations.push(
                    Violation::new(
                        ViolationKind::RelationTargetMissing,
                        format!(
                            "Property id:[{}] targets missing database {:?}",
                            property.id, relation_config.target_database_id
                        ),
                    )
                    .on_property(database, property),
                );
            }

            if relation_config.is_dual_property {
                check_dual_counterpart(graph, database, property, violations);
            }
        }
        PropertyKind::Rollup { rollup_config } => {
            let Some(relation) = database.property(&rollup_config.relation_property_id) else {
                violations.push(
                    Violation::new(
                        ViolationKind::RollupRelationMissing,
                        format!(
                            "Rollup id:[{}] relation property {:?} not found in database {:?}",
                            property.id, rollup_config.relation_property_id, database.id
                        ),
                    )
                    .on_property(database, property),
                );
                return;
            };

            let Some(relation_config) = relation.relation_config() else {
                violations.push(
                    Violation::new(
                        ViolationKind::RollupRelationNotRelation,
                        format!(
                            "Rollup id:[{}] aggregates through {:?} of type {}",
                            property.id,
                            relation.id,
                            relation.property_type()
                        ),
                    )
                    .on_property(database, property),
                );
                return;
            };

            // A missing target database is reported on the relation property itself.
            if let Some(target) = graph.find_database(&relation_config.target_database_id) {
                if !target.has_property(&rollup_config.target_property_id) {
                    violations.push(
                        Violation::new(
                            ViolationKind::RollupTargetMissing,
                            format!(
                                "Rollup id:[{}] target property {:?} not found in database {:?}",
                                property.id, rollup_config.target_property_id, target.id
                            ),
                        )
                        .on_property(database, property),
                    );
                }
            }
        }
        PropertyKind::Formula { formula_config } => {
            let resolution = resolve_references(database, formula_config);
            for name in resolution.missing {
                violations.push(
                    Violation::new(
                        ViolationKind::FormulaReferenceMissing,
                        format!(
                            "Formula id:[{}] references unknown property {:?}",
                            property.id, name
                        ),
                    )
                    .on_property(database, property),
                );
            }
        }
        _ => {}
    }
}

fn check_dual_counterpart(
    graph: &SchemaGraph,
    database: &Database,
    property: &Property,
    violations: &mut Vec<Violation>,
) {
    let Some(config) = property.relation_config() else {
        return;
    };

    let Some(linked_id) = config.linked_property_id.as_deref() else {
        violations.push(
            Violation::new(
                ViolationKind::DualPairIncomplete,
                format!(
                    "Property id:[{}] is flagged dual but has no linked property",
                    property.id
                ),
            )
            .on_property(database, property),
        );
        return;
    };

    let Some((counterpart_db, counterpart)) = graph.find_property_owner(linked_id) else {
        violations.push(
            Violation::new(
                ViolationKind::DualLinkMismatch,
                format!(
                    "Property id:[{}] is linked to missing property {:?}",
                    property.id, linked_id
                ),
            )
            .on_property(database, property),
        );
        return;
    };

    if !counterpart.is_relation() {
        violations.push(
            Violation::new(
                ViolationKind::DualPropertyNotRelation,
                format!(
                    "Property id:[{}] is linked to {:?} of type {}",
                    property.id,
                    counterpart.id,
                    counterpart.property_type()
                ),
            )
            .on_property(database, property),
        );
        return;
    }

    if counterpart.linked_property_id() != Some(property.id.as_str()) {
        violations.push(
            Violation::new(
                ViolationKind::DualLinkMismatch,
                format!(
                    "Property id:[{}] is linked to {:?}, which does not link back",
                    property.id, counterpart.id
                ),
            )
            .on_property(database, property),
        );
    }

    if config.target_database_id != counterpart_db.id {
        violations.push(
            Violation::new(
                ViolationKind::DualTargetMismatch,
                format!(
                    "Property id:[{}] targets {:?} but its counterpart lives in {:?}",
                    property.id, config.target_database_id, counterpart_db.id
                ),
            )
            .on_property(database, property),
        );
    }
}
