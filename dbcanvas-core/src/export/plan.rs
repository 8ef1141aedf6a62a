//! Pure staging of an export: which properties go in which step, with every
//! definition that does not depend on external ids already built.

use std::collections::HashSet;

use crate::schema::{resolve_references, Database, Property, PropertyKind, PropertyType, SchemaGraph};

use super::definition::{is_supported, rollup_function, PropertyDefinition, PropertySpec};
use super::ledger::ExportAnalysis;

#[derive(Debug, Clone)]
pub struct PlannedProperty<'g> {
    pub property: &'g Property,
    pub definition: PropertyDefinition,
}

#[derive(Debug, Clone)]
pub struct PlannedRelation<'g> {
    pub property: &'g Property,
    pub target_database_id: String,
    pub dual: bool,
}

#[derive(Debug, Clone)]
pub struct PlannedRollup<'g> {
    pub property: &'g Property,
    pub relation_property_id: String,
    pub target_property_id: String,
    /// `None` when the relation property does not exist in the database.
    pub relation_property_name: Option<String>,
    /// `None` when the target property cannot be found.
    pub target_property_name: Option<String>,
    pub function: &'static str,
}

#[derive(Debug, Clone)]
pub struct PlannedFormula<'g> {
    pub property: &'g Property,
    pub definition: PropertyDefinition,
    pub missing_references: Vec<String>,
}

/// Per-database property steps, each in ascending `order`.
#[derive(Debug, Clone)]
pub struct DatabasePlan<'g> {
    pub database: &'g Database,
    pub plain: Vec<PlannedProperty<'g>>,
    pub relations: Vec<PlannedRelation<'g>>,
    pub rollups: Vec<PlannedRollup<'g>>,
    pub formulas: Vec<PlannedFormula<'g>>,
    pub unsupported: Vec<&'g Property>,
}

impl DatabasePlan<'_> {
    /// Every property of the database, whatever step it belongs to.
    pub fn property_count(&self) -> usize {
        self.plain.len()
            + self.relations.len()
            + self.rollups.len()
            + self.formulas.len()
            + self.unsupported.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEnd {
    pub database_id: String,
    pub property_id: String,
    pub property_name: String,
}

/// A dual pair to link once both sides exist externally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLink {
    pub a: LinkEnd,
    pub b: LinkEnd,
}

/// A dual pair that cannot be linked: one side is missing, is not a
/// relation, or does not link back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLink {
    pub scope: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ExportPlan<'g> {
    pub databases: Vec<DatabasePlan<'g>>,
    pub links: Vec<PlannedLink>,
    pub skipped_links: Vec<SkippedLink>,
    pub analysis: ExportAnalysis,
}

impl<'g> ExportPlan<'g> {
    pub fn build(graph: &'g SchemaGraph) -> Self {
        let databases: Vec<DatabasePlan<'g>> = graph
            .databases
            .iter()
            .map(|database| plan_database(graph, database))
            .collect();
        let (links, skipped_links) = plan_links(graph);

        Self {
            databases,
            links,
            skipped_links,
            analysis: analyze(graph),
        }
    }

    pub fn property_count(&self) -> usize {
        self.databases.iter().map(DatabasePlan::property_count).sum()
    }
}

/// Type-based support counts; `total == supported + skipped`.
pub fn analyze(graph: &SchemaGraph) -> ExportAnalysis {
    let mut analysis = ExportAnalysis::default();
    for property in graph.databases.iter().flat_map(|db| db.properties.iter()) {
        analysis.total += 1;
        if is_supported(property.property_type()) {
            analysis.supported += 1;
        } else {
            analysis.skipped += 1;
        }
    }
    analysis
}

fn plan_database<'g>(graph: &'g SchemaGraph, database: &'g Database) -> DatabasePlan<'g> {
    let mut plan = DatabasePlan {
        database,
        plain: Vec::new(),
        relations: Vec::new(),
        rollups: Vec::new(),
        formulas: Vec::new(),
        unsupported: Vec::new(),
    };

    for property in database.properties_in_order() {
        if !is_supported(property.property_type()) {
            plan.unsupported.push(property);
            continue;
        }

        match &property.kind {
            PropertyKind::Relation { relation_config } => plan.relations.push(PlannedRelation {
                property,
                target_database_id: relation_config.target_database_id.clone(),
                dual: relation_config.is_dual_property,
            }),
            PropertyKind::Rollup { rollup_config } => {
                let relation = database
                    .property(&rollup_config.relation_property_id)
                    .filter(|p| p.property_type() == PropertyType::Relation);
                let target_name = relation
                    .and_then(|p| p.relation_config())
                    .and_then(|config| graph.find_database(&config.target_database_id))
                    .and_then(|target| target.property(&rollup_config.target_property_id))
                    .map(|p| p.name.clone());
                plan.rollups.push(PlannedRollup {
                    property,
                    relation_property_id: rollup_config.relation_property_id.clone(),
                    target_property_id: rollup_config.target_property_id.clone(),
                    relation_property_name: relation.map(|p| p.name.clone()),
                    target_property_name: target_name,
                    function: rollup_function(rollup_config.aggregation),
                });
            }
            PropertyKind::Formula { formula_config } => plan.formulas.push(PlannedFormula {
                property,
                definition: PropertyDefinition {
                    name: property.name.clone(),
                    spec: PropertySpec::Formula {
                        expression: formula_config.expression.clone(),
                    },
                },
                missing_references: resolve_references(database, formula_config).missing,
            }),
            kind => match PropertySpec::plain(kind) {
                Some(spec) => plan.plain.push(PlannedProperty {
                    property,
                    definition: PropertyDefinition {
                        name: property.name.clone(),
                        spec,
                    },
                }),
                None => plan.unsupported.push(property),
            },
        }
    }

    plan
}

/// Dual pairs from relation records and from linked property flags,
/// deduplicated by unordered pair. A pair is linked only when both sides are
/// relation properties pointing at each other; anything else is skipped.
fn plan_links(graph: &SchemaGraph) -> (Vec<PlannedLink>, Vec<SkippedLink>) {
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut links = Vec::new();
    let mut skipped = Vec::new();

    let record_pairs = graph.relations.iter().filter(|r| r.is_dual()).filter_map(|r| {
        Some((r.from_property_id.clone()?, r.to_property_id.clone()?))
    });
    let property_pairs = graph
        .databases
        .iter()
        .flat_map(|db| db.properties.iter())
        .filter_map(|p| Some((p.id.clone(), p.linked_property_id()?.to_string())));

    for (a, b) in record_pairs.chain(property_pairs) {
        let key = if a <= b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };
        if !seen.insert(key) {
            continue;
        }

        let scope = format!("{} <-> {}", end_label(graph, &a), end_label(graph, &b));
        match (link_end(graph, &a), link_end(graph, &b)) {
            (Ok(a_end), Ok(b_end)) => {
                if links_back(graph, &a, &b) && links_back(graph, &b, &a) {
                    links.push(PlannedLink { a: a_end, b: b_end });
                } else {
                    skipped.push(SkippedLink {
                        scope,
                        reason: "properties do not link back to each other".to_string(),
                    });
                }
            }
            (Err(reason), _) | (_, Err(reason)) => skipped.push(SkippedLink { scope, reason }),
        }
    }

    (links, skipped)
}

fn link_end(graph: &SchemaGraph, property_id: &str) -> Result<LinkEnd, String> {
    let Some((database, property)) = graph.find_property_owner(property_id) else {
        return Err(format!("property '{}' does not exist", property_id));
    };
    if !property.is_relation() {
        return Err(format!("property '{}' is not a relation", property.name));
    }
    Ok(LinkEnd {
        database_id: database.id.clone(),
        property_id: property.id.clone(),
        property_name: property.name.clone(),
    })
}

fn links_back(graph: &SchemaGraph, from: &str, to: &str) -> bool {
    graph
        .find_property(from)
        .and_then(|p| p.linked_property_id())
        == Some(to)
}

fn end_label(graph: &SchemaGraph, property_id: &str) -> String {
    graph
        .find_property(property_id)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| property_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FormulaConfig, RelationConfig};

    fn dual_relation(id: &str, name: &str, target: &str, linked: &str) -> Property {
        Property::new(
            id,
            name,
            PropertyKind::Relation {
                relation_config: RelationConfig {
                    target_database_id: target.to_string(),
                    is_dual_property: true,
                    is_parent: None,
                    linked_property_id: Some(linked.to_string()),
                },
            },
        )
    }

    fn graph() -> SchemaGraph {
        SchemaGraph::new(
            vec![
                Database::new("db_a", "A")
                    .with_property(
                        Property::new(
                            "a_total",
                            "Total",
                            PropertyKind::Formula {
                                formula_config: FormulaConfig {
                                    expression: "prop(\"Name\") + prop(\"Gone\")".to_string(),
                                    referenced_properties: ["Name".to_string(), "Gone".to_string()]
                                        .into_iter()
                                        .collect(),
                                },
                            },
                        )
                        .with_order(0),
                    )
                    .with_property(Property::new("a_name", "Name", PropertyKind::Title).with_order(1))
                    .with_property(dual_relation("a_link", "LinksToB", "db_b", "b_link").with_order(2))
                    .with_property(
                        Property::new("a_button", "Go", PropertyKind::Button).with_order(3),
                    ),
                Database::new("db_b", "B")
                    .with_property(Property::new("b_name", "Name", PropertyKind::Title))
                    .with_property(dual_relation("b_link", "LinksToA", "db_a", "a_link")),
            ],
            vec![],
        )
    }

    #[test]
    fn test_properties_staged_by_kind() {
        let graph = graph();
        let plan = ExportPlan::build(&graph);
        let a = &plan.databases[0];

        assert_eq!(a.plain.len(), 1);
        assert_eq!(a.relations.len(), 1);
        assert_eq!(a.formulas[0].missing_references, vec!["Gone".to_string()]);
        assert_eq!(a.unsupported[0].id, "a_button");
        assert_eq!(plan.property_count(), 6);
    }

    #[test]
    fn test_analysis_accounting() {
        let analysis = analyze(&graph());
        assert_eq!(analysis.total, 6);
        assert_eq!(analysis.skipped, 1);
        assert_eq!(analysis.total, analysis.supported + analysis.skipped);
    }

    #[test]
    fn test_links_deduplicated() {
        let graph = graph();
        let plan = ExportPlan::build(&graph);
        assert_eq!(plan.links.len(), 1);
        assert_eq!(plan.links[0].a.property_id, "a_link");
        assert_eq!(plan.links[0].b.property_name, "LinksToA");
        assert!(plan.skipped_links.is_empty());
    }

    #[test]
    fn test_dangling_linked_property_is_skipped() {
        let mut graph = graph();
        graph.databases[1].properties.retain(|p| p.id != "b_link");

        let plan = ExportPlan::build(&graph);
        assert!(plan.links.is_empty());
        assert_eq!(
            plan.skipped_links,
            vec![SkippedLink {
                scope: "LinksToB <-> b_link".to_string(),
                reason: "property 'b_link' does not exist".to_string(),
            }]
        );
    }

    #[test]
    fn test_non_relation_counterpart_is_skipped() {
        let mut graph = graph();
        graph.databases[1].properties[1] =
            Property::new("b_link", "LinksToA", PropertyKind::Title);

        let plan = ExportPlan::build(&graph);
        assert!(plan.links.is_empty());
        assert_eq!(plan.skipped_links.len(), 1);
        assert_eq!(
            plan.skipped_links[0].reason,
            "property 'LinksToA' is not a relation"
        );
    }

    #[test]
    fn test_one_sided_pair_is_not_linked() {
        let mut graph = graph();
        graph.databases[1] = graph.databases[1]
            .clone()
            .with_property(dual_relation("b_other", "Other", "db_b", "b_link"));
        if let PropertyKind::Relation { relation_config } =
            &mut graph.databases[1].properties[1].kind
        {
            relation_config.linked_property_id = Some("b_other".to_string());
        }

        let plan = ExportPlan::build(&graph);
        assert_eq!(plan.links.len(), 1);
        assert_eq!(plan.links[0].a.property_id, "b_link");
        assert_eq!(plan.links[0].b.property_id, "b_other");
        assert_eq!(
            plan.skipped_links,
            vec![SkippedLink {
                scope: "LinksToB <-> LinksToA".to_string(),
                reason: "properties do not link back to each other".to_string(),
            }]
        );
    }
}
