//! Deep cloning of schema graphs under fresh identifiers.
//!
//! Cloning is two strict passes: the first allocates a new id for every
//! database, property and relation, the second rewrites every reference
//! through the completed table. Ids the table does not know are carried over
//! unchanged; [`stale_references`] and [`stale_canvas_references`] report any
//! that name an entity of the source.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::EngineConfig;
use crate::ids::{IdGenerator, IdKind, UuidIdGenerator};
use crate::owner::OwnerContext;
use crate::schema::{validate, Canvas, PropertyKind, SchemaGraph, ViewState};

/// A cloned graph and the `old id -> new id` table used to build it.
#[derive(Debug, Clone)]
pub struct RemappedGraph {
    pub graph: SchemaGraph,
    pub id_map: HashMap<String, String>,
}

/// A reference in a cloned graph that still names an id of its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleReference {
    pub location: String,
    pub id: String,
}

#[derive(Clone)]
pub struct IdentifierRemapper {
    ids: Arc<dyn IdGenerator>,
}

impl Default for IdentifierRemapper {
    fn default() -> Self {
        Self::new(Arc::new(UuidIdGenerator))
    }
}

impl IdentifierRemapper {
    pub fn new(ids: Arc<dyn IdGenerator>) -> Self {
        Self { ids }
    }

    pub fn id_generator(&self) -> &dyn IdGenerator {
        self.ids.as_ref()
    }

    pub fn clone_graph(&self, source: &SchemaGraph) -> RemappedGraph {
        let mut id_map = HashMap::new();

        for database in &source.databases {
            id_map.insert(database.id.clone(), self.ids.generate(IdKind::Database));
            for property in &database.properties {
                id_map.insert(property.id.clone(), self.ids.generate(IdKind::Property));
            }
        }
        for relation in &source.relations {
            id_map.insert(relation.id.clone(), self.ids.generate(IdKind::Relation));
        }

        let mut graph = source.clone();
        for database in graph.databases.iter_mut() {
            database.id = remap(&id_map, &database.id);
            for property in database.properties.iter_mut() {
                property.id = remap(&id_map, &property.id);
                match &mut property.kind {
                    PropertyKind::Relation { relation_config } => {
                        relation_config.target_database_id =
                            remap(&id_map, &relation_config.target_database_id);
                        if let Some(linked) = relation_config.linked_property_id.as_mut() {
                            *linked = remap(&id_map, linked);
                        }
                    }
                    PropertyKind::Rollup { rollup_config } => {
                        rollup_config.relation_property_id =
                            remap(&id_map, &rollup_config.relation_property_id);
                        rollup_config.target_property_id =
                            remap(&id_map, &rollup_config.target_property_id);
                    }
                    _ => {}
                }
            }
        }

        for relation in graph.relations.iter_mut() {
            relation.id = remap(&id_map, &relation.id);
            relation.from_database_id = remap(&id_map, &relation.from_database_id);
            relation.to_database_id = remap(&id_map, &relation.to_database_id);
            if let Some(from) = relation.from_property_id.as_mut() {
                *from = remap(&id_map, from);
            }
            if let Some(to) = relation.to_property_id.as_mut() {
                *to = remap(&id_map, to);
            }
        }

        debug!("Remapped {} identifiers", id_map.len());
        RemappedGraph { graph, id_map }
    }

    /// Clones a whole canvas for `owner`: fresh ids throughout, a new canvas
    /// id and name, fresh timestamps, and a back-reference to the source.
    pub fn clone_canvas(
        &self,
        source: &Canvas,
        owner: &OwnerContext,
        config: &EngineConfig,
    ) -> Canvas {
        let RemappedGraph { graph, id_map } = self.clone_graph(&source.graph);

        let violations = validate(&graph);
        for violation in &violations {
            error!(
                "Cloned canvas from {} has a broken reference: {}",
                source.id, violation
            );
        }

        let now = Utc::now();
        let canvas = Canvas {
            id: self.ids.generate(IdKind::Canvas),
            name: format!("{}{}", source.name, config.copy_suffix),
            owner_id: Some(owner.owner_id.clone()),
            created_at: now,
            updated_at: now,
            source_canvas_id: Some(source.id.clone()),
            graph,
            view_state: ViewState {
                pan: source.view_state.pan,
                zoom: source.view_state.zoom,
                selected_ids: source
                    .view_state
                    .selected_ids
                    .iter()
                    .map(|id| remap(&id_map, id))
                    .collect(),
            },
            memo: source.memo.clone(),
        };

        info!(
            "Cloned canvas {} -> {} ({} databases, {} violations)",
            source.id,
            canvas.id,
            canvas.graph.databases.len(),
            violations.len()
        );
        canvas
    }
}

fn remap(id_map: &HashMap<String, String>, id: &str) -> String {
    id_map.get(id).cloned().unwrap_or_else(|| {
        debug!("No mapping for id {}, keeping it", id);
        id.to_string()
    })
}

/// Lists every identifier or reference in `clone` that still names an entity
/// of `source`. Empty for any clone produced by [`IdentifierRemapper`].
pub fn stale_references(source: &SchemaGraph, clone: &SchemaGraph) -> Vec<StaleReference> {
    let source_ids: HashSet<String> = source.all_ids();
    let mut stale = Vec::new();
    let mut check = |location: String, id: &str| {
        if source_ids.contains(id) {
            stale.push(StaleReference {
                location,
                id: id.to_string(),
            });
        }
    };

    for database in &clone.databases {
        check(format!("database {}", database.name), &database.id);
        for property in &database.properties {
            let at = format!("{}.{}", database.name, property.name);
            check(format!("{} id", at), &property.id);
            if let Some(config) = property.relation_config() {
                check(format!("{} target", at), &config.target_database_id);
                if let Some(linked) = config.linked_property_id.as_deref() {
                    check(format!("{} linked property", at), linked);
                }
            }
            if let Some(config) = property.rollup_config() {
                check(format!("{} rollup relation", at), &config.relation_property_id);
                check(format!("{} rollup target", at), &config.target_property_id);
            }
        }
    }

    for relation in &clone.relations {
        let at = format!("relation {}", relation.id);
        check(format!("{} id", at), &relation.id);
        check(format!("{} from database", at), &relation.from_database_id);
        check(format!("{} to database", at), &relation.to_database_id);
        if let Some(from) = relation.from_property_id.as_deref() {
            check(format!("{} from property", at), from);
        }
        if let Some(to) = relation.to_property_id.as_deref() {
            check(format!("{} to property", at), to);
        }
    }

    stale
}

/// [`stale_references`] for whole canvases: the graph, the canvas id and
/// the selection in `viewState.selectedIds`.
pub fn stale_canvas_references(source: &Canvas, clone: &Canvas) -> Vec<StaleReference> {
    let mut stale = stale_references(&source.graph, &clone.graph);
    if clone.id == source.id {
        stale.push(StaleReference {
            location: "canvas id".to_string(),
            id: clone.id.clone(),
        });
    }

    let source_ids = source.graph.all_ids();
    for (index, id) in clone.view_state.selected_ids.iter().enumerate() {
        if source_ids.contains(id) {
            stale.push(StaleReference {
                location: format!("viewState.selectedIds[{}]", index),
                id: id.clone(),
            });
        }
    }
    stale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        Aggregation, Database, Property, Relation, RelationConfig, RelationType, RollupConfig,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct SequentialIds(AtomicUsize);

    impl IdGenerator for SequentialIds {
        fn generate(&self, kind: IdKind) -> String {
            format!("{}_new{}", kind.prefix(), self.0.fetch_add(1, Ordering::SeqCst))
        }
    }

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

    fn source() -> SchemaGraph {
        SchemaGraph::new(
            vec![
                Database::new("db_a", "A")
                    .with_property(Property::new("a_name", "Name", PropertyKind::Title))
                    .with_property(dual_relation("a_link", "LinksToB", "db_b", "b_link"))
                    .with_property(Property::new(
                        "a_count",
                        "Count",
                        PropertyKind::Rollup {
                            rollup_config: RollupConfig {
                                relation_property_id: "a_link".to_string(),
                                target_property_id: "b_name".to_string(),
                                aggregation: Aggregation::Count,
                            },
                        },
                    )),
                Database::new("db_b", "B")
                    .with_property(Property::new("b_name", "Name", PropertyKind::Title))
                    .with_property(dual_relation("b_link", "LinksToA", "db_a", "a_link")),
            ],
            vec![Relation {
                id: "rel_ab".to_string(),
                from_database_id: "db_a".to_string(),
                to_database_id: "db_b".to_string(),
                relation_type: RelationType::Dual,
                label: None,
                from_property_name: "LinksToB".to_string(),
                to_property_name: "LinksToA".to_string(),
                from_property_id: Some("a_link".to_string()),
                to_property_id: Some("b_link".to_string()),
            }],
        )
    }

    #[test]
    fn test_clone_graph_rewrites_every_reference() {
        let remapper = IdentifierRemapper::new(Arc::new(SequentialIds::default()));
        let source = source();
        let RemappedGraph { graph, id_map } = remapper.clone_graph(&source);

        assert_eq!(id_map.len(), 8);
        assert!(graph.all_ids().is_disjoint(&source.all_ids()));
        assert!(stale_references(&source, &graph).is_empty());
        assert!(validate(&graph).is_empty());

        let new_a_link = &id_map["a_link"];
        let new_b_link = &id_map["b_link"];
        let a_link = graph.find_property(new_a_link).unwrap();
        assert_eq!(a_link.linked_property_id(), Some(new_b_link.as_str()));
        assert_eq!(
            a_link.relation_config().unwrap().target_database_id,
            id_map["db_b"]
        );

        let rollup = graph.find_property(&id_map["a_count"]).unwrap();
        assert_eq!(
            rollup.rollup_config().unwrap().relation_property_id,
            *new_a_link
        );

        let relation = &graph.relations[0];
        assert_eq!(relation.id, id_map["rel_ab"]);
        assert!(relation.joins(new_a_link, new_b_link));
    }

    #[test]
    fn test_unknown_reference_kept_and_not_stale() {
        let mut source = source();
        source.databases[0].properties[2] = Property::new(
            "a_count",
            "Count",
            PropertyKind::Rollup {
                rollup_config: RollupConfig {
                    relation_property_id: "a_link".to_string(),
                    target_property_id: "ghost".to_string(),
                    aggregation: Aggregation::Sum,
                },
            },
        );

        let RemappedGraph { graph, .. } = IdentifierRemapper::default().clone_graph(&source);
        let rollup = graph.databases[0].properties[2].rollup_config().unwrap();
        assert_eq!(rollup.target_property_id, "ghost");
        assert!(stale_references(&source, &graph).is_empty());
    }

    #[test]
    fn test_stale_reference_detected() {
        let source = source();
        let mut clone = IdentifierRemapper::default().clone_graph(&source).graph;
        clone.relations[0].to_database_id = "db_b".to_string();

        let stale = stale_references(&source, &clone);
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, "db_b");
    }

    #[test]
    fn test_clone_canvas_metadata() {
        let mut canvas = Canvas::new("canvas_1", "Inventory", source());
        canvas.view_state.zoom = 1.5;
        canvas.view_state.selected_ids = vec!["db_a".to_string(), "elsewhere".to_string()];
        canvas.memo = "notes".to_string();

        let remapper = IdentifierRemapper::new(Arc::new(SequentialIds::default()));
        let owner = OwnerContext::new("user-2");
        let clone = remapper.clone_canvas(&canvas, &owner, &EngineConfig::default());

        assert_eq!(clone.name, "Inventory (copy)");
        assert_eq!(clone.source_canvas_id.as_deref(), Some("canvas_1"));
        assert_eq!(clone.owner_id.as_deref(), Some("user-2"));
        assert!(clone.id.starts_with("canvas_"));
        assert_ne!(clone.id, canvas.id);
        assert!(clone.created_at >= canvas.created_at);
        assert_eq!(clone.view_state.zoom, 1.5);
        assert_eq!(clone.view_state.selected_ids[1], "elsewhere");
        assert_eq!(clone.view_state.selected_ids[0], clone.graph.databases[0].id);
        assert_eq!(clone.memo, "notes");
        assert!(stale_canvas_references(&canvas, &clone).is_empty());
    }

    #[test]
    fn test_stale_selection_detected() {
        let mut canvas = Canvas::new("canvas_1", "Inventory", source());
        canvas.view_state.selected_ids = vec!["a_name".to_string(), "b_link".to_string()];

        let mut clone = IdentifierRemapper::default().clone_canvas(
            &canvas,
            &OwnerContext::new("user-2"),
            &EngineConfig::default(),
        );
        clone.view_state.selected_ids[1] = "b_link".to_string();

        let stale = stale_canvas_references(&canvas, &clone);
        assert_eq!(
            stale,
            vec![StaleReference {
                location: "viewState.selectedIds[1]".to_string(),
                id: "b_link".to_string(),
            }]
        );
    }
}
