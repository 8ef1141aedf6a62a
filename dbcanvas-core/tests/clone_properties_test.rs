use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dbcanvas::ids::{IdGenerator, IdKind};
use dbcanvas::remap::{
    stale_canvas_references, stale_references, IdentifierRemapper, RemappedGraph,
};
use dbcanvas::schema::{validate, SchemaGraph};
use dbcanvas::{EngineConfig, OwnerContext};
use dbcanvas_test_utils::fixtures;

/// Counts allocations per kind so tests can check one fresh id per entity.
#[derive(Default)]
struct CountingIds {
    next: AtomicUsize,
}

impl IdGenerator for CountingIds {
    fn generate(&self, kind: IdKind) -> String {
        format!("{}_{}", kind.prefix(), self.next.fetch_add(1, Ordering::SeqCst))
    }
}

fn structure(graph: &SchemaGraph) -> Vec<(String, Vec<(String, String)>)> {
    graph
        .databases
        .iter()
        .map(|db| {
            (
                db.name.clone(),
                db.properties
                    .iter()
                    .map(|p| (p.name.clone(), p.property_type().to_string()))
                    .collect(),
            )
        })
        .collect()
}

#[test]
fn test_dual_pair_clone_scenario() {
    let source = fixtures::dual_pair_graph();
    let RemappedGraph { graph, id_map } = IdentifierRemapper::default().clone_graph(&source);

    let a = graph.find_database_by_name("A").unwrap();
    let b = graph.find_database_by_name("B").unwrap();
    let a_link = a.property_by_name("LinksToB").unwrap();
    let b_link = b.property_by_name("LinksToA").unwrap();

    assert_ne!(a.id, "db_a");
    assert_ne!(a_link.id, "a_link");
    assert_eq!(id_map["a_link"], a_link.id);
    assert_eq!(a_link.linked_property_id(), Some(b_link.id.as_str()));
    assert_eq!(b_link.linked_property_id(), Some(a_link.id.as_str()));
    assert_eq!(a_link.relation_config().unwrap().target_database_id, b.id);
    assert_eq!(b_link.relation_config().unwrap().target_database_id, a.id);

    let relation = &graph.relations[0];
    assert!(relation.is_dual());
    assert_eq!(relation.from_database_id, a.id);
    assert!(relation.joins(&a_link.id, &b_link.id));

    assert!(validate(&graph).is_empty());
}

#[test]
fn test_clone_is_disjoint_and_structurally_equal() {
    let source = fixtures::project_tracker().unwrap().graph;
    let remapper = IdentifierRemapper::new(Arc::new(CountingIds::default()));
    let RemappedGraph { graph, id_map } = remapper.clone_graph(&source);

    assert!(graph.all_ids().is_disjoint(&source.all_ids()));
    assert_eq!(id_map.len(), source.all_ids().len());
    assert_eq!(structure(&graph), structure(&source));
    assert_eq!(graph.relations.len(), source.relations.len());
    assert!(stale_references(&source, &graph).is_empty());

    let allocated: HashMap<&str, usize> =
        id_map.values().fold(HashMap::new(), |mut counts, id| {
            let prefix = id.split('_').next().unwrap_or_default();
            *counts.entry(prefix).or_default() += 1;
            counts
        });
    assert_eq!(allocated["db"], 3);
    assert_eq!(allocated["prop"], 15);
    assert_eq!(allocated["rel"], 2);
}

#[test]
fn test_validation_preserved_by_clone() {
    let valid = fixtures::project_tracker().unwrap().graph;
    assert!(validate(&valid).is_empty());
    let clone = IdentifierRemapper::default().clone_graph(&valid).graph;
    assert!(validate(&clone).is_empty());
    assert_eq!(validate(&clone), validate(&clone));

    // Broken references survive the clone as the same kinds of violation.
    let mut broken = valid;
    broken.databases[1].properties[2]
        .relation_config_mut()
        .unwrap()
        .target_database_id = "db_missing".to_string();
    let before: Vec<_> = validate(&broken).into_iter().map(|v| v.kind).collect();
    let after: Vec<_> = validate(&IdentifierRemapper::default().clone_graph(&broken).graph)
        .into_iter()
        .map(|v| v.kind)
        .collect();
    assert_eq!(before, after);
    assert!(!after.is_empty());
}

#[test]
fn test_rollup_and_formula_survive_clone() {
    let source = fixtures::project_tracker().unwrap().graph;
    let RemappedGraph { graph, id_map } = IdentifierRemapper::default().clone_graph(&source);

    let projects = graph.find_database(&id_map["db_projects"]).unwrap();
    let rollup = projects
        .property_by_name("Task Count")
        .and_then(|p| p.rollup_config())
        .unwrap();
    assert_eq!(rollup.relation_property_id, id_map["p_tasks"]);
    assert_eq!(rollup.target_property_id, id_map["t_name"]);

    let formula = projects
        .property_by_name("Budget Per Task")
        .and_then(|p| p.formula_config())
        .unwrap();
    assert!(formula.referenced_properties.contains("Task Count"));
}

#[test]
fn test_clone_canvas_wrapper() {
    let source = fixtures::project_tracker().unwrap();
    let owner = OwnerContext::new("user-42");
    let config = EngineConfig {
        copy_suffix: " - Copy".to_string(),
        ..EngineConfig::default()
    };

    let clone = IdentifierRemapper::default().clone_canvas(&source, &owner, &config);

    assert_eq!(clone.name, "Project Tracker - Copy");
    assert_eq!(clone.source_canvas_id.as_deref(), Some("canvas_tracker"));
    assert_eq!(clone.owner_id.as_deref(), Some("user-42"));
    assert!(clone.created_at > source.created_at);
    assert_eq!(clone.memo, source.memo);
    assert_eq!(clone.view_state.zoom, source.view_state.zoom);
    for selected in &clone.view_state.selected_ids {
        assert!(clone.graph.all_ids().contains(selected));
    }
    assert!(stale_canvas_references(&source, &clone).is_empty());
}
