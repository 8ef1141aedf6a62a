use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use dbcanvas::schema::{
    Canvas, Database, Property, PropertyKind, Relation, RelationConfig, RelationType, SchemaGraph,
};

pub fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

pub fn load_fixture(relative_path: &str) -> io::Result<String> {
    fs::read_to_string(fixtures_root().join(relative_path))
}

pub fn load_canvas(relative_path: &str) -> io::Result<Canvas> {
    let json = load_fixture(relative_path)?;
    Canvas::from_json_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Three databases with a dual pair, a single relation, a rollup, a formula
/// and two unsupported property types.
pub fn project_tracker() -> io::Result<Canvas> {
    load_canvas("project_tracker.json")
}

pub fn dual_relation(id: &str, name: &str, target: &str, linked: &str) -> Property {
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

/// Databases A and B joined by the dual pair `a_link <-> b_link`.
pub fn dual_pair_graph() -> SchemaGraph {
    SchemaGraph::new(
        vec![
            Database::new("db_a", "A")
                .with_property(Property::new("a_name", "Name", PropertyKind::Title))
                .with_property(dual_relation("a_link", "LinksToB", "db_b", "b_link").with_order(1)),
            Database::new("db_b", "B")
                .with_property(Property::new("b_name", "Name", PropertyKind::Title))
                .with_property(dual_relation("b_link", "LinksToA", "db_a", "a_link").with_order(1)),
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

pub fn dual_pair_canvas() -> Canvas {
    Canvas::new("canvas_ab", "A and B", dual_pair_graph())
}
