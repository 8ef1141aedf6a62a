//! Canvas schema graph: databases, their typed properties and the relations
//! between them, with invariant checking in [`validate`].

pub mod canvas;
pub mod database;
pub mod formula;
pub mod graph;
pub mod position;
pub mod property;
pub mod relation;
pub mod validation;

pub use canvas::{Canvas, ViewState};
pub use database::Database;
pub use formula::{resolve_references, FormulaResolution};
pub use graph::SchemaGraph;
pub use position::Position;
pub use property::{
    Aggregation, DateConfig, FormulaConfig, NumberConfig, Property, PropertyKind, PropertyType,
    RelationConfig, RollupConfig,
};
pub use relation::{Relation, RelationType};
pub use validation::{validate, Violation, ViolationKind};
