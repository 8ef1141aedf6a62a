use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::{SchemaError, SchemaResult};

use super::database::Database;
use super::property::Property;
use super::relation::Relation;

/// Databases and the relations drawn between them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaGraph {
    #[serde(default)]
    pub databases: Vec<Database>,
    #[serde(default)]
    pub relations: Vec<Relation>,
}

impl SchemaGraph {
    pub fn new(databases: Vec<Database>, relations: Vec<Relation>) -> Self {
        Self {
            databases,
            relations,
        }
    }

    pub fn find_database(&self, database_id: &str) -> Option<&Database> {
        self.databases.iter().find(|db| db.id == database_id)
    }

    pub fn find_database_mut(&mut self, database_id: &str) -> Option<&mut Database> {
        self.databases.iter_mut().find(|db| db.id == database_id)
    }

    pub fn find_database_by_name(&self, name: &str) -> Option<&Database> {
        self.databases.iter().find(|db| db.name == name)
    }

    pub fn find_property(&self, property_id: &str) -> Option<&Property> {
        self.find_property_owner(property_id)
            .map(|(_, property)| property)
    }

    pub fn find_property_mut(&mut self, property_id: &str) -> Option<&mut Property> {
        self.databases
            .iter_mut()
            .flat_map(|db| db.properties.iter_mut())
            .find(|p| p.id == property_id)
    }

    /// Property together with the database that owns it.
    pub fn find_property_owner(&self, property_id: &str) -> Option<(&Database, &Property)> {
        self.databases.iter().find_map(|db| {
            db.property(property_id)
                .map(|property| (db, property))
        })
    }

    pub fn find_property_by_name(&self, database_id: &str, name: &str) -> Option<&Property> {
        self.find_database(database_id)
            .and_then(|db| db.property_by_name(name))
    }

    pub fn find_relation(&self, relation_id: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.id == relation_id)
    }

    pub fn require_database(&self, database_id: &str) -> SchemaResult<&Database> {
        self.find_database(database_id)
            .ok_or_else(|| SchemaError::DatabaseNotFound(database_id.to_string()))
    }

    pub fn require_property(&self, property_id: &str) -> SchemaResult<&Property> {
        self.find_property(property_id)
            .ok_or_else(|| SchemaError::PropertyNotFound(property_id.to_string()))
    }

    pub fn require_relation(&self, relation_id: &str) -> SchemaResult<&Relation> {
        self.find_relation(relation_id)
            .ok_or_else(|| SchemaError::RelationNotFound(relation_id.to_string()))
    }

    pub fn property_count(&self) -> usize {
        self.databases.iter().map(|db| db.properties.len()).sum()
    }

    /// Every database, property and relation identifier in the graph.
    pub fn all_ids(&self) -> HashSet<String> {
        let mut ids = HashSet::new();
        for db in &self.databases {
            ids.insert(db.id.clone());
            for property in &db.properties {
                ids.insert(property.id.clone());
            }
        }
        for relation in &self.relations {
            ids.insert(relation.id.clone());
        }
        ids
    }
}
