//! Dual relation pairing and the cascade that keeps relation-bearing
//! properties consistent when properties or databases are removed.
//!
//! These operations are the only place dual pairings are created or broken;
//! [`crate::schema::validate`] independently checks the result.

use std::collections::VecDeque;

use tracing::{debug, info};

use crate::errors::{LinkError, LinkResult};
use crate::ids::{IdGenerator, IdKind};
use crate::schema::{Relation, RelationType, SchemaGraph};

/// Identifiers removed by a cascading delete.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Removal {
    pub databases: Vec<String>,
    pub properties: Vec<String>,
    pub relations: Vec<String>,
}

pub struct RelationLinker<'g> {
    graph: &'g mut SchemaGraph,
    ids: &'g dyn IdGenerator,
}

struct Side {
    property_id: String,
    property_name: String,
    database_id: String,
}

impl<'g> RelationLinker<'g> {
    pub fn new(graph: &'g mut SchemaGraph, ids: &'g dyn IdGenerator) -> Self {
        Self { graph, ids }
    }

    /// Pairs two relation properties as a dual relation and returns the id of
    /// the relation record describing the pair.
    pub fn pair(&mut self, a: &str, b: &str) -> LinkResult<String> {
        if a == b {
            return Err(LinkError::SelfPair(a.to_string()));
        }

        let side_a = self.relation_side(a)?;
        let side_b = self.relation_side(b)?;

        // Break any existing pairing that does not already join a and b.
        for (this, other) in [(a, b), (b, a)] {
            let current = self
                .graph
                .find_property(this)
                .and_then(|p| p.linked_property_id().map(str::to_string));
            if current.as_deref() != Some(other) {
                self.unpair(this);
            }
        }

        for (this, other) in [(&side_a, &side_b), (&side_b, &side_a)] {
            if let Some(config) = self
                .graph
                .find_property_mut(&this.property_id)
                .and_then(|p| p.relation_config_mut())
            {
                config.is_dual_property = true;
                config.linked_property_id = Some(other.property_id.clone());
                config.target_database_id = other.database_id.clone();
            }
        }

        let relation_id = self.upsert_dual_relation(&side_a, &side_b);
        info!(
            "Paired relation properties {} <-> {} (relation {})",
            a, b, relation_id
        );
        Ok(relation_id)
    }

    /// Breaks the dual pairing of `property_id`, clearing the counterpart too
    /// when it still links back. Returns whether anything changed; unknown or
    /// unpaired properties are a no-op.
    pub fn unpair(&mut self, property_id: &str) -> bool {
        let Some(config) = self
            .graph
            .find_property_mut(property_id)
            .and_then(|p| p.relation_config_mut())
        else {
            return false;
        };

        if !config.is_dual_property && config.linked_property_id.is_none() {
            return false;
        }

        let linked = config.linked_property_id.take();
        config.clear_pairing();

        if let Some(linked_id) = linked.as_deref() {
            if let Some(counterpart) = self
                .graph
                .find_property_mut(linked_id)
                .and_then(|p| p.relation_config_mut())
            {
                if counterpart.linked_property_id.as_deref() == Some(property_id) {
                    counterpart.clear_pairing();
                }
            }
        }

        for relation in self
            .graph
            .relations
            .iter_mut()
            .filter(|r| r.is_dual() && r.touches_property(property_id))
        {
            relation.relation_type = RelationType::Single;
            relation.to_property_id = None;
        }

        debug!(
            "Unpaired relation property {} (counterpart {:?})",
            property_id, linked
        );
        true
    }

    /// Removes a property, unpairing it first and cascading to rollups that
    /// aggregate through or over it.
    pub fn remove_property(&mut self, property_id: &str) -> LinkResult<Removal> {
        if self.graph.find_property(property_id).is_none() {
            return Err(LinkError::PropertyNotFound(property_id.to_string()));
        }

        let mut removal = Removal::default();
        self.remove_properties(vec![property_id.to_string()], &mut removal);
        Ok(removal)
    }

    /// Removes a database with its properties, every relation record touching
    /// it, and relation properties elsewhere that target it.
    pub fn remove_database(&mut self, database_id: &str) -> LinkResult<Removal> {
        let Some(database) = self.graph.find_database(database_id) else {
            return Err(LinkError::DatabaseNotFound(database_id.to_string()));
        };

        let mut seeds: Vec<String> = database.properties.iter().map(|p| p.id.clone()).collect();
        seeds.extend(
            self.graph
                .databases
                .iter()
                .filter(|db| db.id != database_id)
                .flat_map(|db| db.properties.iter())
                .filter(|p| {
                    p.relation_config()
                        .is_some_and(|c| c.target_database_id == database_id)
                })
                .map(|p| p.id.clone()),
        );

        let mut removal = Removal::default();
        self.remove_properties(seeds, &mut removal);

        self.graph.databases.retain(|db| db.id != database_id);
        removal.databases.push(database_id.to_string());

        let graph = &mut *self.graph;
        graph.relations.retain(|relation| {
            if relation.touches_database(database_id) {
                removal.relations.push(relation.id.clone());
                false
            } else {
                true
            }
        });

        info!(
            "Removed database {} ({} properties, {} relations)",
            database_id,
            removal.properties.len(),
            removal.relations.len()
        );
        Ok(removal)
    }

    fn remove_properties(&mut self, seeds: Vec<String>, removal: &mut Removal) {
        let mut queue: VecDeque<String> = seeds.into();

        while let Some(property_id) = queue.pop_front() {
            if removal.properties.contains(&property_id)
                || self.graph.find_property(&property_id).is_none()
            {
                continue;
            }

            self.unpair(&property_id);

            for dependent in self
                .graph
                .databases
                .iter()
                .flat_map(|db| db.properties.iter())
                .filter(|p| {
                    p.rollup_config().is_some_and(|c| {
                        c.relation_property_id == property_id || c.target_property_id == property_id
                    })
                })
            {
                queue.push_back(dependent.id.clone());
            }

            for db in self.graph.databases.iter_mut() {
                db.properties.retain(|p| p.id != property_id);
            }

            let graph = &mut *self.graph;
            graph.relations.retain(|relation| {
                if relation.touches_property(&property_id) {
                    removal.relations.push(relation.id.clone());
                    false
                } else {
                    true
                }
            });

            removal.properties.push(property_id);
        }
    }

    fn relation_side(&self, property_id: &str) -> LinkResult<Side> {
        let (database, property) = self
            .graph
            .find_property_owner(property_id)
            .ok_or_else(|| LinkError::PropertyNotFound(property_id.to_string()))?;

        if !property.is_relation() {
            return Err(LinkError::TypeMismatch {
                property_id: property_id.to_string(),
                actual: property.property_type().to_string(),
            });
        }

        Ok(Side {
            property_id: property.id.clone(),
            property_name: property.name.clone(),
            database_id: database.id.clone(),
        })
    }

    fn upsert_dual_relation(&mut self, a: &Side, b: &Side) -> String {
        // Reuse the record of an existing edge between the two properties,
        // including a single edge left behind by an earlier unpair.
        let existing = self.graph.relations.iter_mut().find(|r| {
            r.joins(&a.property_id, &b.property_id)
                || (r.to_property_id.is_none()
                    && ((r.from_property_id.as_deref() == Some(a.property_id.as_str())
                        && r.to_database_id == b.database_id)
                        || (r.from_property_id.as_deref() == Some(b.property_id.as_str())
                            && r.to_database_id == a.database_id)))
        });

        if let Some(relation) = existing {
            let (from, to) = if relation.from_property_id.as_deref() == Some(a.property_id.as_str())
            {
                (a, b)
            } else {
                (b, a)
            };
            relation.relation_type = RelationType::Dual;
            relation.from_database_id = from.database_id.clone();
            relation.to_database_id = to.database_id.clone();
            relation.from_property_id = Some(from.property_id.clone());
            relation.to_property_id = Some(to.property_id.clone());
            relation.from_property_name = from.property_name.clone();
            relation.to_property_name = to.property_name.clone();
            return relation.id.clone();
        }

        let relation = Relation {
            id: self.ids.generate(IdKind::Relation),
            from_database_id: a.database_id.clone(),
            to_database_id: b.database_id.clone(),
            relation_type: RelationType::Dual,
            label: None,
            from_property_name: a.property_name.clone(),
            to_property_name: b.property_name.clone(),
            from_property_id: Some(a.property_id.clone()),
            to_property_id: Some(b.property_id.clone()),
        };
        let relation_id = relation.id.clone();
        self.graph.relations.push(relation);
        relation_id
    }
}
