use serde::{Deserialize, Serialize};

use super::position::Position;
use super::property::Property;

/// A table definition placed on the canvas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub position: Position,
    #[serde(default)]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collapsed: Option<bool>,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl Database {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            position: Position::default(),
            color: String::new(),
            memo: None,
            collapsed: None,
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    pub fn property(&self, property_id: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.id == property_id)
    }

    pub fn property_mut(&mut self, property_id: &str) -> Option<&mut Property> {
        self.properties.iter_mut().find(|p| p.id == property_id)
    }

    pub fn property_by_name(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn has_property(&self, property_id: &str) -> bool {
        self.property(property_id).is_some()
    }

    /// Properties sorted by `order`; ties keep their stored sequence.
    pub fn properties_in_order(&self) -> Vec<&Property> {
        let mut ordered: Vec<&Property> = self.properties.iter().collect();
        ordered.sort_by_key(|p| p.order);
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::PropertyKind;

    #[test]
    fn test_properties_in_order_is_stable() {
        let db = Database::new("db_1", "Tasks")
            .with_property(Property::new("p3", "Due", PropertyKind::Text).with_order(2))
            .with_property(Property::new("p1", "Name", PropertyKind::Title).with_order(0))
            .with_property(Property::new("p2", "Notes", PropertyKind::Text).with_order(2));

        let ids: Vec<&str> = db
            .properties_in_order()
            .iter()
            .map(|p| p.id.as_str())
            .collect();
        assert_eq!(ids, vec!["p1", "p3", "p2"]);
    }

    #[test]
    fn test_lookup_by_name() {
        let db = Database::new("db_1", "Tasks")
            .with_property(Property::new("p1", "Name", PropertyKind::Title));
        assert_eq!(db.property_by_name("Name").map(|p| p.id.as_str()), Some("p1"));
        assert!(db.property_by_name("name").is_none());
    }
}
