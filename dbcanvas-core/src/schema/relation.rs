use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    Single,
    Dual,
    Formula,
}

/// Canvas edge between two databases. For `dual` relations this is the record
/// of which two relation properties are paired.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub id: String,
    pub from_database_id: String,
    pub to_database_id: String,
    #[serde(rename = "type")]
    pub relation_type: RelationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub from_property_name: String,
    #[serde(default)]
    pub to_property_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_property_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_property_id: Option<String>,
}

impl Relation {
    pub fn is_dual(&self) -> bool {
        self.relation_type == RelationType::Dual
    }

    pub fn touches_database(&self, database_id: &str) -> bool {
        self.from_database_id == database_id || self.to_database_id == database_id
    }

    pub fn touches_property(&self, property_id: &str) -> bool {
        self.from_property_id.as_deref() == Some(property_id)
            || self.to_property_id.as_deref() == Some(property_id)
    }

    /// True when the relation names exactly this pair of properties, in either direction.
    pub fn joins(&self, a: &str, b: &str) -> bool {
        let from = self.from_property_id.as_deref();
        let to = self.to_property_id.as_deref();
        (from == Some(a) && to == Some(b)) || (from == Some(b) && to == Some(a))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_type_serialized_as_type() {
        let relation: Relation = serde_json::from_value(serde_json::json!({
            "id": "rel_1",
            "fromDatabaseId": "db_a",
            "toDatabaseId": "db_b",
            "type": "dual",
            "fromPropertyName": "LinksToB",
            "toPropertyName": "LinksToA",
            "fromPropertyId": "prop_a",
            "toPropertyId": "prop_b"
        }))
        .unwrap();

        assert!(relation.is_dual());
        assert!(relation.joins("prop_b", "prop_a"));
        assert!(!relation.joins("prop_a", "prop_a"));
        assert_eq!(serde_json::to_value(&relation).unwrap()["type"], "dual");
    }
}
