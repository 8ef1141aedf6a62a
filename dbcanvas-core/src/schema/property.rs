use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Flat discriminant of [`PropertyKind`], used for reporting and type checks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Title,
    Text,
    Number,
    Select,
    MultiSelect,
    Status,
    Date,
    Person,
    Files,
    Checkbox,
    Url,
    Email,
    Phone,
    Formula,
    Relation,
    Rollup,
    CreatedTime,
    CreatedBy,
    LastEditedTime,
    LastEditedBy,
    Button,
    Id,
    Expiry,
}

impl PropertyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PropertyType::Title => "title",
            PropertyType::Text => "text",
            PropertyType::Number => "number",
            PropertyType::Select => "select",
            PropertyType::MultiSelect => "multi_select",
            PropertyType::Status => "status",
            PropertyType::Date => "date",
            PropertyType::Person => "person",
            PropertyType::Files => "files",
            PropertyType::Checkbox => "checkbox",
            PropertyType::Url => "url",
            PropertyType::Email => "email",
            PropertyType::Phone => "phone",
            PropertyType::Formula => "formula",
            PropertyType::Relation => "relation",
            PropertyType::Rollup => "rollup",
            PropertyType::CreatedTime => "created_time",
            PropertyType::CreatedBy => "created_by",
            PropertyType::LastEditedTime => "last_edited_time",
            PropertyType::LastEditedBy => "last_edited_by",
            PropertyType::Button => "button",
            PropertyType::Id => "id",
            PropertyType::Expiry => "expiry",
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rollup aggregation function
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Count,
    Sum,
    Average,
    Min,
    Max,
    Earliest,
    Latest,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationConfig {
    pub target_database_id: String,
    #[serde(default)]
    pub is_dual_property: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_parent: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_property_id: Option<String>,
}

impl RelationConfig {
    /// One-directional relation to `target_database_id`.
    pub fn single(target_database_id: impl Into<String>) -> Self {
        Self {
            target_database_id: target_database_id.into(),
            is_dual_property: false,
            is_parent: None,
            linked_property_id: None,
        }
    }

    /// Clears the dual pairing, keeping the target.
    pub fn clear_pairing(&mut self) {
        self.is_dual_property = false;
        self.linked_property_id = None;
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RollupConfig {
    pub relation_property_id: String,
    pub target_property_id: String,
    pub aggregation: Aggregation,
}

/// Formula references are property names resolved within the owning database,
/// see [`crate::schema::formula::resolve_references`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaConfig {
    pub expression: String,
    #[serde(default)]
    pub referenced_properties: BTreeSet<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumberConfig {
    pub format: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default)]
    pub include_time: bool,
}

/// Type of a property together with the configuration only that type carries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum PropertyKind {
    Title,
    Text,
    Number {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        number_config: Option<NumberConfig>,
    },
    Select {
        #[serde(default)]
        selected_values: Vec<String>,
    },
    MultiSelect {
        #[serde(default)]
        selected_values: Vec<String>,
    },
    Status {
        #[serde(default)]
        selected_values: Vec<String>,
    },
    Date {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        date_config: Option<DateConfig>,
    },
    Person,
    Files,
    Checkbox,
    Url,
    Email,
    Phone,
    Formula {
        formula_config: FormulaConfig,
    },
    Relation {
        relation_config: RelationConfig,
    },
    Rollup {
        rollup_config: RollupConfig,
    },
    CreatedTime,
    CreatedBy,
    LastEditedTime,
    LastEditedBy,
    Button,
    Id,
    Expiry,
}

impl PropertyKind {
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyKind::Title => PropertyType::Title,
            PropertyKind::Text => PropertyType::Text,
            PropertyKind::Number { .. } => PropertyType::Number,
            PropertyKind::Select { .. } => PropertyType::Select,
            PropertyKind::MultiSelect { .. } => PropertyType::MultiSelect,
            PropertyKind::Status { .. } => PropertyType::Status,
            PropertyKind::Date { .. } => PropertyType::Date,
            PropertyKind::Person => PropertyType::Person,
            PropertyKind::Files => PropertyType::Files,
            PropertyKind::Checkbox => PropertyType::Checkbox,
            PropertyKind::Url => PropertyType::Url,
            PropertyKind::Email => PropertyType::Email,
            PropertyKind::Phone => PropertyType::Phone,
            PropertyKind::Formula { .. } => PropertyType::Formula,
            PropertyKind::Relation { .. } => PropertyType::Relation,
            PropertyKind::Rollup { .. } => PropertyType::Rollup,
            PropertyKind::CreatedTime => PropertyType::CreatedTime,
            PropertyKind::CreatedBy => PropertyType::CreatedBy,
            PropertyKind::LastEditedTime => PropertyType::LastEditedTime,
            PropertyKind::LastEditedBy => PropertyType::LastEditedBy,
            PropertyKind::Button => PropertyType::Button,
            PropertyKind::Id => PropertyType::Id,
            PropertyKind::Expiry => PropertyType::Expiry,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub kind: PropertyKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub order: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

impl Property {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            required: false,
            order: 0,
            memo: None,
        }
    }

    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    pub fn property_type(&self) -> PropertyType {
        self.kind.property_type()
    }

    pub fn is_relation(&self) -> bool {
        matches!(self.kind, PropertyKind::Relation { .. })
    }

    pub fn relation_config(&self) -> Option<&RelationConfig> {
        match &self.kind {
            PropertyKind::Relation { relation_config } => Some(relation_config),
            _ => None,
        }
    }

    pub fn relation_config_mut(&mut self) -> Option<&mut RelationConfig> {
        match &mut self.kind {
            PropertyKind::Relation { relation_config } => Some(relation_config),
            _ => None,
        }
    }

    pub fn rollup_config(&self) -> Option<&RollupConfig> {
        match &self.kind {
            PropertyKind::Rollup { rollup_config } => Some(rollup_config),
            _ => None,
        }
    }

    pub fn formula_config(&self) -> Option<&FormulaConfig> {
        match &self.kind {
            PropertyKind::Formula { formula_config } => Some(formula_config),
            _ => None,
        }
    }

    /// Id of the counterpart when this property is one side of a dual pair.
    pub fn linked_property_id(&self) -> Option<&str> {
        self.relation_config()
            .filter(|config| config.is_dual_property)
            .and_then(|config| config.linked_property_id.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_relation_property_json_shape() {
        let property = Property::new(
            "prop_a",
            "LinksToB",
            PropertyKind::Relation {
                relation_config: RelationConfig {
                    target_database_id: "db_b".to_string(),
                    is_dual_property: true,
                    is_parent: None,
                    linked_property_id: Some("prop_b".to_string()),
                },
            },
        )
        .with_order(1);

        let value = serde_json::to_value(&property).unwrap();
        assert_eq!(value["type"], "relation");
        assert_eq!(value["relationConfig"]["targetDatabaseId"], "db_b");
        assert_eq!(value["relationConfig"]["isDualProperty"], true);
        assert_eq!(value["relationConfig"]["linkedPropertyId"], "prop_b");
        assert_eq!(value["order"], 1);
    }

    #[test]
    fn test_parse_plain_and_configured_properties() {
        let title: Property = serde_json::from_value(json!({
            "id": "prop_1",
            "name": "Name",
            "type": "title",
            "required": true,
            "order": 0
        }))
        .unwrap();
        assert_eq!(title.property_type(), PropertyType::Title);
        assert!(title.required);

        let select: Property = serde_json::from_value(json!({
            "id": "prop_2",
            "name": "Stage",
            "type": "multi_select",
            "selectedValues": ["todo", "done"]
        }))
        .unwrap();
        assert_eq!(
            select.kind,
            PropertyKind::MultiSelect {
                selected_values: vec!["todo".to_string(), "done".to_string()]
            }
        );

        let rollup: Property = serde_json::from_value(json!({
            "id": "prop_3",
            "name": "Total",
            "type": "rollup",
            "rollupConfig": {
                "relationPropertyId": "prop_rel",
                "targetPropertyId": "prop_amount",
                "aggregation": "sum"
            }
        }))
        .unwrap();
        let config = rollup.rollup_config().unwrap();
        assert_eq!(config.aggregation, Aggregation::Sum);
        assert_eq!(config.relation_property_id, "prop_rel");
    }

    #[test]
    fn test_relation_config_required_for_relation_type() {
        let result = serde_json::from_value::<Property>(json!({
            "id": "prop_1",
            "name": "Broken",
            "type": "relation"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_linked_property_id_requires_dual_flag() {
        let mut property = Property::new(
            "prop_a",
            "Link",
            PropertyKind::Relation {
                relation_config: RelationConfig::single("db_b"),
            },
        );
        property.relation_config_mut().unwrap().linked_property_id = Some("prop_b".to_string());
        assert_eq!(property.linked_property_id(), None);

        property.relation_config_mut().unwrap().is_dual_property = true;
        assert_eq!(property.linked_property_id(), Some("prop_b"));
    }
}
