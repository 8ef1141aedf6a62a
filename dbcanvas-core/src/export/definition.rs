use serde::{Deserialize, Serialize};

use crate::schema::{Aggregation, PropertyKind, PropertyType};

/// Property types with no equivalent in the external schema.
pub const UNSUPPORTED_TYPES: [PropertyType; 3] =
    [PropertyType::Status, PropertyType::Button, PropertyType::Expiry];

pub fn is_supported(property_type: PropertyType) -> bool {
    !UNSUPPORTED_TYPES.contains(&property_type)
}

/// A property creation request in the external system's shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyDefinition {
    pub name: String,
    #[serde(flatten)]
    pub spec: PropertySpec,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertySpec {
    Title,
    RichText,
    Number { format: String },
    Select { options: Vec<String> },
    MultiSelect { options: Vec<String> },
    Date,
    People,
    Files,
    Checkbox,
    Url,
    Email,
    PhoneNumber,
    Formula { expression: String },
    /// `database_id` is the external id of the target container.
    Relation { database_id: String, dual: bool },
    Rollup {
        relation_property_name: String,
        rollup_property_name: String,
        function: String,
    },
    CreatedTime,
    CreatedBy,
    LastEditedTime,
    LastEditedBy,
    UniqueId,
}

impl PropertySpec {
    /// Spec for properties that reference nothing outside themselves. `None`
    /// for relation, rollup, formula and unsupported kinds.
    pub fn plain(kind: &PropertyKind) -> Option<Self> {
        let spec = match kind {
            PropertyKind::Title => PropertySpec::Title,
            PropertyKind::Text => PropertySpec::RichText,
            PropertyKind::Number { number_config } => PropertySpec::Number {
                format: number_config
                    .as_ref()
                    .map(|config| config.format.clone())
                    .unwrap_or_else(|| "number".to_string()),
            },
            PropertyKind::Select { selected_values } => PropertySpec::Select {
                options: selected_values.clone(),
            },
            PropertyKind::MultiSelect { selected_values } => PropertySpec::MultiSelect {
                options: selected_values.clone(),
            },
            PropertyKind::Date { .. } => PropertySpec::Date,
            PropertyKind::Person => PropertySpec::People,
            PropertyKind::Files => PropertySpec::Files,
            PropertyKind::Checkbox => PropertySpec::Checkbox,
            PropertyKind::Url => PropertySpec::Url,
            PropertyKind::Email => PropertySpec::Email,
            PropertyKind::Phone => PropertySpec::PhoneNumber,
            PropertyKind::CreatedTime => PropertySpec::CreatedTime,
            PropertyKind::CreatedBy => PropertySpec::CreatedBy,
            PropertyKind::LastEditedTime => PropertySpec::LastEditedTime,
            PropertyKind::LastEditedBy => PropertySpec::LastEditedBy,
            PropertyKind::Id => PropertySpec::UniqueId,
            PropertyKind::Formula { .. }
            | PropertyKind::Relation { .. }
            | PropertyKind::Rollup { .. }
            | PropertyKind::Status { .. }
            | PropertyKind::Button
            | PropertyKind::Expiry => return None,
        };
        Some(spec)
    }
}

/// External rollup function name for an aggregation.
pub fn rollup_function(aggregation: Aggregation) -> &'static str {
    match aggregation {
        Aggregation::Count => "count",
        Aggregation::Sum => "sum",
        Aggregation::Average => "average",
        Aggregation::Min => "min",
        Aggregation::Max => "max",
        Aggregation::Earliest => "earliest_date",
        Aggregation::Latest => "latest_date",
    }
}
