use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::SchemaResult;

use super::graph::SchemaGraph;
use super::position::Position;

/// Pan, zoom and selection of the canvas editor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    #[serde(default)]
    pub pan: Position,
    #[serde(default = "default_zoom")]
    pub zoom: f64,
    #[serde(default)]
    pub selected_ids: Vec<String>,
}

fn default_zoom() -> f64 {
    1.0
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            pan: Position::default(),
            zoom: default_zoom(),
            selected_ids: Vec::new(),
        }
    }
}

/// Serialized canvas document: the schema graph plus its editor state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Canvas {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Canvas this one was duplicated from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_canvas_id: Option<String>,
    #[serde(flatten)]
    pub graph: SchemaGraph,
    #[serde(default)]
    pub view_state: ViewState,
    #[serde(default)]
    pub memo: String,
}

impl Canvas {
    pub fn new(id: impl Into<String>, name: impl Into<String>, graph: SchemaGraph) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            owner_id: None,
            created_at: now,
            updated_at: now,
            source_canvas_id: None,
            graph,
            view_state: ViewState::default(),
            memo: String::new(),
        }
    }

    pub fn from_json_str(json: &str) -> SchemaResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> SchemaResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
