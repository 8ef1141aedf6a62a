//! Shared fixtures and collaborator fakes for dbcanvas integration tests.

pub mod fakes;
pub mod fixtures;
pub mod temp;

pub use fakes::{RecordingCanvasStore, ScriptedSchemaApi, SchemaApiCall, StaticQuota};
pub use temp::TempDir;
