pub mod collaborators;
pub mod config;
pub mod errors;
pub mod export;
pub mod ids;
pub mod linker;
pub mod owner;
pub mod remap;
pub mod schema;
pub mod services;

pub use config::EngineConfig;
pub use export::{ExportResult, ExportTranslator};
pub use owner::OwnerContext;
pub use remap::IdentifierRemapper;
pub use services::{DuplicateOutcome, DuplicationService};
