pub mod duplication;

pub use duplication::{DuplicateOutcome, DuplicationService};
