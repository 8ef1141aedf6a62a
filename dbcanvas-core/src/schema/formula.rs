//! Formula reference resolution.
//!
//! Formulas store the *names* of the properties they read. Renaming a
//! referenced property therefore breaks the formula without any structural
//! error. All name lookups for formulas go through [`resolve_references`] so
//! an id-based scheme can replace it in one place.

use super::database::Database;
use super::property::FormulaConfig;

/// Outcome of resolving a formula's referenced names against its database.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormulaResolution {
    /// `(name, property id)` for every reference found in the database.
    pub resolved: Vec<(String, String)>,
    /// Referenced names with no property of that name.
    pub missing: Vec<String>,
}

impl FormulaResolution {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

pub fn resolve_references(database: &Database, formula: &FormulaConfig) -> FormulaResolution {
    let mut resolution = FormulaResolution::default();
    for name in &formula.referenced_properties {
        match database.property_by_name(name) {
            Some(property) => resolution
                .resolved
                .push((name.clone(), property.id.clone())),
            None => resolution.missing.push(name.clone()),
        }
    }
    resolution
}
