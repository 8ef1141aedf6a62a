use indexmap::IndexMap;
use serde::Serialize;

use crate::collaborators::ExternalRef;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStage {
    CreatingDatabases,
    CreatingProperties,
    LinkingRelations,
    Done,
    PartialFailure,
}

impl ExportStage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportStage::Done | ExportStage::PartialFailure)
    }
}

/// Stage transition pushed to an optional progress listener.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportProgress {
    pub stage: ExportStage,
    /// Units of work scheduled for the stage; zero for terminal stages.
    pub units: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportIssue {
    pub scope: String,
    pub message: String,
}

impl ExportIssue {
    pub fn new(scope: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            message: message.into(),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExportAnalysis {
    pub total: usize,
    pub supported: usize,
    pub skipped: usize,
}

/// Outcome of one unit of export work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnitOutcome {
    /// A database container now exists externally.
    Created {
        internal_id: String,
        external: ExternalRef,
    },
    /// A property was created or a pair linked.
    Completed,
    Error(ExportIssue),
    Warning(ExportIssue),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    pub success: bool,
    pub stage: ExportStage,
    /// Internal database id to the container created for it, in creation order.
    pub results: IndexMap<String, ExternalRef>,
    pub errors: Vec<ExportIssue>,
    pub warnings: Vec<ExportIssue>,
    pub analysis: ExportAnalysis,
}

/// Accumulates unit outcomes across the stages of one export run.
#[derive(Debug, Default)]
pub struct ExportLedger {
    results: IndexMap<String, ExternalRef>,
    errors: Vec<ExportIssue>,
    warnings: Vec<ExportIssue>,
    completed: usize,
}

impl ExportLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: UnitOutcome) {
        match outcome {
            UnitOutcome::Created {
                internal_id,
                external,
            } => {
                self.results.insert(internal_id, external);
            }
            UnitOutcome::Completed => self.completed += 1,
            UnitOutcome::Error(issue) => self.errors.push(issue),
            UnitOutcome::Warning(issue) => self.warnings.push(issue),
        }
    }

    pub fn error(&mut self, scope: impl Into<String>, message: impl Into<String>) {
        self.record(UnitOutcome::Error(ExportIssue::new(scope, message)));
    }

    pub fn warning(&mut self, scope: impl Into<String>, message: impl Into<String>) {
        self.record(UnitOutcome::Warning(ExportIssue::new(scope, message)));
    }

    pub fn external(&self, internal_id: &str) -> Option<&ExternalRef> {
        self.results.get(internal_id)
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn finish(self, analysis: ExportAnalysis) -> ExportResult {
        let success = self.errors.is_empty();
        ExportResult {
            success,
            stage: if success {
                ExportStage::Done
            } else {
                ExportStage::PartialFailure
            },
            results: self.results,
            errors: self.errors,
            warnings: self.warnings,
            analysis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warnings_do_not_fail_export() {
        let mut ledger = ExportLedger::new();
        ledger.record(UnitOutcome::Created {
            internal_id: "db_a".to_string(),
            external: ExternalRef {
                external_id: "ext-1".to_string(),
                url: "https://example.test/ext-1".to_string(),
            },
        });
        ledger.warning("A.Status", "unsupported");
        let result = ledger.finish(ExportAnalysis::default());

        assert!(result.success);
        assert_eq!(result.stage, ExportStage::Done);
        assert_eq!(result.results["db_a"].external_id, "ext-1");
    }

    #[test]
    fn test_errors_mark_partial_failure() {
        let mut ledger = ExportLedger::new();
        ledger.error("A", "boom");
        assert!(ledger.has_errors());
        let result = ledger.finish(ExportAnalysis::default());
        assert!(!result.success);
        assert_eq!(result.stage, ExportStage::PartialFailure);
        assert!(result.stage.is_terminal());
    }
}
