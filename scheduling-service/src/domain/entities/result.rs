use serde::{Deserialize, Serialize};

use super::assignment::Assignment;
use super::violation::Violation;

/// Which engine produced a `SchedulingResult`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    Heuristic,
    Optimizer,
    Manual,
}

/// Outcome of a run. `Fallback` marks an optimizer run that could not reach
/// feasibility and was replaced by the heuristic engine's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    Success,
    Fallback,
    Error,
}

/// Solver-specific bookkeeping attached to an optimizer run. Absent for the
/// heuristic engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolverMetadata {
    pub objective_value: Option<f64>,
    pub variable_count: Option<usize>,
    pub constraint_count: Option<usize>,
}

/// The public output of either engine: the day-by-day assignments, the
/// violations found against them, which engine produced them, and how it
/// went.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulingResult {
    pub month: String,
    pub engine: EngineKind,
    pub status: ResultStatus,
    pub entries: Vec<Assignment>,
    pub violations: Vec<Violation>,
    pub solver: SolverMetadata,
    pub duration_ms: u64,
}

impl SchedulingResult {
    pub fn new(month: impl Into<String>, engine: EngineKind, status: ResultStatus) -> Self {
        Self {
            month: month.into(),
            engine,
            status,
            entries: Vec::new(),
            violations: Vec::new(),
            solver: SolverMetadata::default(),
            duration_ms: 0,
        }
    }

    pub fn has_critical_violations(&self) -> bool {
        self.violations
            .iter()
            .any(|violation| violation.severity == super::violation::Severity::Critical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_result_has_no_entries_or_violations() {
        let result = SchedulingResult::new("2024-11", EngineKind::Heuristic, ResultStatus::Success);
        assert!(result.entries.is_empty());
        assert!(result.violations.is_empty());
        assert!(!result.has_critical_violations());
    }
}
