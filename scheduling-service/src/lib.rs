pub mod domain;

pub use domain::engine::{run_heuristic, run_optimizer, run_optimizer_or_fallback};
pub use domain::entities::{
    Absence, AbsenceType, Assignment, EngineKind, ResultStatus, Role, SchedulingContext,
    SchedulingResult, Severity, Violation, ViolationScope,
};
pub use domain::ruleset::RuleSet;
