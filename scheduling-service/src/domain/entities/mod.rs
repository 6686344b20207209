pub mod assignment;
pub mod context;
pub mod result;
pub mod resource;
pub mod role;
pub mod shift;
pub mod violation;

pub use assignment::{sort_assignments, Assignment};
pub use context::SchedulingContext;
pub use resource::{Absence, AbsenceType, Resource};
pub use result::{EngineKind, ResultStatus, SchedulingResult, SolverMetadata};
pub use role::Role;
pub use shift::Shift;
pub use violation::{format_iso_week, MetaValue, Severity, Violation, ViolationScope};
