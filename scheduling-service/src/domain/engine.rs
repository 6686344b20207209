use std::collections::BTreeMap;

use shared::DomainResult;

use super::entities::{
    EngineKind, MetaValue, ResultStatus, SchedulingContext, SchedulingResult, Severity, Violation,
    ViolationScope,
};
use super::services;

/// Runs the greedy heuristic engine only.
pub fn run_heuristic(context: &SchedulingContext) -> DomainResult<SchedulingResult> {
    services::run_heuristic(context)
}

/// Runs the MILP optimizer only. Never falls back; a result with
/// `status == ResultStatus::Error` means the model was infeasible.
pub fn run_optimizer(context: &SchedulingContext) -> SchedulingResult {
    services::run_optimizer(context)
}

/// Runs the optimizer, falling back to the heuristic engine if the
/// optimizer could not reach feasibility. On fallback, the returned result
/// carries `status == ResultStatus::Fallback` and an `optimizer-infeasible`
/// warning summarizing where the optimizer would have fallen short, grouped
/// by day and role group.
pub fn run_optimizer_or_fallback(context: &SchedulingContext) -> SchedulingResult {
    let optimizer_result = services::run_optimizer(context);

    if optimizer_result.status != ResultStatus::Error && !optimizer_result.entries.is_empty() {
        return optimizer_result;
    }

    let mut fallback = match services::run_heuristic(context) {
        Ok(result) => result,
        Err(err) => {
            let mut result =
                SchedulingResult::new(&context.month, EngineKind::Heuristic, ResultStatus::Error);
            result.violations.push(Violation::new(
                "heuristic-failed",
                err.to_string(),
                Severity::Critical,
                ViolationScope::Schedule,
            ));
            return result;
        }
    };

    let shortfalls = summarize_optimizer_shortfalls(&fallback);

    fallback.status = ResultStatus::Fallback;
    fallback.violations.push(
        Violation::new(
            "optimizer-infeasible",
            "optimizer could not reach a feasible schedule, heuristic engine used instead",
            Severity::Warning,
            ViolationScope::Schedule,
        )
        .with_meta("shortfalls", MetaValue::StrList(shortfalls)),
    );
    fallback
}

/// Mirrors the original system's shortfall summary: every `staffing-*`
/// violation the optimizer raised before giving up, rendered as
/// `"<date>: <code>"` labels grouped in chronological order.
fn summarize_optimizer_shortfalls(result: &SchedulingResult) -> Vec<String> {
    let mut by_day: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for violation in &result.violations {
        if !violation.code.starts_with("staffing") && !violation.code.starts_with("role-") {
            continue;
        }
        let day_label = violation
            .day
            .map(|day| day.to_string())
            .unwrap_or_else(|| "schedule".to_string());
        by_day.entry(day_label).or_default().push(violation.code.clone());
    }
    by_day
        .into_iter()
        .map(|(day, codes)| format!("{day}: {}", codes.join(", ")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::shift::default_shift_catalog;
    use crate::domain::entities::{Resource, Role};
    use crate::domain::ruleset::load_default_rules;

    fn context_with(resource_count: usize) -> SchedulingContext {
        let resources: Vec<Resource> = (1..=resource_count as i64)
            .map(|id| {
                let role = match id % 4 {
                    0 => Role::PotWasher,
                    1 => Role::Cook,
                    2 => Role::KitchenAssistant,
                    _ => Role::Apprentice,
                };
                Resource::new(id, role)
            })
            .collect();
        SchedulingContext::new(
            "2024-11",
            resources,
            default_shift_catalog(),
            load_default_rules().clone(),
        )
        .unwrap()
    }

    #[test]
    fn heuristic_entry_point_delegates() {
        let context = context_with(10);
        let result = run_heuristic(&context).unwrap();
        assert_eq!(result.engine, EngineKind::Heuristic);
    }

    #[test]
    fn fallback_path_always_returns_a_tagged_result() {
        let context = context_with(10);
        let result = run_optimizer_or_fallback(&context);
        assert!(matches!(
            result.engine,
            EngineKind::Optimizer | EngineKind::Heuristic
        ));
        assert_ne!(result.status, ResultStatus::Error);
    }
}
