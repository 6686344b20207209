use std::collections::HashMap;

use chrono::NaiveDate;
use good_lp::{constraint, variable, variables, Expression, Solution, SolverModel};

use crate::domain::entities::{
    shift::{prime_shift_base, role_allowed_shift_codes},
    Assignment, EngineKind, ResultStatus, SchedulingContext, SchedulingResult, Severity, Violation,
    ViolationScope,
};

use super::rule_evaluator::iso_year_week;

const UNDESIRED_SHIFT_PENALTY: f64 = 5.0;
const PREFERRED_SHIFT_BONUS: f64 = -2.0;
const PRIME_SHIFT_PENALTY: f64 = 1.0;
const REST_BLOCK_SLACK_PENALTY: f64 = 50.0;
const MONTHLY_TARGET_TOLERANCE: f64 = 2.0;
const RECOVERY_WINDOW_DAYS: usize = 7;
const RECOVERY_WINDOW_MAX_WORKED: f64 = 5.0;

type AssignmentKey = (i64, NaiveDate, i32);

struct SolveOutcome {
    entries: Vec<Assignment>,
    metadata: crate::domain::entities::SolverMetadata,
}

/// Builds and solves the MILP model for `context` with `good_lp`'s
/// `microlp` backend, the closest ecosystem equivalent to a CP-SAT solver
/// available to this crate. Hard constraints cover per-resource daily
/// exclusivity, weekly hour/day caps, the consecutive-working-day window,
/// daily staffing and role-composition floors/ceilings. A roster too small
/// to meet those floors makes the model genuinely infeasible, surfacing as
/// `optimizer-failed`. The objective only carries the soft preferences:
/// avoiding undesired shifts, rewarding preferred ones, and discouraging
/// unnecessary prime-shift use.
pub fn run_optimizer(context: &SchedulingContext) -> SchedulingResult {
    let started = std::time::Instant::now();
    match solve(context) {
        Ok(outcome) => {
            let relaxed = super::prime_relaxation::relax(context, outcome.entries);
            let violations = super::rule_evaluator::evaluate(context, &relaxed);
            let mut result =
                SchedulingResult::new(&context.month, EngineKind::Optimizer, ResultStatus::Success);
            result.entries = relaxed;
            result.violations = violations;
            result.solver = outcome.metadata;
            result.duration_ms = started.elapsed().as_millis() as u64;
            result
        }
        Err(reason) => {
            let mut result =
                SchedulingResult::new(&context.month, EngineKind::Optimizer, ResultStatus::Error);
            result.violations.push(
                Violation::new(
                    "optimizer-failed",
                    reason,
                    Severity::Critical,
                    ViolationScope::Schedule,
                )
                .with_meta("workers_configured", 8i64),
            );
            result.duration_ms = started.elapsed().as_millis() as u64;
            result
        }
    }
}

fn solve(context: &SchedulingContext) -> Result<SolveOutcome, String> {
    let mut vars = variables!();
    let mut x: HashMap<AssignmentKey, good_lp::Variable> = HashMap::new();

    for resource in &context.resources {
        for &day in &context.calendar_days {
            if !resource.is_available_on(day) {
                continue;
            }
            for &code in role_allowed_shift_codes(resource.role) {
                let var = vars.add(variable().binary());
                x.insert((resource.id, day, code), var);
            }
        }
    }

    let mut objective = Expression::from(0.0);
    let mut objective_terms: Vec<(good_lp::Variable, f64)> = Vec::new();

    for (&(resource_id, _day, code), &var) in &x {
        let resource = context
            .resource_by_id(resource_id)
            .expect("resource exists for every variable key");
        let mut weight = 0.0;
        if resource.undesired_shift_codes.contains(&code) {
            weight += UNDESIRED_SHIFT_PENALTY;
        }
        if resource.preferred_shift_codes.contains(&code) {
            weight += PREFERRED_SHIFT_BONUS;
        }
        if prime_shift_base(code).is_some() {
            weight += PRIME_SHIFT_PENALTY;
        }
        if weight != 0.0 {
            objective += var * weight;
            objective_terms.push((var, weight));
        }
    }

    // Required rest-block disjunction: one indicator per resource per valid
    // window, plus a slack variable so an unsatisfiable window set degrades
    // to a penalized violation rather than model infeasibility.
    let required_rest = context.rules.working_time.required_consecutive_days_off_per_month as usize;
    let mut rest_window_vars: Vec<good_lp::Variable> = Vec::new();
    let mut rest_slack_vars: Vec<good_lp::Variable> = Vec::new();
    let mut rest_windows: HashMap<i64, Vec<(usize, good_lp::Variable)>> = HashMap::new();
    let mut rest_slack: HashMap<i64, good_lp::Variable> = HashMap::new();

    if required_rest > 0 && context.calendar_days.len() >= required_rest {
        let last_start = context.calendar_days.len() - required_rest;
        for resource in &context.resources {
            let mut windows = Vec::new();
            for start in 0..=last_start {
                let indicator = vars.add(variable().binary());
                windows.push((start, indicator));
                rest_window_vars.push(indicator);
            }
            let slack = vars.add(variable().binary());
            rest_slack_vars.push(slack);
            objective += Expression::from(slack) * REST_BLOCK_SLACK_PENALTY;
            objective_terms.push((slack, REST_BLOCK_SLACK_PENALTY));
            rest_windows.insert(resource.id, windows);
            rest_slack.insert(resource.id, slack);
        }
    }

    let mut problem = vars.minimise(objective).using(good_lp::microlp);
    let mut constraint_count: usize = 0;

    for resource in &context.resources {
        for &day in &context.calendar_days {
            let daily: Vec<good_lp::Variable> = role_allowed_shift_codes(resource.role)
                .iter()
                .filter_map(|&code| x.get(&(resource.id, day, code)))
                .copied()
                .collect();
            if daily.is_empty() {
                continue;
            }
            let sum: Expression = daily.into_iter().map(Expression::from).sum();
            problem = problem.with(constraint!(sum <= 1));
            constraint_count += 1;
        }
    }

    for resource in &context.resources {
        for week in distinct_weeks(&context.calendar_days) {
            let week_vars: Vec<(good_lp::Variable, f64)> = context
                .calendar_days
                .iter()
                .filter(|&&day| iso_year_week(day) == week)
                .flat_map(|&day| {
                    role_allowed_shift_codes(resource.role).iter().filter_map(move |&code| {
                        x.get(&(resource.id, day, code))
                            .and_then(|&var| context.shift_by_code(code).map(|shift| (var, shift.hours)))
                    })
                })
                .collect();
            if week_vars.is_empty() {
                continue;
            }
            let hours_expr: Expression = week_vars
                .iter()
                .map(|&(var, hours)| Expression::from(var) * hours)
                .sum();
            problem = problem.with(constraint!(
                hours_expr <= context.rules.working_time.max_hours_per_week
            ));
            constraint_count += 1;

            let day_count: Expression = week_vars.iter().map(|&(var, _)| Expression::from(var)).sum();
            problem = problem.with(constraint!(
                day_count <= context.rules.working_time.max_working_days_per_week as f64
            ));
            constraint_count += 1;
        }
    }

    let window = context.rules.working_time.max_consecutive_working_days as usize + 1;
    if context.calendar_days.len() >= window {
        for resource in &context.resources {
            for start in 0..=(context.calendar_days.len() - window) {
                let window_days = &context.calendar_days[start..start + window];
                let window_expr: Expression = window_days
                    .iter()
                    .flat_map(|&day| {
                        role_allowed_shift_codes(resource.role)
                            .iter()
                            .filter_map(move |&code| x.get(&(resource.id, day, code)))
                    })
                    .map(|&var| Expression::from(var))
                    .sum();
                problem = problem.with(constraint!(
                    window_expr <= context.rules.working_time.max_consecutive_working_days as f64
                ));
                constraint_count += 1;
            }
        }
    }

    // Independent recovery rule: no resource works more than five days in
    // any rolling seven-day window, regardless of the general consecutive
    // working-day cap above.
    if context.calendar_days.len() >= RECOVERY_WINDOW_DAYS {
        for resource in &context.resources {
            for start in 0..=(context.calendar_days.len() - RECOVERY_WINDOW_DAYS) {
                let window_days = &context.calendar_days[start..start + RECOVERY_WINDOW_DAYS];
                let window_expr: Expression = window_days
                    .iter()
                    .flat_map(|&day| {
                        role_allowed_shift_codes(resource.role)
                            .iter()
                            .filter_map(move |&code| x.get(&(resource.id, day, code)))
                    })
                    .map(|&var| Expression::from(var))
                    .sum();
                problem = problem.with(constraint!(window_expr <= RECOVERY_WINDOW_MAX_WORKED));
                constraint_count += 1;
            }
        }
    }

    // Required rest-block disjunction: at least one window indicator fires
    // (or the slack absorbs the violation), and a firing indicator forces
    // its window to be fully off.
    for resource in &context.resources {
        let Some(windows) = rest_windows.get(&resource.id) else {
            continue;
        };
        let slack = rest_slack[&resource.id];
        let disjunction: Expression = windows
            .iter()
            .map(|&(_, indicator)| Expression::from(indicator))
            .sum::<Expression>()
            + Expression::from(slack);
        problem = problem.with(constraint!(disjunction >= 1));
        constraint_count += 1;

        for &(start, indicator) in windows {
            let window_days = &context.calendar_days[start..start + required_rest];
            let window_expr: Expression = window_days
                .iter()
                .flat_map(|&day| {
                    role_allowed_shift_codes(resource.role)
                        .iter()
                        .filter_map(move |&code| x.get(&(resource.id, day, code)))
                })
                .map(|&var| Expression::from(var))
                .sum();
            let capacity = required_rest as f64;
            let rhs: Expression = Expression::from(capacity) - Expression::from(indicator) * capacity;
            problem = problem.with(constraint!(window_expr <= rhs));
            constraint_count += 1;
        }
    }

    // Monthly target-hours bound: resources with a declared target must
    // land within a small tolerance of it across the whole month.
    for resource in &context.resources {
        let Some(target) = resource.target_hours else {
            continue;
        };
        let month_vars: Vec<(good_lp::Variable, f64)> = context
            .calendar_days
            .iter()
            .flat_map(|&day| {
                role_allowed_shift_codes(resource.role).iter().filter_map(move |&code| {
                    x.get(&(resource.id, day, code))
                        .and_then(|&var| context.shift_by_code(code).map(|shift| (var, shift.hours)))
                })
            })
            .collect();
        if month_vars.is_empty() {
            continue;
        }
        let total_expr: Expression = month_vars
            .iter()
            .map(|&(var, hours)| Expression::from(var) * hours)
            .sum();
        problem = problem.with(constraint!(total_expr.clone() >= target - MONTHLY_TARGET_TOLERANCE));
        constraint_count += 1;
        problem = problem.with(constraint!(total_expr <= target + MONTHLY_TARGET_TOLERANCE));
        constraint_count += 1;
    }

    for &day in &context.working_days {
        let assigned: Expression = x
            .iter()
            .filter(|(&(_, d, _), _)| d == day)
            .map(|(_, &var)| Expression::from(var))
            .sum();
        problem = problem.with(constraint!(
            assigned >= context.rules.shifts.minimum_daily_staff as f64
        ));
        constraint_count += 1;

        for (group, composition) in &context.rules.shifts.composition {
            let group_vars: Vec<good_lp::Variable> = context
                .resources
                .iter()
                .filter(|resource| resource.role.composition_key() == group)
                .flat_map(|resource| {
                    role_allowed_shift_codes(resource.role)
                        .iter()
                        .filter_map(|&code| x.get(&(resource.id, day, code)))
                })
                .copied()
                .collect();
            if group_vars.is_empty() {
                continue;
            }
            let group_sum: Expression = group_vars.iter().map(|&var| Expression::from(var)).sum();
            problem = problem.with(constraint!(
                group_sum <= composition.max_positions as f64
            ));
            constraint_count += 1;
            problem = problem.with(constraint!(
                group_sum >= composition.min_positions as f64
            ));
            constraint_count += 1;
        }
    }

    let variable_count = x.len() + rest_window_vars.len() + rest_slack_vars.len();

    let solution = problem.solve().map_err(|err| format!("optimizer could not reach feasibility: {err}"))?;

    let objective_value: f64 = objective_terms
        .iter()
        .map(|&(var, weight)| weight * solution.value(var))
        .sum();

    let mut entries = Vec::new();
    for resource in &context.resources {
        for &day in &context.calendar_days {
            if let Some(absence) = resource.absence_on(day) {
                entries.push(Assignment::absence(resource.id, day, absence.kind));
                continue;
            }
            let chosen = role_allowed_shift_codes(resource.role)
                .iter()
                .find(|&&code| {
                    x.get(&(resource.id, day, code))
                        .map(|&var| solution.value(var) > 0.5)
                        .unwrap_or(false)
                });
            match chosen {
                Some(&code) => entries.push(Assignment::shift(resource.id, day, code)),
                None => entries.push(Assignment::rest_day(resource.id, day)),
            }
        }
    }
    crate::domain::entities::sort_assignments(&mut entries);

    let metadata = crate::domain::entities::SolverMetadata {
        objective_value: Some(objective_value),
        variable_count: Some(variable_count),
        constraint_count: Some(constraint_count),
    };

    Ok(SolveOutcome { entries, metadata })
}

fn distinct_weeks(days: &[NaiveDate]) -> Vec<(i32, u32)> {
    let mut weeks: Vec<(i32, u32)> = days.iter().map(|&day| iso_year_week(day)).collect();
    weeks.sort();
    weeks.dedup();
    weeks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::shift::default_shift_catalog;
    use crate::domain::entities::{Resource, Role};
    use crate::domain::ruleset::load_default_rules;

    fn small_context() -> SchedulingContext {
        let resources: Vec<Resource> = (1..=9)
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
    fn optimizer_run_tags_engine_kind() {
        let context = small_context();
        let result = run_optimizer(&context);
        assert_eq!(result.engine, EngineKind::Optimizer);
    }

    #[test]
    fn optimizer_produces_an_entry_per_resource_per_day_on_success() {
        let context = small_context();
        let result = run_optimizer(&context);
        if result.status == ResultStatus::Success {
            let expected = context.resources.len() * context.calendar_days.len();
            assert_eq!(result.entries.len(), expected);
        }
    }

    #[test]
    fn successful_run_carries_solver_metadata() {
        let context = small_context();
        let result = run_optimizer(&context);
        if result.status == ResultStatus::Success {
            assert!(result.solver.variable_count.unwrap_or(0) > 0);
            assert!(result.solver.constraint_count.unwrap_or(0) > 0);
            assert!(result.solver.objective_value.is_some());
        }
    }

    #[test]
    fn resource_with_target_hours_stays_within_tolerance_when_feasible() {
        let mut context = small_context();
        for resource in &mut context.resources {
            resource.target_hours = Some(120.0);
        }
        let result = run_optimizer(&context);
        if result.status == ResultStatus::Success {
            for resource in &context.resources {
                let total: f64 = result
                    .entries
                    .iter()
                    .filter(|entry| entry.resource_id == resource.id && entry.is_work())
                    .filter_map(|entry| entry.shift_code.and_then(|code| context.shift_by_code(code)))
                    .map(|shift| shift.hours)
                    .sum();
                assert!((total - 120.0).abs() <= MONTHLY_TARGET_TOLERANCE + 0.01);
            }
        }
    }
}
