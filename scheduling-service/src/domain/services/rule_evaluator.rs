use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};

use crate::domain::entities::{Assignment, SchedulingContext, Severity, Violation, ViolationScope};

/// Returns the `(iso_year, iso_week)` pair chrono computes for `date`.
pub fn iso_year_week(date: NaiveDate) -> (i32, u32) {
    let week = date.iso_week();
    (week.year(), week.week())
}

/// Evaluates a finished schedule against the active rule set and returns
/// every violation found. Pure function: it never mutates `context` or
/// `assignments`, and can be run over heuristic output, optimizer output,
/// or a hand-edited plan alike.
pub fn evaluate(context: &SchedulingContext, assignments: &[Assignment]) -> Vec<Violation> {
    let mut violations = Vec::new();

    if assignments.is_empty() && !context.working_days.is_empty() {
        violations.push(Violation::new(
            "empty-schedule",
            "no assignments were produced for a month with working days",
            Severity::Warning,
            ViolationScope::Schedule,
        ));
        return violations;
    }

    by_day_staffing(context, assignments, &mut violations);
    by_day_role_composition(context, assignments, &mut violations);
    by_resource_week_hours(context, assignments, &mut violations);
    by_resource_week_days(context, assignments, &mut violations);
    by_resource_consecutive_days(context, assignments, &mut violations);
    by_resource_consecutive_rest(context, assignments, &mut violations);

    violations
}

fn work_assignments_by_day<'a>(
    assignments: &'a [Assignment],
) -> HashMap<NaiveDate, Vec<&'a Assignment>> {
    let mut by_day: HashMap<NaiveDate, Vec<&Assignment>> = HashMap::new();
    for assignment in assignments.iter().filter(|a| a.is_work()) {
        by_day.entry(assignment.date).or_default().push(assignment);
    }
    by_day
}

fn by_day_staffing(
    context: &SchedulingContext,
    assignments: &[Assignment],
    violations: &mut Vec<Violation>,
) {
    let by_day = work_assignments_by_day(assignments);
    let minimum = context.rules.shifts.minimum_daily_staff;

    for &day in &context.working_days {
        let assigned = by_day.get(&day).map(|v| v.len()).unwrap_or(0) as u32;
        if assigned < minimum {
            violations.push(
                Violation::new(
                    "staffing-shortfall",
                    format!("only {assigned} of {minimum} required staff assigned"),
                    Severity::Warning,
                    ViolationScope::Day,
                )
                .with_day(day)
                .with_meta("assigned", assigned as i64)
                .with_meta("required", minimum as i64),
            );
        }
    }
}

fn by_day_role_composition(
    context: &SchedulingContext,
    assignments: &[Assignment],
    violations: &mut Vec<Violation>,
) {
    let by_day = work_assignments_by_day(assignments);

    for &day in &context.working_days {
        let Some(worked) = by_day.get(&day) else {
            continue;
        };
        let mut counts: BTreeMap<&'static str, u32> = BTreeMap::new();
        for assignment in worked {
            if let Some(resource) = context.resource_by_id(assignment.resource_id) {
                *counts.entry(resource.role.composition_key()).or_insert(0) += 1;
            }
        }

        for (key, composition) in &context.rules.shifts.composition {
            let assigned = *counts.get(key.as_str()).unwrap_or(&0);
            if assigned < composition.min_positions {
                violations.push(
                    Violation::new(
                        "role-min-shortfall",
                        format!("{key}: {assigned} assigned, minimum {}", composition.min_positions),
                        Severity::Critical,
                        ViolationScope::Day,
                    )
                    .with_day(day)
                    .with_meta("role_group", key.as_str())
                    .with_meta("assigned", assigned as i64),
                );
            }
            if assigned > composition.max_positions {
                violations.push(
                    Violation::new(
                        "role-max-exceeded",
                        format!("{key}: {assigned} assigned, maximum {}", composition.max_positions),
                        Severity::Warning,
                        ViolationScope::Day,
                    )
                    .with_day(day)
                    .with_meta("role_group", key.as_str())
                    .with_meta("assigned", assigned as i64),
                );
            }
        }
    }
}

fn by_resource_week_hours(
    context: &SchedulingContext,
    assignments: &[Assignment],
    violations: &mut Vec<Violation>,
) {
    let max_hours = context.rules.working_time.max_hours_per_week;
    let mut hours_by_week: BTreeMap<(i64, i32, u32), f64> = BTreeMap::new();

    for assignment in assignments.iter().filter(|a| a.is_work()) {
        let Some(shift) = assignment
            .shift_code
            .and_then(|code| context.shift_by_code(code))
        else {
            continue;
        };
        let (iso_year, iso_week) = iso_year_week(assignment.date);
        *hours_by_week
            .entry((assignment.resource_id, iso_year, iso_week))
            .or_insert(0.0) += shift.hours;
    }

    for ((resource_id, iso_year, iso_week), hours) in hours_by_week {
        if hours > max_hours {
            violations.push(
                Violation::new(
                    "hours-per-week-exceeded",
                    format!("resource worked {hours:.2}h, limit {max_hours:.2}h"),
                    Severity::Critical,
                    ViolationScope::Week,
                )
                .with_resource(resource_id)
                .with_iso_week(iso_year, iso_week)
                .with_meta("hours", hours),
            );
        }
    }
}

fn by_resource_week_days(
    context: &SchedulingContext,
    assignments: &[Assignment],
    violations: &mut Vec<Violation>,
) {
    let max_days = context.rules.working_time.max_working_days_per_week;
    let mut days_by_week: BTreeMap<(i64, i32, u32), u32> = BTreeMap::new();

    for assignment in assignments.iter().filter(|a| a.is_work()) {
        let (iso_year, iso_week) = iso_year_week(assignment.date);
        *days_by_week
            .entry((assignment.resource_id, iso_year, iso_week))
            .or_insert(0) += 1;
    }

    for ((resource_id, iso_year, iso_week), days) in days_by_week {
        if days > max_days {
            violations.push(
                Violation::new(
                    "days-per-week-exceeded",
                    format!("resource worked {days} days, limit {max_days}"),
                    Severity::Critical,
                    ViolationScope::Week,
                )
                .with_resource(resource_id)
                .with_iso_week(iso_year, iso_week)
                .with_meta("days", days as i64),
            );
        }
    }
}

/// Longest run of consecutive calendar days on which `is_work_day(day)` is
/// true, scanning the distinct sorted days in `days`.
pub fn longest_consecutive_stretch(days: &[NaiveDate]) -> u32 {
    if days.is_empty() {
        return 0;
    }
    let mut sorted = days.to_vec();
    sorted.sort();
    sorted.dedup();

    let mut longest = 1u32;
    let mut current = 1u32;
    for pair in sorted.windows(2) {
        if pair[1] == pair[0] + chrono::Duration::days(1) {
            current += 1;
        } else {
            current = 1;
        }
        longest = longest.max(current);
    }
    longest
}

fn by_resource_consecutive_days(
    context: &SchedulingContext,
    assignments: &[Assignment],
    violations: &mut Vec<Violation>,
) {
    let max_consecutive = context.rules.working_time.max_consecutive_working_days;
    let mut work_days_by_resource: BTreeMap<i64, Vec<NaiveDate>> = BTreeMap::new();

    for assignment in assignments.iter().filter(|a| a.is_work()) {
        work_days_by_resource
            .entry(assignment.resource_id)
            .or_default()
            .push(assignment.date);
    }

    for (resource_id, days) in work_days_by_resource {
        let longest = longest_consecutive_stretch(&days);
        if longest > max_consecutive {
            violations.push(
                Violation::new(
                    "consecutive-days-exceeded",
                    format!("resource worked {longest} consecutive days, limit {max_consecutive}"),
                    Severity::Critical,
                    ViolationScope::Resource,
                )
                .with_resource(resource_id)
                .with_meta("consecutive_days", longest as i64),
            );
        }
    }
}

/// Whether `days` (sorted, deduplicated) contains a run of `required`
/// consecutive rest days somewhere within `[start, end]`.
fn has_consecutive_days_off(
    work_days: &[NaiveDate],
    start: NaiveDate,
    end: NaiveDate,
    required: u32,
) -> bool {
    if required == 0 {
        return true;
    }
    let mut streak = 0u32;
    let mut day = start;
    while day <= end {
        if work_days.contains(&day) {
            streak = 0;
        } else {
            streak += 1;
            if streak >= required {
                return true;
            }
        }
        day += chrono::Duration::days(1);
    }
    false
}

fn by_resource_consecutive_rest(
    context: &SchedulingContext,
    assignments: &[Assignment],
    violations: &mut Vec<Violation>,
) {
    let required = context.rules.working_time.required_consecutive_days_off_per_month;
    let Some(&first_day) = context.calendar_days.first() else {
        return;
    };
    let Some(&last_day) = context.calendar_days.last() else {
        return;
    };

    let mut work_days_by_resource: BTreeMap<i64, Vec<NaiveDate>> = BTreeMap::new();
    for resource in &context.resources {
        work_days_by_resource.entry(resource.id).or_default();
    }
    for assignment in assignments.iter().filter(|a| a.is_work()) {
        work_days_by_resource
            .entry(assignment.resource_id)
            .or_default()
            .push(assignment.date);
    }

    for (resource_id, mut days) in work_days_by_resource {
        days.sort();
        if !has_consecutive_days_off(&days, first_day, last_day, required) {
            violations.push(
                Violation::new(
                    "insufficient-consecutive-rest",
                    format!("resource has no run of {required} consecutive rest days this month"),
                    Severity::Warning,
                    ViolationScope::Resource,
                )
                .with_resource(resource_id)
                .with_meta("required_rest_days", required as i64),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::shift::default_shift_catalog;
    use crate::domain::entities::{Resource, Role, SchedulingContext};
    use crate::domain::ruleset::load_default_rules;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_context() -> SchedulingContext {
        let resources = vec![
            Resource::new(1, Role::Cook),
            Resource::new(2, Role::Cook),
            Resource::new(3, Role::KitchenAssistant),
        ];
        SchedulingContext::new(
            "2024-11",
            resources,
            default_shift_catalog(),
            load_default_rules().clone(),
        )
        .unwrap()
    }

    #[test]
    fn empty_assignments_yield_empty_schedule_violation() {
        let context = sample_context();
        let violations = evaluate(&context, &[]);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, "empty-schedule");
    }

    #[test]
    fn understaffed_day_is_flagged() {
        let context = sample_context();
        let assignments = vec![Assignment::shift(1, date(2024, 11, 4), 1)];
        let violations = evaluate(&context, &assignments);
        assert!(violations.iter().any(|v| v.code == "staffing-shortfall"));
    }

    #[test]
    fn longest_stretch_counts_consecutive_run() {
        let days = vec![
            date(2024, 11, 1),
            date(2024, 11, 2),
            date(2024, 11, 3),
            date(2024, 11, 5),
        ];
        assert_eq!(longest_consecutive_stretch(&days), 3);
    }

    #[test]
    fn weekly_hours_over_limit_is_flagged() {
        let context = sample_context();
        let monday = date(2024, 11, 4);
        let mut assignments = Vec::new();
        for offset in 0..6 {
            assignments.push(Assignment::shift(1, monday + chrono::Duration::days(offset), 4));
        }
        let violations = evaluate(&context, &assignments);
        assert!(violations.iter().any(|v| v.code == "hours-per-week-exceeded"));
    }
}
