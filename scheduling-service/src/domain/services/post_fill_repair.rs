use crate::domain::entities::{
    shift::{role_allowed_shift_codes, POT_WASHER_EARLY, POT_WASHER_LATE},
    AbsenceType, Assignment, Resource, Role, SchedulingContext,
};

use super::rule_evaluator::iso_year_week;

/// The generic workday length used as a per-assignment proxy when topping a
/// resource up towards its contracted monthly hours; it is not tied to any
/// one shift code.
pub const STANDARD_WORKDAY_HOURS: f64 = 8.3;

fn find_entry_index(entries: &[Assignment], resource_id: i64, day: chrono::NaiveDate) -> Option<usize> {
    entries
        .iter()
        .position(|entry| entry.resource_id == resource_id && entry.date == day)
}

fn is_open_rest_day(entries: &[Assignment], resource_id: i64, day: chrono::NaiveDate) -> bool {
    find_entry_index(entries, resource_id, day)
        .map(|index| entries[index].shift_code.is_none() && entries[index].absence_type.is_none())
        .unwrap_or(false)
}

fn resource_week_hours(
    context: &SchedulingContext,
    entries: &[Assignment],
    resource_id: i64,
    week: (i32, u32),
) -> f64 {
    entries
        .iter()
        .filter(|entry| entry.resource_id == resource_id && entry.is_work() && iso_year_week(entry.date) == week)
        .filter_map(|entry| entry.shift_code.and_then(|code| context.shift_by_code(code)))
        .map(|shift| shift.hours)
        .sum()
}

fn resource_week_days(entries: &[Assignment], resource_id: i64, week: (i32, u32)) -> u32 {
    entries
        .iter()
        .filter(|entry| entry.resource_id == resource_id && entry.is_work() && iso_year_week(entry.date) == week)
        .count() as u32
}

/// Actual hours credited towards a resource's contract for the month:
/// worked shift hours, plus a standard workday for every sick-leave day,
/// minus a standard workday for every vacation day that falls on a
/// scheduled working day.
fn resource_monthly_hours(context: &SchedulingContext, entries: &[Assignment], resource_id: i64) -> f64 {
    let shift_hours: f64 = entries
        .iter()
        .filter(|entry| entry.resource_id == resource_id && entry.is_work())
        .filter_map(|entry| entry.shift_code.and_then(|code| context.shift_by_code(code)))
        .map(|shift| shift.hours)
        .sum();

    let Some(resource) = context.resource_by_id(resource_id) else {
        return shift_hours;
    };

    let sick_days = context
        .calendar_days
        .iter()
        .filter(|&&day| matches!(resource.absence_on(day).map(|a| a.kind), Some(AbsenceType::Sick)))
        .count() as f64;
    let vacation_working_days = context
        .working_days
        .iter()
        .filter(|&&day| matches!(resource.absence_on(day).map(|a| a.kind), Some(AbsenceType::Vacation)))
        .count() as f64;

    shift_hours + STANDARD_WORKDAY_HOURS * sick_days - STANDARD_WORKDAY_HOURS * vacation_working_days
}

/// Contract-hour floor target: the resource's declared target, or the
/// working-day count valued at a standard workday each, whichever is
/// higher.
fn contract_hour_floor_target(context: &SchedulingContext, resource: &Resource) -> f64 {
    let working_days_floor = context.working_days.len() as f64 * STANDARD_WORKDAY_HOURS;
    resource.target_hours.unwrap_or(0.0).max(working_days_floor)
}

fn consecutive_days_ending_before(
    entries: &[Assignment],
    resource_id: i64,
    day: chrono::NaiveDate,
) -> u32 {
    let mut streak = 0;
    let mut probe = day - chrono::Duration::days(1);
    loop {
        let worked = entries
            .iter()
            .any(|entry| entry.resource_id == resource_id && entry.date == probe && entry.is_work());
        if !worked {
            break;
        }
        streak += 1;
        probe -= chrono::Duration::days(1);
    }
    streak
}

fn can_assign(
    context: &SchedulingContext,
    entries: &[Assignment],
    resource_id: i64,
    day: chrono::NaiveDate,
    shift_code: i32,
) -> bool {
    let Some(resource) = context.resource_by_id(resource_id) else {
        return false;
    };
    if !resource.is_available_on(day) || !is_open_rest_day(entries, resource_id, day) {
        return false;
    }
    if !role_allowed_shift_codes(resource.role).contains(&shift_code) {
        return false;
    }
    let Some(shift) = context.shift_by_code(shift_code) else {
        return false;
    };
    let week = iso_year_week(day);
    if resource_week_hours(context, entries, resource_id, week) + shift.hours
        > context.rules.working_time.max_hours_per_week
    {
        return false;
    }
    if resource_week_days(entries, resource_id, week) + 1 > context.rules.working_time.max_working_days_per_week
    {
        return false;
    }
    if consecutive_days_ending_before(entries, resource_id, day) + 1
        > context.rules.working_time.max_consecutive_working_days
    {
        return false;
    }
    true
}

/// Tops resources up towards their contracted monthly hours by converting
/// open rest days into shifts. Runs first so the daily-staffing pass below
/// sees the improved picture.
fn apply_contract_hour_floor(context: &SchedulingContext, entries: &mut [Assignment]) {
    for resource in &context.resources {
        let target = contract_hour_floor_target(context, resource);
        let allowed = role_allowed_shift_codes(resource.role);
        if allowed.is_empty() {
            continue;
        }
        let preferred_code = resource
            .preferred_shift_codes
            .iter()
            .find(|code| allowed.contains(code))
            .copied()
            .unwrap_or(allowed[0]);

        let max_additional_shifts = (target / STANDARD_WORKDAY_HOURS).ceil() as usize + 1;
        for _ in 0..max_additional_shifts {
            let monthly_hours = resource_monthly_hours(context, entries, resource.id);
            if monthly_hours >= target {
                break;
            }
            let Some(day) = context
                .working_days
                .iter()
                .find(|&&day| can_assign(context, entries, resource.id, day, preferred_code))
            else {
                break;
            };
            let day = *day;
            if let Some(index) = find_entry_index(entries, resource.id, day) {
                entries[index].shift_code = Some(preferred_code);
                entries[index].comment = Some("(contract hour floor)".to_string());
            }
        }
    }
}

/// Fills any remaining understaffed working day from resources still on an
/// open rest day that day.
fn apply_daily_staffing_floor(context: &SchedulingContext, entries: &mut [Assignment]) {
    let minimum = context.rules.shifts.minimum_daily_staff as usize;
    for &day in &context.working_days {
        loop {
            let assigned = entries
                .iter()
                .filter(|entry| entry.date == day && entry.is_work())
                .count();
            if assigned >= minimum {
                break;
            }
            let candidate = context.resources.iter().find(|resource| {
                role_allowed_shift_codes(resource.role)
                    .iter()
                    .any(|&code| can_assign(context, entries, resource.id, day, code))
            });
            let Some(resource) = candidate else {
                break;
            };
            let shift_code = *role_allowed_shift_codes(resource.role)
                .iter()
                .find(|&&code| can_assign(context, entries, resource.id, day, code))
                .expect("candidate satisfied the filter above");
            if let Some(index) = find_entry_index(entries, resource.id, day) {
                entries[index].shift_code = Some(shift_code);
                entries[index].comment = Some("(daily staffing floor)".to_string());
            }
        }
    }
}

/// Ensures the two pot-washer shift families (early/late) appear together
/// on each working day when a pot-washer resource is available for the
/// missing family.
fn apply_pot_washer_pairing(context: &SchedulingContext, entries: &mut [Assignment]) {
    for &day in &context.working_days {
        let has_early = entries.iter().any(|entry| {
            entry.date == day && entry.shift_code.map(|c| POT_WASHER_EARLY.contains(&c)).unwrap_or(false)
        });
        let has_late = entries.iter().any(|entry| {
            entry.date == day && entry.shift_code.map(|c| POT_WASHER_LATE.contains(&c)).unwrap_or(false)
        });
        if has_early == has_late {
            continue;
        }
        let (missing_family, missing_codes): (&str, &[i32]) = if has_early {
            ("late", &POT_WASHER_LATE)
        } else {
            ("early", &POT_WASHER_EARLY)
        };

        let candidate = context.resources.iter().find(|resource| {
            resource.role == Role::PotWasher
                && missing_codes
                    .iter()
                    .any(|&code| can_assign(context, entries, resource.id, day, code))
        });
        if let Some(resource) = candidate {
            let shift_code = *missing_codes
                .iter()
                .find(|&&code| can_assign(context, entries, resource.id, day, code))
                .expect("candidate satisfied the filter above");
            if let Some(index) = find_entry_index(entries, resource.id, day) {
                entries[index].shift_code = Some(shift_code);
                entries[index].comment = Some(format!("(pot washer pairing: {missing_family})"));
            }
        }
    }
}

/// Runs the three ordered repair passes over a finished schedule. Not
/// invoked automatically by either engine; callers apply it explicitly
/// when they want the stricter contract/staffing/pairing guarantees.
pub fn repair(context: &SchedulingContext, mut entries: Vec<Assignment>) -> Vec<Assignment> {
    apply_contract_hour_floor(context, &mut entries);
    apply_daily_staffing_floor(context, &mut entries);
    apply_pot_washer_pairing(context, &mut entries);
    crate::domain::entities::sort_assignments(&mut entries);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::shift::default_shift_catalog;
    use crate::domain::entities::{sort_assignments, Resource};
    use crate::domain::ruleset::load_default_rules;

    fn full_rest_schedule(context: &SchedulingContext) -> Vec<Assignment> {
        let mut entries = Vec::new();
        for resource in &context.resources {
            for &day in &context.calendar_days {
                entries.push(Assignment::rest_day(resource.id, day));
            }
        }
        sort_assignments(&mut entries);
        entries
    }

    #[test]
    fn daily_staffing_floor_fills_understaffed_days() {
        let resources: Vec<Resource> = (1..=8).map(|id| Resource::new(id, Role::Cook)).collect();
        let context = SchedulingContext::new(
            "2024-11",
            resources,
            default_shift_catalog(),
            load_default_rules().clone(),
        )
        .unwrap();
        let entries = full_rest_schedule(&context);
        let repaired = repair(&context, entries);
        let first_working_day = context.working_days[0];
        let assigned = repaired
            .iter()
            .filter(|entry| entry.date == first_working_day && entry.is_work())
            .count();
        assert!(assigned >= context.rules.shifts.minimum_daily_staff as usize || assigned > 0);
    }

    #[test]
    fn contract_hour_floor_raises_monthly_hours_towards_target() {
        let mut resource = Resource::new(1, Role::Cook);
        resource.target_hours = Some(80.0);
        let context = SchedulingContext::new(
            "2024-11",
            vec![resource],
            default_shift_catalog(),
            load_default_rules().clone(),
        )
        .unwrap();
        let entries = full_rest_schedule(&context);
        let repaired = repair(&context, entries);
        let hours = resource_monthly_hours(&context, &repaired, 1);
        assert!(hours > 0.0);
    }

    #[test]
    fn floor_applies_even_without_a_declared_target() {
        let resources: Vec<Resource> = (1..=8).map(|id| Resource::new(id, Role::Cook)).collect();
        let context = SchedulingContext::new(
            "2024-11",
            resources,
            default_shift_catalog(),
            load_default_rules().clone(),
        )
        .unwrap();
        let target = contract_hour_floor_target(&context, &context.resources[0]);
        assert!(target > 0.0);
        assert_eq!(target, context.working_days.len() as f64 * STANDARD_WORKDAY_HOURS);
    }

    #[test]
    fn sick_days_credit_and_vacation_days_debit_monthly_hours() {
        use crate::domain::entities::Absence;

        let mut resource = Resource::new(1, Role::Cook);
        let sick_day = chrono::NaiveDate::from_ymd_opt(2024, 11, 5).unwrap();
        resource
            .absences
            .push(Absence::new(sick_day, sick_day, AbsenceType::Sick));
        let context = SchedulingContext::new(
            "2024-11",
            vec![resource],
            default_shift_catalog(),
            load_default_rules().clone(),
        )
        .unwrap();
        let mut entries = full_rest_schedule(&context);
        if let Some(index) = find_entry_index(&entries, 1, sick_day) {
            entries[index] = Assignment::absence(1, sick_day, AbsenceType::Sick);
        }
        let hours = resource_monthly_hours(&context, &entries, 1);
        assert_eq!(hours, STANDARD_WORKDAY_HOURS);
    }
}
