use std::collections::HashMap;

use crate::domain::entities::{shift::prime_variant_of, Assignment, SchedulingContext};

use super::rule_evaluator::iso_year_week;

/// Converts over-hours resources onto shortened "prime" shift variants,
/// largest hour reduction first, until each resource is back at or under
/// the weekly hour cap or no further conversion is possible. Idempotent:
/// an assignment already on its prime variant is never touched again.
pub fn relax(context: &SchedulingContext, mut entries: Vec<Assignment>) -> Vec<Assignment> {
    let max_hours = context.rules.working_time.max_hours_per_week;

    for resource in &context.resources {
        if !context.rules.prime_shifts.allows(resource.role) {
            continue;
        }

        let mut weekly_hours: HashMap<(i32, u32), f64> = HashMap::new();
        for entry in entries.iter().filter(|e| e.resource_id == resource.id && e.is_work()) {
            if let Some(shift) = entry.shift_code.and_then(|code| context.shift_by_code(code)) {
                *weekly_hours.entry(iso_year_week(entry.date)).or_insert(0.0) += shift.hours;
            }
        }

        let overloaded_weeks: Vec<(i32, u32)> = weekly_hours
            .iter()
            .filter(|(_, &hours)| hours > max_hours)
            .map(|(&week, _)| week)
            .collect();

        for week in overloaded_weeks {
            let mut candidate_indices: Vec<usize> = entries
                .iter()
                .enumerate()
                .filter(|(_, entry)| {
                    entry.resource_id == resource.id
                        && entry.is_work()
                        && iso_year_week(entry.date) == week
                        && entry
                            .shift_code
                            .map(|code| prime_variant_of(code).is_some())
                            .unwrap_or(false)
                })
                .map(|(index, _)| index)
                .collect();

            candidate_indices.sort_by(|&a, &b| {
                let delta = |index: usize| -> f64 {
                    let code = entries[index].shift_code.unwrap();
                    let base_hours = context.shift_by_code(code).map(|s| s.hours).unwrap_or(0.0);
                    let prime_hours = prime_variant_of(code)
                        .and_then(|prime_code| context.shift_by_code(prime_code))
                        .map(|s| s.hours)
                        .unwrap_or(0.0);
                    base_hours - prime_hours
                };
                delta(b)
                    .partial_cmp(&delta(a))
                    .unwrap_or(std::cmp::Ordering::Equal)
            });

            let mut remaining = *weekly_hours.get(&week).unwrap() - max_hours;
            for index in candidate_indices {
                if remaining <= 0.0 {
                    break;
                }
                let code = entries[index].shift_code.unwrap();
                let Some(prime_code) = prime_variant_of(code) else {
                    continue;
                };
                let base_hours = context.shift_by_code(code).map(|s| s.hours).unwrap_or(0.0);
                let prime_hours = context
                    .shift_by_code(prime_code)
                    .map(|s| s.hours)
                    .unwrap_or(0.0);
                entries[index].shift_code = Some(prime_code);
                entries[index].comment = Some("(prime adjustment)".to_string());
                remaining -= base_hours - prime_hours;
            }
        }
    }

    entries
}
