use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use shared::DomainResult;

use crate::domain::entities::{
    sort_assignments, Assignment, EngineKind, ResultStatus, SchedulingContext, SchedulingResult,
};

use super::rule_evaluator::{self, iso_year_week};

#[derive(Debug, Default, Clone)]
struct ResourceState {
    weekly_hours: HashMap<(i32, u32), f64>,
    weekly_days: HashMap<(i32, u32), u32>,
    consecutive_days: u32,
    last_work_day: Option<NaiveDate>,
    monthly_hours: f64,
    total_assignments: u32,
    forced_rest_days: HashSet<NaiveDate>,
    last_pot_washer_family: Option<&'static str>,
}

impl ResourceState {
    fn hours_this_week(&self, week: (i32, u32)) -> f64 {
        *self.weekly_hours.get(&week).unwrap_or(&0.0)
    }

    fn days_this_week(&self, week: (i32, u32)) -> u32 {
        *self.weekly_days.get(&week).unwrap_or(&0)
    }

    fn record_work(&mut self, day: NaiveDate, hours: f64, pot_washer_family: Option<&'static str>) {
        let week = iso_year_week(day);
        *self.weekly_hours.entry(week).or_insert(0.0) += hours;
        *self.weekly_days.entry(week).or_insert(0) += 1;
        self.monthly_hours += hours;
        self.total_assignments += 1;
        self.consecutive_days = match self.last_work_day {
            Some(previous) if previous + chrono::Duration::days(1) == day => {
                self.consecutive_days + 1
            }
            _ => 1,
        };
        self.last_work_day = Some(day);
        if pot_washer_family.is_some() {
            self.last_pot_washer_family = pot_washer_family;
        }
    }

    fn record_rest(&mut self, day: NaiveDate) {
        if self.last_work_day != Some(day) {
            self.consecutive_days = 0;
        }
    }
}

/// Picks the mandatory rest window for each resource up front, before any
/// shift is assigned, so the later coverage pass never has to displace an
/// already-granted rest day.
///
/// Only applies when `required_consecutive_days_off_per_month > 1` (a
/// single rest day falls out naturally from the coverage pass). Skips a
/// resource whose existing absences/unavailable days already contain a run
/// of the required length. Otherwise picks, among the windows where the
/// resource is available every day, the one centered closest to the middle
/// of the month, preferring a non-edge window; ties are broken
/// deterministically by `resource.id mod candidates`.
fn assign_mandatory_rest(context: &SchedulingContext, states: &mut HashMap<i64, ResourceState>) {
    let required = context.rules.working_time.required_consecutive_days_off_per_month as usize;
    let days = &context.calendar_days;
    if required <= 1 || days.len() < required {
        return;
    }

    let month_len = days.len();
    let middle = (month_len as f64 - 1.0) / 2.0;
    let last_start = month_len - required;

    for resource in &context.resources {
        let already_covered = days
            .windows(required)
            .any(|window| window.iter().all(|&day| !resource.is_available_on(day)));
        if already_covered {
            continue;
        }

        let candidates: Vec<usize> = (0..=last_start)
            .filter(|&start| {
                days[start..start + required]
                    .iter()
                    .all(|&day| resource.is_available_on(day))
            })
            .collect();
        if candidates.is_empty() {
            continue;
        }

        let score = |start: usize| -> (bool, f64) {
            let center = start as f64 + (required as f64 - 1.0) / 2.0;
            let is_edge = start == 0 || start == last_start;
            (is_edge, (center - middle).abs())
        };

        let best_score = candidates
            .iter()
            .map(|&start| score(start))
            .min_by(|a, b| a.0.cmp(&b.0).then(a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal)))
            .expect("candidates is non-empty");

        let tied: Vec<usize> = candidates
            .into_iter()
            .filter(|&start| {
                let (edge, distance) = score(start);
                edge == best_score.0 && distance == best_score.1
            })
            .collect();

        let chosen_start = tied[(resource.id.unsigned_abs() as usize) % tied.len()];
        let state = states.entry(resource.id).or_default();
        for day in &days[chosen_start..chosen_start + required] {
            state.forced_rest_days.insert(*day);
        }
    }
}

fn is_eligible(
    context: &SchedulingContext,
    resource_id: i64,
    day: NaiveDate,
    shift_code: i32,
    states: &HashMap<i64, ResourceState>,
) -> bool {
    let Some(resource) = context.resource_by_id(resource_id) else {
        return false;
    };
    if !resource.is_available_on(day) {
        return false;
    }
    if !crate::domain::entities::shift::role_allowed_shift_codes(resource.role).contains(&shift_code) {
        return false;
    }
    if resource.undesired_shift_codes.contains(&shift_code) {
        return false;
    }
    let Some(shift) = context.shift_by_code(shift_code) else {
        return false;
    };
    let state = states.get(&resource_id).cloned().unwrap_or_default();
    if state.forced_rest_days.contains(&day) {
        return false;
    }
    let week = iso_year_week(day);
    if state.hours_this_week(week) + shift.hours > context.rules.working_time.max_hours_per_week {
        return false;
    }
    if state.days_this_week(week) + 1 > context.rules.working_time.max_working_days_per_week {
        return false;
    }
    let would_be_consecutive = match state.last_work_day {
        Some(previous) if previous + chrono::Duration::days(1) == day => state.consecutive_days + 1,
        Some(previous) if previous == day => state.consecutive_days,
        _ => 1,
    };
    if would_be_consecutive > context.rules.working_time.max_consecutive_working_days {
        return false;
    }
    true
}

/// Lower is better. Balances weekly load, favours preferred shifts, and
/// keeps cooks/assistants/relief staff ahead of pot-washers per the
/// published role selection priority. `pot_washer_already_present`
/// deprioritises adding a second pot-washer on a day that already has one.
fn score_candidate(
    context: &SchedulingContext,
    resource_id: i64,
    shift_code: i32,
    day: NaiveDate,
    states: &HashMap<i64, ResourceState>,
    pot_washer_already_present: bool,
) -> f64 {
    let resource = context.resource_by_id(resource_id).expect("eligible resource exists");
    let shift = context.shift_by_code(shift_code).expect("eligible shift exists");
    let state = states.get(&resource_id).cloned().unwrap_or_default();
    let week = iso_year_week(day);

    let mut score = state.hours_this_week(week);
    score += resource.role.selection_priority() as f64 * 0.1;
    score += state.total_assignments as f64 * 0.02;

    if resource.preferred_shift_codes.contains(&shift_code) {
        score -= 1.0;
    }
    if let Some(target) = resource.target_hours {
        if state.monthly_hours + shift.hours > target {
            score += 0.5;
        }
    }
    if pot_washer_already_present && resource.role == crate::domain::entities::Role::PotWasher {
        score += 0.4;
    }
    score
}

fn pot_washer_family(shift_code: i32) -> Option<&'static str> {
    use crate::domain::entities::shift::{POT_WASHER_EARLY, POT_WASHER_LATE};
    if POT_WASHER_EARLY.contains(&shift_code) {
        Some("early")
    } else if POT_WASHER_LATE.contains(&shift_code) {
        Some("late")
    } else {
        None
    }
}

/// Picks the pot-washer shift code that alternates between the early and
/// late family relative to the resource's last pot-washer assignment.
fn preferred_pot_washer_code(state: &ResourceState, available_codes: &[i32]) -> Option<i32> {
    use crate::domain::entities::shift::{POT_WASHER_EARLY, POT_WASHER_LATE};
    let wanted_family = match state.last_pot_washer_family {
        Some("early") => "late",
        Some("late") => "early",
        _ => "early",
    };
    let family_codes: &[i32] = if wanted_family == "early" {
        &POT_WASHER_EARLY
    } else {
        &POT_WASHER_LATE
    };
    available_codes
        .iter()
        .find(|code| family_codes.contains(code))
        .or_else(|| available_codes.first())
        .copied()
}

/// Resolves the shift code a candidate would actually work: alternates the
/// pot-washer family, otherwise returns `shift_code` unchanged.
fn resolve_candidate_code(
    context: &SchedulingContext,
    resource_id: i64,
    shift_code: i32,
    day: NaiveDate,
    states: &HashMap<i64, ResourceState>,
) -> i32 {
    if pot_washer_family(shift_code).is_none() {
        return shift_code;
    }
    let resource = context.resource_by_id(resource_id).expect("eligible resource exists");
    let state = states.get(&resource_id).cloned().unwrap_or_default();
    let allowed: Vec<i32> =
        crate::domain::entities::shift::role_allowed_shift_codes(resource.role)
            .iter()
            .copied()
            .filter(|code| is_eligible(context, resource_id, day, *code, states))
            .collect();
    preferred_pot_washer_code(&state, &allowed).unwrap_or(shift_code)
}

/// Finds the best-scoring eligible (resource, shift) pair for `day` among
/// resources not already assigned today, optionally restricted to a single
/// composition-key role group. Returns `None` once no eligible candidate
/// remains.
fn best_candidate(
    context: &SchedulingContext,
    day: NaiveDate,
    assigned_today: &HashSet<i64>,
    states: &HashMap<i64, ResourceState>,
    role_group: Option<&str>,
    pot_washer_already_present: bool,
) -> Option<(i64, i32, f64)> {
    let mut best: Option<(i64, i32, f64)> = None;
    for resource in &context.resources {
        if assigned_today.contains(&resource.id) {
            continue;
        }
        if let Some(group) = role_group {
            if resource.role.composition_key() != group {
                continue;
            }
        }
        for &shift_code in crate::domain::entities::shift::role_allowed_shift_codes(resource.role) {
            if !is_eligible(context, resource.id, day, shift_code, states) {
                continue;
            }
            let candidate_code = resolve_candidate_code(context, resource.id, shift_code, day, states);
            let score = score_candidate(
                context,
                resource.id,
                candidate_code,
                day,
                states,
                pot_washer_already_present,
            );
            if best.map(|(_, _, best_score)| score < best_score).unwrap_or(true) {
                best = Some((resource.id, candidate_code, score));
            }
            break;
        }
    }
    best
}

fn commit_assignment(
    context: &SchedulingContext,
    day: NaiveDate,
    resource_id: i64,
    shift_code: i32,
    states: &mut HashMap<i64, ResourceState>,
    entries: &mut Vec<Assignment>,
    assigned_today: &mut HashSet<i64>,
    role_counts: &mut HashMap<&'static str, u32>,
) {
    let resource = context.resource_by_id(resource_id).expect("known resource");
    let family = pot_washer_family(shift_code);
    let state = states.entry(resource_id).or_default();
    let shift = context.shift_by_code(shift_code).expect("known shift code");
    state.record_work(day, shift.hours, family);
    entries.push(Assignment::shift(resource_id, day, shift_code));
    assigned_today.insert(resource_id);
    *role_counts.entry(resource.role.composition_key()).or_insert(0) += 1;
}

/// Runs the greedy day-by-day heuristic engine. Per working day: a role
/// minimums pass fills each composition group up to its minimum headcount,
/// a coverage pass fills remaining headcount up to `minimum_daily_staff`,
/// and a deficit pass tops up resources whose monthly hour deficit still
/// exceeds the 4h threshold, bounded by `resources.len()` and
/// `minimum_daily_staff + 1`. Returns a fully diagnosed result (rule
/// evaluator has already been applied).
pub fn run_heuristic(context: &SchedulingContext) -> DomainResult<SchedulingResult> {
    let started = std::time::Instant::now();
    let mut states: HashMap<i64, ResourceState> = context
        .resources
        .iter()
        .map(|r| (r.id, ResourceState::default()))
        .collect();
    assign_mandatory_rest(context, &mut states);

    let mut entries: Vec<Assignment> = Vec::new();
    let working_days: HashSet<NaiveDate> = context.working_days.iter().copied().collect();

    for &day in &context.calendar_days {
        let mut assigned_today: HashSet<i64> = HashSet::new();
        let mut role_counts: HashMap<&'static str, u32> = HashMap::new();

        for resource in &context.resources {
            if let Some(absence) = resource.absence_on(day) {
                entries.push(Assignment::absence(resource.id, day, absence.kind));
                assigned_today.insert(resource.id);
            }
        }

        if working_days.contains(&day) {
            let minimum = context.rules.shifts.minimum_daily_staff as usize;

            for (role_key, composition) in &context.rules.shifts.composition {
                while role_counts.get(role_key.as_str()).copied().unwrap_or(0) < composition.min_positions {
                    let pot_washer_present = role_counts.get("pot_washers").copied().unwrap_or(0) > 0;
                    let Some((resource_id, shift_code, _)) = best_candidate(
                        context,
                        day,
                        &assigned_today,
                        &states,
                        Some(role_key.as_str()),
                        pot_washer_present,
                    ) else {
                        break;
                    };
                    commit_assignment(
                        context,
                        day,
                        resource_id,
                        shift_code,
                        &mut states,
                        &mut entries,
                        &mut assigned_today,
                        &mut role_counts,
                    );
                }
            }

            let mut assigned_count: usize = role_counts.values().sum::<u32>() as usize;
            while assigned_count < minimum {
                let pot_washer_present = role_counts.get("pot_washers").copied().unwrap_or(0) > 0;
                let Some((resource_id, shift_code, _)) =
                    best_candidate(context, day, &assigned_today, &states, None, pot_washer_present)
                else {
                    break;
                };
                commit_assignment(
                    context,
                    day,
                    resource_id,
                    shift_code,
                    &mut states,
                    &mut entries,
                    &mut assigned_today,
                    &mut role_counts,
                );
                assigned_count += 1;
            }

            let deficit_cap = context.resources.len().min(minimum + 1);
            while assigned_count < deficit_cap {
                let mut best: Option<(i64, i32, f64)> = None;
                for resource in &context.resources {
                    if assigned_today.contains(&resource.id) {
                        continue;
                    }
                    let Some(target) = resource.target_hours else {
                        continue;
                    };
                    let group = resource.role.composition_key();
                    if let Some(composition) = context.rules.shifts.composition.get(group) {
                        if role_counts.get(group).copied().unwrap_or(0) >= composition.max_positions {
                            continue;
                        }
                    }
                    let state = states.get(&resource.id).cloned().unwrap_or_default();
                    if target - state.monthly_hours <= 4.0 {
                        continue;
                    }
                    for &shift_code in
                        crate::domain::entities::shift::role_allowed_shift_codes(resource.role)
                    {
                        if !is_eligible(context, resource.id, day, shift_code, &states) {
                            continue;
                        }
                        let candidate_code =
                            resolve_candidate_code(context, resource.id, shift_code, day, &states);
                        let score = score_candidate(context, resource.id, candidate_code, day, &states, false);
                        if best.map(|(_, _, best_score)| score < best_score).unwrap_or(true) {
                            best = Some((resource.id, candidate_code, score));
                        }
                        break;
                    }
                }
                let Some((resource_id, shift_code, _)) = best else {
                    break;
                };
                commit_assignment(
                    context,
                    day,
                    resource_id,
                    shift_code,
                    &mut states,
                    &mut entries,
                    &mut assigned_today,
                    &mut role_counts,
                );
                assigned_count += 1;
            }
        }

        for resource in &context.resources {
            if assigned_today.contains(&resource.id) {
                continue;
            }
            let state = states.entry(resource.id).or_default();
            state.record_rest(day);
            entries.push(Assignment::rest_day(resource.id, day));
        }
    }

    sort_assignments(&mut entries);

    let relaxed = super::prime_relaxation::relax(context, entries);
    let violations = rule_evaluator::evaluate(context, &relaxed);

    let mut result = SchedulingResult::new(&context.month, EngineKind::Heuristic, ResultStatus::Success);
    result.entries = relaxed;
    result.violations = violations;
    result.duration_ms = started.elapsed().as_millis() as u64;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{shift::default_shift_catalog, Resource, Role};
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
    fn every_resource_has_an_entry_every_day() {
        let context = context_with(10);
        let result = run_heuristic(&context).unwrap();
        let expected = context.resources.len() * context.calendar_days.len();
        assert_eq!(result.entries.len(), expected);
    }

    #[test]
    fn heuristic_result_is_tagged_correctly() {
        let context = context_with(10);
        let result = run_heuristic(&context).unwrap();
        assert_eq!(result.engine, EngineKind::Heuristic);
        assert_eq!(result.status, ResultStatus::Success);
    }

    #[test]
    fn mandatory_rest_window_is_honoured() {
        let context = context_with(10);
        let mut states: HashMap<i64, ResourceState> = context
            .resources
            .iter()
            .map(|r| (r.id, ResourceState::default()))
            .collect();
        assign_mandatory_rest(&context, &mut states);
        for state in states.values() {
            assert_eq!(
                state.forced_rest_days.len(),
                context.rules.working_time.required_consecutive_days_off_per_month as usize
            );
        }
    }

    #[test]
    fn mandatory_rest_skips_resource_already_covered_by_absence() {
        use crate::domain::entities::resource::{Absence, AbsenceType};
        use chrono::NaiveDate;

        let mut context = context_with(1);
        let absence_start = NaiveDate::from_ymd_opt(2024, 11, 14).unwrap();
        let absence_end = NaiveDate::from_ymd_opt(2024, 11, 16).unwrap();
        context.resources[0]
            .absences
            .push(Absence::new(absence_start, absence_end, AbsenceType::Vacation));

        let mut states: HashMap<i64, ResourceState> = context
            .resources
            .iter()
            .map(|r| (r.id, ResourceState::default()))
            .collect();
        assign_mandatory_rest(&context, &mut states);
        assert!(states[&context.resources[0].id].forced_rest_days.is_empty());
    }

    #[test]
    fn role_minimums_are_filled_before_coverage_tops_up() {
        let context = context_with(20);
        let result = run_heuristic(&context).unwrap();
        assert!(!result.violations.iter().any(|v| v.code == "role-min-shortfall"));
    }
}
