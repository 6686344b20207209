use std::collections::BTreeMap;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use shared::{DomainError, DomainResult};

use super::entities::Role;

/// Minimum/maximum headcount for one role-composition group within a shift.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleComposition {
    pub min_positions: u32,
    pub max_positions: u32,
}

impl RoleComposition {
    /// How many more resources of this group could still be assigned given
    /// `current`, clamped at zero.
    pub fn remaining_positions(&self, current: u32) -> u32 {
        self.max_positions.saturating_sub(current)
    }
}

/// Working-time limits applied per resource per ISO week / month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorkingTimeRules {
    pub max_hours_per_week: f64,
    pub max_working_days_per_week: u32,
    pub max_consecutive_working_days: u32,
    pub required_consecutive_days_off_per_month: u32,
}

/// Per-shift staffing minimums and the role-composition caps within them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftRules {
    pub minimum_daily_staff: u32,
    pub composition: BTreeMap<String, RoleComposition>,
}

impl ShiftRules {
    pub fn composition_for(&self, role: Role) -> Option<&RoleComposition> {
        self.composition.get(role.composition_key())
    }
}

/// Which roles may be scheduled on a prime (shortened) shift variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrimeShiftRules {
    pub allowed_for: Vec<Role>,
    pub excluded_for: Vec<Role>,
}

impl PrimeShiftRules {
    pub fn allows(&self, role: Role) -> bool {
        self.allowed_for.contains(&role) && !self.excluded_for.contains(&role)
    }
}

/// Vacation/rest related rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VacationRules {
    pub max_concurrent_vacations: u32,
    pub desired_rest_days: u32,
}

/// The complete declarative rule set driving both engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub working_time: WorkingTimeRules,
    pub shifts: ShiftRules,
    pub prime_shifts: PrimeShiftRules,
    pub vacations: VacationRules,
}

const DEFAULT_RULES_JSON: &str = include_str!("data/default_rules.json");

static DEFAULT_RULES: Lazy<RuleSet> = Lazy::new(|| {
    serde_json::from_str(DEFAULT_RULES_JSON).expect("shipped default_rules.json is valid")
});

/// The rule snapshot shipped with this crate, lazily parsed once.
pub fn load_default_rules() -> &'static RuleSet {
    &DEFAULT_RULES
}

/// Loads an externally supplied rule configuration. Reading and validating
/// the config file is the only seam this crate exposes to the config loader
/// described as an external collaborator; the loader itself lives outside
/// this crate.
pub fn load_active_rules(path: Option<&Path>) -> DomainResult<RuleSet> {
    let Some(path) = path else {
        return Ok(load_default_rules().clone());
    };
    let raw = std::fs::read_to_string(path)
        .map_err(|err| DomainError::InvalidInput(format!("cannot read rule config: {err}")))?;
    serde_json::from_str(&raw)
        .map_err(|err| DomainError::InvalidInput(format!("malformed rule config: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shipped_default_rules_parse() {
        let rules = load_default_rules();
        assert_eq!(rules.working_time.max_hours_per_week, 50.0);
        assert_eq!(rules.shifts.minimum_daily_staff, 7);
    }

    #[test]
    fn remaining_positions_never_underflows() {
        let composition = RoleComposition {
            min_positions: 1,
            max_positions: 2,
        };
        assert_eq!(composition.remaining_positions(5), 0);
    }

    #[test]
    fn prime_shift_rules_respect_exclusions() {
        let rules = &load_default_rules().prime_shifts;
        assert!(!rules.allows(Role::ReliefCook));
    }

    #[test]
    fn missing_path_falls_back_to_default() {
        let rules = load_active_rules(None).unwrap();
        assert_eq!(rules, load_default_rules().clone());
    }
}
