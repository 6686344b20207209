use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use super::role::Role;

/// A single shift definition: integer code, description, time window and
/// quarter-hour-precision duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shift {
    pub code: i32,
    pub description: String,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub hours: f64,
}

impl Shift {
    pub fn new(code: i32, description: &str, start: &str, end: &str, hours: f64) -> Self {
        Self {
            code,
            description: description.to_string(),
            start: NaiveTime::parse_from_str(start, "%H:%M").expect("valid HH:MM"),
            end: NaiveTime::parse_from_str(end, "%H:%M").expect("valid HH:MM"),
            hours,
        }
    }
}

/// Maps a prime shift code to the base shift code it shortens.
pub fn prime_shift_base(code: i32) -> Option<i32> {
    match code {
        11 => Some(1),
        18 => Some(8),
        101 => Some(10),
        _ => None,
    }
}

/// Maps a base shift code to its prime (shorter) variant, if one exists.
pub fn prime_variant_of(base_code: i32) -> Option<i32> {
    match base_code {
        1 => Some(11),
        8 => Some(18),
        10 => Some(101),
        _ => None,
    }
}

/// Pot-washer "early" shift family (base + prime).
pub const POT_WASHER_EARLY: [i32; 2] = [8, 18];
/// Pot-washer "late" shift family (base + prime).
pub const POT_WASHER_LATE: [i32; 2] = [10, 101];

/// The fixed subset of shift codes each role is allowed to work.
pub fn role_allowed_shift_codes(role: Role) -> &'static [i32] {
    match role {
        Role::Cook | Role::ReliefCook => &[1, 4, 11],
        Role::KitchenAssistant | Role::Apprentice => &[1, 4, 8, 11, 18],
        Role::PotWasher => &[8, 10, 18, 101],
    }
}

/// The reference shift catalog used by the default rule snapshot.
pub fn default_shift_catalog() -> Vec<Shift> {
    vec![
        Shift::new(1, "Early cook shift", "07:00", "16:15", 9.25),
        Shift::new(4, "Long double shift", "07:15", "19:15", 12.00),
        Shift::new(8, "Early support shift", "08:00", "17:15", 9.25),
        Shift::new(10, "Late support shift", "10:15", "19:30", 9.25),
        Shift::new(11, "Prime of shift 1", "08:00", "16:15", 8.25),
        Shift::new(18, "Prime of shift 8", "09:00", "17:15", 8.25),
        Shift::new(101, "Prime of shift 10", "11:15", "19:30", 8.25),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prime_mapping_is_strictly_shorter() {
        let catalog = default_shift_catalog();
        let hours_of = |code: i32| catalog.iter().find(|s| s.code == code).unwrap().hours;
        for (prime, base) in [(11, 1), (18, 8), (101, 10)] {
            assert_eq!(prime_shift_base(prime), Some(base));
            assert!(hours_of(prime) < hours_of(base));
        }
    }

    #[test]
    fn prime_variant_is_inverse_of_base() {
        for base in [1, 8, 10] {
            let prime = prime_variant_of(base).unwrap();
            assert_eq!(prime_shift_base(prime), Some(base));
        }
    }

    #[test]
    fn pot_washer_allowed_codes_cover_both_families() {
        let allowed = role_allowed_shift_codes(Role::PotWasher);
        for code in POT_WASHER_EARLY.iter().chain(POT_WASHER_LATE.iter()) {
            assert!(allowed.contains(code));
        }
    }
}
