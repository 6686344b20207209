use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::role::Role;

/// Kind of closed-interval absence a resource can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsenceType {
    Vacation,
    Sick,
    Other,
}

/// A closed date interval during which a resource is unavailable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Absence {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub kind: AbsenceType,
    pub comment: Option<String>,
}

impl Absence {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate, kind: AbsenceType) -> Self {
        Self {
            start_date,
            end_date,
            kind,
            comment: None,
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start_date && day <= self.end_date
    }
}

/// A kitchen staff member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: i64,
    pub role: Role,
    /// One entry per weekday, Monday first (matches
    /// `chrono::Weekday::num_days_from_monday`).
    pub availability: [bool; 7],
    pub preferred_shift_codes: Vec<i32>,
    pub undesired_shift_codes: Vec<i32>,
    pub absences: Vec<Absence>,
    pub target_hours: Option<f64>,
    pub is_relief: bool,
}

impl Resource {
    pub fn new(id: i64, role: Role) -> Self {
        Self {
            id,
            role,
            availability: [true; 7],
            preferred_shift_codes: Vec::new(),
            undesired_shift_codes: Vec::new(),
            absences: Vec::new(),
            target_hours: None,
            is_relief: matches!(role, Role::ReliefCook),
        }
    }

    pub fn available_on_weekday(&self, day: NaiveDate) -> bool {
        self.availability[day.weekday().num_days_from_monday() as usize]
    }

    pub fn absence_on(&self, day: NaiveDate) -> Option<&Absence> {
        self.absences.iter().find(|absence| absence.contains(day))
    }

    pub fn is_available_on(&self, day: NaiveDate) -> bool {
        self.available_on_weekday(day) && self.absence_on(day).is_none()
    }

    /// `true` iff `other` overlaps one of this resource's absences. Used to
    /// validate the input invariant that absences do not overlap each other.
    fn absences_are_non_overlapping(absences: &[Absence]) -> bool {
        let mut sorted: Vec<&Absence> = absences.iter().collect();
        sorted.sort_by_key(|a| a.start_date);
        sorted
            .windows(2)
            .all(|pair| pair[0].end_date < pair[1].start_date)
    }

    pub fn validate(&self) -> Result<(), String> {
        if !Self::absences_are_non_overlapping(&self.absences) {
            return Err(format!("resource {} has overlapping absences", self.id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn availability_defaults_to_every_day() {
        let resource = Resource::new(1, Role::Cook);
        for offset in 0..7 {
            let day = date(2024, 11, 4) + chrono::Duration::days(offset);
            assert!(resource.available_on_weekday(day));
        }
    }

    #[test]
    fn absence_blocks_availability_within_window() {
        let mut resource = Resource::new(1, Role::Cook);
        resource.absences.push(Absence::new(
            date(2024, 11, 10),
            date(2024, 11, 12),
            AbsenceType::Vacation,
        ));
        assert!(!resource.is_available_on(date(2024, 11, 11)));
        assert!(resource.is_available_on(date(2024, 11, 13)));
    }

    #[test]
    fn overlapping_absences_fail_validation() {
        let mut resource = Resource::new(1, Role::Cook);
        resource.absences.push(Absence::new(
            date(2024, 11, 1),
            date(2024, 11, 5),
            AbsenceType::Vacation,
        ));
        resource.absences.push(Absence::new(
            date(2024, 11, 4),
            date(2024, 11, 8),
            AbsenceType::Sick,
        ));
        assert!(resource.validate().is_err());
    }
}
