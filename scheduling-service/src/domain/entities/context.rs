use chrono::NaiveDate;
use shared::{DomainError, DomainResult};

use crate::domain::calendar::{self, Holiday};
use crate::domain::ruleset::RuleSet;

use super::resource::Resource;
use super::shift::Shift;

/// Everything the two engines need to produce a schedule for one month:
/// the resource roster, the shift catalog, the active rule set, and the
/// derived calendar (calendar days, working days, holidays).
#[derive(Debug, Clone)]
pub struct SchedulingContext {
    pub month: String,
    pub year: i32,
    pub month_number: u32,
    pub resources: Vec<Resource>,
    pub shifts: Vec<Shift>,
    pub rules: RuleSet,
    pub holidays: Vec<Holiday>,
    pub calendar_days: Vec<NaiveDate>,
    pub working_days: Vec<NaiveDate>,
}

impl SchedulingContext {
    pub fn new(
        month: impl Into<String>,
        resources: Vec<Resource>,
        shifts: Vec<Shift>,
        rules: RuleSet,
    ) -> DomainResult<Self> {
        let month = month.into();
        let (year, month_number) = calendar::parse_month(&month)?;

        if shifts.is_empty() {
            return Err(DomainError::InvalidInput(
                "shift catalog must not be empty".into(),
            ));
        }
        for shift in &shifts {
            if shift.hours <= 0.0 {
                return Err(DomainError::InvalidInput(format!(
                    "shift {} has non-positive hours ({})",
                    shift.code, shift.hours
                )));
            }
        }

        if resources.is_empty() {
            return Err(DomainError::InvalidInput(
                "resource roster must not be empty".into(),
            ));
        }
        for resource in &resources {
            resource.validate().map_err(DomainError::InvalidInput)?;
        }

        let calendar_days = calendar::month_days(&month)?;
        let holidays = calendar::holidays(year);
        let holiday_dates: Vec<NaiveDate> = holidays.iter().map(|h| h.date).collect();
        let working_days = calendar::working_days(&month, &holiday_dates)?;

        Ok(Self {
            month,
            year,
            month_number,
            resources,
            shifts,
            rules,
            holidays,
            calendar_days,
            working_days,
        })
    }

    pub fn shift_by_code(&self, code: i32) -> Option<&Shift> {
        self.shifts.iter().find(|shift| shift.code == code)
    }

    pub fn resource_by_id(&self, id: i64) -> Option<&Resource> {
        self.resources.iter().find(|resource| resource.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::role::Role;
    use crate::domain::entities::shift::default_shift_catalog;
    use crate::domain::ruleset::load_default_rules;

    fn sample_resources() -> Vec<Resource> {
        vec![Resource::new(1, Role::Cook), Resource::new(2, Role::PotWasher)]
    }

    #[test]
    fn rejects_malformed_month() {
        let result = SchedulingContext::new(
            "not-a-month",
            sample_resources(),
            default_shift_catalog(),
            load_default_rules().clone(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_empty_resource_roster() {
        let result = SchedulingContext::new(
            "2024-11",
            Vec::new(),
            default_shift_catalog(),
            load_default_rules().clone(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_empty_shift_catalog() {
        let result = SchedulingContext::new(
            "2024-11",
            sample_resources(),
            Vec::new(),
            load_default_rules().clone(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_non_positive_shift_hours() {
        let mut shifts = default_shift_catalog();
        shifts[0].hours = 0.0;
        let result = SchedulingContext::new(
            "2024-11",
            sample_resources(),
            shifts,
            load_default_rules().clone(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn valid_context_derives_calendar() {
        let context = SchedulingContext::new(
            "2024-11",
            sample_resources(),
            default_shift_catalog(),
            load_default_rules().clone(),
        )
        .unwrap();
        assert_eq!(context.calendar_days.len(), 30);
        assert!(context.working_days.len() < context.calendar_days.len());
    }
}
