use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::resource::AbsenceType;

/// A single day-by-day planning entry. Exactly one of `shift_code` /
/// `absence_type` is set, except on a pure rest day where both are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub resource_id: i64,
    pub date: NaiveDate,
    pub shift_code: Option<i32>,
    pub absence_type: Option<AbsenceType>,
    pub comment: Option<String>,
}

impl Assignment {
    pub fn rest_day(resource_id: i64, date: NaiveDate) -> Self {
        Self {
            resource_id,
            date,
            shift_code: None,
            absence_type: None,
            comment: None,
        }
    }

    pub fn shift(resource_id: i64, date: NaiveDate, shift_code: i32) -> Self {
        Self {
            resource_id,
            date,
            shift_code: Some(shift_code),
            absence_type: None,
            comment: None,
        }
    }

    pub fn shift_with_comment(
        resource_id: i64,
        date: NaiveDate,
        shift_code: i32,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            resource_id,
            date,
            shift_code: Some(shift_code),
            absence_type: None,
            comment: Some(comment.into()),
        }
    }

    pub fn absence(resource_id: i64, date: NaiveDate, absence_type: AbsenceType) -> Self {
        Self {
            resource_id,
            date,
            shift_code: None,
            absence_type: Some(absence_type),
            comment: None,
        }
    }

    pub fn is_work(&self) -> bool {
        self.shift_code.is_some()
    }
}

/// Sorts assignments by `(date, resource_id)` as required for output.
pub fn sort_assignments(entries: &mut [Assignment]) {
    entries.sort_by(|a, b| a.date.cmp(&b.date).then(a.resource_id.cmp(&b.resource_id)));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn sort_orders_by_date_then_resource() {
        let mut entries = vec![
            Assignment::rest_day(2, date(2024, 11, 1)),
            Assignment::rest_day(1, date(2024, 11, 1)),
            Assignment::rest_day(1, date(2024, 10, 31)),
        ];
        sort_assignments(&mut entries);
        assert_eq!(entries[0].date, date(2024, 10, 31));
        assert_eq!(entries[1].resource_id, 1);
        assert_eq!(entries[2].resource_id, 2);
    }
}
