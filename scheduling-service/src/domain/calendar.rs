use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use shared::{DomainError, DomainResult};

/// A public holiday: a stable code, the concrete date it falls on in a
/// given year, and a display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holiday {
    pub code: String,
    pub date: NaiveDate,
    pub name: String,
}

/// Parses a `YYYY-MM` month string into `(year, month)`. A malformed month
/// string is a fatal caller error.
pub fn parse_month(month: &str) -> DomainResult<(i32, u32)> {
    let parts: Vec<&str> = month.split('-').collect();
    if parts.len() != 2 {
        return Err(DomainError::InvalidInput(format!(
            "malformed month '{month}', expected YYYY-MM"
        )));
    }
    let year: i32 = parts[0]
        .parse()
        .map_err(|_| DomainError::InvalidInput(format!("malformed month '{month}'")))?;
    let month_number: u32 = parts[1]
        .parse()
        .map_err(|_| DomainError::InvalidInput(format!("malformed month '{month}'")))?;
    if !(1..=12).contains(&month_number) {
        return Err(DomainError::InvalidInput(format!(
            "malformed month '{month}', month must be 1-12"
        )));
    }
    Ok((year, month_number))
}

/// Every calendar day of the given `YYYY-MM` month, in order.
pub fn month_days(month: &str) -> DomainResult<Vec<NaiveDate>> {
    let (year, month_number) = parse_month(month)?;
    let first = NaiveDate::from_ymd_opt(year, month_number, 1)
        .ok_or_else(|| DomainError::InvalidInput(format!("malformed month '{month}'")))?;
    let mut days = Vec::new();
    let mut day = first;
    while day.month() == month_number {
        days.push(day);
        day += Duration::days(1);
    }
    Ok(days)
}

/// The subsequence of `month_days` excluding Saturdays, Sundays, and the
/// given holiday dates.
pub fn working_days(month: &str, holidays: &[NaiveDate]) -> DomainResult<Vec<NaiveDate>> {
    let days = month_days(month)?;
    Ok(days
        .into_iter()
        .filter(|day| {
            !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) && !holidays.contains(day)
        })
        .collect())
}

/// Gregorian Easter Sunday via the Anonymous/Meeus-Jones-Butcher algorithm.
pub fn easter_sunday(year: i32) -> NaiveDate {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = 1 + (h + l - 7 * m + 114) % 31;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32).expect("valid Easter date")
}

fn third_monday_of_september(year: i32) -> NaiveDate {
    let september_first = NaiveDate::from_ymd_opt(year, 9, 1).expect("valid date");
    let offset = (7 - september_first.weekday().num_days_from_monday()) % 7;
    let first_monday = september_first + Duration::days(offset as i64);
    first_monday + Duration::weeks(2)
}

/// The fixed/Easter-derived public holiday set for the given year, ported
/// from the original canton-specific holiday service.
pub fn holidays(year: i32) -> Vec<Holiday> {
    let easter = easter_sunday(year);
    let good_friday = easter - Duration::days(2);
    let easter_monday = easter + Duration::days(1);
    let ascension = easter + Duration::days(39);
    let whit_monday = easter + Duration::days(50);
    let federal_fast_monday = third_monday_of_september(year);

    vec![
        Holiday {
            code: "new_years_day".into(),
            date: NaiveDate::from_ymd_opt(year, 1, 1).unwrap(),
            name: "New Year's Day".into(),
        },
        Holiday {
            code: "berchtolds_day".into(),
            date: NaiveDate::from_ymd_opt(year, 1, 2).unwrap(),
            name: "Berchtold Day".into(),
        },
        Holiday {
            code: "vaud_independence_day".into(),
            date: NaiveDate::from_ymd_opt(year, 1, 24).unwrap(),
            name: "Vaud Independence Day".into(),
        },
        Holiday {
            code: "good_friday".into(),
            date: good_friday,
            name: "Good Friday".into(),
        },
        Holiday {
            code: "easter_monday".into(),
            date: easter_monday,
            name: "Easter Monday".into(),
        },
        Holiday {
            code: "ascension_day".into(),
            date: ascension,
            name: "Ascension Day".into(),
        },
        Holiday {
            code: "whit_monday".into(),
            date: whit_monday,
            name: "Whit Monday".into(),
        },
        Holiday {
            code: "swiss_national_day".into(),
            date: NaiveDate::from_ymd_opt(year, 8, 1).unwrap(),
            name: "Swiss National Day".into(),
        },
        Holiday {
            code: "federal_fast_monday".into(),
            date: federal_fast_monday,
            name: "Federal Fast Monday".into(),
        },
        Holiday {
            code: "christmas_day".into(),
            date: NaiveDate::from_ymd_opt(year, 12, 25).unwrap(),
            name: "Christmas Day".into(),
        },
        Holiday {
            code: "st_stephens_day".into(),
            date: NaiveDate::from_ymd_opt(year, 12, 26).unwrap(),
            name: "St. Stephen's Day".into(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_month() {
        assert!(parse_month("2024/11").is_err());
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("november").is_err());
    }

    #[test]
    fn february_day_count_matches_leap_rule() {
        assert_eq!(month_days("2024-02").unwrap().len(), 29);
        assert_eq!(month_days("2023-02").unwrap().len(), 28);
    }

    #[test]
    fn single_day_month_edge_case() {
        // Not a real single-day month, but verifies the first/last day bounds.
        let days = month_days("2024-11").unwrap();
        assert_eq!(days.first().unwrap().day(), 1);
        assert_eq!(days.last().unwrap().day(), 30);
    }

    #[test]
    fn working_days_excludes_weekends_and_holidays() {
        let holiday_dates: Vec<NaiveDate> = holidays(2024).iter().map(|h| h.date).collect();
        let days = working_days("2024-12", &holiday_dates).unwrap();
        assert!(!days.contains(&NaiveDate::from_ymd_opt(2024, 12, 25).unwrap()));
        assert!(days.iter().all(|d| !matches!(
            d.weekday(),
            Weekday::Sat | Weekday::Sun
        )));
    }

    #[test]
    fn easter_known_values() {
        assert_eq!(easter_sunday(2024), NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
        assert_eq!(easter_sunday(2025), NaiveDate::from_ymd_opt(2025, 4, 20).unwrap());
    }

    #[test]
    fn holiday_set_has_eleven_entries() {
        assert_eq!(holidays(2024).len(), 11);
    }
}
