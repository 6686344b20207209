use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Violation severity. Critical violations do not stop the computation but
/// signal the plan is not compliant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// The scope a violation is reported against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationScope {
    Schedule,
    Day,
    Resource,
    Week,
    Month,
}

/// A typed value in a violation's free-form metadata map, replacing the
/// source system's dynamically-typed metadata dict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Int(i64),
    Float(f64),
    Str(String),
    StrList(Vec<String>),
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Int(v)
    }
}
impl From<usize> for MetaValue {
    fn from(v: usize) -> Self {
        MetaValue::Int(v as i64)
    }
}
impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Float(v)
    }
}
impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Str(v.to_string())
    }
}
impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Str(v)
    }
}
impl From<Vec<String>> for MetaValue {
    fn from(v: Vec<String>) -> Self {
        MetaValue::StrList(v)
    }
}

/// A structured rule violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub code: String,
    pub message: String,
    pub severity: Severity,
    pub scope: ViolationScope,
    pub day: Option<NaiveDate>,
    pub resource_id: Option<i64>,
    pub iso_week: Option<String>,
    pub meta: BTreeMap<String, MetaValue>,
}

impl Violation {
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        severity: Severity,
        scope: ViolationScope,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            severity,
            scope,
            day: None,
            resource_id: None,
            iso_week: None,
            meta: BTreeMap::new(),
        }
    }

    pub fn with_day(mut self, day: NaiveDate) -> Self {
        self.day = Some(day);
        self
    }

    pub fn with_resource(mut self, resource_id: i64) -> Self {
        self.resource_id = Some(resource_id);
        self
    }

    pub fn with_iso_week(mut self, iso_year: i32, iso_week: u32) -> Self {
        self.iso_week = Some(format_iso_week(iso_year, iso_week));
        self
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<MetaValue>) -> Self {
        self.meta.insert(key.to_string(), value.into());
        self
    }
}

/// Formats an ISO week key as `YYYY-Www` (zero-padded).
pub fn format_iso_week(iso_year: i32, iso_week: u32) -> String {
    format!("{iso_year}-W{iso_week:02}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_week_is_zero_padded() {
        assert_eq!(format_iso_week(2024, 3), "2024-W03");
        assert_eq!(format_iso_week(2024, 44), "2024-W44");
    }

    #[test]
    fn builder_sets_optional_fields() {
        let v = Violation::new("staffing-shortfall", "msg", Severity::Warning, ViolationScope::Day)
            .with_resource(7)
            .with_meta("assigned", 3usize);
        assert_eq!(v.resource_id, Some(7));
        assert_eq!(v.meta.get("assigned"), Some(&MetaValue::Int(3)));
    }
}
