//! Calendar feature derivation for the delay model
//!
//! Parses the `timestamp` column and appends `month`, `day`, `day_of_week`,
//! `is_weekend` and `month_name`. Components are taken in the timestamp's own
//! offset; naive timestamps are used as-is.

use crate::error::{InputIssue, PredictError, Result};
use crate::models::{Column, ValidatedRecords};
use crate::schema::TIMESTAMP_FIELD;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

pub const MONTH_FEATURE: &str = "month";
pub const DAY_FEATURE: &str = "day";
pub const DAY_OF_WEEK_FEATURE: &str = "day_of_week";
pub const IS_WEEKEND_FEATURE: &str = "is_weekend";
pub const MONTH_NAME_FEATURE: &str = "month_name";

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Calendar features of a single instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeFeatures {
    pub month: u32,
    pub day: u32,
    /// Monday = 0 ... Sunday = 6
    pub day_of_week: u32,
    pub is_weekend: bool,
    pub month_name: &'static str,
}

impl TimeFeatures {
    pub fn from_datetime(dt: &NaiveDateTime) -> Self {
        let day_of_week = dt.weekday().num_days_from_monday();
        Self {
            month: dt.month(),
            day: dt.day(),
            day_of_week,
            is_weekend: day_of_week >= 5,
            month_name: MONTH_NAMES[dt.month0() as usize],
        }
    }
}

/// Parse an ISO-8601 date/time, keeping wall-clock time in its stated offset
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, fmt) {
            return Some(dt.naive_local());
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Derives calendar features from the timestamp column
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeFeatureDeriver;

impl TimeFeatureDeriver {
    pub fn new() -> Self {
        Self
    }

    /// Parse `timestamp` in place and append the five derived columns.
    ///
    /// Fails on the first value that does not parse. Nothing is appended
    /// unless every row parses.
    pub fn derive(&self, records: &mut ValidatedRecords) -> Result<()> {
        let parsed = match records.column(TIMESTAMP_FIELD) {
            Some(Column::Categorical(raw)) => raw
                .iter()
                .map(|v| {
                    parse_timestamp(v).ok_or_else(|| {
                        PredictError::invalid(
                            TIMESTAMP_FIELD,
                            InputIssue::InvalidTimestamp(v.clone()),
                        )
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Some(Column::Timestamp(parsed)) => parsed.clone(),
            Some(other) => {
                return Err(PredictError::invalid(
                    TIMESTAMP_FIELD,
                    InputIssue::TypeMismatch(format!(
                        "expected timestamp strings, got {} values",
                        other.type_name()
                    )),
                ))
            }
            None => return Err(PredictError::invalid(TIMESTAMP_FIELD, InputIssue::Missing)),
        };

        let features: Vec<TimeFeatures> = parsed.iter().map(TimeFeatures::from_datetime).collect();

        let columns = &mut records.columns;
        columns.insert(
            MONTH_FEATURE.to_string(),
            Column::Integer(features.iter().map(|f| f.month as i64).collect()),
        );
        columns.insert(
            DAY_FEATURE.to_string(),
            Column::Integer(features.iter().map(|f| f.day as i64).collect()),
        );
        columns.insert(
            DAY_OF_WEEK_FEATURE.to_string(),
            Column::Integer(features.iter().map(|f| f.day_of_week as i64).collect()),
        );
        columns.insert(
            IS_WEEKEND_FEATURE.to_string(),
            Column::Integer(features.iter().map(|f| f.is_weekend as i64).collect()),
        );
        columns.insert(
            MONTH_NAME_FEATURE.to_string(),
            Column::Categorical(features.iter().map(|f| f.month_name.to_string()).collect()),
        );
        columns.insert(TIMESTAMP_FIELD.to_string(), Column::Timestamp(parsed));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn features_of(value: &str) -> TimeFeatures {
        TimeFeatures::from_datetime(&parse_timestamp(value).unwrap())
    }

    fn records_with(timestamps: &[&str]) -> ValidatedRecords {
        let mut columns = HashMap::new();
        columns.insert(
            TIMESTAMP_FIELD.to_string(),
            Column::Categorical(timestamps.iter().map(|s| s.to_string()).collect()),
        );
        ValidatedRecords {
            rows: timestamps.len(),
            columns,
        }
    }

    #[test]
    fn test_friday_new_year() {
        let f = features_of("2021-01-01T00:00:00");
        assert_eq!(
            f,
            TimeFeatures {
                month: 1,
                day: 1,
                day_of_week: 4,
                is_weekend: false,
                month_name: "January",
            }
        );
    }

    #[test]
    fn test_saturday_is_weekend() {
        let f = features_of("2021-01-02T00:00:00");
        assert_eq!(f.day_of_week, 5);
        assert!(f.is_weekend);
    }

    #[test]
    fn test_sunday_and_monday() {
        assert_eq!(features_of("2021-01-03T12:30:45").day_of_week, 6);
        let monday = features_of("2021-01-04T18:45:15");
        assert_eq!(monday.day_of_week, 0);
        assert!(!monday.is_weekend);
    }

    #[test]
    fn test_accepted_formats() {
        for value in [
            "2021-01-01 00:00:00",
            "2021-01-01T00:00:00.250",
            "2021-01-01T00:00",
            "2021-01-01",
            "2021-01-01T00:00:00Z",
            "2021-01-01T00:00:00+02:00",
            "2021-01-01T00:00:00+0000",
        ] {
            assert!(parse_timestamp(value).is_some(), "failed to parse {}", value);
        }
    }

    #[test]
    fn test_offset_keeps_stated_wall_clock() {
        // 23:30 on Dec 31st at -05:00 is already Jan 1st in UTC
        let f = features_of("2020-12-31T23:30:00-05:00");
        assert_eq!(f.month, 12);
        assert_eq!(f.day, 31);
        assert_eq!(f.month_name, "December");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2021-13-01T00:00:00").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_derive_appends_columns() {
        let mut records = records_with(&["2021-01-01T00:00:00", "2021-07-17 06:15:30"]);
        TimeFeatureDeriver::new().derive(&mut records).unwrap();

        assert_eq!(records.column(MONTH_FEATURE), Some(&Column::Integer(vec![1, 7])));
        assert_eq!(records.column(DAY_FEATURE), Some(&Column::Integer(vec![1, 17])));
        assert_eq!(
            records.column(DAY_OF_WEEK_FEATURE),
            Some(&Column::Integer(vec![4, 5]))
        );
        assert_eq!(
            records.column(IS_WEEKEND_FEATURE),
            Some(&Column::Integer(vec![0, 1]))
        );
        assert_eq!(
            records.column(MONTH_NAME_FEATURE),
            Some(&Column::Categorical(vec![
                "January".to_string(),
                "July".to_string()
            ]))
        );
        assert!(matches!(
            records.column(TIMESTAMP_FIELD),
            Some(Column::Timestamp(_))
        ));
    }

    #[test]
    fn test_derive_fails_on_bad_row() {
        let mut records = records_with(&["2021-01-01T00:00:00", "not a date"]);
        let err = TimeFeatureDeriver::new().derive(&mut records).unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(err.field(), Some(TIMESTAMP_FIELD));
        assert!(records.column(MONTH_FEATURE).is_none());
    }

    #[test]
    fn test_month_names_are_english() {
        for (i, name) in MONTH_NAMES.iter().enumerate() {
            let ts = format!("2022-{:02}-15T00:00:00", i + 1);
            assert_eq!(features_of(&ts).month_name, *name);
        }
    }
}
