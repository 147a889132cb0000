//! Recurrence points: partial calendar records bounding a blackout window
//!
//! A recurrence point is a cron-like record of five optional fields. An
//! absent field larger than the largest present one means "any value"; an
//! absent minute means 0. `day_of_week` and `day_of_month` are mutually
//! exclusive.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Recurrence granularity of a blackout window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrenceKind {
    Daily,
    Weekly,
    Monthly,
    Annual,
}

impl fmt::Display for RecurrenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecurrenceKind::Daily => write!(f, "daily"),
            RecurrenceKind::Weekly => write!(f, "weekly"),
            RecurrenceKind::Monthly => write!(f, "monthly"),
            RecurrenceKind::Annual => write!(f, "annual"),
        }
    }
}

/// Partial calendar record.
///
/// Fields are kept signed and unchecked so that out-of-range values survive
/// parsing and are reported by window validation instead of by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecurrencePoint {
    /// 0 - 59
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minute: Option<i32>,
    /// 0 - 23, required
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<i32>,
    /// 0 - 7; 0 and 7 are Sunday, 1 is Monday
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_week: Option<i32>,
    /// 1 - 31
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<i32>,
    /// 1 - 12
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<i32>,
}

impl RecurrencePoint {
    /// Every day at `hour:minute`
    pub fn daily(hour: i32, minute: i32) -> Self {
        Self {
            hour: Some(hour),
            minute: Some(minute),
            ..Default::default()
        }
    }

    /// Every week on `day_of_week` at `hour:minute`
    pub fn weekly(day_of_week: i32, hour: i32, minute: i32) -> Self {
        Self {
            day_of_week: Some(day_of_week),
            ..Self::daily(hour, minute)
        }
    }

    /// Every month on `day_of_month` at `hour:minute`
    pub fn monthly(day_of_month: i32, hour: i32, minute: i32) -> Self {
        Self {
            day_of_month: Some(day_of_month),
            ..Self::daily(hour, minute)
        }
    }

    /// Every year on `month`/`day_of_month` at `hour:minute`
    pub fn annual(month: i32, day_of_month: i32, hour: i32, minute: i32) -> Self {
        Self {
            month: Some(month),
            day_of_month: Some(day_of_month),
            ..Self::daily(hour, minute)
        }
    }

    /// Determine the recurrence kind from which fields are present.
    ///
    /// Returns None when the combination matches no kind (including a
    /// missing hour).
    pub fn classify(&self) -> Option<RecurrenceKind> {
        self.hour?;
        match (self.month, self.day_of_week, self.day_of_month) {
            (None, None, None) => Some(RecurrenceKind::Daily),
            (None, Some(_), None) => Some(RecurrenceKind::Weekly),
            (None, None, Some(_)) => Some(RecurrenceKind::Monthly),
            (Some(_), None, Some(_)) => Some(RecurrenceKind::Annual),
            _ => None,
        }
    }

    /// Time of day this point falls on; a missing minute is 0
    pub fn time_of_day(&self) -> Option<NaiveTime> {
        let hour = u32::try_from(self.hour?).ok()?;
        let minute = u32::try_from(self.minute.unwrap_or(0)).ok()?;
        NaiveTime::from_hms_opt(hour, minute, 0)
    }

    /// Weekday this point falls on, with 0 and 7 both meaning Sunday
    pub fn weekday(&self) -> Option<Weekday> {
        match self.day_of_week? {
            0 | 7 => Some(Weekday::Sun),
            1 => Some(Weekday::Mon),
            2 => Some(Weekday::Tue),
            3 => Some(Weekday::Wed),
            4 => Some(Weekday::Thu),
            5 => Some(Weekday::Fri),
            6 => Some(Weekday::Sat),
            _ => None,
        }
    }
}

impl fmt::Display for RecurrencePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn field(f: &mut fmt::Formatter<'_>, value: Option<i32>) -> fmt::Result {
            match value {
                Some(v) => write!(f, "{}", v),
                None => write!(f, "*"),
            }
        }
        // cron field order: minute hour day-of-month month day-of-week
        field(f, self.minute)?;
        write!(f, " ")?;
        field(f, self.hour)?;
        write!(f, " ")?;
        field(f, self.day_of_month)?;
        write!(f, " ")?;
        field(f, self.month)?;
        write!(f, " ")?;
        field(f, self.day_of_week)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_kinds() {
        assert_eq!(RecurrencePoint::daily(14, 30).classify(), Some(RecurrenceKind::Daily));
        assert_eq!(RecurrencePoint::weekly(4, 3, 0).classify(), Some(RecurrenceKind::Weekly));
        assert_eq!(RecurrencePoint::monthly(15, 20, 0).classify(), Some(RecurrenceKind::Monthly));
        assert_eq!(RecurrencePoint::annual(12, 23, 0, 0).classify(), Some(RecurrenceKind::Annual));
    }

    #[test]
    fn test_classify_requires_hour() {
        let point = RecurrencePoint {
            minute: Some(30),
            ..Default::default()
        };
        assert_eq!(point.classify(), None);
    }

    #[test]
    fn test_classify_rejects_unknown_combinations() {
        // month without day of month
        let month_only = RecurrencePoint {
            month: Some(7),
            ..RecurrencePoint::daily(14, 0)
        };
        assert_eq!(month_only.classify(), None);

        // both day fields
        let both_days = RecurrencePoint {
            day_of_week: Some(1),
            ..RecurrencePoint::annual(7, 1, 14, 0)
        };
        assert_eq!(both_days.classify(), None);

        // month with day of week
        let month_and_weekday = RecurrencePoint {
            month: Some(7),
            ..RecurrencePoint::weekly(1, 14, 0)
        };
        assert_eq!(month_and_weekday.classify(), None);
    }

    #[test]
    fn test_missing_minute_is_zero() {
        let point = RecurrencePoint {
            hour: Some(3),
            ..Default::default()
        };
        assert_eq!(point.time_of_day(), NaiveTime::from_hms_opt(3, 0, 0));
    }

    #[test]
    fn test_sunday_has_two_spellings() {
        assert_eq!(RecurrencePoint::weekly(0, 1, 0).weekday(), Some(Weekday::Sun));
        assert_eq!(RecurrencePoint::weekly(7, 1, 0).weekday(), Some(Weekday::Sun));
        assert_eq!(RecurrencePoint::weekly(4, 1, 0).weekday(), Some(Weekday::Thu));
        assert_eq!(RecurrencePoint::weekly(8, 1, 0).weekday(), None);
    }

    #[test]
    fn test_deserialize_wire_shape() {
        let point: RecurrencePoint =
            serde_json::from_str(r#"{ "hour": 0, "day_of_month": 23, "month": 12 }"#).unwrap();
        assert_eq!(point, RecurrencePoint {
            hour: Some(0),
            day_of_month: Some(23),
            month: Some(12),
            ..Default::default()
        });
        assert_eq!(point.to_string(), "* 0 23 12 *");
    }
}
