//! Blackout windows: recurring intervals during which a rule's firing is withheld
//!
//! A window is bounded by two recurrence points of the same kind. Every
//! occurrence is half-open: the start instant is inside the window, the end
//! instant is not. Windows may wrap the natural boundary of their kind
//! (midnight, week end, month end, year end).
//!
//! Calendar arithmetic happens on wall-clock readings in the window's zone.
//! A day of month that does not exist in a given month (the 31st in April,
//! February 29 outside leap years) falls on that month's last day.

use chrono::{
    DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Weekday,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::{RecurrenceKind, RecurrencePoint, TimezoneMode};

/// Leap year used to check annual dates, so that February 29 is legal
const LEAP_REFERENCE_YEAR: i32 = 2000;

/// Which matches are released when a blackout ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    /// Every withheld match, in order
    #[default]
    All,
    /// Only the first withheld match
    First,
    /// Only the last withheld match
    Last,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::All => write!(f, "all"),
            Trigger::First => write!(f, "first"),
            Trigger::Last => write!(f, "last"),
        }
    }
}

/// Which bound of a window a validation error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Start,
    End,
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Boundary::Start => write!(f, "start_time"),
            Boundary::End => write!(f, "end_time"),
        }
    }
}

/// Blackout window errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    #[error("{0} must be provided")]
    MissingBoundary(Boundary),

    #[error("{0}: hour is required")]
    MissingHour(Boundary),

    #[error("{boundary}: {field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        boundary: Boundary,
        field: &'static str,
        value: i32,
        min: i32,
        max: i32,
    },

    #[error("{0}: day_of_week and day_of_month are mutually exclusive")]
    ConflictingDays(Boundary),

    #[error("{boundary}: fields {point} match no schedule type")]
    UnknownKind {
        boundary: Boundary,
        point: RecurrencePoint,
    },

    #[error("start_time is {start} but end_time is {end}; both must be the same schedule type")]
    KindMismatch {
        start: RecurrenceKind,
        end: RecurrenceKind,
    },

    #[error("{boundary}: {month}/{day} is not a valid date")]
    ImpossibleDate {
        boundary: Boundary,
        month: i32,
        day: i32,
    },

    #[error("calendar arithmetic failed: {0}")]
    Internal(String),
}

/// Month and day within a year, ordered year-agnostically
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct MonthDay {
    month: u32,
    day: u32,
}

/// Validated pair of bounds, one variant per recurrence kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Schedule {
    Daily {
        start: NaiveTime,
        end: NaiveTime,
    },
    Weekly {
        start_day: Weekday,
        start: NaiveTime,
        end_day: Weekday,
        end: NaiveTime,
    },
    Monthly {
        start_day: u32,
        start: NaiveTime,
        end_day: u32,
        end: NaiveTime,
    },
    Annual {
        start_date: MonthDay,
        start: NaiveTime,
        end_date: MonthDay,
        end: NaiveTime,
    },
}

/// A validated, immutable blackout window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlackoutWindow {
    start_point: RecurrencePoint,
    end_point: RecurrencePoint,
    schedule: Schedule,
    trigger: Trigger,
    timezone: TimezoneMode,
}

/// Validate a pair of recurrence points and return their common kind.
///
/// Checks run in a fixed order and stop at the first violation: presence of
/// both bounds, numeric ranges, mutually exclusive day fields, schedule
/// type of each bound, matching types, and for annual windows that both
/// dates exist in a leap year.
pub fn validate_bounds(
    start: Option<&RecurrencePoint>,
    end: Option<&RecurrencePoint>,
) -> Result<RecurrenceKind, WindowError> {
    let start = start.ok_or(WindowError::MissingBoundary(Boundary::Start))?;
    let end = end.ok_or(WindowError::MissingBoundary(Boundary::End))?;

    check_ranges(start, Boundary::Start)?;
    check_ranges(end, Boundary::End)?;

    let start_kind = classify(start, Boundary::Start)?;
    let end_kind = classify(end, Boundary::End)?;
    if start_kind != end_kind {
        return Err(WindowError::KindMismatch {
            start: start_kind,
            end: end_kind,
        });
    }

    if start_kind == RecurrenceKind::Annual {
        check_annual_date(start, Boundary::Start)?;
        check_annual_date(end, Boundary::End)?;
    }

    Ok(start_kind)
}

fn check_ranges(point: &RecurrencePoint, boundary: Boundary) -> Result<(), WindowError> {
    check_field(boundary, "minute", point.minute, 0, 59)?;
    if point.hour.is_none() {
        return Err(WindowError::MissingHour(boundary));
    }
    let fields = [
        ("hour", point.hour, 0, 23),
        ("month", point.month, 1, 12),
        ("day_of_month", point.day_of_month, 1, 31),
        ("day_of_week", point.day_of_week, 0, 7),
    ];
    for (field, value, min, max) in fields {
        check_field(boundary, field, value, min, max)?;
    }
    Ok(())
}

fn check_field(
    boundary: Boundary,
    field: &'static str,
    value: Option<i32>,
    min: i32,
    max: i32,
) -> Result<(), WindowError> {
    match value {
        Some(value) if value < min || value > max => Err(WindowError::OutOfRange {
            boundary,
            field,
            value,
            min,
            max,
        }),
        _ => Ok(()),
    }
}

fn classify(point: &RecurrencePoint, boundary: Boundary) -> Result<RecurrenceKind, WindowError> {
    if point.day_of_week.is_some() && point.day_of_month.is_some() {
        return Err(WindowError::ConflictingDays(boundary));
    }
    point.classify().ok_or(WindowError::UnknownKind {
        boundary,
        point: *point,
    })
}

fn check_annual_date(point: &RecurrencePoint, boundary: Boundary) -> Result<(), WindowError> {
    let month = point.month.unwrap_or(0);
    let day = point.day_of_month.unwrap_or(0);
    let exists = u32::try_from(month)
        .ok()
        .zip(u32::try_from(day).ok())
        .and_then(|(m, d)| NaiveDate::from_ymd_opt(LEAP_REFERENCE_YEAR, m, d))
        .is_some();
    if exists {
        Ok(())
    } else {
        Err(WindowError::ImpossibleDate {
            boundary,
            month,
            day,
        })
    }
}

fn internal(what: &str) -> WindowError {
    WindowError::Internal(what.to_string())
}

fn time_of(point: &RecurrencePoint) -> Result<NaiveTime, WindowError> {
    point.time_of_day().ok_or_else(|| internal("time of day"))
}

fn day_of_month(point: &RecurrencePoint) -> Result<u32, WindowError> {
    point
        .day_of_month
        .and_then(|d| u32::try_from(d).ok())
        .ok_or_else(|| internal("day of month"))
}

fn month_day(point: &RecurrencePoint) -> Result<MonthDay, WindowError> {
    let month = point
        .month
        .and_then(|m| u32::try_from(m).ok())
        .ok_or_else(|| internal("month"))?;
    Ok(MonthDay {
        month,
        day: day_of_month(point)?,
    })
}

impl Schedule {
    fn build(
        kind: RecurrenceKind,
        start: &RecurrencePoint,
        end: &RecurrencePoint,
    ) -> Result<Self, WindowError> {
        let schedule = match kind {
            RecurrenceKind::Daily => Schedule::Daily {
                start: time_of(start)?,
                end: time_of(end)?,
            },
            RecurrenceKind::Weekly => Schedule::Weekly {
                start_day: start.weekday().ok_or_else(|| internal("start weekday"))?,
                start: time_of(start)?,
                end_day: end.weekday().ok_or_else(|| internal("end weekday"))?,
                end: time_of(end)?,
            },
            RecurrenceKind::Monthly => Schedule::Monthly {
                start_day: day_of_month(start)?,
                start: time_of(start)?,
                end_day: day_of_month(end)?,
                end: time_of(end)?,
            },
            RecurrenceKind::Annual => Schedule::Annual {
                start_date: month_day(start)?,
                start: time_of(start)?,
                end_date: month_day(end)?,
                end: time_of(end)?,
            },
        };
        Ok(schedule)
    }

    fn kind(&self) -> RecurrenceKind {
        match self {
            Schedule::Daily { .. } => RecurrenceKind::Daily,
            Schedule::Weekly { .. } => RecurrenceKind::Weekly,
            Schedule::Monthly { .. } => RecurrenceKind::Monthly,
            Schedule::Annual { .. } => RecurrenceKind::Annual,
        }
    }

    /// Whether the wall-clock reading `t` lies inside an occurrence
    fn contains(&self, t: NaiveDateTime) -> Option<bool> {
        match *self {
            Schedule::Daily { start, end } => {
                let time = t.time();
                if start <= end {
                    Some(time >= start && time < end)
                } else {
                    // Crosses midnight (e.g., 22:00 - 02:00)
                    Some(time >= start || time < end)
                }
            }
            Schedule::Weekly {
                start_day,
                start,
                end_day,
                end,
            } => {
                let anchor = previous_or_same(t.date(), start_day)?;
                let (mut window_start, mut window_end) =
                    weekly_occurrence(anchor, start_day, start, end_day, end)?;
                if t < window_start {
                    window_start = window_start.checked_sub_days(Days::new(7))?;
                    window_end = window_end.checked_sub_days(Days::new(7))?;
                }
                Some(window_start <= t && t < window_end)
            }
            Schedule::Monthly { .. } | Schedule::Annual { .. } => {
                // Only occurrences starting in this cycle or the previous one can reach t
                let cycle = self.cycle(t)?;
                for index in [cycle.checked_sub(1)?, cycle] {
                    let (window_start, window_end) = self.occurrence(index)?;
                    if window_start <= t && t < window_end {
                        return Some(true);
                    }
                }
                Some(false)
            }
        }
    }

    /// End of the current or upcoming occurrence, strictly after `t`
    fn next_end(&self, t: NaiveDateTime) -> Option<NaiveDateTime> {
        match *self {
            Schedule::Daily { end, .. } => {
                let today = t.date();
                if t.time() < end {
                    Some(today.and_time(end))
                } else {
                    Some(today.succ_opt()?.and_time(end))
                }
            }
            Schedule::Weekly {
                start_day,
                start,
                end_day,
                end,
            } => {
                let anchor = previous_or_same(t.date(), start_day)?;
                let (_, candidate) = weekly_occurrence(anchor, start_day, start, end_day, end)?;
                if candidate <= t {
                    candidate.checked_add_days(Days::new(7))
                } else {
                    Some(candidate)
                }
            }
            Schedule::Monthly { .. } | Schedule::Annual { .. } => {
                let cycle = self.cycle(t)?;
                let mut empty_end = None;
                for index in cycle.checked_sub(1)?..=cycle.checked_add(3)? {
                    let (window_start, window_end) = self.occurrence(index)?;
                    if window_end <= t {
                        continue;
                    }
                    if window_start < window_end {
                        return Some(window_end);
                    }
                    empty_end.get_or_insert(window_end);
                }
                // Every occurrence is empty (same day, start after end)
                empty_end
            }
        }
    }

    /// Cycle holding `t`: months since year 0 for monthly windows, the year
    /// for annual ones
    fn cycle(&self, t: NaiveDateTime) -> Option<i32> {
        match self {
            Schedule::Monthly { .. } => {
                t.year().checked_mul(12)?.checked_add(t.month0() as i32)
            }
            Schedule::Annual { .. } => Some(t.year()),
            Schedule::Daily { .. } | Schedule::Weekly { .. } => None,
        }
    }

    /// Occurrence starting in cycle `index`. A wrapping window ends in the
    /// following cycle. Clamping can leave an occurrence empty.
    fn occurrence(&self, index: i32) -> Option<(NaiveDateTime, NaiveDateTime)> {
        match *self {
            Schedule::Monthly {
                start_day,
                start,
                end_day,
                end,
            } => {
                let end_index = if start_day > end_day {
                    index.checked_add(1)?
                } else {
                    index
                };
                let (year, month) = month_of(index);
                let (end_year, end_month) = month_of(end_index);
                Some((
                    clamped_date(year, month, start_day)?.and_time(start),
                    clamped_date(end_year, end_month, end_day)?.and_time(end),
                ))
            }
            Schedule::Annual {
                start_date,
                start,
                end_date,
                end,
            } => {
                let end_year = if start_date > end_date {
                    index.checked_add(1)?
                } else {
                    index
                };
                Some((
                    annual_date(index, start_date)?.and_time(start),
                    annual_date(end_year, end_date)?.and_time(end),
                ))
            }
            Schedule::Daily { .. } | Schedule::Weekly { .. } => None,
        }
    }
}

/// Start and end of the weekly occurrence that starts on `anchor`
fn weekly_occurrence(
    anchor: NaiveDate,
    start_day: Weekday,
    start: NaiveTime,
    end_day: Weekday,
    end: NaiveTime,
) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let window_start = anchor.and_time(start);
    let days_until_end = if start_day == end_day {
        if start <= end { 0 } else { 1 }
    } else {
        let diff = end_day.number_from_monday() as i64 - start_day.number_from_monday() as i64;
        diff.rem_euclid(7) as u64
    };
    let window_end = anchor.checked_add_days(Days::new(days_until_end))?.and_time(end);
    Some((window_start, window_end))
}

/// Most recent `weekday` at or before `date`
fn previous_or_same(date: NaiveDate, weekday: Weekday) -> Option<NaiveDate> {
    let back = (date.weekday().num_days_from_monday() + 7 - weekday.num_days_from_monday()) % 7;
    date.checked_sub_days(Days::new(u64::from(back)))
}

/// Year and month of a month index counted from year 0
fn month_of(index: i32) -> (i32, u32) {
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (ny, nm) = month_of(year * 12 + month as i32);
    Some(NaiveDate::from_ymd_opt(ny, nm, 1)?.pred_opt()?.day())
}

/// `day` of the given month, or the month's last day if it is shorter
fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let day = day.min(days_in_month(year, month)?);
    NaiveDate::from_ymd_opt(year, month, day)
}

fn annual_date(year: i32, date: MonthDay) -> Option<NaiveDate> {
    clamped_date(year, date.month, date.day)
}

impl BlackoutWindow {
    /// Build and validate a window from its bounds
    pub fn new(
        start: RecurrencePoint,
        end: RecurrencePoint,
        trigger: Trigger,
        timezone: TimezoneMode,
    ) -> Result<Self, WindowError> {
        let kind = validate_bounds(Some(&start), Some(&end))?;
        let schedule = Schedule::build(kind, &start, &end)?;
        Ok(Self {
            start_point: start,
            end_point: end,
            schedule,
            trigger,
            timezone,
        })
    }

    pub fn kind(&self) -> RecurrenceKind {
        self.schedule.kind()
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    pub fn timezone(&self) -> TimezoneMode {
        self.timezone
    }

    /// Check if the given instant falls within the blackout
    pub fn is_active<Tz: TimeZone>(&self, at: &DateTime<Tz>) -> Result<bool, WindowError> {
        let civil = self.timezone.to_civil(at);
        self.schedule.contains(civil).ok_or_else(|| {
            WindowError::Internal(format!("no {} occurrence around {}", self.kind(), civil))
        })
    }

    /// End of the current or upcoming occurrence, strictly after `at`,
    /// expressed in the window's zone
    pub fn next_end_instant<Tz: TimeZone>(
        &self,
        at: &DateTime<Tz>,
    ) -> Result<DateTime<FixedOffset>, WindowError> {
        let civil = self.timezone.to_civil(at);
        let end = self.schedule.next_end(civil).ok_or_else(|| {
            WindowError::Internal(format!("no {} end after {}", self.kind(), civil))
        })?;
        self.timezone.from_civil(end).ok_or_else(|| {
            WindowError::Internal(format!("cannot place {} in {} time", end, self.timezone))
        })
    }
}

impl fmt::Display for BlackoutWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] -> [{}] ({}, trigger {})",
            self.kind(),
            self.start_point,
            self.end_point,
            self.timezone,
            self.trigger
        )
    }
}
