//! Time utilities for rulebook sessions
//!
//! Rule evaluation is driven by a pseudo clock: a virtual clock that only
//! moves when the caller advances it, independent of wall-clock time.
//! Blackout windows interpret the clock's instants either in UTC or in the
//! process-local timezone.

use chrono::{
    DateTime, Duration, FixedOffset, Local, LocalResult, NaiveDateTime, TimeZone, Utc,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::{Result, RulebookError};

/// Environment variable holding the initial pseudo clock time
pub const START_TIME_ENV_VAR: &str = "RULEBOOK_START_TIME";

/// How a blackout window interprets instants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimezoneMode {
    #[default]
    Utc,
    Local,
}

impl TimezoneMode {
    /// Wall-clock reading of `at` in this zone
    pub fn to_civil<Tz: TimeZone>(self, at: &DateTime<Tz>) -> NaiveDateTime {
        match self {
            TimezoneMode::Utc => at.naive_utc(),
            TimezoneMode::Local => at.with_timezone(&Local).naive_local(),
        }
    }

    /// Resolve a wall-clock reading in this zone to an instant.
    ///
    /// Ambiguous readings (clocks turned back) resolve to the earlier
    /// instant. Readings inside a gap (clocks turned forward) are pushed
    /// later by the length of the gap.
    pub fn from_civil(self, civil: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            TimezoneMode::Utc => Some(Utc.from_utc_datetime(&civil).into()),
            TimezoneMode::Local => match Local.from_local_datetime(&civil) {
                LocalResult::Single(dt) => Some(dt.into()),
                LocalResult::Ambiguous(a, b) => {
                    debug!(civil = %civil, "Ambiguous local time, using the earlier instant");
                    // chrono does not promise which reading comes first
                    Some(a.min(b).into())
                }
                LocalResult::None => {
                    debug!(civil = %civil, "Local time falls in a gap, shifting past it");
                    let day_before = civil.checked_sub_signed(Duration::days(1))?;
                    let before_gap = Local.offset_from_utc_datetime(&day_before);
                    let offset = Duration::seconds(i64::from(before_gap.local_minus_utc()));
                    let utc = civil.checked_sub_signed(offset)?;
                    Some(Local.from_utc_datetime(&utc).into())
                }
            },
        }
    }
}

impl fmt::Display for TimezoneMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimezoneMode::Utc => write!(f, "utc"),
            TimezoneMode::Local => write!(f, "local"),
        }
    }
}

/// Unit for advancing the pseudo clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    #[serde(alias = "millisecond", alias = "ms")]
    Milliseconds,
    #[serde(alias = "second", alias = "s")]
    Seconds,
    #[serde(alias = "minute", alias = "m")]
    Minutes,
    #[serde(alias = "hour", alias = "h")]
    Hours,
    #[serde(alias = "day", alias = "d")]
    Days,
}

impl TimeUnit {
    /// Span covering `amount` of this unit, or None on overflow
    pub fn span(self, amount: u64) -> Option<Duration> {
        let amount = i64::try_from(amount).ok()?;
        match self {
            TimeUnit::Milliseconds => Duration::try_milliseconds(amount),
            TimeUnit::Seconds => Duration::try_seconds(amount),
            TimeUnit::Minutes => Duration::try_minutes(amount),
            TimeUnit::Hours => Duration::try_hours(amount),
            TimeUnit::Days => Duration::try_days(amount),
        }
    }
}

impl FromStr for TimeUnit {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ms" | "millisecond" | "milliseconds" => Ok(TimeUnit::Milliseconds),
            "s" | "second" | "seconds" => Ok(TimeUnit::Seconds),
            "m" | "minute" | "minutes" => Ok(TimeUnit::Minutes),
            "h" | "hour" | "hours" => Ok(TimeUnit::Hours),
            "d" | "day" | "days" => Ok(TimeUnit::Days),
            other => Err(format!("Unknown time unit: {}", other)),
        }
    }
}

/// Virtual clock driving time-dependent evaluation in a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PseudoClock {
    now: DateTime<Utc>,
}

impl PseudoClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: start }
    }

    /// Clock initialised to the current wall-clock time
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Move the clock forward by `amount` of `unit`
    pub fn advance(&mut self, amount: u64, unit: TimeUnit) -> Result<DateTime<Utc>> {
        let span = unit.span(amount).ok_or_else(|| {
            RulebookError::clock(format!("cannot advance by {} {:?}", amount, unit))
        })?;
        let next = self
            .now
            .checked_add_signed(span)
            .ok_or_else(|| RulebookError::clock("clock advanced past the representable range"))?;
        self.now = next;
        Ok(next)
    }

    /// Move the clock forward to `target`; moving backward is refused
    pub fn advance_to(&mut self, target: DateTime<Utc>) -> Result<DateTime<Utc>> {
        if target < self.now {
            return Err(RulebookError::clock(format!(
                "cannot move clock backward from {} to {}",
                format_instant(&self.now),
                format_instant(&target)
            )));
        }
        self.now = target;
        Ok(target)
    }
}

/// Parse an initial clock time.
///
/// Accepts RFC 3339 (`2025-07-01T15:00:00Z`) or `YYYY-MM-DD HH:MM:SS`,
/// the latter read as process-local time.
pub fn parse_clock_time(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").ok()?;
    TimezoneMode::Local
        .from_civil(naive)
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format an instant with its offset for logs and CLI output
pub fn format_instant<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    dt.format("%Y-%m-%d %H:%M:%S %:z").to_string()
}

/// Pins the process-local zone for tests that read `Local`
#[cfg(test)]
pub(crate) fn pin_test_zone() {
    use std::sync::Once;

    // Central European rules as a POSIX TZ string, so no zoneinfo files are needed
    static PIN: Once = Once::new();
    PIN.call_once(|| unsafe { std::env::set_var("TZ", "CET-1CEST,M3.5.0,M10.5.0/3") });
}
