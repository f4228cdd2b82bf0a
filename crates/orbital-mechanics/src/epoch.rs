//! Simulation epochs
//!
//! An epoch is stored as seconds since J2000 so that short propagation steps
//! keep sub-microsecond resolution; Julian days are derived on demand.
//! Calendar conversion goes through `chrono` on the proleptic Gregorian
//! calendar. J2000 is treated as 2000-01-01T12:00:00 UTC; the TT/UTC offset
//! is not modeled. Julian day 0 (-4713-11-24T12:00 UTC) and everything before
//! it is rejected.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{OrbitalError, Result};

pub const J2000_JD: f64 = 2_451_545.0;
pub const SECONDS_PER_DAY: f64 = 86_400.0;

const J2000_UNIX_SECONDS: i64 = 946_728_000;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Epoch(f64);

impl Epoch {
    /// Fails unless `julian_day` is finite and positive.
    pub fn from_julian_day(julian_day: f64) -> Result<Self> {
        if !julian_day.is_finite() || julian_day <= 0.0 {
            return Err(OrbitalError::InvalidEpoch(format!(
                "Julian day {julian_day} is not after the start of the Julian period"
            )));
        }
        Ok(Self((julian_day - J2000_JD) * SECONDS_PER_DAY))
    }

    pub fn from_seconds_since_j2000(seconds: f64) -> Self {
        Self(seconds)
    }

    pub fn j2000() -> Self {
        Self(0.0)
    }

    pub fn julian_day(self) -> f64 {
        J2000_JD + self.0 / SECONDS_PER_DAY
    }

    pub fn seconds_since_j2000(self) -> f64 {
        self.0
    }

    pub fn from_datetime(datetime: DateTime<Utc>) -> Result<Self> {
        let since_j2000 = datetime.signed_duration_since(j2000_datetime()?);
        let epoch = Self(since_j2000.num_milliseconds() as f64 / 1_000.0);
        if epoch.julian_day() <= 0.0 {
            return Err(OrbitalError::InvalidEpoch(format!(
                "{datetime} precedes the start of the Julian period"
            )));
        }
        Ok(epoch)
    }

    /// Build an epoch from calendar fields, validating each of them.
    pub fn from_calendar(
        year: i32,
        month: u32,
        day: u32,
        hour: u32,
        minute: u32,
        second: f64,
    ) -> Result<Self> {
        if !(0.0..60.0).contains(&second) {
            return Err(OrbitalError::InvalidEpoch(format!("second {second} out of range")));
        }
        // 59.9996 s must not round up into a 60th second
        let millis = ((second * 1000.0).round() as u32).min(59_999);
        let datetime = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_milli_opt(hour, minute, millis / 1000, millis % 1000))
            .ok_or_else(|| {
                OrbitalError::InvalidEpoch(format!(
                    "{year:04}-{month:02}-{day:02} {hour:02}:{minute:02}:{second} is not a calendar date"
                ))
            })?
            .and_utc();
        Self::from_datetime(datetime)
    }

    pub fn to_datetime(self) -> Result<DateTime<Utc>> {
        let millis = (self.0 * 1_000.0).round();
        let out_of_range = || OrbitalError::InvalidEpoch(format!("{self} out of range"));
        if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
            return Err(out_of_range());
        }
        TimeDelta::try_milliseconds(millis as i64)
            .and_then(|delta| j2000_datetime().ok()?.checked_add_signed(delta))
            .ok_or_else(out_of_range)
    }

    pub fn add_seconds(self, seconds: f64) -> Self {
        Self(self.0 + seconds)
    }

    pub fn add_days(self, days: f64) -> Self {
        Self(self.0 + days * SECONDS_PER_DAY)
    }

    /// Seconds elapsed from `earlier` to `self`.
    pub fn seconds_since(self, earlier: Epoch) -> f64 {
        self.0 - earlier.0
    }
}

impl Default for Epoch {
    fn default() -> Self {
        Self::j2000()
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JD {:.6}", self.julian_day())
    }
}

fn j2000_datetime() -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(J2000_UNIX_SECONDS, 0)
        .ok_or_else(|| OrbitalError::InvalidEpoch("J2000 not representable".into()))
}
