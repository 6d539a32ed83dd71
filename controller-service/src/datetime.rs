//! Controller-local wall-clock time
//!
//! Time comes from an external real-time clock with no timezone. The clock chip and the legacy
//! settings block store a two-digit year; [`Timestamp`] keeps the full year so that boundary
//! comparisons do not wrap at a century rollover. [`LegacyDateTime`] is the narrow form and the
//! conversion between the two is explicit.
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};

/// Full year that a legacy two-digit year of `0` maps to
pub const LEGACY_CENTURY_BASE: u16 = 2000;

/// Error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A calendar field is out of range, or the day does not exist in that month
    InvalidDate,
    /// Arithmetic left the representable range
    Overflow,
}

/// Wall-clock timestamp with second resolution
///
/// Field order is significant: the derived ordering is lexicographic from year down to second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timestamp {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
}

impl Timestamp {
    /// Create a timestamp, validating every field against the calendar
    pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Result<Self, Error> {
        let timestamp = Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        };
        // Round trip through chrono rejects Feb 30th and friends
        timestamp.to_naive()?;
        Ok(timestamp)
    }

    /// Full year, e.g. 2024
    pub fn year(&self) -> u16 {
        self.year
    }

    /// Month, 1-12
    pub fn month(&self) -> u8 {
        self.month
    }

    /// Day of month, 1-31
    pub fn day(&self) -> u8 {
        self.day
    }

    /// Hour, 0-23
    pub fn hour(&self) -> u8 {
        self.hour
    }

    /// Minute, 0-59
    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Second, 0-59
    pub fn second(&self) -> u8 {
        self.second
    }

    /// Convert to a chrono date-time
    pub fn to_naive(&self) -> Result<NaiveDateTime, Error> {
        let date = NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)
            .ok_or(Error::InvalidDate)?;
        let time = NaiveTime::from_hms_opt(self.hour as u32, self.minute as u32, self.second as u32)
            .ok_or(Error::InvalidDate)?;
        Ok(NaiveDateTime::new(date, time))
    }

    /// Convert from a chrono date-time, dropping sub-second precision
    pub fn from_naive(naive: NaiveDateTime) -> Result<Self, Error> {
        let year = u16::try_from(naive.year()).map_err(|_| Error::Overflow)?;
        Ok(Self {
            year,
            month: naive.month() as u8,
            day: naive.day() as u8,
            hour: naive.hour() as u8,
            minute: naive.minute() as u8,
            // Leap seconds are folded into the preceding second
            second: naive.second().min(59) as u8,
        })
    }

    /// Returns this timestamp moved forward by `minutes`, carrying into hours, days, months and years
    pub fn checked_add_minutes(&self, minutes: u32) -> Result<Self, Error> {
        let delta = TimeDelta::try_minutes(minutes as i64).ok_or(Error::Overflow)?;
        let moved = self.to_naive()?.checked_add_signed(delta).ok_or(Error::Overflow)?;
        Self::from_naive(moved)
    }

    /// Returns true if this timestamp is equal to or later than `boundary`
    pub fn is_at_or_past(&self, boundary: &Timestamp) -> bool {
        self >= boundary
    }
}

/// Date-time as stored by the clock chip and the legacy settings block
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LegacyDateTime {
    pub second: u8,
    pub minute: u8,
    pub hour: u8,
    pub day: u8,
    pub month: u8,
    /// Two-digit year, 0-99
    pub year: u8,
}

impl TryFrom<LegacyDateTime> for Timestamp {
    type Error = Error;

    /// Maps the two-digit year into [`LEGACY_CENTURY_BASE`]..[`LEGACY_CENTURY_BASE`] + 99
    fn try_from(legacy: LegacyDateTime) -> Result<Self, Self::Error> {
        if legacy.year > 99 {
            return Err(Error::InvalidDate);
        }

        Timestamp::new(
            LEGACY_CENTURY_BASE + legacy.year as u16,
            legacy.month,
            legacy.day,
            legacy.hour,
            legacy.minute,
            legacy.second,
        )
    }
}

impl TryFrom<Timestamp> for LegacyDateTime {
    type Error = Error;

    /// Fails for years the two-digit field cannot hold
    fn try_from(timestamp: Timestamp) -> Result<Self, Self::Error> {
        let year = timestamp
            .year
            .checked_sub(LEGACY_CENTURY_BASE)
            .filter(|year| *year <= 99)
            .ok_or(Error::Overflow)?;

        Ok(Self {
            second: timestamp.second,
            minute: timestamp.minute,
            hour: timestamp.hour,
            day: timestamp.day,
            month: timestamp.month,
            year: year as u8,
        })
    }
}
