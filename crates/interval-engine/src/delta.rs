//! Signed calendar offsets.
//!
//! [`CalendarDelta`] is a relative offset in the style of a "relativedelta":
//! every field is kept separately, so `months(1)` means "the same day next
//! month" rather than a fixed number of seconds. Offsets compose field-wise,
//! which makes composition commutative: the order in which terms were added
//! to an expression never changes the result. Fields are held as `i128`,
//! so sums of `i64` terms stay exact in any order; a total that does not fit
//! the calendar is reported by [`CalendarDelta::apply`], not on composition.
//!
//! # Applying an offset
//!
//! [`CalendarDelta::apply`] first moves the instant by `years * 12 + months`
//! calendar months, clamping the day-of-month to the length of the target
//! month (Jan 31 + 1 month = Feb 29 in a leap year). The exact part (days,
//! hours, minutes, seconds, microseconds) is added afterwards.

use std::fmt;
use std::ops::{Add, Neg, Sub};

use chrono::{Months, NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::error::{IntervalError, Result};

/// The field of a [`CalendarDelta`] that a unit's offsets are expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaField {
    Years,
    Months,
    Days,
    Hours,
    Minutes,
    Seconds,
    Microseconds,
}

/// A signed, composable calendar offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarDelta {
    years: i128,
    months: i128,
    days: i128,
    hours: i128,
    minutes: i128,
    seconds: i128,
    microseconds: i128,
}

impl CalendarDelta {
    /// The neutral offset.
    pub const fn zero() -> Self {
        Self {
            years: 0,
            months: 0,
            days: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
            microseconds: 0,
        }
    }

    /// An offset of `n` in a single field.
    pub fn of(field: DeltaField, n: i64) -> Self {
        Self::wide(field, i128::from(n))
    }

    /// `count` steps of `multiplier` in one field, without overflow.
    pub(crate) fn scaled(field: DeltaField, count: i64, multiplier: i64) -> Self {
        Self::wide(field, i128::from(count) * i128::from(multiplier))
    }

    fn wide(field: DeltaField, n: i128) -> Self {
        let mut delta = Self::zero();
        match field {
            DeltaField::Years => delta.years = n,
            DeltaField::Months => delta.months = n,
            DeltaField::Days => delta.days = n,
            DeltaField::Hours => delta.hours = n,
            DeltaField::Minutes => delta.minutes = n,
            DeltaField::Seconds => delta.seconds = n,
            DeltaField::Microseconds => delta.microseconds = n,
        }
        delta
    }

    pub fn years(n: i64) -> Self {
        Self::of(DeltaField::Years, n)
    }

    pub fn months(n: i64) -> Self {
        Self::of(DeltaField::Months, n)
    }

    /// Weeks are stored as days.
    pub fn weeks(n: i64) -> Self {
        Self::scaled(DeltaField::Days, n, 7)
    }

    pub fn days(n: i64) -> Self {
        Self::of(DeltaField::Days, n)
    }

    pub fn hours(n: i64) -> Self {
        Self::of(DeltaField::Hours, n)
    }

    pub fn minutes(n: i64) -> Self {
        Self::of(DeltaField::Minutes, n)
    }

    pub fn seconds(n: i64) -> Self {
        Self::of(DeltaField::Seconds, n)
    }

    pub fn microseconds(n: i64) -> Self {
        Self::of(DeltaField::Microseconds, n)
    }

    /// The value held in one field.
    pub fn get(&self, field: DeltaField) -> i128 {
        match field {
            DeltaField::Years => self.years,
            DeltaField::Months => self.months,
            DeltaField::Days => self.days,
            DeltaField::Hours => self.hours,
            DeltaField::Minutes => self.minutes,
            DeltaField::Seconds => self.seconds,
            DeltaField::Microseconds => self.microseconds,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    /// Add this offset to `instant`.
    ///
    /// # Errors
    ///
    /// Returns [`IntervalError::OutOfRange`] if the result cannot be
    /// represented by `NaiveDateTime`.
    pub fn apply(&self, instant: NaiveDateTime) -> Result<NaiveDateTime> {
        let out_of_range = || {
            IntervalError::OutOfRange(format!("{} + ({}) is not representable", instant, self))
        };

        let total_months = self
            .years
            .checked_mul(12)
            .and_then(|m| m.checked_add(self.months))
            .and_then(|m| i64::try_from(m).ok())
            .ok_or_else(out_of_range)?;
        let shifted = shift_months(instant, total_months).ok_or_else(out_of_range)?;
        let exact = self.exact_part().ok_or_else(out_of_range)?;

        shifted.checked_add_signed(exact).ok_or_else(out_of_range)
    }

    /// The fixed-length part of the offset (everything except years and months).
    fn exact_part(&self) -> Option<TimeDelta> {
        let narrow = |n: i128| i64::try_from(n).ok();
        TimeDelta::try_days(narrow(self.days)?)?
            .checked_add(&TimeDelta::try_hours(narrow(self.hours)?)?)?
            .checked_add(&TimeDelta::try_minutes(narrow(self.minutes)?)?)?
            .checked_add(&TimeDelta::try_seconds(narrow(self.seconds)?)?)?
            .checked_add(&TimeDelta::microseconds(narrow(self.microseconds)?))
    }

    fn zip_with(self, other: Self, f: impl Fn(i128, i128) -> i128) -> Self {
        Self {
            years: f(self.years, other.years),
            months: f(self.months, other.months),
            days: f(self.days, other.days),
            hours: f(self.hours, other.hours),
            minutes: f(self.minutes, other.minutes),
            seconds: f(self.seconds, other.seconds),
            microseconds: f(self.microseconds, other.microseconds),
        }
    }
}

fn shift_months(instant: NaiveDateTime, months: i64) -> Option<NaiveDateTime> {
    let step = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        instant.checked_add_months(step)
    } else {
        instant.checked_sub_months(step)
    }
}

impl Add for CalendarDelta {
    type Output = CalendarDelta;

    fn add(self, rhs: CalendarDelta) -> CalendarDelta {
        self.zip_with(rhs, i128::saturating_add)
    }
}

impl Sub for CalendarDelta {
    type Output = CalendarDelta;

    fn sub(self, rhs: CalendarDelta) -> CalendarDelta {
        self + (-rhs)
    }
}

impl Neg for CalendarDelta {
    type Output = CalendarDelta;

    fn neg(self) -> CalendarDelta {
        Self::zero().zip_with(self, i128::saturating_sub)
    }
}

impl fmt::Display for CalendarDelta {
    /// Compact signed terms, e.g. `-1mo+1d`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return f.write_str("0");
        }
        let terms = [
            (self.years, "y"),
            (self.months, "mo"),
            (self.days, "d"),
            (self.hours, "h"),
            (self.minutes, "m"),
            (self.seconds, "s"),
            (self.microseconds, "us"),
        ];
        for (value, suffix) in terms {
            if value != 0 {
                write!(f, "{value:+}{suffix}")?;
            }
        }
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
