//! The unit catalog: the fixed set of calendar granularities an expression
//! can walk through, from [`Unit::Decade`] down to [`Unit::Microsecond`].
//!
//! Units are plain data. Every [`Unit`] indexes one row of a static table
//! that holds its rank, the [`DeltaField`] its offsets are expressed in, the
//! multiplier applied to a count, its residual, a truncation rule, a value
//! extractor for rollover checks, and the maximum index each finer unit may
//! take inside one instance of it.
//!
//! The four sub-second units do not own a calendar field of their own; they
//! subdivide the microsecond field, so their truncation rounds that field
//! down to a multiple of the unit's multiplier.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::delta::{CalendarDelta, DeltaField};
use crate::error::{IntervalError, Result};

/// A calendar granularity.
///
/// Variants are declared coarsest first; [`Unit::rank`] gives the total
/// order used to validate nesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Decade,
    Year,
    Quarter,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
    Decisecond,
    Centisecond,
    Millisecond,
    Microsecond,
}

/// One row of the catalog.
struct UnitSpec {
    name: &'static str,
    accessor: &'static str,
    rank: u8,
    field: DeltaField,
    multiplier: i64,
    residual: i64,
    truncate: fn(&NaiveDateTime) -> Option<NaiveDateTime>,
    value_of: fn(&NaiveDateTime) -> i64,
    max_children: &'static [(Unit, i64)],
}

// Rows are in declaration order of `Unit`.
static CATALOG: [UnitSpec; 13] = [
    UnitSpec {
        name: "Decade",
        accessor: "decade",
        rank: 12,
        field: DeltaField::Years,
        multiplier: 10,
        residual: 0,
        truncate: truncate_decade,
        value_of: |t| i64::from(t.year().div_euclid(10)),
        max_children: &[
            (Unit::Microsecond, 320_544_000_000_000),
            (Unit::Millisecond, 320_544_000_000),
            (Unit::Centisecond, 32_054_400_000),
            (Unit::Decisecond, 3_205_440_000),
            (Unit::Second, 320_544_000),
            (Unit::Minute, 5_342_400),
            (Unit::Hour, 89_040),
            (Unit::Day, 3_710),
            (Unit::Week, 530),
            (Unit::Month, 120),
            (Unit::Quarter, 40),
            (Unit::Year, 10),
        ],
    },
    UnitSpec {
        name: "Year",
        accessor: "year",
        rank: 11,
        field: DeltaField::Years,
        multiplier: 1,
        residual: 0,
        truncate: truncate_year,
        value_of: |t| i64::from(t.year()),
        max_children: &[
            (Unit::Microsecond, 32_054_400_000_000),
            (Unit::Millisecond, 32_054_400_000),
            (Unit::Centisecond, 3_205_440_000),
            (Unit::Decisecond, 320_544_000),
            (Unit::Second, 32_054_400),
            (Unit::Minute, 534_240),
            (Unit::Hour, 8_904),
            (Unit::Day, 366),
            (Unit::Week, 53),
            (Unit::Month, 12),
            (Unit::Quarter, 4),
        ],
    },
    UnitSpec {
        name: "Quarter",
        accessor: "quarter",
        rank: 10,
        field: DeltaField::Months,
        multiplier: 3,
        residual: 1,
        truncate: truncate_quarter,
        value_of: |t| i64::from((t.month() - 1) / 3 + 1),
        max_children: &[
            (Unit::Microsecond, 8_467_200_000_000),
            (Unit::Millisecond, 8_467_200_000),
            (Unit::Centisecond, 846_720_000),
            (Unit::Decisecond, 84_672_000),
            (Unit::Second, 8_467_200),
            (Unit::Minute, 141_120),
            (Unit::Hour, 2_352),
            (Unit::Day, 98),
            (Unit::Week, 14),
            (Unit::Month, 3),
        ],
    },
    UnitSpec {
        name: "Month",
        accessor: "month",
        rank: 9,
        field: DeltaField::Months,
        multiplier: 1,
        residual: 1,
        truncate: truncate_month,
        value_of: |t| i64::from(t.month()),
        max_children: &[
            (Unit::Microsecond, 3_024_000_000_000),
            (Unit::Millisecond, 3_024_000_000),
            (Unit::Centisecond, 302_400_000),
            (Unit::Decisecond, 30_240_000),
            (Unit::Second, 3_024_000),
            (Unit::Minute, 50_400),
            (Unit::Hour, 840),
            (Unit::Day, 35),
            (Unit::Week, 5),
        ],
    },
    UnitSpec {
        name: "Week",
        accessor: "week",
        rank: 8,
        field: DeltaField::Days,
        multiplier: 7,
        residual: 1,
        truncate: truncate_week,
        value_of: week_ordinal,
        max_children: &[
            (Unit::Microsecond, 604_800_000_000),
            (Unit::Millisecond, 604_800_000),
            (Unit::Centisecond, 60_480_000),
            (Unit::Decisecond, 6_048_000),
            (Unit::Second, 604_800),
            (Unit::Minute, 10_080),
            (Unit::Hour, 168),
            (Unit::Day, 7),
        ],
    },
    UnitSpec {
        name: "Day",
        accessor: "day",
        rank: 7,
        field: DeltaField::Days,
        multiplier: 1,
        residual: 1,
        truncate: |t| t.date().and_hms_opt(0, 0, 0),
        value_of: |t| i64::from(t.day()),
        max_children: &[
            (Unit::Microsecond, 86_400_000_000),
            (Unit::Millisecond, 86_400_000),
            (Unit::Centisecond, 8_640_000),
            (Unit::Decisecond, 864_000),
            (Unit::Second, 86_400),
            (Unit::Minute, 1_440),
            (Unit::Hour, 24),
        ],
    },
    UnitSpec {
        name: "Hour",
        accessor: "hour",
        rank: 6,
        field: DeltaField::Hours,
        multiplier: 1,
        residual: 0,
        truncate: |t| t.date().and_hms_opt(t.hour(), 0, 0),
        value_of: |t| i64::from(t.hour()),
        max_children: &[
            (Unit::Microsecond, 3_600_000_000),
            (Unit::Millisecond, 3_600_000),
            (Unit::Centisecond, 360_000),
            (Unit::Decisecond, 36_000),
            (Unit::Second, 3_600),
            (Unit::Minute, 60),
        ],
    },
    UnitSpec {
        name: "Minute",
        accessor: "minute",
        rank: 5,
        field: DeltaField::Minutes,
        multiplier: 1,
        residual: 0,
        truncate: |t| t.date().and_hms_opt(t.hour(), t.minute(), 0),
        value_of: |t| i64::from(t.minute()),
        max_children: &[
            (Unit::Microsecond, 60_000_000),
            (Unit::Millisecond, 60_000),
            (Unit::Centisecond, 6_000),
            (Unit::Decisecond, 600),
            (Unit::Second, 60),
        ],
    },
    UnitSpec {
        name: "Second",
        accessor: "second",
        rank: 4,
        field: DeltaField::Seconds,
        multiplier: 1,
        residual: 0,
        truncate: |t| t.date().and_hms_opt(t.hour(), t.minute(), t.second()),
        value_of: |t| i64::from(t.second()),
        max_children: &[
            (Unit::Microsecond, 1_000_000),
            (Unit::Millisecond, 1_000),
            (Unit::Centisecond, 100),
            (Unit::Decisecond, 10),
        ],
    },
    UnitSpec {
        name: "Decisecond",
        accessor: "decisecond",
        rank: 3,
        field: DeltaField::Microseconds,
        multiplier: 100_000,
        residual: 0,
        truncate: |t| truncate_sub_second(t, 100_000),
        value_of: |t| i64::from(micros(t) / 100_000),
        max_children: &[
            (Unit::Microsecond, 100_000),
            (Unit::Millisecond, 100),
            (Unit::Centisecond, 10),
        ],
    },
    UnitSpec {
        name: "Centisecond",
        accessor: "centisecond",
        rank: 2,
        field: DeltaField::Microseconds,
        multiplier: 10_000,
        residual: 0,
        truncate: |t| truncate_sub_second(t, 10_000),
        value_of: |t| i64::from(micros(t) / 10_000),
        max_children: &[(Unit::Microsecond, 10_000), (Unit::Millisecond, 10)],
    },
    UnitSpec {
        name: "Millisecond",
        accessor: "millisecond",
        rank: 1,
        field: DeltaField::Microseconds,
        multiplier: 1_000,
        residual: 0,
        truncate: |t| truncate_sub_second(t, 1_000),
        value_of: |t| i64::from(micros(t) / 1_000),
        max_children: &[(Unit::Microsecond, 1_000)],
    },
    UnitSpec {
        name: "Microsecond",
        accessor: "microsecond",
        rank: 0,
        field: DeltaField::Microseconds,
        multiplier: 1,
        residual: 0,
        truncate: |t| truncate_sub_second(t, 1),
        value_of: |t| i64::from(micros(t)),
        max_children: &[],
    },
];

impl Unit {
    /// Every unit, coarsest first.
    pub const ALL: [Unit; 13] = [
        Unit::Decade,
        Unit::Year,
        Unit::Quarter,
        Unit::Month,
        Unit::Week,
        Unit::Day,
        Unit::Hour,
        Unit::Minute,
        Unit::Second,
        Unit::Decisecond,
        Unit::Centisecond,
        Unit::Millisecond,
        Unit::Microsecond,
    ];

    fn spec(self) -> &'static UnitSpec {
        &CATALOG[self as usize]
    }

    /// Display name, e.g. `"Month"`.
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Accessor name, e.g. `"month"`. Accepted by [`Unit::from_str`].
    pub fn accessor(self) -> &'static str {
        self.spec().accessor
    }

    /// Position in the coarse-to-fine order; `Decade` is highest.
    pub fn rank(self) -> u8 {
        self.spec().rank
    }

    pub fn is_coarser_than(self, other: Unit) -> bool {
        self.rank() > other.rank()
    }

    pub fn delta_field(self) -> DeltaField {
        self.spec().field
    }

    /// How many `delta_field` steps one of this unit spans (Quarter → 3 months).
    pub fn multiplier(self) -> i64 {
        self.spec().multiplier
    }

    /// The value this unit's calendar counter already holds at the start of
    /// its parent (1 for counters that start at one: day, week, month, quarter).
    pub fn residual(self) -> i64 {
        self.spec().residual
    }

    /// The largest index `child` may take inside one instance of this unit.
    ///
    /// `None` means no limit is known for the pair. Limits are advisory for
    /// irregular units (a month allows 35 days).
    pub fn max_index(self, child: Unit) -> Option<i64> {
        self.spec()
            .max_children
            .iter()
            .find(|(unit, _)| *unit == child)
            .map(|(_, max)| *max)
    }

    /// An offset of `count` of this unit.
    pub fn delta(self, count: i64) -> CalendarDelta {
        CalendarDelta::scaled(self.delta_field(), count, self.multiplier())
    }

    /// The start of the interval of this unit that contains `instant`.
    ///
    /// # Errors
    ///
    /// Returns [`IntervalError::OutOfRange`] if the boundary is not
    /// representable (e.g. the Monday before the earliest supported date).
    pub fn truncate(self, instant: &NaiveDateTime) -> Result<NaiveDateTime> {
        (self.spec().truncate)(instant).ok_or_else(|| {
            IntervalError::OutOfRange(format!(
                "cannot truncate {} to the start of its {}",
                instant,
                self.accessor()
            ))
        })
    }

    /// The current value of this granularity in `instant`, used to detect
    /// rollover into a coarser unit.
    pub fn value_of(self, instant: &NaiveDateTime) -> i64 {
        (self.spec().value_of)(instant)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Unit {
    type Err = IntervalError;

    /// Parse an accessor name (`"month"`, case-insensitive).
    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim().to_ascii_lowercase();
        Unit::ALL
            .into_iter()
            .find(|unit| unit.accessor() == needle)
            .ok_or_else(|| IntervalError::InvalidArgument(format!("unknown unit: '{}'", s.trim())))
    }
}

// ── Truncation and value helpers ────────────────────────────────────────────

fn micros(t: &NaiveDateTime) -> u32 {
    t.nanosecond() / 1_000
}

fn start_of(date: NaiveDate) -> Option<NaiveDateTime> {
    date.and_hms_opt(0, 0, 0)
}

fn truncate_decade(t: &NaiveDateTime) -> Option<NaiveDateTime> {
    let year = t.year().div_euclid(10) * 10;
    start_of(NaiveDate::from_ymd_opt(year, 1, 1)?)
}

fn truncate_year(t: &NaiveDateTime) -> Option<NaiveDateTime> {
    start_of(NaiveDate::from_ymd_opt(t.year(), 1, 1)?)
}

fn truncate_quarter(t: &NaiveDateTime) -> Option<NaiveDateTime> {
    let first_month = ((t.month() - 1) / 3) * 3 + 1;
    start_of(NaiveDate::from_ymd_opt(t.year(), first_month, 1)?)
}

fn truncate_month(t: &NaiveDateTime) -> Option<NaiveDateTime> {
    start_of(t.date().with_day(1)?)
}

/// Weeks start on Monday.
fn truncate_week(t: &NaiveDateTime) -> Option<NaiveDateTime> {
    let back = u64::from(t.weekday().num_days_from_monday());
    start_of(t.date().checked_sub_days(Days::new(back))?)
}

/// Whole weeks elapsed since Monday 0001-01-01, so every day of a
/// Monday-to-Sunday week maps to the same value.
fn week_ordinal(t: &NaiveDateTime) -> i64 {
    (i64::from(t.date().num_days_from_ce()) - 1).div_euclid(7)
}

fn truncate_sub_second(t: &NaiveDateTime, multiplier: u32) -> Option<NaiveDateTime> {
    let kept = (micros(t) / multiplier) * multiplier;
    t.date()
        .and_hms_micro_opt(t.hour(), t.minute(), t.second(), kept)
}

// ── Tests ───────────────────────────────────────────────────────────────────
