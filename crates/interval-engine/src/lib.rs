//! # interval-engine
//!
//! Lazy, chainable calendar path expressions.
//!
//! An expression selects a position within a hierarchy of calendar
//! granularities and is resolved against a concrete instant only when
//! evaluated. `year.month[-1].day[24]` reads as "the 25th of the last month
//! of the year":
//!
//! ```
//! use chrono::NaiveDate;
//! use interval_engine::Expression;
//!
//! let christmas = Expression::new().year().month()?.at(-1)?.day()?.at(24)?;
//! let anchor = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap().and_hms_opt(17, 0, 0).unwrap();
//! assert_eq!(christmas.evaluate(anchor)?.to_string(), "2024-12-25 00:00:00");
//! # Ok::<(), interval_engine::IntervalError>(())
//! ```
//!
//! ## Modules
//!
//! - [`unit`] — The unit catalog: ranks, truncation rules, offsets and index limits
//! - [`delta`] — Signed, composable calendar offsets
//! - [`expression`] — Chain construction, index validation and offset arithmetic
//! - [`evaluate`] — Resolving a chain against an instant, with rollover policies
//! - [`error`] — Error types

pub mod delta;
pub mod error;
pub mod evaluate;
pub mod expression;
pub mod unit;

pub use delta::{CalendarDelta, DeltaField};
pub use error::{IntervalError, Result};
pub use evaluate::EvalOptions;
pub use expression::{Chain, Expression, Role};
pub use unit::Unit;
