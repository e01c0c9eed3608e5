//! Evaluating a chain against an instant.
//!
//! Evaluation walks the chain once, from the scope down to the node it was
//! called on:
//!
//! 1. Truncate the instant to the scope's boundary and apply the scope's
//!    offset.
//! 2. For every unit node below it: truncate to the node's own unit, add the
//!    index delta, then apply the node's offset under the rollover policy.
//!
//! The index delta for `index >= 0` is `index + 1 - residual` of the node's
//! unit. For a negative index it is one parent unit forward, then `index`
//! units back, so `-1` always lands on the last unit of the parent.
//!
//! Re-truncating at every level anchors offsets attached to an intermediate
//! node to that node's boundary. It is not the cheapest walk, but the chain
//! is at most 13 levels deep.
//!
//! # Rollover
//!
//! With [`EvalOptions::rollover`] disabled, each step compares the parent
//! unit's value before and after the step and fails with
//! [`IntervalError::Rollover`] if it changed (e.g. day 30 of February
//! spilling into March). With [`EvalOptions::operation_safe`] also set, only
//! the index step is checked; offsets added with `+`/`-` may cross the
//! parent boundary freely.
//!
//! The parent's value is read before the node truncates to its own unit.
//! A week that starts in the previous month therefore trips the check even
//! at index 0: `month.week[0]` on 2024-05-15 snaps back to Monday
//! 2024-04-29 and reports the month changing from 5 to 4.
//!
//! Instants are anything that converts into a `NaiveDateTime`; a
//! `NaiveDate` evaluates from midnight.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::delta::CalendarDelta;
use crate::error::{IntervalError, Result};
use crate::expression::{Chain, Node};
use crate::unit::Unit;

/// Options for [`Chain::evaluate_with_options`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalOptions {
    /// Allow steps to carry into coarser units. Defaults to `true`.
    pub rollover: bool,
    /// Exempt explicit offsets from the rollover check. Only valid when
    /// `rollover` is `false`.
    pub operation_safe: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            rollover: true,
            operation_safe: false,
        }
    }
}

impl EvalOptions {
    /// Reject any step that changes a coarser unit.
    pub fn strict() -> Self {
        Self {
            rollover: false,
            operation_safe: false,
        }
    }

    /// Reject index steps that change a coarser unit; let offsets through.
    pub fn operation_safe() -> Self {
        Self {
            rollover: false,
            operation_safe: true,
        }
    }

    fn policy(&self) -> Result<Policy> {
        match (self.rollover, self.operation_safe) {
            (true, false) => Ok(Policy::Rollover),
            (false, false) => Ok(Policy::Strict),
            (false, true) => Ok(Policy::OperationSafe),
            (true, true) => Err(IntervalError::InvalidArgument(
                "operation_safe requires rollover to be disabled".to_string(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Policy {
    Rollover,
    Strict,
    OperationSafe,
}

impl Chain {
    /// Resolve this chain against `instant` with default options
    /// (rollover allowed).
    ///
    /// # Errors
    ///
    /// Returns [`IntervalError::IncompleteChain`] if a unit in the chain has
    /// no index, or [`IntervalError::OutOfRange`] if the result leaves the
    /// representable range.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use interval_engine::Expression;
    ///
    /// let last_day = Expression::new().month().day()?.at(-1)?;
    /// let feb = NaiveDate::from_ymd_opt(2020, 2, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    /// assert_eq!(last_day.evaluate(feb)?.to_string(), "2020-02-29 00:00:00");
    /// # Ok::<(), interval_engine::IntervalError>(())
    /// ```
    pub fn evaluate(&self, instant: impl Into<NaiveDateTime>) -> Result<NaiveDateTime> {
        self.evaluate_with_options(instant, &EvalOptions::default())
    }

    /// Resolve this chain against the root's default instant.
    pub fn evaluate_origin(&self) -> Result<NaiveDateTime> {
        self.evaluate_origin_with_options(&EvalOptions::default())
    }

    /// Resolve this chain against `instant`.
    ///
    /// # Errors
    ///
    /// In addition to the errors of [`Chain::evaluate`]:
    /// [`IntervalError::InvalidArgument`] if `operation_safe` is combined
    /// with `rollover`, and [`IntervalError::Rollover`] if rollover is
    /// disabled and a step carried into a coarser unit.
    pub fn evaluate_with_options(
        &self,
        instant: impl Into<NaiveDateTime>,
        options: &EvalOptions,
    ) -> Result<NaiveDateTime> {
        self.resolve(instant.into(), options)
    }

    /// Resolve this chain against the root's default instant.
    ///
    /// # Errors
    ///
    /// As [`Chain::evaluate_with_options`], plus
    /// [`IntervalError::IncompleteChain`] if the root has no instant.
    pub fn evaluate_origin_with_options(&self, options: &EvalOptions) -> Result<NaiveDateTime> {
        let origin = self.origin().ok_or_else(|| {
            IntervalError::IncompleteChain(format!(
                "no instant given and the root of '{self}' has none"
            ))
        })?;
        self.resolve(origin, options)
    }

    fn resolve(&self, mut instant: NaiveDateTime, options: &EvalOptions) -> Result<NaiveDateTime> {
        let policy = options.policy()?;

        let path = self.path();
        if let Some(unindexed) = path.iter().skip(1).find(|node| node.index.is_none()) {
            return Err(IntervalError::IncompleteChain(format!(
                "{} in '{}' has no index",
                unindexed.unit, self
            )));
        }

        let (scope, units) = match path.split_first() {
            Some(split) => split,
            None => return Ok(instant),
        };
        instant = scope.unit.truncate(&instant)?;
        instant = scope.offset.apply(instant)?;
        tracing::trace!(unit = %scope.unit, %instant, "scope");

        let mut parent = scope.unit;
        for node in units {
            instant = step(parent, node, instant, policy)?;
            tracing::trace!(unit = %node.unit, %instant, "step");
            parent = node.unit;
        }

        Ok(instant)
    }
}

fn step(
    parent: Unit,
    node: &Node,
    instant: NaiveDateTime,
    policy: Policy,
) -> Result<NaiveDateTime> {
    // Evaluation rejects unindexed chains before walking them.
    let index = node.index.unwrap_or(0);
    let before = parent.value_of(&instant);

    let truncated = node.unit.truncate(&instant)?;
    let indexed = index_delta(parent, node.unit, index).apply(truncated)?;

    match policy {
        Policy::Rollover => node.offset.apply(indexed),
        Policy::Strict => {
            let shifted = node.offset.apply(indexed)?;
            check_rollover(parent, before, &shifted)?;
            Ok(shifted)
        }
        Policy::OperationSafe => {
            check_rollover(parent, before, &indexed)?;
            node.offset.apply(indexed)
        }
    }
}

fn index_delta(parent: Unit, unit: Unit, index: i64) -> CalendarDelta {
    if index >= 0 {
        unit.delta(index + 1 - unit.residual())
    } else {
        parent.delta(1) + unit.delta(index)
    }
}

fn check_rollover(parent: Unit, before: i64, instant: &NaiveDateTime) -> Result<()> {
    let after = parent.value_of(instant);
    if before == after {
        return Ok(());
    }
    tracing::debug!(unit = %parent, before, after, "rollover detected");
    Err(IntervalError::Rollover {
        unit: parent,
        before,
        after,
    })
}

// ── Tests ───────────────────────────────────────────────────────────────────
