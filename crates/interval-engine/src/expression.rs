//! Expression chains: lazily built paths through the unit hierarchy.
//!
//! An [`Expression`] is the root of every chain and optionally holds a
//! default instant. Descending from it picks the *scope*, the unit every
//! evaluation truncates to first. Each further descent adds a *unit* node
//! which must be indexed with [`Chain::at`] before it can be evaluated or
//! descended below:
//!
//! ```
//! use interval_engine::{CalendarDelta, Expression};
//!
//! let expr = Expression::new();
//! // The 25th of the last month of the year, at 08:00.
//! let holiday = expr.year().month()?.at(-1)?.day()?.at(24)?.hour()?.at(7)?;
//! // One month and one day earlier, anchored at the hour.
//! let shifted = holiday.clone() + CalendarDelta::days(1) - expr.month().n(1)?;
//! assert_eq!(holiday.to_string(), "Year > Month[-1] > Day[25] > Hour[8]");
//! assert_eq!(shifted.to_string(), "Year > Month[-1] > Day[25] > Hour[8] + (-1mo+1d)");
//! # Ok::<(), interval_engine::IntervalError>(())
//! ```
//!
//! Every node is immutable once built. Indexing and arithmetic return new
//! nodes that share their ancestry through [`Arc`], so chains are cheap to
//! fork and can be evaluated from several threads at once.
//!
//! Chains cannot be combined with other chains yet; `chain + chain` is
//! reserved and reports [`IntervalError::ChainCombination`].

use std::fmt;
use std::ops::{Add, Sub};
use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::delta::CalendarDelta;
use crate::error::{IntervalError, Result};
use crate::unit::Unit;

/// The position of a node in its chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The [`Expression`] every chain starts from. Has no unit.
    Root,
    /// The first node below the root; fixes the truncation baseline.
    Scope,
    /// Any node below the scope; must be indexed.
    Unit,
}

/// The root of an expression chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Expression {
    origin: Option<NaiveDateTime>,
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) unit: Unit,
    pub(crate) index: Option<i64>,
    pub(crate) offset: CalendarDelta,
    pub(crate) link: Link,
}

#[derive(Debug, Clone)]
pub(crate) enum Link {
    /// Scope nodes hang off the root and carry its default instant.
    Root(Option<NaiveDateTime>),
    Parent(Arc<Node>),
}

/// A scope or unit node, together with the path back to its root.
#[derive(Debug, Clone)]
pub struct Chain {
    node: Arc<Node>,
}

macro_rules! unit_accessors {
    ($ret:ty; $($name:ident => $unit:ident),* $(,)?) => {
        $(
            #[doc = concat!("Descend to [`Unit::", stringify!($unit), "`].")]
            pub fn $name(&self) -> $ret {
                self.descend(Unit::$unit)
            }
        )*
    };
}

impl Expression {
    /// A root without a default instant; evaluation must supply one.
    pub fn new() -> Self {
        Self::default()
    }

    /// A root whose chains evaluate against `instant` unless told otherwise.
    /// A `NaiveDate` is taken at midnight.
    pub fn with_instant(instant: impl Into<NaiveDateTime>) -> Self {
        Self {
            origin: Some(instant.into()),
        }
    }

    pub fn instant(&self) -> Option<NaiveDateTime> {
        self.origin
    }

    pub fn role(&self) -> Role {
        Role::Root
    }

    /// Start a chain scoped to `unit`. Any unit may be a scope.
    pub fn descend(&self, unit: Unit) -> Chain {
        Chain {
            node: Arc::new(Node {
                unit,
                index: None,
                offset: CalendarDelta::zero(),
                link: Link::Root(self.origin),
            }),
        }
    }

    unit_accessors!(Chain;
        decade => Decade,
        year => Year,
        quarter => Quarter,
        month => Month,
        week => Week,
        day => Day,
        hour => Hour,
        minute => Minute,
        second => Second,
        decisecond => Decisecond,
        centisecond => Centisecond,
        millisecond => Millisecond,
        microsecond => Microsecond,
    );
}

impl Chain {
    fn from_node(node: Node) -> Self {
        Self {
            node: Arc::new(node),
        }
    }

    pub fn role(&self) -> Role {
        match self.node.link {
            Link::Root(_) => Role::Scope,
            Link::Parent(_) => Role::Unit,
        }
    }

    pub fn unit(&self) -> Unit {
        self.node.unit
    }

    pub fn index(&self) -> Option<i64> {
        self.node.index
    }

    /// The offset attached to this node by `+`/`-`.
    pub fn offset(&self) -> CalendarDelta {
        self.node.offset
    }

    /// The node this one was derived from, or `None` for a scope.
    pub fn parent(&self) -> Option<Chain> {
        match &self.node.link {
            Link::Root(_) => None,
            Link::Parent(parent) => Some(Chain {
                node: Arc::clone(parent),
            }),
        }
    }

    /// The scope node at the top of this chain.
    pub fn scope(&self) -> Chain {
        let mut node = &self.node;
        while let Link::Parent(parent) = &node.link {
            node = parent;
        }
        Chain {
            node: Arc::clone(node),
        }
    }

    /// The root's default instant.
    pub fn origin(&self) -> Option<NaiveDateTime> {
        match self.scope().node.link {
            Link::Root(origin) => origin,
            Link::Parent(_) => None,
        }
    }

    /// The root this chain was built from.
    pub fn root(&self) -> Expression {
        Expression {
            origin: self.origin(),
        }
    }

    /// Nodes from the scope down to this one.
    pub(crate) fn path(&self) -> Vec<&Node> {
        let mut current: &Node = &self.node;
        let mut nodes = vec![current];
        while let Link::Parent(parent) = &current.link {
            current = parent.as_ref();
            nodes.push(current);
        }
        nodes.reverse();
        nodes
    }

    /// Add a node for `unit` below this one.
    ///
    /// # Errors
    ///
    /// Returns [`IntervalError::InvalidNesting`] if this is an unindexed unit
    /// node, or if `unit` is not strictly finer than this node's unit.
    pub fn descend(&self, unit: Unit) -> Result<Chain> {
        if self.role() == Role::Unit && self.node.index.is_none() {
            return Err(IntervalError::InvalidNesting(format!(
                "cannot access child units before indexing {}",
                self.node.unit
            )));
        }
        if !self.node.unit.is_coarser_than(unit) {
            return Err(IntervalError::InvalidNesting(format!(
                "{} cannot be factored by {}",
                self.node.unit, unit
            )));
        }
        Ok(Chain::from_node(Node {
            unit,
            index: None,
            offset: CalendarDelta::zero(),
            link: Link::Parent(Arc::clone(&self.node)),
        }))
    }

    unit_accessors!(Result<Chain>;
        decade => Decade,
        year => Year,
        quarter => Quarter,
        month => Month,
        week => Week,
        day => Day,
        hour => Hour,
        minute => Minute,
        second => Second,
        decisecond => Decisecond,
        centisecond => Centisecond,
        millisecond => Millisecond,
        microsecond => Microsecond,
    );

    /// The largest index this node accepts, from its parent's unit.
    /// `None` for a scope.
    pub fn max_index(&self) -> Option<i64> {
        match &self.node.link {
            Link::Root(_) => None,
            Link::Parent(parent) => parent.unit.max_index(self.node.unit),
        }
    }

    /// Select position `index` of this unit within its parent.
    ///
    /// Non-negative indices count from the start of the parent (0 is the
    /// first); negative indices count back from its end (-1 is the last).
    /// The accepted range is `-(max + 1)..=max`, see [`Chain::max_index`].
    ///
    /// # Errors
    ///
    /// Returns [`IntervalError::InvalidIndex`] for a scope node, a node that
    /// is already indexed, or an index outside the accepted range.
    pub fn at(&self, index: i64) -> Result<Chain> {
        if self.role() != Role::Unit {
            return Err(IntervalError::InvalidIndex(format!(
                "cannot index the scope {}; only units below it take an index",
                self.node.unit
            )));
        }
        if let Some(existing) = self.node.index {
            return Err(IntervalError::InvalidIndex(format!(
                "{} is already indexed at {}",
                self.node.unit, existing
            )));
        }
        let parent_unit = self.parent().map(|p| p.unit());
        let max = self.max_index().ok_or_else(|| {
            IntervalError::InvalidIndex(format!(
                "no index limit known for {} within {:?}",
                self.node.unit, parent_unit
            ))
        })?;
        if index < -max - 1 || index > max {
            return Err(IntervalError::InvalidIndex(format!(
                "{} cannot accept index {} (range {}..={})",
                self.node.unit,
                index,
                -max - 1,
                max
            )));
        }

        Ok(Chain::from_node(Node {
            index: Some(index),
            ..(*self.node).clone()
        }))
    }

    /// An offset of `count` of the scope's unit, for use in arithmetic.
    ///
    /// # Errors
    ///
    /// Returns [`IntervalError::UnsupportedOperand`] unless this is a scope.
    pub fn n(&self, count: i64) -> Result<CalendarDelta> {
        if self.role() != Role::Scope {
            return Err(IntervalError::UnsupportedOperand(format!(
                "offsets can only be built from a scope, not from the unit {}",
                self.node.unit
            )));
        }
        Ok(self.node.unit.delta(count))
    }

    /// A copy of this node with `delta` composed into its offset.
    /// `self` is left untouched; the ancestry is shared.
    pub fn plus(&self, delta: CalendarDelta) -> Chain {
        Chain::from_node(Node {
            offset: self.node.offset + delta,
            ..(*self.node).clone()
        })
    }

    pub fn minus(&self, delta: CalendarDelta) -> Chain {
        self.plus(-delta)
    }
}

impl Add<CalendarDelta> for Chain {
    type Output = Chain;

    fn add(self, rhs: CalendarDelta) -> Chain {
        self.plus(rhs)
    }
}

impl Add<CalendarDelta> for &Chain {
    type Output = Chain;

    fn add(self, rhs: CalendarDelta) -> Chain {
        self.plus(rhs)
    }
}

impl Add<Chain> for CalendarDelta {
    type Output = Chain;

    fn add(self, rhs: Chain) -> Chain {
        rhs.plus(self)
    }
}

impl Sub<CalendarDelta> for Chain {
    type Output = Chain;

    fn sub(self, rhs: CalendarDelta) -> Chain {
        self.minus(rhs)
    }
}

impl Sub<CalendarDelta> for &Chain {
    type Output = Chain;

    fn sub(self, rhs: CalendarDelta) -> Chain {
        self.minus(rhs)
    }
}

impl Add<Chain> for Chain {
    type Output = Result<Chain>;

    fn add(self, rhs: Chain) -> Result<Chain> {
        Err(IntervalError::ChainCombination(format!(
            "cannot add '{rhs}' to '{self}'"
        )))
    }
}

impl Sub<Chain> for Chain {
    type Output = Result<Chain>;

    fn sub(self, rhs: Chain) -> Result<Chain> {
        Err(IntervalError::ChainCombination(format!(
            "cannot subtract '{rhs}' from '{self}'"
        )))
    }
}

impl fmt::Display for Chain {
    /// `Unit[index] + (delta) > Unit[index] > …`, scope first. Non-negative
    /// indices print one-based, negative ones as given.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, node) in self.path().into_iter().enumerate() {
            if i > 0 {
                f.write_str(" > ")?;
            }
            f.write_str(node.unit.name())?;
            match node.index {
                Some(index) if index >= 0 => write!(f, "[{}]", index + 1)?,
                Some(index) => write!(f, "[{index}]")?,
                None => {}
            }
            if !node.offset.is_zero() {
                write!(f, " + ({})", node.offset)?;
            }
        }
        Ok(())
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn base() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    // ── roles and structure ─────────────────────────────────────────────

    #[test]
    fn test_root_holds_instant() {
        let expr = Expression::with_instant(base());
        assert_eq!(expr.role(), Role::Root);
        assert_eq!(expr.instant(), Some(base()));
        assert_eq!(Expression::new().instant(), None);

        let from_date = Expression::with_instant(base().date());
        assert_eq!(from_date, Expression::with_instant(base()));
    }

    #[test]
    fn test_roles_scope_then_unit() {
        let expr = Expression::new();
        for (i, scope_unit) in Unit::ALL.into_iter().enumerate() {
            let scope = expr.descend(scope_unit);
            assert_eq!(scope.role(), Role::Scope);
            assert!(scope.parent().is_none());

            for unit in &Unit::ALL[i + 1..] {
                let child = scope.descend(*unit).unwrap();
                assert_eq!(child.role(), Role::Unit);
                assert_eq!(child.parent().unwrap().role(), Role::Scope);
            }
        }
    }

    #[test]
    fn test_three_levels_of_every_unit() {
        let expr = Expression::new();
        for (i, a) in Unit::ALL.into_iter().enumerate() {
            let scope = expr.descend(a);
            for (j, b) in Unit::ALL.into_iter().enumerate().skip(i + 1) {
                let unit = scope.descend(b).unwrap().at(0).unwrap();
                for c in Unit::ALL.into_iter().skip(j + 1) {
                    unit.descend(c).unwrap();
                }
            }
        }
    }

    #[test]
    fn test_origin_reaches_every_node() {
        let chain = Expression::with_instant(base())
            .year()
            .month()
            .unwrap()
            .at(3)
            .unwrap()
            .day()
            .unwrap();
        assert_eq!(chain.origin(), Some(base()));
        assert_eq!(chain.root(), Expression::with_instant(base()));
        assert_eq!(chain.scope().unit(), Unit::Year);
    }

    // ── nesting ─────────────────────────────────────────────────────────

    #[test]
    fn test_descend_rejects_coarser_or_equal_unit() {
        let month = Expression::new().month();
        let err = month.descend(Unit::Year).unwrap_err();
        assert!(matches!(err, IntervalError::InvalidNesting(_)), "got: {err}");
        assert!(err.to_string().contains("Month cannot be factored by Year"));

        let err = month.month().unwrap_err();
        assert!(matches!(err, IntervalError::InvalidNesting(_)), "got: {err}");
    }

    #[test]
    fn test_descend_below_unindexed_unit_fails() {
        let month = Expression::new().year().month().unwrap();
        let err = month.day().unwrap_err();
        assert!(matches!(err, IntervalError::InvalidNesting(_)), "got: {err}");
        assert!(err.to_string().contains("before indexing Month"), "got: {err}");
    }

    // ── indexing ────────────────────────────────────────────────────────

    #[test]
    fn test_index_scope_fails() {
        let err = Expression::new().year().at(0).unwrap_err();
        assert!(matches!(err, IntervalError::InvalidIndex(_)), "got: {err}");
    }

    #[test]
    fn test_index_binds_value() {
        let year = Expression::new().year();
        for n in 0..12 {
            let month = year.month().unwrap().at(n).unwrap();
            assert_eq!(month.index(), Some(n));
            for w in 0..6 {
                assert_eq!(month.week().unwrap().at(w).unwrap().index(), Some(w));
            }
        }
    }

    #[test]
    fn test_index_bounds() {
        let month = Expression::new().year().month().unwrap();
        assert_eq!(month.max_index(), Some(12));
        assert!(month.at(12).is_ok());
        assert!(month.at(-13).is_ok());
        assert!(matches!(
            month.at(13).unwrap_err(),
            IntervalError::InvalidIndex(_)
        ));
        assert!(matches!(
            month.at(-14).unwrap_err(),
            IntervalError::InvalidIndex(_)
        ));
    }

    #[test]
    fn test_index_only_once() {
        let day = Expression::new().month().day().unwrap().at(3).unwrap();
        let err = day.at(4).unwrap_err();
        assert!(err.to_string().contains("already indexed"), "got: {err}");
    }

    #[test]
    fn test_index_leaves_unindexed_node_untouched() {
        let day = Expression::new().month().day().unwrap();
        let indexed = day.at(3).unwrap();
        assert_eq!(day.index(), None);
        assert_eq!(indexed.index(), Some(3));
    }

    // ── arithmetic ──────────────────────────────────────────────────────

    #[test]
    fn test_n_only_on_scope() {
        let expr = Expression::new();
        assert_eq!(expr.quarter().n(2).unwrap(), CalendarDelta::months(6));
        let err = expr.year().month().unwrap().at(0).unwrap().n(1).unwrap_err();
        assert!(
            matches!(err, IntervalError::UnsupportedOperand(_)),
            "got: {err}"
        );
    }

    #[test]
    fn test_arithmetic_copies() {
        let expr = Expression::new();
        let day = expr.month().day().unwrap().at(9).unwrap();
        let later = &day + CalendarDelta::hours(3);
        let back = later.clone() - CalendarDelta::hours(1);

        assert!(day.offset().is_zero());
        assert_eq!(later.offset(), CalendarDelta::hours(3));
        assert_eq!(back.offset(), CalendarDelta::hours(2));
        assert_eq!(back.index(), Some(9));
        assert!(Arc::ptr_eq(
            &day.parent().unwrap().node,
            &back.parent().unwrap().node
        ));
    }

    #[test]
    fn test_delta_on_left() {
        let year = Expression::new().year();
        let chain = CalendarDelta::years(2) + year;
        assert_eq!(chain.offset(), CalendarDelta::years(2));
    }

    #[test]
    fn test_chain_combination_not_implemented() {
        let expr = Expression::new();
        let err = (expr.year() + expr.month()).unwrap_err();
        assert!(
            matches!(err, IntervalError::ChainCombination(_)),
            "got: {err}"
        );
        let err = (expr.year() - expr.month()).unwrap_err();
        assert!(
            matches!(err, IntervalError::ChainCombination(_)),
            "got: {err}"
        );
    }

    // ── display ─────────────────────────────────────────────────────────

    #[test]
    fn test_display() {
        let expr = Expression::new();
        let chain = expr
            .year()
            .month()
            .unwrap()
            .at(1)
            .unwrap()
            .day()
            .unwrap()
            .at(-1)
            .unwrap();
        assert_eq!(chain.to_string(), "Year > Month[2] > Day[-1]");

        let shifted = expr.year() - CalendarDelta::years(2);
        assert_eq!(shifted.to_string(), "Year + (-2y)");

        let unindexed = expr.week().day().unwrap();
        assert_eq!(unindexed.to_string(), "Week > Day");
    }

    #[test]
    fn test_chain_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Chain>();
        assert_send_sync::<Expression>();
    }
}
