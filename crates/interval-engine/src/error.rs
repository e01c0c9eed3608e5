//! Error types for interval-engine operations.

use thiserror::Error;

use crate::unit::Unit;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntervalError {
    /// Descending to a unit that is not strictly finer than the current one,
    /// or descending below a unit that has not been indexed yet.
    #[error("Invalid nesting: {0}")]
    InvalidNesting(String),

    #[error("Invalid index: {0}")]
    InvalidIndex(String),

    /// A chain was evaluated with an unindexed unit or without any instant.
    #[error("Incomplete chain: {0}")]
    IncompleteChain(String),

    #[error("Unsupported operand: {0}")]
    UnsupportedOperand(String),

    /// Arithmetic between two chains. Reserved; not implemented yet.
    #[error("Chain combination is not implemented: {0}")]
    ChainCombination(String),

    /// A step changed the value of a coarser unit while rollover was disabled.
    #[error("Rollover detected: {unit} changed from {before} to {after}")]
    Rollover { unit: Unit, before: i64, after: i64 },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Out of range: {0}")]
    OutOfRange(String),
}

pub type Result<T> = std::result::Result<T, IntervalError>;
