//! # Error Types
//!
//! Errors in treegrad are local to a single traversal: an operator either
//! receives operands it cannot work with, or produces a value outside the
//! reals. Either way the walk stops and the error travels back to the
//! caller with no partial result.

use std::fmt;

use thiserror::Error;

use crate::op::Arity;

/// Which half of an operator raised a domain error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    /// `Op::forward`
    Forward,
    /// `Op::backward`
    Backward,
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pass::Forward => write!(f, "forward"),
            Pass::Backward => write!(f, "backward"),
        }
    }
}

/// Errors raised while building, evaluating or differentiating expressions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GradError {
    /// Operator called with an operand count it does not support.
    #[error("Invalid arity for {op}: expected {expected} operand(s), got {got}")]
    InvalidArity {
        op: &'static str,
        expected: Arity,
        got: usize,
    },

    /// A calculation node with no children.
    #[error("Malformed tree: {op} applied to zero operands")]
    EmptyOperands { op: &'static str },

    /// Finite operands produced a NaN or infinite result.
    #[error("Domain error in {op} {pass} at operands {operands:?}")]
    DomainError {
        op: &'static str,
        pass: Pass,
        operands: Vec<f64>,
    },

    /// A cached forward value tree does not line up with the expression it
    /// is paired with.
    #[error("Forward cache mismatch at {op}: node has {expected} operand(s), cache has {got}")]
    CacheMismatch {
        op: &'static str,
        expected: usize,
        got: usize,
    },

    /// A leaf index past the last leaf of an expression.
    #[error("Leaf index {index} out of range for expression with {leaves} leaves")]
    LeafOutOfRange { index: usize, leaves: usize },
}
