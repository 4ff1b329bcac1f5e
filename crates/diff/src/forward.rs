//! # Forward Evaluation
//!
//! This module implements forward evaluation of expression trees, the
//! deterministic semantics that maps an expression to its scalar value.
//!
//! ## Key Concepts
//!
//! - **Post-order**: Every child is fully resolved before its parent's
//!   operator runs
//! - **Value cache**: [`forward_with_cache`] keeps each node's value in a
//!   tree shaped like the expression, so the backward pass never
//!   re-evaluates a subtree
//!
//! ## Example
//!
//! ```rust
//! use treegrad_core::expr::{add, literal, multiply};
//! use treegrad_diff::forward::evaluate;
//!
//! let y = add(multiply(literal(8.0), literal(3.0)), literal(1.2));
//! assert_eq!(evaluate(&y).unwrap(), 25.2);
//! ```

use log::{debug, trace};
use treegrad_core::{Calc, Expr, GradError, NonFinite, Pass};

/// Forward value of one node, with the values of its children.
///
/// Mirrors the shape of the [`Expr`] it was computed from: a literal
/// produces a node with no children.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTree {
    /// Value of this node.
    pub value: f64,
    /// Cached children, in operand order.
    pub children: Vec<ValueTree>,
}

impl ValueTree {
    /// The children's values, i.e. the operands this node's operator saw.
    pub fn operands(&self) -> Vec<f64> {
        self.children.iter().map(|c| c.value).collect()
    }
}

/// Evaluate an expression, rejecting non-finite operator results.
pub fn evaluate(expr: &Expr) -> Result<f64, GradError> {
    evaluate_with(expr, NonFinite::Reject)
}

/// Evaluate an expression under the given non-finite policy.
pub fn evaluate_with(expr: &Expr, non_finite: NonFinite) -> Result<f64, GradError> {
    debug!("evaluate: {} nodes", expr.node_count());
    eval_node(expr, non_finite)
}

fn eval_node(expr: &Expr, non_finite: NonFinite) -> Result<f64, GradError> {
    match expr {
        Expr::Literal(value) => Ok(*value),
        Expr::Calc(calc) => {
            let operands = calc
                .children()
                .iter()
                .map(|child| eval_node(child, non_finite))
                .collect::<Result<Vec<f64>, GradError>>()?;
            let value = calc.op().forward(&operands)?;
            trace!("{}{:?} = {}", calc.op().name(), operands, value);
            non_finite.check(calc.op(), Pass::Forward, &operands, &[value])?;
            Ok(value)
        }
    }
}

/// Forward pass that keeps every intermediate value for the backward pass.
pub fn forward_with_cache(expr: &Expr, non_finite: NonFinite) -> Result<ValueTree, GradError> {
    match expr {
        Expr::Literal(value) => Ok(ValueTree {
            value: *value,
            children: Vec::new(),
        }),
        Expr::Calc(calc) => forward_calc(calc, non_finite),
    }
}

/// [`forward_with_cache`] for a calculation node.
pub fn forward_calc(calc: &Calc, non_finite: NonFinite) -> Result<ValueTree, GradError> {
    let children = calc
        .children()
        .iter()
        .map(|child| forward_with_cache(child, non_finite))
        .collect::<Result<Vec<ValueTree>, GradError>>()?;
    let operands: Vec<f64> = children.iter().map(|c| c.value).collect();
    let value = calc.op().forward(&operands)?;
    trace!("{}{:?} = {}", calc.op().name(), operands, value);
    non_finite.check(calc.op(), Pass::Forward, &operands, &[value])?;
    Ok(ValueTree { value, children })
}
