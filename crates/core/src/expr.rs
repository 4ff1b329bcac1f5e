//! # Expressions
//!
//! An [`Expr`] is either a literal scalar or a calculation: an operator
//! applied to an ordered, non-empty list of child expressions. Children are
//! owned by their parent, so every expression is a strict tree. The tree is
//! lazy; nothing is computed until it is evaluated.
//!
//! ## Example
//!
//! ```rust
//! use treegrad_core::expr::{add, literal, multiply};
//!
//! //          y
//! //          |
//! //          +
//! //        /   \
//! //      *      b
//! //    /   \
//! //  a       x
//! let y = add(multiply(literal(8.0), literal(3.0)), literal(1.2));
//! assert_eq!(y.depth(), 3);
//! assert_eq!(y.leaves(), vec![8.0, 3.0, 1.2]);
//! ```

use crate::error::GradError;
use crate::op::Op;

/// A scalar expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A fixed scalar leaf.
    Literal(f64),
    /// An operator applied to child expressions.
    Calc(Calc),
}

/// An operator together with the children it is applied to.
///
/// Only constructed through [`apply`] and the helpers in this module, which
/// guarantee the child count satisfies the operator's arity.
#[derive(Debug, Clone, PartialEq)]
pub struct Calc {
    op: Op,
    children: Vec<Expr>,
}

impl Calc {
    /// The operator at this node.
    pub fn op(&self) -> Op {
        self.op
    }

    /// Child expressions, in operand order.
    pub fn children(&self) -> &[Expr] {
        &self.children
    }

    /// Number of operands.
    pub fn arity(&self) -> usize {
        self.children.len()
    }
}

impl Expr {
    /// The calculation node, if this is not a literal.
    pub fn as_calc(&self) -> Option<&Calc> {
        match self {
            Expr::Literal(_) => None,
            Expr::Calc(calc) => Some(calc),
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Literal(_))
    }

    /// Number of nodes on the longest root-to-leaf path.
    pub fn depth(&self) -> usize {
        match self {
            Expr::Literal(_) => 1,
            Expr::Calc(calc) => 1 + calc.children.iter().map(Expr::depth).max().unwrap_or(0),
        }
    }

    /// Total number of nodes, leaves included.
    pub fn node_count(&self) -> usize {
        match self {
            Expr::Literal(_) => 1,
            Expr::Calc(calc) => 1 + calc.children.iter().map(Expr::node_count).sum::<usize>(),
        }
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            Expr::Literal(_) => 1,
            Expr::Calc(calc) => calc.children.iter().map(Expr::leaf_count).sum(),
        }
    }

    /// Leaf values from left to right.
    pub fn leaves(&self) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.leaf_count());
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(&self, out: &mut Vec<f64>) {
        match self {
            Expr::Literal(value) => out.push(*value),
            Expr::Calc(calc) => {
                for child in &calc.children {
                    child.collect_leaves(out);
                }
            }
        }
    }

    /// Copy of this tree with the `index`-th leaf (left to right) replaced by
    /// `value`. Indices past the last leaf leave the tree unchanged.
    pub fn with_leaf(&self, index: usize, value: f64) -> Expr {
        let mut counter = 0;
        self.replace_leaf(index, value, &mut counter)
    }

    fn replace_leaf(&self, index: usize, value: f64, counter: &mut usize) -> Expr {
        match self {
            Expr::Literal(v) => {
                let here = *counter;
                *counter += 1;
                Expr::Literal(if here == index { value } else { *v })
            }
            Expr::Calc(calc) => Expr::Calc(Calc {
                op: calc.op,
                children: calc
                    .children
                    .iter()
                    .map(|child| child.replace_leaf(index, value, counter))
                    .collect(),
            }),
        }
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Literal(value)
    }
}

// ============================================================================
// Composition helpers
// ============================================================================

/// Wrap a scalar as a leaf.
pub fn literal(value: f64) -> Expr {
    Expr::Literal(value)
}

/// Apply `op` to `children`.
///
/// Rejects an empty child list (`EmptyOperands`) and any count the operator
/// does not accept (`InvalidArity`), so a built tree never fails on arity
/// later.
pub fn apply(op: Op, children: Vec<Expr>) -> Result<Expr, GradError> {
    if children.is_empty() {
        return Err(GradError::EmptyOperands { op: op.name() });
    }
    op.check_arity(children.len())?;
    Ok(Expr::Calc(Calc { op, children }))
}

/// a + b
///
/// Builds the node directly rather than through [`apply`]: two operands
/// always satisfy `Add`'s arity, so construction cannot fail.
pub fn add(a: Expr, b: Expr) -> Expr {
    Expr::Calc(Calc {
        op: Op::Add,
        children: vec![a, b],
    })
}

/// a * b, infallible like [`add`].
pub fn multiply(a: Expr, b: Expr) -> Expr {
    Expr::Calc(Calc {
        op: Op::Multiply,
        children: vec![a, b],
    })
}

/// eˣ
pub fn exp(x: Expr) -> Expr {
    unary(Op::Exp, x)
}

pub fn sin(x: Expr) -> Expr {
    unary(Op::Sin, x)
}

pub fn cos(x: Expr) -> Expr {
    unary(Op::Cos, x)
}

/// Σ terms, for any non-empty list.
pub fn sum(terms: Vec<Expr>) -> Result<Expr, GradError> {
    apply(Op::Add, terms)
}

/// Π factors, for any non-empty list.
pub fn product(factors: Vec<Expr>) -> Result<Expr, GradError> {
    apply(Op::Multiply, factors)
}

// Only called with Exp, Sin or Cos, all of arity exactly 1.
fn unary(op: Op, x: Expr) -> Expr {
    Expr::Calc(Calc {
        op,
        children: vec![x],
    })
}
