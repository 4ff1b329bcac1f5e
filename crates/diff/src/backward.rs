//! # Backward Pass - Reverse-Mode Autodiff
//!
//! This module walks an expression tree from the root to its leaves,
//! applying the chain rule at every calculation node:
//!
//! - The node's operator yields one local partial per child
//! - Each partial is scaled by the upstream gradient flowing into the node
//! - A literal child keeps the scaled value as its gradient; a calculation
//!   child receives it as its own upstream gradient
//!
//! The result is a [`GradExpr`], a fresh tree with the same shape as the
//! source in which every leaf carries ∂root/∂leaf.
//!
//! ## Example
//!
//! ```rust
//! use treegrad_core::expr::{add, literal, multiply};
//! use treegrad_diff::backward::differentiate;
//!
//! // y = a*x + b with a = 8, x = 3, b = 1.2
//! let y = add(multiply(literal(8.0), literal(3.0)), literal(1.2));
//! let grads = differentiate(y.as_calc().unwrap()).unwrap();
//!
//! // [∂y/∂a, ∂y/∂x, ∂y/∂b] = [x, a, 1]
//! assert_eq!(grads.leaf_grads(), vec![3.0, 8.0, 1.0]);
//! ```

use std::fmt;

use log::{debug, trace};
use thiserror::Error;
use treegrad_core::render::{write_application, RenderNode};
use treegrad_core::{Calc, Expr, GradConfig, GradError, NonFinite, Op, Pass};

use crate::forward::{evaluate_with, forward_calc, ValueTree};

/// An expression annotated with gradients.
#[derive(Debug, Clone, PartialEq)]
pub enum GradExpr {
    /// A source leaf with its accumulated gradient ∂root/∂value.
    Literal { value: f64, grad: f64 },
    /// A differentiated calculation node.
    Calc(GradCalc),
}

/// A calculation node whose children have been differentiated.
///
/// Intermediate nodes carry no gradient of their own; only leaves do.
#[derive(Debug, Clone, PartialEq)]
pub struct GradCalc {
    /// Same operator as the source node
    pub op: Op,
    /// Differentiated children, in operand order
    pub children: Vec<GradExpr>,
}

impl GradExpr {
    /// Leaf gradients from left to right, parallel to [`Expr::leaves`].
    pub fn leaf_grads(&self) -> Vec<f64> {
        let mut out = Vec::new();
        self.collect_leaf_grads(&mut out);
        out
    }

    fn collect_leaf_grads(&self, out: &mut Vec<f64>) {
        match self {
            GradExpr::Literal { grad, .. } => out.push(*grad),
            GradExpr::Calc(calc) => {
                for child in &calc.children {
                    child.collect_leaf_grads(out);
                }
            }
        }
    }

    /// Leaf values from left to right.
    pub fn leaf_values(&self) -> Vec<f64> {
        match self {
            GradExpr::Literal { value, .. } => vec![*value],
            GradExpr::Calc(calc) => calc.children.iter().flat_map(|c| c.leaf_values()).collect(),
        }
    }

    /// Whether this tree has the same nesting, arities and operators as
    /// `expr`, with the same leaf values.
    pub fn same_shape(&self, expr: &Expr) -> bool {
        match (self, expr) {
            (GradExpr::Literal { value, .. }, Expr::Literal(source)) => {
                value.to_bits() == source.to_bits()
            }
            (GradExpr::Calc(calc), Expr::Calc(source)) => calc.same_shape(source),
            _ => false,
        }
    }
}

impl GradCalc {
    /// Leaf gradients from left to right.
    pub fn leaf_grads(&self) -> Vec<f64> {
        self.children.iter().flat_map(|c| c.leaf_grads()).collect()
    }

    pub fn same_shape(&self, source: &Calc) -> bool {
        self.op == source.op()
            && self.children.len() == source.arity()
            && self
                .children
                .iter()
                .zip(source.children())
                .all(|(g, e)| g.same_shape(e))
    }
}

impl From<GradCalc> for GradExpr {
    fn from(calc: GradCalc) -> Self {
        GradExpr::Calc(calc)
    }
}

/// Differentiate with the standard seed ∂root/∂root = 1.
pub fn differentiate(calc: &Calc) -> Result<GradCalc, GradError> {
    differentiate_with(calc, &GradConfig::default())
}

/// Differentiate with an explicit upstream gradient for the root.
pub fn differentiate_seeded(calc: &Calc, upstream: f64) -> Result<GradCalc, GradError> {
    differentiate_with(calc, &GradConfig::new().with_seed(upstream))
}

/// Differentiate under `config`.
///
/// Runs one cached forward pass, then one backward pass; every node is
/// evaluated and visited exactly once.
pub fn differentiate_with(calc: &Calc, config: &GradConfig) -> Result<GradCalc, GradError> {
    debug!(
        "differentiate: {} at seed {}",
        calc.op().name(),
        config.seed
    );
    let cache = forward_calc(calc, config.non_finite)?;
    backward(calc, &cache, config.seed, config.non_finite)
}

/// Gradient tree for any expression, including a bare literal (whose
/// gradient is the seed itself).
pub fn grad(expr: &Expr, config: &GradConfig) -> Result<GradExpr, GradError> {
    match expr {
        Expr::Literal(value) => Ok(GradExpr::Literal {
            value: *value,
            grad: config.seed,
        }),
        Expr::Calc(calc) => differentiate_with(calc, config).map(GradExpr::from),
    }
}

/// Backward pass over a calculation whose forward values are in `cache`.
///
/// `cache` must come from [`forward_calc`] on the same node; a cache whose
/// child count differs from the node's at any level fails with
/// `CacheMismatch`.
pub fn backward(
    calc: &Calc,
    cache: &ValueTree,
    upstream: f64,
    non_finite: NonFinite,
) -> Result<GradCalc, GradError> {
    let op = calc.op();
    if cache.children.len() != calc.arity() {
        return Err(GradError::CacheMismatch {
            op: op.name(),
            expected: calc.arity(),
            got: cache.children.len(),
        });
    }
    let operands = cache.operands();

    let local = op.backward(&operands)?;
    non_finite.check(op, Pass::Backward, &operands, &local)?;
    trace!("{} backward {:?} x {}", op.name(), local, upstream);

    // Chain rule: ∂root/∂child = ∂node/∂child · ∂root/∂node
    let children = calc
        .children()
        .iter()
        .zip(&cache.children)
        .zip(local)
        .map(|((child, child_cache), partial)| {
            let grad = partial * upstream;
            match child {
                Expr::Literal(value) => Ok(GradExpr::Literal {
                    value: *value,
                    grad,
                }),
                Expr::Calc(child_calc) => {
                    backward(child_calc, child_cache, grad, non_finite).map(GradExpr::from)
                }
            }
        })
        .collect::<Result<Vec<GradExpr>, GradError>>()?;

    Ok(GradCalc { op, children })
}

// ============================================================================
// Gradient checking
// ============================================================================

/// Error from gradient checking.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GradCheckError {
    /// Analytical and numerical gradients disagree at a leaf.
    #[error(
        "Gradient mismatch at leaf {leaf}: analytical={analytical}, numerical={numerical}, diff={diff}"
    )]
    Mismatch {
        leaf: usize,
        analytical: f64,
        numerical: f64,
        diff: f64,
    },

    /// Evaluation or differentiation itself failed.
    #[error(transparent)]
    Grad(#[from] GradError),
}

/// Numerical gradient of `expr` with respect to its `leaf`-th leaf.
///
/// Uses central differences: (f(x+h) - f(x-h)) / 2h
pub fn numerical_gradient(expr: &Expr, leaf: usize, h: f64) -> Result<f64, GradError> {
    let leaves = expr.leaves();
    let x = leaves
        .get(leaf)
        .copied()
        .ok_or(GradError::LeafOutOfRange {
            index: leaf,
            leaves: leaves.len(),
        })?;
    let f_plus = evaluate_with(&expr.with_leaf(leaf, x + h), NonFinite::Reject)?;
    let f_minus = evaluate_with(&expr.with_leaf(leaf, x - h), NonFinite::Reject)?;
    Ok((f_plus - f_minus) / (2.0 * h))
}

/// Check analytical gradients of every leaf against numerical ones.
///
/// # Arguments
///
/// * `expr` - The expression to check
/// * `h` - Step size for numerical differentiation (e.g., 1e-6)
/// * `tolerance` - Maximum allowed difference, relative for large values
pub fn grad_check(expr: &Expr, h: f64, tolerance: f64) -> Result<(), GradCheckError> {
    let analytical_grads = grad(expr, &GradConfig::default())?.leaf_grads();

    for (leaf, &analytical) in analytical_grads.iter().enumerate() {
        let numerical = numerical_gradient(expr, leaf, h)?;
        let diff = (numerical - analytical).abs();

        let scale = analytical.abs().max(numerical.abs()).max(1.0);
        if diff / scale > tolerance {
            return Err(GradCheckError::Mismatch {
                leaf,
                analytical,
                numerical,
                diff,
            });
        }
    }

    Ok(())
}

// ============================================================================
// Presentation
// ============================================================================

impl RenderNode for GradExpr {
    fn label(&self) -> String {
        match self {
            GradExpr::Literal { value, grad } => format!("{} (grad={})", value, grad),
            GradExpr::Calc(calc) => calc.op.symbol().to_string(),
        }
    }

    fn child_nodes(&self) -> Vec<&Self> {
        match self {
            GradExpr::Literal { .. } => Vec::new(),
            GradExpr::Calc(calc) => calc.children.iter().collect(),
        }
    }
}

impl fmt::Display for GradExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradExpr::Literal { value, grad } => write!(f, "{}{{grad={}}}", value, grad),
            GradExpr::Calc(calc) => write!(f, "{}", calc),
        }
    }
}

impl fmt::Display for GradCalc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operands: Vec<String> = self.children.iter().map(|c| c.to_string()).collect();
        write_application(f, self.op, &operands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use treegrad_core::expr::{add, cos, exp, literal, multiply, product, sin, sum};
    use treegrad_core::render::tree;

    fn affine() -> Expr {
        // y = a*x + b
        add(multiply(literal(8.0), literal(3.0)), literal(1.2))
    }

    #[test]
    fn test_backward_affine() {
        let y = affine();
        let grads = differentiate(y.as_calc().unwrap()).unwrap();

        // grad(a) = x, grad(x) = a, grad(b) = 1
        assert_eq!(grads.leaf_grads(), vec![3.0, 8.0, 1.0]);
    }

    #[test]
    fn test_backward_structure() {
        let y = affine();
        let grads = differentiate(y.as_calc().unwrap()).unwrap();

        assert_eq!(grads.op, Op::Add);
        assert_eq!(grads.children.len(), 2);
        match &grads.children[0] {
            GradExpr::Calc(mul) => {
                assert_eq!(mul.op, Op::Multiply);
                assert_eq!(
                    mul.children[0],
                    GradExpr::Literal {
                        value: 8.0,
                        grad: 3.0
                    }
                );
            }
            other => panic!("expected calculation, got {:?}", other),
        }
        assert_eq!(
            grads.children[1],
            GradExpr::Literal {
                value: 1.2,
                grad: 1.0
            }
        );
    }

    #[test]
    fn test_default_seed_is_one() {
        let y = affine();
        let calc = y.as_calc().unwrap();
        assert_eq!(
            differentiate(calc).unwrap(),
            differentiate_seeded(calc, 1.0).unwrap()
        );
    }

    #[test]
    fn test_seed_scales_leaf_grads() {
        let y = affine();
        let calc = y.as_calc().unwrap();
        let scaled = differentiate_seeded(calc, -2.5).unwrap();
        assert_eq!(scaled.leaf_grads(), vec![-7.5, -20.0, -2.5]);
    }

    #[test]
    fn test_sin_cos_at_zero() {
        let s = sin(literal(0.0));
        let grads = differentiate(s.as_calc().unwrap()).unwrap();
        assert_eq!(grads.leaf_grads(), vec![1.0]);

        let c = cos(literal(0.0));
        let grads = differentiate(c.as_calc().unwrap()).unwrap();
        assert_eq!(grads.leaf_grads()[0], 0.0);
    }

    #[test]
    fn test_exp_gradient_is_exp() {
        let e = exp(literal(2.0));
        let grads = differentiate(e.as_calc().unwrap()).unwrap();
        assert_relative_eq!(grads.leaf_grads()[0], 2.0f64.exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_chain_through_unary() {
        // d/dx sin(x * y) = y cos(xy), d/dy = x cos(xy)
        let (x, y) = (0.7, 1.3);
        let e = sin(multiply(literal(x), literal(y)));
        let grads = differentiate(e.as_calc().unwrap()).unwrap().leaf_grads();
        assert_relative_eq!(grads[0], y * (x * y).cos(), epsilon = 1e-12);
        assert_relative_eq!(grads[1], x * (x * y).cos(), epsilon = 1e-12);
    }

    #[test]
    fn test_variadic_gradients() {
        let s = sum(vec![literal(1.0), literal(2.0), literal(3.0)]).unwrap();
        let grads = differentiate(s.as_calc().unwrap()).unwrap();
        assert_eq!(grads.leaf_grads(), vec![1.0, 1.0, 1.0]);

        let p = product(vec![literal(2.0), literal(3.0), literal(4.0)]).unwrap();
        let grads = differentiate(p.as_calc().unwrap()).unwrap();
        assert_eq!(grads.leaf_grads(), vec![12.0, 8.0, 6.0]);
    }

    #[test]
    fn test_zero_factor_gradient_is_finite() {
        // y = 0 * x: ∂y/∂x = 0, ∂y/∂0 = x
        let y = multiply(literal(0.0), literal(5.0));
        let grads = differentiate(y.as_calc().unwrap()).unwrap();
        assert_eq!(grads.leaf_grads(), vec![5.0, 0.0]);
    }

    #[test]
    fn test_backward_overflow_is_domain_error() {
        // exp(710) overflows f64 before the backward pass starts
        let e = exp(literal(710.0));
        let err = differentiate(e.as_calc().unwrap()).unwrap_err();
        assert!(matches!(
            err,
            GradError::DomainError {
                op: "exp",
                pass: Pass::Forward,
                ..
            }
        ));
    }

    #[test]
    fn test_propagate_policy_keeps_infinity() {
        let e = exp(literal(710.0));
        let config = GradConfig::new().with_non_finite(NonFinite::Propagate);
        let grads = differentiate_with(e.as_calc().unwrap(), &config).unwrap();
        assert!(grads.leaf_grads()[0].is_infinite());
    }

    #[test]
    fn test_grad_on_literal_root() {
        let config = GradConfig::new().with_seed(4.0);
        let g = grad(&literal(9.0), &config).unwrap();
        assert_eq!(
            g,
            GradExpr::Literal {
                value: 9.0,
                grad: 4.0
            }
        );
        assert!(g.same_shape(&literal(9.0)));
    }

    #[test]
    fn test_same_shape() {
        let y = affine();
        let g = grad(&y, &GradConfig::default()).unwrap();
        assert!(g.same_shape(&y));
        assert_eq!(g.leaf_values(), y.leaves());
        assert!(!g.same_shape(&add(literal(8.0), literal(3.0))));
    }

    #[test]
    fn test_grad_check_passes() {
        let e = add(
            multiply(sin(literal(0.4)), exp(literal(0.3))),
            cos(multiply(literal(1.1), literal(-0.6))),
        );
        let result = grad_check(&e, 1e-6, 1e-5);
        assert!(result.is_ok(), "Grad check failed: {:?}", result);
    }

    #[test]
    fn test_numerical_gradient_affine() {
        let y = affine();
        assert_relative_eq!(numerical_gradient(&y, 0, 1e-6).unwrap(), 3.0, epsilon = 1e-6);
        assert_relative_eq!(numerical_gradient(&y, 2, 1e-6).unwrap(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_numerical_gradient_leaf_out_of_range() {
        let y = multiply(literal(2.0), literal(3.0));
        let err = numerical_gradient(&y, 5, 1e-6).unwrap_err();
        assert_eq!(err, GradError::LeafOutOfRange { index: 5, leaves: 2 });
    }

    #[test]
    fn test_backward_rejects_cache_of_other_arity() {
        let three = sum(vec![literal(1.0), literal(2.0), literal(3.0)]).unwrap();
        let two = add(literal(1.0), literal(2.0));
        let cache = forward_calc(two.as_calc().unwrap(), NonFinite::Reject).unwrap();

        let err = backward(three.as_calc().unwrap(), &cache, 1.0, NonFinite::Reject).unwrap_err();
        assert_eq!(
            err,
            GradError::CacheMismatch {
                op: "add",
                expected: 3,
                got: 2,
            }
        );
    }

    #[test]
    fn test_backward_rejects_nested_cache_mismatch() {
        // Same root arity, but the cache has a leaf where the node has sin(x).
        let e = add(sin(literal(0.5)), literal(1.0));
        let flat = add(literal(0.5), literal(1.0));
        let cache = forward_calc(flat.as_calc().unwrap(), NonFinite::Reject).unwrap();

        let err = backward(e.as_calc().unwrap(), &cache, 1.0, NonFinite::Reject).unwrap_err();
        assert!(matches!(
            err,
            GradError::CacheMismatch {
                op: "sin",
                expected: 1,
                got: 0,
            }
        ));
    }

    #[test]
    fn test_backward_with_matching_cache() {
        let y = affine();
        let calc = y.as_calc().unwrap();
        let cache = forward_calc(calc, NonFinite::Reject).unwrap();
        let grads = backward(calc, &cache, 1.0, NonFinite::Reject).unwrap();
        assert!(grads.same_shape(calc));
        assert_eq!(GradExpr::from(grads.clone()), GradExpr::Calc(grads));
    }

    #[test]
    fn test_display() {
        let y = affine();
        let g = grad(&y, &GradConfig::default()).unwrap();
        assert_eq!(g.to_string(), "((8{grad=3} * 3{grad=8}) + 1.2{grad=1})");
    }

    #[test]
    fn test_tree_dump() {
        let g = grad(&sin(literal(0.0)), &GradConfig::default()).unwrap();
        assert_eq!(tree(&g), "sin\n  0 (grad=1)\n");
    }
}
