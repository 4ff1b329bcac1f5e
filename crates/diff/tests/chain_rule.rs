//! # Chain Rule Tests
//!
//! End-to-end checks through the public API:
//! - y = a*x + b, the canonical example
//! - Sin/Cos derivatives at zero
//! - Error propagation out of nested trees

use approx::assert_relative_eq;
use treegrad_core::expr::{add, apply, cos, exp, literal, multiply, sin, sum};
use treegrad_core::{Arity, GradConfig, GradError, NonFinite, Op, Pass};
use treegrad_diff::{differentiate, differentiate_seeded, evaluate, grad, GradExpr};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// y = a*x + b
// ============================================================================

#[test]
fn test_affine_forward() {
    init_logger();
    let (a, x, b) = (8.0, 3.0, 1.2);
    let y = add(multiply(literal(a), literal(x)), literal(b));
    assert_relative_eq!(evaluate(&y).unwrap(), a * x + b);
}

#[test]
fn test_affine_gradients() {
    init_logger();
    let y = add(multiply(literal(8.0), literal(3.0)), literal(1.2));
    let grads = differentiate(y.as_calc().unwrap()).unwrap();

    let GradExpr::Calc(mul) = &grads.children[0] else {
        panic!("expected a*x to stay a calculation");
    };
    assert_eq!(mul.leaf_grads(), vec![3.0, 8.0]); // grad(a) = x, grad(x) = a
    assert_eq!(grads.leaf_grads()[2], 1.0); // grad(b) = 1
}

#[test]
fn test_affine_gradients_with_seed() {
    let y = add(multiply(literal(8.0), literal(3.0)), literal(1.2));
    let grads = differentiate_seeded(y.as_calc().unwrap(), 3.0).unwrap();
    assert_eq!(grads.leaf_grads(), vec![9.0, 24.0, 3.0]);
}

// ============================================================================
// Operator derivatives
// ============================================================================

#[test]
fn test_sin_at_zero() {
    let e = sin(literal(0.0));
    let grads = differentiate(e.as_calc().unwrap()).unwrap();
    assert_eq!(grads.leaf_grads(), vec![1.0]);
}

#[test]
fn test_cos_at_zero() {
    let e = cos(literal(0.0));
    let grads = differentiate(e.as_calc().unwrap()).unwrap();
    assert_eq!(grads.leaf_grads()[0], 0.0);
}

#[test]
fn test_exp_of_product() {
    // d/da e^(a*b) = b e^(ab)
    let (a, b) = (0.5, -1.5);
    let e = exp(multiply(literal(a), literal(b)));
    let grads = differentiate(e.as_calc().unwrap()).unwrap().leaf_grads();
    assert_relative_eq!(grads[0], b * (a * b).exp(), epsilon = 1e-12);
    assert_relative_eq!(grads[1], a * (a * b).exp(), epsilon = 1e-12);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_malformed_tree_rejected_at_construction() {
    assert_eq!(
        apply(Op::Multiply, vec![]),
        Err(GradError::EmptyOperands { op: "multiply" })
    );
    assert_eq!(
        apply(Op::Exp, vec![literal(1.0), literal(2.0)]),
        Err(GradError::InvalidArity {
            op: "exp",
            expected: Arity::Exactly(1),
            got: 2,
        })
    );
}

#[test]
fn test_domain_error_aborts_deep_traversal() {
    init_logger();
    let e = sum(vec![
        literal(1.0),
        sin(multiply(literal(2.0), exp(literal(800.0)))),
    ])
    .unwrap();

    let expected = GradError::DomainError {
        op: "exp",
        pass: Pass::Forward,
        operands: vec![800.0],
    };
    assert_eq!(evaluate(&e).unwrap_err(), expected);
    assert_eq!(differentiate(e.as_calc().unwrap()).unwrap_err(), expected);
}

#[test]
fn test_propagate_reports_nan_instead_of_failing() {
    init_logger();
    // sin(∞) is NaN, but the ∞ came from exp, which is allowed through
    let e = sin(exp(literal(800.0)));
    let config = GradConfig::new().with_non_finite(NonFinite::Propagate);
    let g = grad(&e, &config).unwrap();
    assert!(g.leaf_grads()[0].is_nan());
}
