//! # Diff - Reverse-Mode Autodiff over Expression Trees
//!
//! This crate evaluates and differentiates the scalar expression trees
//! defined in `treegrad-core`.
//!
//! ## Core Concepts
//!
//! - **Forward pass** — post-order walk, children before their operator
//! - **Backward pass** — pre-order walk, chain rule from the root down
//! - **Seed** — the root's upstream gradient, 1 by default (∂y/∂y)
//! - **Shadow tree** — differentiation returns a new tree of the same shape
//!   whose leaves carry their gradients
//!
//! ## Modules
//!
//! - [`forward`] — Evaluation and the cached forward pass
//! - [`backward`] — Differentiation and numerical gradient checking
//!
//! ## Example
//!
//! ```rust
//! use treegrad_core::expr::{add, literal, multiply, sin};
//! use treegrad_diff::{differentiate, evaluate};
//!
//! // y = sin(a * x) + b
//! let y = add(sin(multiply(literal(0.5), literal(2.0))), literal(1.0));
//! let value = evaluate(&y).unwrap();
//! assert!((value - (1.0f64.sin() + 1.0)).abs() < 1e-12);
//!
//! let grads = differentiate(y.as_calc().unwrap()).unwrap();
//! assert_eq!(grads.leaf_grads().len(), 3);
//! ```

pub mod backward;
pub mod forward;

// Re-export key types
pub use backward::{
    differentiate, differentiate_seeded, differentiate_with, grad, grad_check, GradCalc,
    GradCheckError, GradExpr,
};
pub use forward::{evaluate, evaluate_with, forward_with_cache, ValueTree};
