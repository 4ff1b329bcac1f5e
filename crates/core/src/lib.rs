//! # Core - Scalar Expression Trees
//!
//! This crate provides the data model for treegrad:
//!
//! - **Operators**: The closed catalog of scalar operations, each with a
//!   forward function and its local partial derivatives
//! - **Expressions**: Immutable trees of literals and operator applications
//! - **Errors**: Arity, malformed-tree and domain failures
//! - **Config**: Seed gradient and non-finite policy for the traversals
//! - **Render**: One-line and indented presentation of trees
//!
//! Evaluation and differentiation live in `treegrad-diff`.

pub mod config;
pub mod error;
pub mod expr;
pub mod op;
pub mod render;

// Re-export key types at crate root for convenience
pub use config::{GradConfig, NonFinite};
pub use error::{GradError, Pass};
pub use expr::{add, apply, cos, exp, literal, multiply, product, sin, sum, Calc, Expr};
pub use op::{Arity, Op};
pub use render::RenderNode;
