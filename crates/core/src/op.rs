//! # Scalar Operators
//!
//! `Op` is the closed catalog of operations that can appear in a
//! calculation node. Each operation knows how to:
//!
//! - Execute forward (operand scalars → one scalar)
//! - Compute local partials (one ∂out/∂operandᵢ per operand)
//!
//! ## Operations
//!
//! | Op | Arity | Forward | Backward |
//! |----|-------|---------|----------|
//! | Add | ≥ 1 | Σ xᵢ | 1 for every operand |
//! | Multiply | ≥ 1 | Π xᵢ | Π_{j≠i} xⱼ |
//! | Exp | 1 | eˣ | eˣ |
//! | Sin | 1 | sin x | cos x |
//! | Cos | 1 | cos x | −sin x |
//!
//! Operators are stateless and `Copy`, so any number of nodes can share one.
//! They only check arity; whether a non-finite result is an error is decided
//! by the traversal (see [`crate::config::NonFinite`]).

use std::fmt;

use crate::error::GradError;

/// How many operands an operator accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly `n` operands.
    Exactly(usize),
    /// `n` or more operands.
    AtLeast(usize),
}

impl Arity {
    /// Whether `count` operands satisfy this arity.
    pub fn accepts(&self, count: usize) -> bool {
        match *self {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "exactly {}", n),
            Arity::AtLeast(n) => write!(f, "at least {}", n),
        }
    }
}

/// Scalar operations for expression trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Sum of all operands.
    Add,

    /// Product of all operands.
    Multiply,

    /// Natural exponential: eˣ
    Exp,

    /// Sine (radians).
    Sin,

    /// Cosine (radians).
    Cos,
}

impl Op {
    /// Every operator in the catalog.
    pub const ALL: [Op; 5] = [Op::Add, Op::Multiply, Op::Exp, Op::Sin, Op::Cos];

    /// Display symbol. Presentation only.
    pub fn symbol(&self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Multiply => "*",
            Op::Exp => "e^",
            Op::Sin => "sin",
            Op::Cos => "cos",
        }
    }

    /// Identifier used in error messages and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Op::Add => "add",
            Op::Multiply => "multiply",
            Op::Exp => "exp",
            Op::Sin => "sin",
            Op::Cos => "cos",
        }
    }

    /// Number of operands this operator expects.
    pub fn arity(&self) -> Arity {
        match self {
            Op::Add | Op::Multiply => Arity::AtLeast(1),
            Op::Exp | Op::Sin | Op::Cos => Arity::Exactly(1),
        }
    }

    /// Whether the operator takes a variable number of operands.
    pub fn is_variadic(&self) -> bool {
        matches!(self.arity(), Arity::AtLeast(_))
    }

    /// Fail with `InvalidArity` unless `count` operands are acceptable.
    pub fn check_arity(&self, count: usize) -> Result<(), GradError> {
        if self.arity().accepts(count) {
            Ok(())
        } else {
            Err(GradError::InvalidArity {
                op: self.name(),
                expected: self.arity(),
                got: count,
            })
        }
    }

    /// Execute the forward pass over the ordered operands.
    pub fn forward(&self, operands: &[f64]) -> Result<f64, GradError> {
        self.check_arity(operands.len())?;

        let value = match self {
            Op::Add => operands.iter().sum(),
            Op::Multiply => operands.iter().product(),
            Op::Exp => operands[0].exp(),
            Op::Sin => operands[0].sin(),
            Op::Cos => operands[0].cos(),
        };
        Ok(value)
    }

    /// Local partial derivative of the output with respect to each operand,
    /// evaluated at `operands`. The result has one entry per operand, in
    /// operand order.
    pub fn backward(&self, operands: &[f64]) -> Result<Vec<f64>, GradError> {
        self.check_arity(operands.len())?;

        let partials = match self {
            // z = Σ xᵢ  →  ∂z/∂xᵢ = 1
            Op::Add => vec![1.0; operands.len()],

            // z = Π xⱼ  →  ∂z/∂xᵢ = Π_{j≠i} xⱼ
            // Computed from prefix/suffix products so a zero operand
            // never divides.
            Op::Multiply => {
                let mut partials = Vec::with_capacity(operands.len());
                let mut prefix = 1.0f64;
                for x in operands {
                    partials.push(prefix);
                    prefix *= *x;
                }
                let mut suffix = 1.0f64;
                for (partial, x) in partials.iter_mut().zip(operands).rev() {
                    *partial *= suffix;
                    suffix *= *x;
                }
                partials
            }

            // d/dx eˣ = eˣ
            Op::Exp => vec![operands[0].exp()],

            Op::Sin => vec![operands[0].cos()],

            Op::Cos => vec![-operands[0].sin()],
        };
        Ok(partials)
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}
