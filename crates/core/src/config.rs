//! Options shared by the forward and backward traversals.

use log::warn;

use crate::error::{GradError, Pass};
use crate::op::Op;

/// What to do when an operator turns finite operands into NaN or ±∞.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NonFinite {
    /// Stop the traversal with `GradError::DomainError`.
    #[default]
    Reject,
    /// Let the value flow through unchanged.
    Propagate,
}

impl NonFinite {
    /// Apply the policy to the `results` of running `op` over `operands`.
    ///
    /// Only the operator that first leaves the reals is blamed: if any
    /// operand is already non-finite the results pass unchecked.
    pub fn check(
        &self,
        op: Op,
        pass: Pass,
        operands: &[f64],
        results: &[f64],
    ) -> Result<(), GradError> {
        if results.iter().all(|r| r.is_finite()) || !operands.iter().all(|x| x.is_finite()) {
            return Ok(());
        }
        match self {
            NonFinite::Reject => Err(GradError::DomainError {
                op: op.name(),
                pass,
                operands: operands.to_vec(),
            }),
            NonFinite::Propagate => {
                warn!(
                    "{} {} produced {:?} from operands {:?}",
                    op.name(),
                    pass,
                    results,
                    operands
                );
                Ok(())
            }
        }
    }
}

/// Differentiation options.
///
/// ```rust
/// use treegrad_core::config::{GradConfig, NonFinite};
///
/// let config = GradConfig::new()
///     .with_seed(2.0)
///     .with_non_finite(NonFinite::Propagate);
/// assert_eq!(config.seed, 2.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradConfig {
    /// Upstream gradient fed into the root, ∂loss/∂root.
    pub seed: f64,
    /// Policy for non-finite operator results.
    pub non_finite: NonFinite,
}

impl GradConfig {
    /// Seed 1.0 (gradient of the output with respect to itself), rejecting
    /// non-finite results.
    pub fn new() -> Self {
        Self {
            seed: 1.0,
            non_finite: NonFinite::Reject,
        }
    }

    pub fn with_seed(mut self, seed: f64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_non_finite(mut self, non_finite: NonFinite) -> Self {
        self.non_finite = non_finite;
        self
    }
}

impl Default for GradConfig {
    fn default() -> Self {
        Self::new()
    }
}
