//! Error types for spline construction.

use thiserror::Error;

/// Errors raised while building an interpolant from knots.
#[derive(Debug, Error, PartialEq)]
pub enum SplineError {
    #[error("x and y knot arrays differ in length ({x_len} vs {y_len})")]
    LengthMismatch { x_len: usize, y_len: usize },

    #[error("Need at least 2 knots, got {found}")]
    TooFewKnots { found: usize },

    #[error("Knot abscissas must be finite and strictly increasing: x[{index}] = {current} after {previous}")]
    NotIncreasing {
        index: usize,
        previous: f64,
        current: f64,
    },
}
