//! Natural cubic spline interpolation of tabulated cross sections.
//!
//! A spline is built once from its knots and never mutated afterwards.
//! Evaluation at a knot abscissa reproduces the knot ordinate exactly,
//! which is what lets a spline library round-trip through a file.

use crate::error::SplineError;

/// A natural cubic spline interpolator for real-valued data.
///
/// Given $n$ data points $(x_i, y_i)$, constructs piecewise cubic polynomials
/// with continuous first and second derivatives and $y'' = 0$ at both ends.
#[derive(Debug, Clone, PartialEq)]
pub struct CubicSpline {
    /// Sorted x values (knots).
    xs: Vec<f64>,
    /// Corresponding y values.
    ys: Vec<f64>,
    /// Second derivatives at each knot (computed during construction).
    y2s: Vec<f64>,
}

impl CubicSpline {
    /// Construct a natural cubic spline from data points.
    ///
    /// # Arguments
    /// * `xs` - Finite, strictly increasing x values.
    /// * `ys` - Corresponding y values (same length as `xs`). Passed through
    ///   unchecked. A non-finite y splits the knots into independent natural
    ///   splines, so only the two intervals touching it evaluate to non-finite
    ///   values and every finite knot is still reproduced exactly.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> Result<Self, SplineError> {
        if xs.len() != ys.len() {
            return Err(SplineError::LengthMismatch {
                x_len: xs.len(),
                y_len: ys.len(),
            });
        }
        if xs.len() < 2 {
            return Err(SplineError::TooFewKnots { found: xs.len() });
        }
        if let Some(x) = xs.iter().position(|x| !x.is_finite()) {
            return Err(SplineError::NotIncreasing {
                index: x,
                previous: if x > 0 { xs[x - 1] } else { f64::NEG_INFINITY },
                current: xs[x],
            });
        }
        for i in 1..xs.len() {
            if xs[i] <= xs[i - 1] {
                return Err(SplineError::NotIncreasing {
                    index: i,
                    previous: xs[i - 1],
                    current: xs[i],
                });
            }
        }

        let n = xs.len();
        let mut y2s = vec![0.0; n];

        // Solve each run of finite ordinates on its own, with natural ends
        // at the breaks.
        let mut start = 0;
        while start < n {
            if !ys[start].is_finite() {
                start += 1;
                continue;
            }
            let end = ys[start..]
                .iter()
                .position(|y| !y.is_finite())
                .map_or(n, |len| start + len);
            natural_second_derivatives(&xs[start..end], &ys[start..end], &mut y2s[start..end]);
            start = end;
        }

        Ok(Self { xs, ys, y2s })
    }

    /// Evaluate the spline at a given x value.
    ///
    /// Extrapolation beyond the data range uses the boundary polynomial.
    pub fn evaluate(&self, x: f64) -> f64 {
        let n = self.xs.len();

        // Binary search for the enclosing interval
        let mut lo = 0;
        let mut hi = n - 1;
        while hi - lo > 1 {
            let mid = (lo + hi) / 2;
            if self.xs[mid] > x {
                hi = mid;
            } else {
                lo = mid;
            }
        }

        if x == self.xs[lo] {
            return self.ys[lo];
        }
        if x == self.xs[hi] {
            return self.ys[hi];
        }

        let h = self.xs[hi] - self.xs[lo];
        let a = (self.xs[hi] - x) / h;
        let b = (x - self.xs[lo]) / h;

        a * self.ys[lo]
            + b * self.ys[hi]
            + ((a * a * a - a) * self.y2s[lo] + (b * b * b - b) * self.y2s[hi]) * h * h / 6.0
    }

    /// Number of knots.
    pub fn len(&self) -> usize {
        self.xs.len()
    }

    /// Always false: a spline has at least two knots.
    pub fn is_empty(&self) -> bool {
        self.xs.is_empty()
    }

    /// Knot abscissas.
    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    /// Knot ordinates.
    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    /// `(x, y)` knot pairs in ascending x.
    pub fn knots(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.xs.iter().copied().zip(self.ys.iter().copied())
    }

    /// First and last knot abscissa.
    pub fn x_range(&self) -> (f64, f64) {
        (self.xs[0], self.xs[self.xs.len() - 1])
    }
}

/// Second derivatives of the natural cubic spline through `(xs, ys)`,
/// written into `y2s`. Runs shorter than three knots are linear.
fn natural_second_derivatives(xs: &[f64], ys: &[f64], y2s: &mut [f64]) {
    let n = xs.len();
    if n < 3 {
        return;
    }
    let mut u = vec![0.0; n - 1];

    // Forward sweep (tridiagonal system for natural spline)
    for i in 1..n - 1 {
        let sig = (xs[i] - xs[i - 1]) / (xs[i + 1] - xs[i - 1]);
        let p = sig * y2s[i - 1] + 2.0;
        y2s[i] = (sig - 1.0) / p;
        u[i] = (ys[i + 1] - ys[i]) / (xs[i + 1] - xs[i])
            - (ys[i] - ys[i - 1]) / (xs[i] - xs[i - 1]);
        u[i] = (6.0 * u[i] / (xs[i + 1] - xs[i - 1]) - sig * u[i - 1]) / p;
    }

    // Back substitution
    y2s[n - 1] = 0.0;
    for k in (0..n - 2).rev() {
        y2s[k + 1] = y2s[k + 1] * y2s[k + 2] + u[k + 1];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spline_passes_through_data_points() {
        let xs = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let ys = vec![2.0, 3.0, 5.0, 4.0, 1.0];
        let spline = CubicSpline::new(xs.clone(), ys.clone()).unwrap();

        for (x, y) in xs.iter().zip(ys.iter()) {
            let result = spline.evaluate(*x);
            assert!(
                (result - y).abs() < 1e-10,
                "Spline({}) = {} but expected {}",
                x,
                result,
                y
            );
        }
    }

    #[test]
    fn test_two_knots_is_linear() {
        let spline = CubicSpline::new(vec![0.0, 2.0], vec![1.0, 5.0]).unwrap();
        assert!((spline.evaluate(1.0) - 3.0).abs() < 1e-12);
        assert_eq!(spline.x_range(), (0.0, 2.0));
    }

    #[test]
    fn test_rejects_bad_knots() {
        assert_eq!(
            CubicSpline::new(vec![1.0], vec![1.0]),
            Err(SplineError::TooFewKnots { found: 1 })
        );
        assert!(matches!(
            CubicSpline::new(vec![1.0, 1.0, 2.0], vec![0.0; 3]),
            Err(SplineError::NotIncreasing { index: 1, .. })
        ));
        assert!(matches!(
            CubicSpline::new(vec![1.0, 2.0], vec![0.0; 3]),
            Err(SplineError::LengthMismatch { .. })
        ));
        assert!(CubicSpline::new(vec![1.0, f64::NAN], vec![0.0; 2]).is_err());
    }

    #[test]
    fn test_non_finite_value_keeps_finite_knots_exact() {
        let xs = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let ys = vec![1.0, 2.0, f64::NAN, 4.0, 5.0, 3.0];
        let spline = CubicSpline::new(xs.clone(), ys.clone()).unwrap();

        for (x, y) in xs.iter().zip(ys.iter()).filter(|(_, y)| y.is_finite()) {
            assert_eq!(spline.evaluate(*x), *y, "Spline({}) must reproduce its knot", x);
        }
        assert!(spline.evaluate(3.0).is_nan());
        assert!(spline.evaluate(2.5).is_nan());

        // Intervals away from the bad knot stay finite.
        assert!(spline.evaluate(1.5).is_finite());
        assert!(spline.evaluate(4.5).is_finite());
        assert!(spline.evaluate(5.5).is_finite());
    }
}
