//! Knot placement for cross-section splines.
//!
//! Cross sections are typically zero below the process threshold and rise
//! sharply just above it. A uniform grid over the whole energy range would
//! put too few knots on the rise, so the planner:
//!
//! - places [`KNOTS_BELOW_THRESHOLD`] knots linearly in `[e_min, E_thr)`,
//! - places one knot exactly on `max(E_thr, e_min)`,
//! - spaces the remaining knots up to `e_max`, linearly or logarithmically.

use log::debug;
use serde::{Deserialize, Serialize};

/// Knots reserved strictly below the threshold when it lies inside the range.
pub const KNOTS_BELOW_THRESHOLD: usize = 5;

/// Smallest acceptable number of knots for a spline.
pub const MIN_KNOTS: usize = 10;

/// Spacing of the knots above threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnotSpacing {
    /// Equal differences between consecutive knots.
    Linear,
    /// Equal ratios between consecutive knots.
    Log,
}

impl KnotSpacing {
    pub fn from_use_log(use_log: bool) -> Self {
        if use_log {
            Self::Log
        } else {
            Self::Linear
        }
    }

    pub fn is_log(self) -> bool {
        self == Self::Log
    }
}

/// Plan the abscissas at which a response function is sampled.
///
/// Returns `max(n_knots, MIN_KNOTS)` ascending energies covering
/// `[e_min, e_max]`. When `e_min < threshold < e_max` exactly
/// [`KNOTS_BELOW_THRESHOLD`] knots fall in `[e_min, threshold)` and one knot
/// equals `threshold`. A threshold at or beyond `e_max` leaves no open
/// region, so the whole range is sampled as if there were no threshold.
/// The same happens when the threshold sits so close to either edge that
/// the knots on one side of it could not be distinct.
///
/// # Panics
/// Panics if `e_min >= e_max` (or either is NaN), or if log spacing is
/// requested with a non-positive lower edge.
pub fn plan_knots(
    threshold: f64,
    e_min: f64,
    e_max: f64,
    n_knots: usize,
    spacing: KnotSpacing,
) -> Vec<f64> {
    assert!(
        e_min < e_max,
        "Knot range must satisfy e_min < e_max (got [{}, {}])",
        e_min,
        e_max
    );

    let n_knots = n_knots.max(MIN_KNOTS);

    if threshold > e_min && threshold < e_max {
        let de = (threshold - e_min) / KNOTS_BELOW_THRESHOLD as f64;
        let mut knots: Vec<f64> = (0..KNOTS_BELOW_THRESHOLD)
            .map(|i| e_min + i as f64 * de)
            .collect();
        knots.extend(spaced(threshold, e_max, n_knots - KNOTS_BELOW_THRESHOLD, spacing));
        if is_strictly_increasing(&knots) {
            return knots;
        }
        debug!(
            "Threshold {} GeV too close to [{}, {}] for distinct knots - sampling the whole range",
            threshold, e_min, e_max
        );
    }

    spaced(e_min, e_max, n_knots, spacing)
}

/// `n` knots from `e0` to `e1` inclusive, with both ends pinned against
/// rounding in the log/linear steps.
fn spaced(e0: f64, e1: f64, n: usize, spacing: KnotSpacing) -> Vec<f64> {
    let last = (n - 1) as f64;
    let mut knots: Vec<f64> = match spacing {
        KnotSpacing::Linear => {
            let de = (e1 - e0) / last;
            (0..n).map(|i| e0 + i as f64 * de).collect()
        }
        KnotSpacing::Log => {
            assert!(
                e0 > 0.0,
                "Logarithmic knot spacing needs a positive lower edge (got {})",
                e0
            );
            let (log0, log1) = (e0.log10(), e1.log10());
            let dlog = (log1 - log0) / last;
            (0..n).map(|i| 10f64.powf(log0 + i as f64 * dlog)).collect()
        }
    };
    knots[0] = e0;
    knots[n - 1] = e1;
    knots
}

fn is_strictly_increasing(knots: &[f64]) -> bool {
    knots.windows(2).all(|w| w[1] > w[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_threshold_below_range_reserves_no_knots() {
        let knots = plan_knots(0.0, 0.5, 50.0, 20, KnotSpacing::Log);
        assert_eq!(knots.len(), 20);
        assert_eq!(knots[0], 0.5);
        assert_eq!(knots[19], 50.0);
    }

    #[test]
    fn test_threshold_inside_range() {
        let thr = 1.2;
        let knots = plan_knots(thr, 0.01, 100.0, 30, KnotSpacing::Log);
        assert_eq!(knots.len(), 30);
        let below = knots.iter().filter(|&&e| e >= 0.01 && e < thr).count();
        assert_eq!(below, KNOTS_BELOW_THRESHOLD);
        assert_eq!(knots.iter().filter(|&&e| e == thr).count(), 1);
        assert_eq!(knots[KNOTS_BELOW_THRESHOLD], thr);
        assert_eq!(knots[0], 0.01);
    }

    #[test]
    fn test_below_threshold_knots_are_linear() {
        let knots = plan_knots(1.0, 0.0, 10.0, 15, KnotSpacing::Linear);
        for (i, e) in knots[..KNOTS_BELOW_THRESHOLD].iter().enumerate() {
            assert_relative_eq!(*e, 0.2 * i as f64, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_log_spacing_has_constant_ratio() {
        let knots = plan_knots(2.0, 0.1, 200.0, 40, KnotSpacing::Log);
        let above = &knots[KNOTS_BELOW_THRESHOLD..];
        let ratio = above[1] / above[0];
        for w in above.windows(2) {
            assert_relative_eq!(w[1] / w[0], ratio, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_linear_spacing_has_constant_difference() {
        let knots = plan_knots(0.0, 1.0, 11.0, 11, KnotSpacing::Linear);
        for w in knots.windows(2) {
            assert_relative_eq!(w[1] - w[0], 1.0, max_relative = 1e-9);
        }
    }

    #[test]
    fn test_knot_count_floored() {
        let knots = plan_knots(0.0, 1.0, 2.0, 3, KnotSpacing::Linear);
        assert_eq!(knots.len(), MIN_KNOTS);
    }

    #[test]
    fn test_knots_strictly_increasing() {
        for spacing in [KnotSpacing::Linear, KnotSpacing::Log] {
            let knots = plan_knots(0.3, 0.01, 100.0, 100, spacing);
            assert!(knots.windows(2).all(|w| w[1] > w[0]));
        }
    }

    #[test]
    fn test_threshold_beyond_range_samples_whole_range() {
        let knots = plan_knots(500.0, 1.0, 100.0, 12, KnotSpacing::Log);
        assert_eq!(knots.len(), 12);
        assert_eq!(knots[0], 1.0);
        assert_eq!(knots[11], 100.0);
    }

    #[test]
    #[should_panic(expected = "e_min < e_max")]
    fn test_degenerate_range_panics() {
        plan_knots(0.0, 5.0, 5.0, 20, KnotSpacing::Linear);
    }

    #[test]
    fn test_threshold_next_to_lower_edge_samples_whole_range() {
        let thr = f64::from_bits(1.0f64.to_bits() + 1);
        for spacing in [KnotSpacing::Linear, KnotSpacing::Log] {
            let knots = plan_knots(thr, 1.0, 10.0, 20, spacing);
            assert_eq!(knots.len(), 20);
            assert!(is_strictly_increasing(&knots));
            assert_eq!(knots[0], 1.0);
            assert_eq!(knots[19], 10.0);
        }
    }

    #[test]
    fn test_threshold_next_to_upper_edge_samples_whole_range() {
        let thr = f64::from_bits(10.0f64.to_bits() - 1);
        for spacing in [KnotSpacing::Linear, KnotSpacing::Log] {
            let knots = plan_knots(thr, 1.0, 10.0, 20, spacing);
            assert_eq!(knots.len(), 20);
            assert!(is_strictly_increasing(&knots));
            assert_eq!(knots[0], 1.0);
            assert_eq!(knots[19], 10.0);
        }
    }
}
