//! Registry-wide spline construction defaults.

use serde::Deserialize;

use crate::knots::{KnotSpacing, MIN_KNOTS};

/// Defaults used by every build that does not override them.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SplineDefaults {
    /// Number of knots per spline (never below [`MIN_KNOTS`]).
    #[serde(default = "default_n_knots")]
    pub n_knots: usize,
    /// Lower edge of the energy range (GeV).
    #[serde(default = "default_e_min")]
    pub e_min: f64,
    /// Upper edge of the energy range (GeV).
    #[serde(default = "default_e_max")]
    pub e_max: f64,
    /// Log spacing above threshold (default: true).
    #[serde(default = "default_true")]
    pub use_log: bool,
}

fn default_n_knots() -> usize {
    100
}
fn default_e_min() -> f64 {
    0.01
}
fn default_e_max() -> f64 {
    100.0
}
fn default_true() -> bool {
    true
}

impl Default for SplineDefaults {
    fn default() -> Self {
        Self {
            n_knots: default_n_knots(),
            e_min: default_e_min(),
            e_max: default_e_max(),
            use_log: true,
        }
    }
}

impl SplineDefaults {
    pub fn spacing(&self) -> KnotSpacing {
        KnotSpacing::from_use_log(self.use_log)
    }

    /// Apply the acceptance rules of the registry setters to a value read
    /// from a file: knots floored at [`MIN_KNOTS`], non-positive edges
    /// replaced by the built-in defaults.
    pub fn sanitised(self) -> Self {
        Self {
            n_knots: self.n_knots.max(MIN_KNOTS),
            e_min: if self.e_min > 0.0 { self.e_min } else { default_e_min() },
            e_max: if self.e_max > 0.0 { self.e_max } else { default_e_max() },
            use_log: self.use_log,
        }
    }
}

/// Per-build overrides of [`SplineDefaults`].
///
/// A missing, non-positive or too-small (`<= 2` knots) override falls back
/// to the registry default.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BuildOverrides {
    pub n_knots: Option<usize>,
    pub e_min: Option<f64>,
    pub e_max: Option<f64>,
}

impl BuildOverrides {
    /// Resolve against `defaults`, returning `(n_knots, e_min, e_max)`.
    pub fn resolve(&self, defaults: &SplineDefaults) -> (usize, f64, f64) {
        let n_knots = self.n_knots.filter(|&n| n > 2).unwrap_or(defaults.n_knots);
        let e_min = self.e_min.filter(|&e| e > 0.0).unwrap_or(defaults.e_min);
        let e_max = self.e_max.filter(|&e| e > 0.0).unwrap_or(defaults.e_max);
        (n_knots, e_min, e_max)
    }
}
