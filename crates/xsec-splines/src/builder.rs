//! Spline construction: sample a response algorithm on planned knots.

use log::{debug, info};
use rayon::prelude::*;

use xsec_core::{ProbeState, ProcessDescription, ResponseAlgorithm};

use crate::config::{BuildOverrides, SplineDefaults};
use crate::error::SplineError;
use crate::knots::plan_knots;
use crate::spline::CubicSpline;

/// Build a cross-section spline for `process` using `algorithm`.
///
/// The algorithm is called exactly once per planned knot. Knots are
/// evaluated in parallel; the returned spline keeps them in ascending
/// energy order. Responses are tabulated as returned, including negative
/// or non-finite values.
///
/// # Panics
/// Panics if the resolved energy range is empty (`e_min >= e_max`).
pub fn build_spline(
    algorithm: &dyn ResponseAlgorithm,
    process: &dyn ProcessDescription,
    defaults: &SplineDefaults,
    overrides: &BuildOverrides,
) -> Result<CubicSpline, SplineError> {
    info!(
        "Creating cross section spline using the algorithm: {}",
        algorithm.id()
    );

    let (n_knots, e_min, e_max) = overrides.resolve(defaults);
    let threshold = process.threshold();
    info!(
        "Energy threshold for {} = {} GeV",
        process.canonical_string(),
        threshold
    );

    let energies = plan_knots(threshold, e_min, e_max, n_knots, defaults.spacing());
    let probe_mass = process.probe_mass();

    let xsecs: Vec<f64> = energies
        .par_iter()
        .map(|&e| {
            let probe = ProbeState::along_z(e, probe_mass);
            let xsec = algorithm.integral(process, &probe);
            debug!("xsec(E = {}) = {:e}", e, xsec);
            xsec
        })
        .collect();

    CubicSpline::new(energies, xsecs)
}
