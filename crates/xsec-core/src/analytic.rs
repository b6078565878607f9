//! Analytic threshold cross section.
//!
//! A closed-form response with the shape typical of inelastic channels:
//! zero below threshold and a power-law rise above it,
//!
//! $$\sigma(E) = \sigma_0 \left(1 - \frac{E_{\text{thr}}}{E}\right)^p, \quad E > E_{\text{thr}}.$$
//!
//! Used as a cheap stand-in for a real cross-section model when building
//! and validating spline libraries.

use serde::{Deserialize, Serialize};

use crate::algorithm::{AlgorithmId, ResponseAlgorithm};
use crate::kinematics::ProbeState;
use crate::process::ProcessDescription;

/// Power-law rise above the process threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdPowerLaw {
    pub id: AlgorithmId,
    /// Asymptotic cross section $\sigma_0$.
    pub sigma0: f64,
    /// Exponent $p$ of the rise.
    pub power: f64,
}

impl ThresholdPowerLaw {
    pub fn new(id: AlgorithmId, sigma0: f64, power: f64) -> Self {
        Self { id, sigma0, power }
    }

    /// Evaluate $\sigma(E)$ for a threshold `threshold` (GeV).
    pub fn cross_section(&self, energy: f64, threshold: f64) -> f64 {
        if energy <= threshold || energy <= 0.0 {
            return 0.0;
        }
        self.sigma0 * (1.0 - threshold / energy).powf(self.power)
    }
}

impl ResponseAlgorithm for ThresholdPowerLaw {
    fn id(&self) -> &AlgorithmId {
        &self.id
    }

    fn integral(&self, process: &dyn ProcessDescription, probe: &ProbeState) -> f64 {
        self.cross_section(probe.energy, process.threshold())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::Interaction;
    use approx::assert_relative_eq;

    fn model() -> ThresholdPowerLaw {
        ThresholdPowerLaw::new(AlgorithmId::new("PowerLaw", "Default"), 1.0e-38, 2.0)
    }

    #[test]
    fn test_zero_at_and_below_threshold() {
        let m = model();
        assert_eq!(m.cross_section(0.5, 1.0), 0.0);
        assert_eq!(m.cross_section(1.0, 1.0), 0.0);
    }

    #[test]
    fn test_rise_above_threshold() {
        let m = model();
        // (1 - 1/2)^2 = 0.25
        assert_relative_eq!(m.cross_section(2.0, 1.0), 0.25e-38, max_relative = 1e-12);
        assert!(m.cross_section(100.0, 1.0) < 1.0e-38);
        assert!(m.cross_section(100.0, 1.0) > m.cross_section(10.0, 1.0));
    }

    #[test]
    fn test_integral_uses_probe_energy_and_process_threshold() {
        let m = model();
        let process = Interaction::new(14, 1000060120, "Weak[CC],RES").with_threshold(1.0);
        let probe = ProbeState::along_z(4.0, 0.0);
        assert_relative_eq!(
            m.integral(&process, &probe),
            m.cross_section(4.0, 1.0),
            max_relative = 1e-15
        );
    }
}
