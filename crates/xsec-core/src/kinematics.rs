//! Probe kinematics used when sampling a response function.
//!
//! Energies and momenta are in GeV (natural units, $c = 1$).

use serde::{Deserialize, Serialize};

/// Four-momentum of the incoming probe, in the target rest frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProbeState {
    /// Momentum components $(p_x, p_y, p_z)$ (GeV).
    pub momentum: [f64; 3],
    /// Total energy $E$ (GeV).
    pub energy: f64,
}

impl ProbeState {
    /// Probe travelling along $+z$ with total energy `energy`.
    ///
    /// For a massive probe the longitudinal momentum follows from
    /// $p_z = \sqrt{E^2 - m^2}$. The radicand is clamped at zero so that a
    /// probe sitting exactly on (or numerically just below) its mass shell
    /// gets $p_z = 0$ rather than `NaN`. A massless probe has $p_z = E$.
    pub fn along_z(energy: f64, mass: f64) -> Self {
        let pz = if mass > 0.0 {
            (energy * energy - mass * mass).max(0.0).sqrt()
        } else {
            energy
        };
        Self {
            momentum: [0.0, 0.0, pz],
            energy,
        }
    }

    /// Magnitude of the three-momentum $|\mathbf{p}|$.
    pub fn momentum_magnitude(&self) -> f64 {
        let [px, py, pz] = self.momentum;
        (px * px + py * py + pz * pz).sqrt()
    }

    /// Invariant mass $\sqrt{E^2 - |\mathbf{p}|^2}$, clamped at zero.
    pub fn invariant_mass(&self) -> f64 {
        let p = self.momentum_magnitude();
        (self.energy * self.energy - p * p).max(0.0).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_massless_probe_has_pz_equal_energy() {
        let p = ProbeState::along_z(2.5, 0.0);
        assert_eq!(p.momentum, [0.0, 0.0, 2.5]);
        assert_eq!(p.energy, 2.5);
    }

    #[test]
    fn test_massive_probe_on_shell() {
        let m = 0.105_658; // muon
        let p = ProbeState::along_z(1.0, m);
        assert_abs_diff_eq!(p.invariant_mass(), m, epsilon = 1e-12);
        assert_abs_diff_eq!(p.momentum[2], (1.0 - m * m).sqrt(), epsilon = 1e-15);
    }

    #[test]
    fn test_below_mass_shell_clamps_to_zero_momentum() {
        let p = ProbeState::along_z(0.1, 0.105_658);
        assert_eq!(p.momentum[2], 0.0);
        assert!(p.momentum_magnitude().is_finite());
    }
}
