//! Physical process descriptions.
//!
//! A [`ProcessDescription`] identifies what a cross section is computed
//! for: the probe, the target and the reaction channel. Spline caches key
//! their entries on [`ProcessDescription::canonical_string`], so two
//! descriptions that print the same are the same process.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A physical configuration a response value is computed for.
pub trait ProcessDescription: Send + Sync {
    /// Minimum probe energy (GeV) at which the process is kinematically allowed.
    fn threshold(&self) -> f64;

    /// Deterministic string form, stable across runs.
    fn canonical_string(&self) -> String;

    /// Rest mass of the probe (GeV). Zero for massless probes.
    fn probe_mass(&self) -> f64;
}

/// A probe + target + channel interaction with a fixed threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    /// PDG code of the incoming probe.
    pub probe_pdg: i32,
    /// Probe rest mass (GeV).
    #[serde(default)]
    pub probe_mass: f64,
    /// PDG ion code of the target (e.g. `1000260560` for Fe56).
    pub target_pdg: i32,
    /// Reaction channel label, e.g. `"Weak[CC],QES"`.
    pub channel: String,
    /// Energy threshold (GeV).
    #[serde(default)]
    pub threshold: f64,
}

impl Interaction {
    pub fn new(probe_pdg: i32, target_pdg: i32, channel: impl Into<String>) -> Self {
        Self {
            probe_pdg,
            probe_mass: 0.0,
            target_pdg,
            channel: channel.into(),
            threshold: 0.0,
        }
    }

    /// Set the probe rest mass (GeV).
    pub fn with_probe_mass(mut self, mass: f64) -> Self {
        self.probe_mass = mass;
        self
    }

    /// Set the energy threshold (GeV).
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }
}

impl ProcessDescription for Interaction {
    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn canonical_string(&self) -> String {
        self.to_string()
    }

    fn probe_mass(&self) -> f64 {
        self.probe_mass
    }
}

impl fmt::Display for Interaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "nu:{};tgt:{};proc:{}",
            self.probe_pdg, self.target_pdg, self.channel
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_string_is_deterministic() {
        let a = Interaction::new(14, 1000260560, "Weak[CC],QES").with_threshold(0.11);
        let b = Interaction::new(14, 1000260560, "Weak[CC],QES").with_threshold(0.11);
        assert_eq!(a.canonical_string(), "nu:14;tgt:1000260560;proc:Weak[CC],QES");
        assert_eq!(a.canonical_string(), b.canonical_string());
    }

    #[test]
    fn test_channel_changes_canonical_string() {
        let qes = Interaction::new(14, 1000260560, "Weak[CC],QES");
        let dis = Interaction::new(14, 1000260560, "Weak[CC],DIS");
        assert_ne!(qes.canonical_string(), dis.canonical_string());
    }
}
