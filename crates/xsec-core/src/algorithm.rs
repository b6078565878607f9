//! Response (cross-section) algorithm abstraction.
//!
//! The spline machinery never integrates physics itself. It asks a
//! [`ResponseAlgorithm`] for the total response of a process at one probe
//! state and tabulates the answers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::kinematics::ProbeState;
use crate::process::ProcessDescription;

/// Identity of an algorithm: its name plus the configuration it was set up with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlgorithmId {
    pub name: String,
    pub config: String,
}

impl AlgorithmId {
    pub fn new(name: impl Into<String>, config: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: config.into(),
        }
    }
}

impl fmt::Display for AlgorithmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.config)
    }
}

/// Computes the response of a process to a probe.
///
/// Implementations are expected to be expensive (seconds per call) and are
/// called concurrently from the spline builder, hence `Send + Sync`.
pub trait ResponseAlgorithm: Send + Sync {
    /// Name and configuration tag of this algorithm.
    fn id(&self) -> &AlgorithmId;

    /// Total response (e.g. cross section in natural units) of `process` for
    /// the given probe state. Physically non-negative, but callers pass the
    /// value through unchecked.
    fn integral(&self, process: &dyn ProcessDescription, probe: &ProbeState) -> f64;
}
