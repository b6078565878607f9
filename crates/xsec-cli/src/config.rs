//! TOML configuration deserialisation for spline-building jobs.

use serde::Deserialize;

use xsec_core::analytic::ThresholdPowerLaw;
use xsec_core::{AlgorithmId, Interaction};
use xsec_splines::SplineDefaults;

/// Top-level job configuration.
#[derive(Debug, Deserialize)]
pub struct JobConfig {
    #[serde(default)]
    pub splines: SplineDefaults,
    pub model: ModelConfig,
    #[serde(default)]
    pub process: Vec<Interaction>,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Parameters of the analytic threshold model.
#[derive(Debug, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_model_name")]
    pub name: String,
    #[serde(default = "default_model_config")]
    pub config: String,
    pub sigma0: f64,
    #[serde(default = "default_power")]
    pub power: f64,
}

fn default_model_name() -> String {
    "xsec::ThresholdPowerLaw".into()
}
fn default_model_config() -> String {
    "Default".into()
}
fn default_power() -> f64 {
    1.0
}

impl ModelConfig {
    pub fn build(&self) -> ThresholdPowerLaw {
        ThresholdPowerLaw::new(
            AlgorithmId::new(self.name.clone(), self.config.clone()),
            self.sigma0,
            self.power,
        )
    }
}

/// Output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Spline library to write (default: "xsec_splines.xml").
    #[serde(default = "default_output_file")]
    pub file: String,
    /// Whether splines preloaded from `input` are written too (default: false).
    #[serde(default)]
    pub save_init: bool,
    /// Existing library to preload before building.
    #[serde(default)]
    pub input: Option<String>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            file: default_output_file(),
            save_init: false,
            input: None,
        }
    }
}

fn default_output_file() -> String {
    "xsec_splines.xml".into()
}

/// Load and parse a TOML job configuration file.
pub fn load_config(path: &std::path::Path) -> anyhow::Result<JobConfig> {
    let content = std::fs::read_to_string(path)?;
    let mut config: JobConfig = toml::from_str(&content)?;
    config.splines = config.splines.sanitised();
    if !(config.splines.e_min < config.splines.e_max) {
        anyhow::bail!(
            "Invalid energy range [{}, {}] GeV: e_min must be below e_max",
            config.splines.e_min,
            config.splines.e_max
        );
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOB: &str = r#"
[splines]
n_knots = 40
e_min = 0.1
e_max = 50.0

[model]
sigma0 = 1e-38
power = 1.5

[[process]]
probe_pdg = 14
target_pdg = 1000260560
channel = "Weak[CC],QES"
threshold = 0.11

[[process]]
probe_pdg = 13
probe_mass = 0.105658
target_pdg = 1000060120
channel = "EM,QEL"
"#;

    #[test]
    fn test_parse_job() {
        let job: JobConfig = toml::from_str(JOB).unwrap();
        assert_eq!(job.splines.n_knots, 40);
        assert!(job.splines.use_log);
        assert_eq!(job.process.len(), 2);
        assert_eq!(job.process[1].threshold, 0.0);
        assert_eq!(job.model.name, "xsec::ThresholdPowerLaw");
        assert_eq!(job.output.file, "xsec_splines.xml");
        assert!(job.output.input.is_none());
    }

    #[test]
    fn test_load_rejects_inverted_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.toml");
        std::fs::write(&path, "[splines]\ne_min = 10.0\ne_max = 1.0\n[model]\nsigma0 = 1.0\n")
            .unwrap();
        assert!(load_config(&path).is_err());
    }
}
