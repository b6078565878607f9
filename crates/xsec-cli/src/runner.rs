//! Job runner: ties together the model, the spline registry and XML output.

use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use xsec_splines::{BuildOverrides, SplineRegistry, XmlStatus};

use crate::config::JobConfig;

/// Build every spline requested by `job`, on top of the optional input library.
pub fn run_build(job: &JobConfig) -> Result<SplineRegistry> {
    let registry = SplineRegistry::with_defaults(job.splines);

    if let Some(input) = &job.output.input {
        load_library(&registry, Path::new(input), true)?;
        println!("Preloaded {} splines from {}", registry.len(), input);
    }

    let model = job.model.build();
    let total = job.process.len();
    for (i, process) in job.process.iter().enumerate() {
        let spline = registry
            .get_or_create(&model, process, &BuildOverrides::default())
            .with_context(|| format!("Building spline for {}", process))?;
        let (lo, hi) = spline.x_range();
        println!(
            "  [{}/{}] {}: {} knots, E = [{}, {}] GeV",
            i + 1,
            total,
            process,
            spline.len(),
            lo,
            hi
        );
    }

    info!("{}", registry);
    Ok(registry)
}

/// Load a library into `registry`, turning a failed status into an error.
pub fn load_library(registry: &SplineRegistry, path: &Path, keep: bool) -> Result<()> {
    match registry.load_from_xml(path, keep) {
        XmlStatus::Ok => Ok(()),
        status => anyhow::bail!("Failed to load {}: {}", path.display(), status),
    }
}

/// Write `registry` to `path` as an XML library, failing on any I/O error.
pub fn save_library(registry: &SplineRegistry, path: &Path, include_loaded: bool) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Creating directory {}", parent.display()))?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Creating spline library {}", path.display()))?;
    registry
        .write_xml(std::io::BufWriter::new(file), include_loaded)
        .with_context(|| format!("Writing spline library {}", path.display()))?;
    info!("Saved {} splines to {}", registry.len(), path.display());
    Ok(())
}

/// Evaluate the spline `key` at each energy.
pub fn evaluate(registry: &SplineRegistry, key: &str, energies: &[f64]) -> Result<Vec<(f64, f64)>> {
    let spline = registry
        .get(key)
        .with_context(|| format!("No spline with key '{}'", key))?;
    Ok(energies.iter().map(|&e| (e, spline.evaluate(e))).collect())
}

/// Write evaluated cross sections to a CSV file with a metadata header.
pub fn write_values_csv(values: &[(f64, f64)], key: &str, path: &Path) -> Result<()> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = std::fs::File::create(path)?;
    writeln!(file, "# xsec-cli spline evaluation")?;
    writeln!(file, "# Version: {}", env!("CARGO_PKG_VERSION"))?;
    writeln!(file, "# spline: {}", key)?;
    writeln!(file, "#")?;
    writeln!(file, "energy_gev,xsec")?;
    for (e, xsec) in values {
        writeln!(file, "{:e},{:e}", e, xsec)?;
    }

    println!("Values written to: {}", path.display());
    Ok(())
}
