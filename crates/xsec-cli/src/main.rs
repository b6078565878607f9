//! Cross-section spline command-line interface.
//!
//! Build and manage XML spline libraries:
//! ```sh
//! xsec-cli build job.toml
//! xsec-cli list splines.xml
//! xsec-cli merge a.xml b.xml -o all.xml
//! xsec-cli eval splines.xml "<key>" 0.5 1.0 2.0
//! ```

mod config;
mod runner;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use xsec_splines::SplineRegistry;

#[derive(Parser)]
#[command(name = "xsec-cli")]
#[command(about = "Cross-section spline builder and library tools")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the splines listed in a TOML job file and save them as XML.
    Build {
        /// Path to the job configuration file.
        config: PathBuf,
        /// Output library (overrides config file setting).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Validate a job file without building anything.
    Validate {
        /// Path to the job configuration file.
        config: PathBuf,
    },
    /// List the splines in a library.
    List {
        /// Spline library (XML).
        file: PathBuf,
    },
    /// Merge several libraries into one (first occurrence of a key wins).
    Merge {
        /// Input libraries, in priority order.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Merged output library.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Evaluate one spline at the given energies (GeV).
    Eval {
        /// Spline library (XML).
        file: PathBuf,
        /// Spline key.
        key: String,
        /// Energies in GeV.
        #[arg(required = true, allow_negative_numbers = true)]
        energies: Vec<f64>,
        /// Also write the values to a CSV file.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { config, output } => {
            println!("Cross-section spline builder");
            println!("============================");
            let job = config::load_config(&config)?;
            println!("Configuration: {}", config.display());

            let registry = runner::run_build(&job)?;

            let out = output.unwrap_or_else(|| PathBuf::from(&job.output.file));
            runner::save_library(&registry, &out, job.output.save_init)?;
            println!("Splines written to: {}", out.display());
            Ok(())
        }
        Commands::Validate { config } => {
            let job = config::load_config(&config)?;
            println!(
                "Configuration is valid: {} ({} processes)",
                config.display(),
                job.process.len()
            );
            Ok(())
        }
        Commands::List { file } => {
            let registry = SplineRegistry::new();
            runner::load_library(&registry, &file, false)?;
            print!("{}", registry);
            Ok(())
        }
        Commands::Merge { inputs, output } => {
            let registry = SplineRegistry::new();
            for input in &inputs {
                runner::load_library(&registry, input, true)?;
                println!("  {}: {} splines so far", input.display(), registry.len());
            }
            runner::save_library(&registry, &output, true)?;
            println!("Merged library written to: {}", output.display());
            Ok(())
        }
        Commands::Eval {
            file,
            key,
            energies,
            csv,
        } => {
            let registry = SplineRegistry::new();
            runner::load_library(&registry, &file, false)?;
            let values = runner::evaluate(&registry, &key, &energies)?;
            println!("E (GeV)        xsec");
            for (e, xsec) in &values {
                println!("{:<14.6e} {:.6e}", e, xsec);
            }
            if let Some(path) = csv {
                runner::write_values_csv(&values, &key, &path)?;
            }
            Ok(())
        }
    }
}
