//! Science On a Sphere bundle builder.
//!
//! Turns a year of reanalysis NetCDF files into an SOS dataset: equirectangular
//! frames of filled temperature bands, height contours and wind barbs, plus the
//! labels file, colorbar, thumbnails and `playlist.sos`.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use netcdf_parser::ReanalysisFile;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sos_builder::{BuildConfig, Pipeline};

#[derive(Parser, Debug)]
#[command(name = "sos-builder")]
#[command(about = "Build Science On a Sphere frame bundles from reanalysis NetCDF")]
struct Cli {
    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render every frame and write the bundle
    Build {
        /// Build configuration (YAML)
        #[arg(short, long, env = "SOS_CONFIG", default_value = "config/example.yaml")]
        config: PathBuf,

        /// Override the output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Render exactly this many frames; each must exist in the input files
        #[arg(long)]
        frames: Option<usize>,

        /// Keep the full-color PNGs
        #[arg(long)]
        no_quantize: bool,
    },
    /// Print the grid, time axis and variables of NetCDF files
    Inspect {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_json);

    match cli.command {
        Command::Build {
            config,
            output_dir,
            frames,
            no_quantize,
        } => {
            let mut build = BuildConfig::load(&config)?;
            if let Some(dir) = output_dir {
                build.output.output_dir = dir;
            }
            if frames.is_some() {
                build.selection.frames = frames;
            }
            if no_quantize {
                build.output.quantize = false;
            }
            build.validate()?;

            info!(config = %config.display(), output = %build.output.output_dir.display(), "Starting build");
            let summary = Pipeline::run(&build)?;
            println!(
                "Wrote {} frames to {} in {:.1}s",
                summary.frames,
                summary.output_dir.display(),
                summary.elapsed.as_secs_f64()
            );
        }
        Command::Inspect { files } => {
            for path in files {
                let file = ReanalysisFile::open(&path)?;
                print!("{}", file.summary()?);
            }
        }
    }

    Ok(())
}

fn init_tracing(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
