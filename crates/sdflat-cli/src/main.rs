//! sdflat - SDF to URDF converter
//!
//! Loads an SDF model (resolving its includes), flattens the nested model
//! hierarchy into a single kinematic tree, and writes it out as URDF.

mod config;

use anyhow::{Context, Result};
use clap::Parser;
use sdflat_core::{SdfDocument, UrdfRobot};
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "sdflat")]
#[command(about = "Flatten nested SDF models into a single URDF tree")]
#[command(version)]
struct Args {
    /// SDF file to convert
    #[arg(required_unless_present = "init_config")]
    input: Option<PathBuf>,

    /// Output URDF file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long, default_value = "sdflat.toml")]
    config: PathBuf,

    /// Model repository for model:// includes
    #[arg(long)]
    model_path: Option<PathBuf>,

    /// Top-level model to convert (defaults to the first one)
    #[arg(long)]
    model: Option<String>,

    /// Skip malformed elements instead of failing
    #[arg(long)]
    allow_partial: bool,

    /// Print the resolved model tree instead of URDF
    #[arg(long)]
    tree: bool,

    /// Write a default configuration file and exit
    #[arg(long, value_name = "PATH")]
    init_config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for output
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if let Some(path) = &args.init_config {
        config::save_default_config(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(path = %path.display(), "Wrote default configuration");
        return Ok(());
    }

    let Some(input) = args.input.as_deref() else {
        anyhow::bail!("No input file given");
    };

    let mut config = config::load_config(&args.config)?;
    if let Some(model_path) = &args.model_path {
        config.models.path = model_path.display().to_string();
    }
    if args.allow_partial {
        config.conversion.allow_partial = true;
    }

    let options = config.to_load_options();
    info!(
        input = %input.display(),
        model_path = %options.model_path.display(),
        allow_partial = options.allow_partial,
        "Loading SDF"
    );

    let doc = SdfDocument::from_file(input, &options)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    if !doc.diagnostics.is_empty() {
        warn!(count = doc.diagnostics.len(), "Document loaded with problems");
    }

    let tree = doc.model(args.model.as_deref())?;

    if args.tree {
        print!("{}", tree);
        return Ok(());
    }

    let flat = tree.flatten()?;
    let robot = UrdfRobot::from_flat(&flat, &config.to_urdf_options());

    match &args.output {
        Some(path) => {
            robot.to_file(path)?;
            info!(
                path = %path.display(),
                links = flat.links().count(),
                joints = flat.joints().count(),
                "Wrote URDF"
            );
        }
        None => print!("{}", robot.to_xml()?),
    }

    Ok(())
}
