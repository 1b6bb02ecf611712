//! chromadiff CLI
//!
//! Command-line driver for comparing two images per color channel. Runs a
//! diff session, writes the published images to disk and prints their
//! identifiers.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};

use chromadiff_engine::FsDecoder;
use chromadiff_session::{DiffResult, DiffSession, SessionConfig, TracingConfig};
use chromadiff_store::ImageStore;

/// chromadiff - per-channel visual difference maps
#[derive(Parser)]
#[command(name = "chromadiff")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Output format for the published result
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// JSON session config (scheme, store_name, default_gain, parallel)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Diff two images once
    Diff(DiffArgs),

    /// Diff two images at several gains, re-running the same request
    Sweep(SweepArgs),
}

#[derive(Args)]
struct SourceArgs {
    /// First image (path or file:// URL)
    a: String,

    /// Second image (path or file:// URL)
    b: String,

    /// Directory to write the published images to
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Compute on the calling thread instead of the worker pool
    #[arg(long)]
    sequential: bool,
}

#[derive(Args)]
struct DiffArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Gain applied to channel differences
    #[arg(short, long)]
    gain: Option<f32>,
}

#[derive(Args)]
struct SweepArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Comma-separated gains, applied in order
    #[arg(long, value_delimiter = ',', required = true)]
    gains: Vec<f32>,
}

fn setup_logging(verbosity: u8) {
    chromadiff_session::init_with_config(TracingConfig::from_verbosity(verbosity));
}

fn load_config(path: Option<&Path>, source: &SourceArgs) -> Result<SessionConfig> {
    let mut config = match path {
        Some(path) => SessionConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    if source.sequential {
        config.parallel = false;
    }
    Ok(config)
}

fn build_session(config: &SessionConfig) -> (Arc<ImageStore>, DiffSession) {
    let store = config.build_store();
    let session = DiffSession::with_config(Arc::clone(&store), Box::new(FsDecoder::new()), config);
    (store, session)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Diff(args) => cmd_diff(args, cli.config.as_deref(), cli.format),
        Commands::Sweep(args) => cmd_sweep(args, cli.config.as_deref(), cli.format),
    }
}

fn cmd_diff(args: DiffArgs, config: Option<&Path>, format: OutputFormat) -> Result<()> {
    let mut config = load_config(config, &args.source)?;
    if let Some(gain) = args.gain {
        if !gain.is_finite() {
            bail!("Gain must be finite, got {}", gain);
        }
        config.default_gain = gain;
    }

    let (store, mut session) = build_session(&config);
    info!("Comparing {} against {}", args.source.a, args.source.b);

    let Some(result) = session.diff(&args.source.a, &args.source.b)? else {
        bail!("Both image paths must be non-empty");
    };

    if let Some(dir) = &args.source.output {
        write_result(&store, &result, dir)?;
    }
    print_results(&[result], format)
}

fn cmd_sweep(args: SweepArgs, config: Option<&Path>, format: OutputFormat) -> Result<()> {
    if let Some(gain) = args.gains.iter().find(|g| !g.is_finite()) {
        bail!("Gain must be finite, got {}", gain);
    }

    let config = load_config(config, &args.source)?;
    let (store, mut session) = build_session(&config);

    let mut results = Vec::with_capacity(args.gains.len());
    for (step, gain) in args.gains.iter().copied().enumerate() {
        let published = if step == 0 {
            session.set_gain(gain);
            session.diff(&args.source.a, &args.source.b)?
        } else {
            session.set_gain_and_recompute(gain)?
        };
        let Some(result) = published else {
            bail!("Both image paths must be non-empty");
        };

        if let Some(dir) = &args.source.output {
            write_result(&store, &result, &dir.join(format!("gain_{gain}")))?;
        }
        results.push(result);
    }

    print_results(&results, format)
}

/// Write every non-empty image of `result` as `<entry>.png` under `dir`
fn write_result(store: &ImageStore, result: &DiffResult, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    for entry in result.entries() {
        let image = store.get(entry);
        if image.is_empty() {
            warn!(entry, "Skipping empty image");
            continue;
        }
        let path = dir.join(format!("{entry}.png"));
        image
            .as_buffer()
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {}", path.display());
    }
    Ok(())
}

fn print_results(results: &[DiffResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(results)?);
        }
        OutputFormat::Text => {
            for result in results {
                println!("Generation {} (gain {}): {:?}", result.generation, result.gain, result.status);
                for id in result.identifiers() {
                    println!("  {}", id);
                }
            }
        }
    }
    Ok(())
}
