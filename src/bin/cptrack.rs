//! cptrack CLI: track segmented cells through a (z, t) stack.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use cptrack_rs::stack::SegmentStatus;
use cptrack_rs::{CancelToken, RunConfig, StackRunner, TrackerAlgorithm};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "cptrack")]
#[command(about = "Track cell identities across segmented microscopy stacks")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track every segment of a stack and write the CSV outputs.
    Track(TrackArgs),

    /// Print the default configuration as JSON.
    DefaultConfig {
        /// Write to this file instead of standard output.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Args)]
struct TrackArgs {
    /// JSON configuration file; flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the *_masks and *_img artifacts.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Directory receiving the outputs.
    #[arg(long)]
    output: Option<PathBuf>,

    /// Depth of the identity-defining time sweep.
    #[arg(long)]
    z_pivot: Option<u32>,

    /// Timepoints swept along depth, comma separated.
    #[arg(long, value_delimiter = ',')]
    timepoints: Option<Vec<u32>>,

    /// template, mean-shift or kalman-template.
    #[arg(long)]
    algorithm: Option<TrackerAlgorithm>,

    /// Largest center displacement between consecutive frames (pixels).
    #[arg(long)]
    jump_limit: Option<f32>,

    /// Seed-center matching tolerance (pixels).
    #[arg(long)]
    match_tolerance: Option<f32>,

    /// Region of interest as x1,y1,x2,y2.
    #[arg(long, value_delimiter = ',', num_args = 4)]
    region: Option<Vec<i32>>,

    /// Ask for a region of interest on standard input before each segment.
    #[arg(long)]
    select_region: bool,

    /// Write annotated frames for every segment.
    #[arg(long)]
    annotate: bool,

    /// Discard the trajectory of removed trackers.
    #[arg(long)]
    drop_removed_history: bool,
}

impl TrackArgs {
    fn into_config(self) -> CliResult<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_json_file(path)?,
            None => RunConfig::default(),
        };
        if let Some(input) = self.input {
            config.input_dir = input;
        }
        if let Some(output) = self.output {
            config.output_dir = output;
        }
        if let Some(z_pivot) = self.z_pivot {
            config.z_pivot = z_pivot;
        }
        if let Some(timepoints) = self.timepoints {
            config.timepoints = timepoints;
        }
        if let Some(algorithm) = self.algorithm {
            config.algorithm = algorithm;
        }
        if let Some(jump_limit) = self.jump_limit {
            config.jump_limit = jump_limit;
        }
        if let Some(tolerance) = self.match_tolerance {
            config.match_tolerance = tolerance;
        }
        if let Some(region) = self.region {
            let &[x1, y1, x2, y2] = region.as_slice() else {
                return Err(format!("--region expects 4 values, got {}", region.len()).into());
            };
            config.region = Some([x1, y1, x2, y2]);
        }
        config.select_region |= self.select_region;
        config.annotate |= self.annotate;
        if self.drop_removed_history {
            config.keep_removed_history = false;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Raise `cancel` on every Ctrl-C so the segment being tracked stops early.
///
/// The listener owns its runtime on a background thread for the rest of the
/// process.
fn listen_for_interrupts(cancel: CancelToken) -> CliResult<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    std::thread::Builder::new()
        .name("interrupt".to_string())
        .spawn(move || {
            runtime.block_on(async {
                while tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupt received, abandoning the current segment");
                    cancel.cancel();
                }
            })
        })?;
    Ok(())
}

fn run_track(args: TrackArgs) -> CliResult<()> {
    let config = args.into_config()?;
    let mut runner = StackRunner::new(config);
    listen_for_interrupts(runner.cancel_token())?;
    let summary = runner.run()?;

    for report in &summary.segments {
        match &report.status {
            SegmentStatus::Tracked {
                outcome,
                frames_processed,
                matches,
                ..
            } => println!(
                "segment {} ({}): {:?}, {} frames, {} linked, {} missed",
                report.index, report.segment, outcome, frames_processed, matches.linked, matches.missed
            ),
            SegmentStatus::Skipped(reason) => {
                println!("segment {} ({}): skipped, {}", report.index, report.segment, reason)
            }
        }
    }
    println!(
        "{} global cells, {} of {} segments skipped",
        summary.table.len(),
        summary.skipped(),
        summary.segments.len()
    );
    Ok(())
}

fn run_default_config(out: Option<PathBuf>) -> CliResult<()> {
    let config = RunConfig::default();
    match out {
        Some(path) => config.to_json_file(&path)?,
        None => println!("{}", serde_json::to_string_pretty(&config)?),
    }
    Ok(())
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Track(args) => run_track(args),
        Commands::DefaultConfig { out } => run_default_config(out),
    }
}
