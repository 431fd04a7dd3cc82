//! # Butterfly-csv CLI
//!
//! Command-line interface for the butterfly-csv library.
//! Converts an OpenStreetMap XML extract into CSV tables.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use butterfly_csv::{ConvertOptions, GraphStats, Layout, OverwriteBehavior};
use clap::{Parser, ValueEnum};
use log::{error, LevelFilter};

mod cli;

/// Command-line interface for butterfly-csv
#[derive(Parser, Debug)]
#[command(name = "butterfly-csv")]
#[command(about = "Convert OpenStreetMap XML extracts into CSV tables")]
#[command(long_about = "Converts an OpenStreetMap XML file into semicolon separated tables:
  butterfly-csv monaco.osm out/                    # elements, nodes, ways, relations
  butterfly-csv monaco.osm out/ --layout per-kind  # one table per element kind
  butterfly-csv monaco.osm out/ --stats=json       # print statistics as JSON

File Overwrite Behavior:
  By default, existing tables in the output directory are never overwritten
  --force                          # Overwrite existing tables")]
#[command(version = env!("BUTTERFLY_VERSION"))]
struct Cli {
    /// OSM XML file to convert
    input: PathBuf,

    /// Existing directory receiving the CSV files
    output: PathBuf,

    /// Table layout
    #[arg(long, value_enum, default_value_t = LayoutArg::Split)]
    layout: LayoutArg,

    /// Overwrite existing output files
    #[arg(short, long)]
    force: bool,

    /// Print element statistics after conversion
    #[arg(long, value_enum, num_args = 0..=1, default_missing_value = "text")]
    stats: Option<StatsFormat>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LayoutArg {
    /// elements.csv plus nodes, ways and relations geometry tables
    Split,
    /// One self-contained table per element kind
    PerKind,
}

impl From<LayoutArg> for Layout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Split => Layout::Split,
            LayoutArg::PerKind => Layout::PerKind,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StatsFormat {
    Text,
    Json,
}

fn main() {
    if let Err(e) = run() {
        error!("❌ Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging to stderr
    let mut logger = env_logger::Builder::from_default_env();
    logger.target(env_logger::Target::Stderr);
    if cli.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    if cli.verbose {
        eprintln!("🦋 Butterfly-csv v{} starting...", env!("BUTTERFLY_VERSION"));
    }

    let banner = format!("🗺️  Converting {}", cli.input.display());
    let progress = cli::ProgressManager::new(&banner);
    let options = ConvertOptions {
        layout: cli.layout.into(),
        overwrite: overwrite_behavior(cli.force),
        progress: Some(progress.callback()),
    };

    let summary = butterfly_csv::convert_with_options(&cli.input, &cli.output, &options)
        .inspect_err(|_| progress.abandon())
        .with_context(|| {
            format!(
                "failed to convert {} into {}",
                cli.input.display(),
                cli.output.display()
            )
        })?;

    if let Some(format) = cli.stats {
        print_stats(&summary.stats, format)?;
    }

    eprintln!("📁 {}", confirmation(&cli.output, summary.files.len()));
    Ok(())
}

fn overwrite_behavior(force: bool) -> OverwriteBehavior {
    if force {
        OverwriteBehavior::Force
    } else {
        OverwriteBehavior::NeverOverwrite
    }
}

fn confirmation(output: &Path, files: usize) -> String {
    format!("Wrote {files} tables to {}", output.display())
}

fn print_stats(stats: &GraphStats, format: StatsFormat) -> Result<()> {
    match format {
        StatsFormat::Text => println!("{stats}"),
        StatsFormat::Json => {
            let json = stats.to_json().context("failed to serialize statistics")?;
            println!("{json}");
        }
    }
    Ok(())
}
