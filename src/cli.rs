//! Command-line interface components.

use crate::config::{JoinConfig, OutputTarget};
use crate::error::{JoinError, Result};
use crate::models::JoinStats;
use clap::Parser;
use colored::*;
use std::path::PathBuf;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(name = "racecourse-join")]
#[command(about = "Join race records with racecourse coordinates and emit the enriched CSV")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Race records file (defaults to <DATA_DIR>/races.csv)
    #[arg(long, value_name = "PATH")]
    pub races: Option<PathBuf>,

    /// Racecourse coordinates file (defaults to <DATA_DIR>/racecourseCoords.csv)
    #[arg(long, value_name = "PATH")]
    pub coords: Option<PathBuf>,

    /// Directory holding races.csv and racecourseCoords.csv
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Write the joined table to this file instead of standard output
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Field delimiter for input and output (a single character, or "tab")
    #[arg(long, default_value = ",", value_parser = parse_delimiter)]
    pub delimiter: char,

    /// Enable verbose logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log warnings and errors, and skip the summary
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Build the run configuration from the parsed arguments
    pub fn to_config(&self) -> Result<JoinConfig> {
        let mut config = JoinConfig::from_data_dir(&self.data_dir).with_delimiter(self.delimiter);

        if let Some(races) = &self.races {
            config = config.with_races_path(races);
        }
        if let Some(coords) = &self.coords {
            config = config.with_coords_path(coords);
        }
        if let Some(output) = &self.output {
            config = config.with_output(OutputTarget::File(output.clone()));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn get_log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

fn parse_delimiter(value: &str) -> std::result::Result<char, String> {
    match value {
        "tab" | "\\t" => return Ok('\t'),
        _ => {}
    }

    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("expected a single character, got '{}'", value)),
    }
}

/// Set up structured logging on stderr; stdout carries the data
pub fn setup_logging(args: &Args) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("racecourse_join={}", log_level)));

    let initialised = if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    initialised
        .map_err(|e| JoinError::configuration(format!("Failed to initialise logging: {}", e)))?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Print the run summary to stderr
pub fn print_summary(stats: &JoinStats, config: &JoinConfig) {
    eprintln!("{}", "Join Summary".bright_green().bold());
    eprintln!(
        "  {} {}",
        "Races:".bright_cyan(),
        stats.races.to_string().bright_white().bold()
    );
    eprintln!(
        "  {} {}",
        "Matched:".bright_cyan(),
        stats.matched.to_string().bright_white()
    );
    if stats.unmatched > 0 {
        eprintln!(
            "  {} {}",
            "Unmatched:".bright_yellow(),
            stats.unmatched.to_string().bright_yellow().bold()
        );
    }
    eprintln!(
        "  {} {}",
        "Coordinates:".bright_cyan(),
        stats.coordinates.to_string().bright_white()
    );
    if stats.duplicate_names > 0 {
        eprintln!(
            "  {} {}",
            "Duplicate names:".bright_yellow(),
            stats.duplicate_names.to_string().bright_yellow()
        );
    }
    eprintln!(
        "  {} {}",
        "Output:".bright_cyan(),
        config.output.describe().bright_white()
    );
}
