//! Racecourse Join Library
//!
//! Enriches race records with racecourse coordinates: two delimited-text
//! files are loaded with per-field type inference, the races are
//! left-joined on their course name against the coordinates, and the
//! result is written back out as delimited text.
//!
//! This library provides:
//! - Typed field inference (numbers, booleans, dates, nulls, text)
//! - A last-wins coordinate lookup with duplicate diagnostics
//! - A strict left join that keeps every race exactly once, in order
//! - All-or-nothing output to stdout or an atomically replaced file
//!
//! # Example
//!
//! ```no_run
//! use racecourse_join::{JoinConfig, run};
//!
//! # async fn example() -> racecourse_join::Result<()> {
//! let config = JoinConfig::new("data/races.csv", "data/racecourseCoords.csv");
//! let mut out = Vec::new();
//! let stats = run(&config, &mut out).await?;
//! println!("{} of {} races matched", stats.matched, stats.races);
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod formatter;
pub mod joiner;
pub mod loader;
pub mod models;
pub mod value;

pub use config::{JoinColumns, JoinConfig, OutputTarget};
pub use error::{JoinError, Result};
pub use models::{Coordinate, JoinStats, Table};
pub use value::Value;

use std::io::Write;
use tracing::info;

/// Load both inputs, join them and write the result
///
/// Output goes to `stdout` when the configuration targets standard
/// output, otherwise to the configured file. Nothing is written unless
/// every earlier step succeeded.
pub async fn run<W: Write>(config: &JoinConfig, stdout: &mut W) -> Result<JoinStats> {
    config.validate()?;
    let delimiter = config.delimiter_byte()?;

    let (races, coord_table) = loader::load_inputs(config).await?;
    info!(
        "Loaded {} races from {} and {} coordinates from {}",
        races.len(),
        config.races_path.display(),
        coord_table.len(),
        config.coords_path.display()
    );

    let coords = joiner::coordinates_from_table(&coord_table, &config.columns);
    let (joined, stats) = joiner::join(&races, &coords, &config.columns);

    let bytes = formatter::format_table(&joined, delimiter)?;
    formatter::write_output(&bytes, &config.output, stdout)?;

    info!(
        "Joined {} races ({} matched, {} unmatched) into {}",
        stats.races,
        stats.matched,
        stats.unmatched,
        config.output.describe()
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_inputs(dir: &TempDir, races: &str, coords: &str) -> JoinConfig {
        fs::write(dir.path().join("races.csv"), races).unwrap();
        fs::write(dir.path().join("racecourseCoords.csv"), coords).unwrap();
        JoinConfig::from_data_dir(dir.path())
    }

    #[tokio::test]
    async fn test_run_joins_and_writes() {
        let dir = TempDir::new().unwrap();
        let config = write_inputs(
            &dir,
            "course,distance\nTokyo,2000\nUnknown,1600\n",
            "name,x,y\nTokyo,10,20\n",
        );

        let mut out = Vec::new();
        let stats = run(&config, &mut out).await.unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "course,distance,course_x,course_y\nTokyo,2000,10,20\nUnknown,1600,,"
        );
        assert_eq!(stats.races, 2);
        assert_eq!(stats.matched, 1);
        assert_eq!(stats.unmatched, 1);
        assert_eq!(stats.coordinates, 1);
    }

    #[tokio::test]
    async fn test_run_writes_nothing_on_malformed_input() {
        let dir = TempDir::new().unwrap();
        let config = write_inputs(&dir, "course\nTokyo\n", "name,x,y\n\"Tokyo,10,20\n");

        let mut out = Vec::new();
        let err = run(&config, &mut out).await.unwrap_err();

        assert!(matches!(err, JoinError::ParseMalformed { .. }));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_run_rejects_bad_config_before_reading() {
        let dir = TempDir::new().unwrap();
        let config = JoinConfig::from_data_dir(dir.path()).with_delimiter('é');

        let mut out = Vec::new();
        let err = run(&config, &mut out).await.unwrap_err();
        assert!(matches!(err, JoinError::Configuration { .. }));
    }
}
