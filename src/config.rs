//! Run configuration and validation.
//!
//! Input locations, key columns and the output destination are plain
//! values injected into [`crate::run`]; nothing is resolved from the
//! location of the binary.

use crate::error::{JoinError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the race records inside a data directory
pub const DEFAULT_RACES_FILE: &str = "races.csv";

/// File name of the racecourse coordinates inside a data directory
pub const DEFAULT_COORDS_FILE: &str = "racecourseCoords.csv";

/// Where the joined table goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputTarget {
    /// The process's standard output
    Stdout,
    /// A file, replaced atomically
    File(PathBuf),
}

impl OutputTarget {
    pub fn describe(&self) -> String {
        match self {
            OutputTarget::Stdout => "<stdout>".to_string(),
            OutputTarget::File(path) => path.display().to_string(),
        }
    }
}

/// Column names used by the join
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinColumns {
    /// Key column in the race records
    pub race_key: String,

    /// Key column in the coordinate records
    pub coord_key: String,

    /// Coordinate columns copied into each race
    pub coord_x: String,
    pub coord_y: String,

    /// Names of the derived race columns
    pub derived_x: String,
    pub derived_y: String,
}

impl Default for JoinColumns {
    fn default() -> Self {
        Self {
            race_key: "course".to_string(),
            coord_key: "name".to_string(),
            coord_x: "x".to_string(),
            coord_y: "y".to_string(),
            derived_x: "course_x".to_string(),
            derived_y: "course_y".to_string(),
        }
    }
}

/// Global configuration for one join run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinConfig {
    /// Race records file
    pub races_path: PathBuf,

    /// Racecourse coordinates file
    pub coords_path: PathBuf,

    /// Output destination
    pub output: OutputTarget,

    /// Field delimiter for both input and output
    pub delimiter: char,

    pub columns: JoinColumns,
}

impl Default for JoinConfig {
    fn default() -> Self {
        Self::from_data_dir(Path::new("."))
    }
}

impl JoinConfig {
    /// Configuration reading the default file names from `dir`
    pub fn from_data_dir(dir: &Path) -> Self {
        Self {
            races_path: dir.join(DEFAULT_RACES_FILE),
            coords_path: dir.join(DEFAULT_COORDS_FILE),
            output: OutputTarget::Stdout,
            delimiter: ',',
            columns: JoinColumns::default(),
        }
    }

    /// Explicit input paths, output to stdout
    pub fn new(races_path: impl Into<PathBuf>, coords_path: impl Into<PathBuf>) -> Self {
        Self {
            races_path: races_path.into(),
            coords_path: coords_path.into(),
            ..Self::default()
        }
    }

    pub fn with_races_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.races_path = path.into();
        self
    }

    pub fn with_coords_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.coords_path = path.into();
        self
    }

    pub fn with_output(mut self, output: OutputTarget) -> Self {
        self.output = output;
        self
    }

    pub fn with_delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_columns(mut self, columns: JoinColumns) -> Self {
        self.columns = columns;
        self
    }

    /// Delimiter as the single byte the CSV reader and writer expect
    pub fn delimiter_byte(&self) -> Result<u8> {
        if !self.delimiter.is_ascii() {
            return Err(JoinError::configuration(format!(
                "Delimiter must be a single ASCII character, got '{}'",
                self.delimiter
            )));
        }
        match self.delimiter {
            '"' | '\n' | '\r' => Err(JoinError::configuration(format!(
                "Delimiter {:?} conflicts with quoting or line breaks",
                self.delimiter
            ))),
            c => Ok(c as u8),
        }
    }

    /// Check the configuration before any file is touched
    pub fn validate(&self) -> Result<()> {
        self.delimiter_byte()?;

        let c = &self.columns;
        for (label, name) in [
            ("race key", &c.race_key),
            ("coordinate key", &c.coord_key),
            ("x column", &c.coord_x),
            ("y column", &c.coord_y),
            ("derived x column", &c.derived_x),
            ("derived y column", &c.derived_y),
        ] {
            if name.is_empty() {
                return Err(JoinError::configuration(format!("{} must not be empty", label)));
            }
        }
        if c.derived_x == c.derived_y {
            return Err(JoinError::configuration(format!(
                "Derived columns must differ, both are '{}'",
                c.derived_x
            )));
        }

        debug!(
            "Configuration: races={}, coords={}, output={}, delimiter={:?}",
            self.races_path.display(),
            self.coords_path.display(),
            self.output.describe(),
            self.delimiter
        );
        Ok(())
    }
}
