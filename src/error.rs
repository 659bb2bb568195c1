//! Error handling for the race/coordinate join.
//!
//! Every variant is fatal: the run stops before anything is written.
//! A race whose course has no coordinates is not an error and never
//! surfaces here.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JoinError {
    #[error("Input file could not be read: {path}")]
    InputMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed delimited text in file: {path} (line {line}) - {reason}")]
    ParseMalformed {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Failed to write output to {destination}")]
    Output {
        destination: String,
        #[source]
        source: std::io::Error,
    },
}

impl JoinError {
    pub fn input_missing(path: &Path, source: std::io::Error) -> Self {
        Self::InputMissing {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn parse_malformed(path: &Path, line: u64, reason: impl Into<String>) -> Self {
        Self::ParseMalformed {
            path: path.to_path_buf(),
            line,
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn output(destination: impl Into<String>, source: std::io::Error) -> Self {
        Self::Output {
            destination: destination.into(),
            source,
        }
    }

    /// Build a parse error from a `csv` reader failure, keeping the line it points at
    pub fn from_csv(path: &Path, error: csv::Error) -> Self {
        let line = error.position().map(|p| p.line()).unwrap_or(0);
        let reason = match error.kind() {
            csv::ErrorKind::Utf8 { .. } => "field is not valid UTF-8".to_string(),
            _ => error.to_string(),
        };
        Self::parse_malformed(path, line, reason)
    }
}

pub type Result<T> = std::result::Result<T, JoinError>;
