use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop a run before any trial executes.
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed table {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path}: missing required column \"{column}\"")]
    Schema { path: PathBuf, column: String },

    #[error("{path}: row {row}, column \"{column}\": expected a whole number, got \"{value}\"")]
    Parse {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },

    #[error("{path}: duplicate {kind} name \"{name}\"")]
    DuplicateName {
        path: PathBuf,
        kind: &'static str,
        name: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, PlacementError>;
