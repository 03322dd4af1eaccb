use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Could not find column: {0}")]
    UnknownColumn(String),
    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),
    #[error("Row has {len} fields, header has {expected}")]
    RowLength { len: usize, expected: usize },
    #[error("Dimension value is not permitted: {0:?}")]
    InvalidDimensionValue(String),
    #[error("Dimension {0} not found")]
    UnknownDimension(String),
    #[error("Unassigned dimension value: {0}")]
    Unassigned(String),
    #[error("Key {key:?} has {parts} parts, expected {expected}")]
    KeyMismatch {
        key: String,
        parts: usize,
        expected: usize,
    },
    #[error("Config has no dimensions")]
    NoDimensions,
    #[error("Invalid filter {0:?}, expected column=value")]
    InvalidFilter(String),
    #[error("Invalid {axis} value {value:?} in series {series:?}")]
    InvalidPoint {
        axis: &'static str,
        value: String,
        series: String,
    },
    #[error("Series {label:?} and {other:?} share the data file {path}")]
    DuplicateSeries {
        label: String,
        other: String,
        path: PathBuf,
    },
    #[error("Chart {chart:?}: {source}")]
    Chart {
        chart: String,
        #[source]
        source: Box<Error>,
    },
    #[error("Config error: {0}")]
    Config(#[from] serde_yml::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Attaches the offending path to an [`io::Error`].
pub(crate) fn io_error(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Error {
    let path = path.into();
    move |source| Error::Io { path, source }
}
