use miette::Diagnostic;
use thiserror::Error;

use crate::domain::DatasetKey;

#[derive(Debug, Error, Diagnostic)]
pub enum SitisError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("site resolution failed: {0}")]
    Resolution(String),

    #[error("graph request failed: {0}")]
    GraphHttp(String),

    #[error("graph returned status {status}: {message}")]
    GraphStatus { status: u16, message: String },

    #[error("cache write failed: {0}")]
    CacheWrite(String),

    #[error("dataset unavailable from remote, cache and local file: {0}")]
    DatasetUnavailable(DatasetKey),

    #[error("missing column {column} in {file}")]
    MissingColumn { file: String, column: String },

    #[error("failed to parse {file}: {message}")]
    CsvParse { file: String, message: String },

    #[error("invalid dataset key: {0}")]
    InvalidDatasetKey(String),

    #[error("activity {0} is not in the catalog")]
    UnknownActivity(i64),

    #[error("no patient with document {0}")]
    PatientNotFound(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
