use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// A page could not be retrieved. Never fatal to a run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}

impl FetchError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

/// A table could not be written or read.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to write spreadsheet {path:?}: {source}")]
    Xlsx {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    #[error("failed to read spreadsheet {path:?}: {message}")]
    XlsxRead { path: PathBuf, message: String },

    #[error("failed to access {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to create directory {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no table found at {stem:?} (.xlsx or .csv)")]
    NotFound { stem: PathBuf },

    #[error("table {path:?} is missing required column {column:?}")]
    MissingColumn { path: PathBuf, column: &'static str },
}
