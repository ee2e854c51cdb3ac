//! Error types for table retrieval

use std::{io, path::PathBuf};
use thiserror::Error;

/// Every way fetching, extracting or parsing a table can fail.
#[derive(Error, Debug)]
pub enum Error {
    #[error("no home directory available for the default cache location")]
    NoHomeDir,

    #[error("unrecognized language tag `{0}` (expected `eng` or `fra`)")]
    UnknownLanguage(String),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("GET {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("reading response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: io::Error,
    },

    #[error("no CSV file found in the zip file for table {table_id}")]
    NoCsvMember { table_id: String },

    #[error("reading archive {path}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("parsing {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: arrow::error::ArrowError,
    },

    #[error("writing {path}: {source}")]
    Parquet {
        path: PathBuf,
        #[source]
        source: parquet::errors::ParquetError,
    },

    #[error("manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Adapter for `map_err` that tags an I/O error with the path it concerns.
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Error::Io { path, source }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failure of the top-level table retrieval.
///
/// Renders as `Error fetching table <id>: <cause>`, while keeping the
/// underlying [`Error`] available for matching.
#[derive(Error, Debug)]
#[error("Error fetching table {table_id}: {source}")]
pub struct TableError {
    table_id: String,
    #[source]
    source: Error,
}

impl TableError {
    pub(crate) fn new(table_id: &str, source: Error) -> Self {
        Self {
            table_id: table_id.to_string(),
            source,
        }
    }

    /// Identifier the caller asked for, as given.
    pub fn table_id(&self) -> &str {
        &self.table_id
    }

    /// The failure that caused this one.
    pub fn kind(&self) -> &Error {
        &self.source
    }

    pub fn into_inner(self) -> Error {
        self.source
    }
}
