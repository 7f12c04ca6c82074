//! Error types for the importer.
//!
//! Each stage has its own enum so callers can tell a bad environment from a
//! bad file from an unreachable server. [`Error`] unifies them for the binary.

use std::path::PathBuf;

use thiserror::Error;

use crate::services::store::DocumentFailure;

/// Boxed cause carried by errors that wrap driver or SDK failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Remediation printed with every connectivity failure.
pub const CONNECTIVITY_HINT: &str = "Check: (1) the client address is on the server allowlist, \
     (2) the URI uses the expected scheme (mongodb+srv:// for clusters), \
     (3) no proxy is intercepting TLS, (4) the system certificate store trusts the server";

/// Problems with the process configuration, raised before any I/O.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVariable(String),

    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),

    #[error("delimiter must be a single ASCII character, got {0:?}")]
    InvalidDelimiter(char),

    #[error("invalid record schema {path:?}: {message}")]
    InvalidSchema { path: PathBuf, message: String },
}

/// Failures while reading the source table.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("file not found: {0:?}")]
    NotFound(PathBuf),

    #[error("I/O error reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV parsing error in {origin}: {source}")]
    Csv {
        origin: String,
        source: csv_async::Error,
    },

    #[error("{0} has no header row")]
    MissingHeader(String),

    #[error("failed to fetch {location}: {source}")]
    Remote { location: String, source: BoxError },
}

/// Failures while writing records to the document store.
#[derive(Debug, Error)]
pub enum InsertError {
    /// Server selection, DNS, TLS or handshake failure. Nothing was written.
    #[error("Cannot connect to MongoDB: {source}. {hint}")]
    Connectivity { source: BoxError, hint: &'static str },

    /// The store accepted the batch but could not confirm the write concern.
    #[error(
        "write concern not satisfied after {inserted} of {submitted} documents were written: {message}"
    )]
    BulkWrite {
        submitted: usize,
        inserted: usize,
        message: String,
        /// Documents rejected in the same batch.
        failures: Vec<DocumentFailure>,
    },

    #[error("insert into {namespace} failed: {source}")]
    Unclassified { namespace: String, source: BoxError },
}

impl InsertError {
    pub fn connectivity(source: impl Into<BoxError>) -> Self {
        Self::Connectivity {
            source: source.into(),
            hint: CONNECTIVITY_HINT,
        }
    }

    pub fn unclassified(namespace: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Unclassified {
            namespace: namespace.into(),
            source: source.into(),
        }
    }
}

/// Any failure of a full import run.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    DataLoad(#[from] DataLoadError),

    #[error(transparent)]
    Insert(#[from] InsertError),
}

pub type Result<T> = std::result::Result<T, Error>;
