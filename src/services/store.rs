//! Document store seam.
//!
//! The inserter only talks to these traits, so the MongoDB client can be
//! swapped for an in-process double in tests.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::config::MongoSettings;
use crate::error::BoxError;
use crate::record::Record;

/// Server error code for a unique index violation.
pub const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Debug, Error)]
pub enum StoreError {
    /// No reachable node: selection timeout, DNS, socket or TLS failure.
    #[error("{0}")]
    Unreachable(#[source] BoxError),

    #[error("invalid client options: {0}")]
    InvalidOptions(String),

    #[error(transparent)]
    Other(BoxError),
}

/// One document the store refused.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentFailure {
    /// Position of the document in the submitted batch.
    pub index: usize,
    pub code: i32,
    pub message: String,
}

impl DocumentFailure {
    pub fn is_duplicate_key(&self) -> bool {
        self.code == DUPLICATE_KEY_CODE
    }
}

/// Store-side result of one unordered bulk insert.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkInsert {
    pub inserted: usize,
    pub failures: Vec<DocumentFailure>,
    pub write_concern_error: Option<String>,
}

impl BulkInsert {
    pub fn complete(inserted: usize) -> Self {
        Self {
            inserted,
            ..Self::default()
        }
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync + Sized {
    /// Liveness check against the server.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Insert every record, continuing past per-document failures.
    async fn insert_unordered(
        &self,
        database: &str,
        collection: &str,
        records: &[Record],
    ) -> Result<BulkInsert, StoreError>;

    /// Release the connection.
    async fn close(self) {}
}

#[async_trait]
pub trait Connector: Send + Sync {
    type Store: DocumentStore;

    /// Open a fresh store connection for one invocation.
    async fn connect(&self, settings: &MongoSettings) -> Result<Self::Store, StoreError>;
}
