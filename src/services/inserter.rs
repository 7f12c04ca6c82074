//! Best-effort bulk insertion into the document store.

use tracing::{debug, error, info, warn};

use crate::config::MongoSettings;
use crate::error::{ConfigError, InsertError};
use crate::record::Record;
use crate::services::database::MongoConnector;
use crate::services::store::{Connector, DocumentFailure, DocumentStore, StoreError};

/// Outcome of one insert call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertReport {
    pub submitted: usize,
    /// Documents actually persisted. Never exceeds `submitted`.
    pub inserted: usize,
    /// Documents the store rejected, by batch position.
    pub failures: Vec<DocumentFailure>,
}

impl InsertReport {
    pub fn duplicates(&self) -> usize {
        self.failures
            .iter()
            .filter(|failure| failure.is_duplicate_key())
            .count()
    }
}

/// Writes records through a fresh connection per call.
pub struct Inserter<C> {
    settings: MongoSettings,
    connector: C,
}

impl Inserter<MongoConnector> {
    /// Build from the process environment; fails before any I/O when the
    /// connection string is missing or blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(MongoSettings::from_env()?, MongoConnector))
    }
}

impl<C: Connector> Inserter<C> {
    pub fn new(settings: MongoSettings, connector: C) -> Self {
        Self {
            settings,
            connector,
        }
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
        connector: C,
    ) -> Result<Self, ConfigError> {
        Ok(Self::new(MongoSettings::from_lookup(lookup)?, connector))
    }

    /// Insert `records` and return how many were persisted.
    pub async fn insert(
        &self,
        records: &[Record],
        database: &str,
        collection: &str,
    ) -> Result<usize, InsertError> {
        let report = self.insert_detailed(records, database, collection).await?;
        Ok(report.inserted)
    }

    /// Insert `records`, keeping the per-document rejections.
    pub async fn insert_detailed(
        &self,
        records: &[Record],
        database: &str,
        collection: &str,
    ) -> Result<InsertReport, InsertError> {
        let namespace = format!("{database}.{collection}");
        info!(%namespace, submitted = records.len(), "connecting to document store");

        let store = self
            .connector
            .connect(&self.settings)
            .await
            .map_err(|e| match e {
                StoreError::Unreachable(source) => InsertError::connectivity(source),
                other => InsertError::unclassified(namespace.as_str(), other),
            })?;

        let outcome = write(&store, records, database, collection, &namespace).await;
        store.close().await;
        outcome
    }
}

async fn write<S: DocumentStore>(
    store: &S,
    records: &[Record],
    database: &str,
    collection: &str,
    namespace: &str,
) -> Result<InsertReport, InsertError> {
    // Any ping failure means the write is never attempted.
    store.ping().await.map_err(InsertError::connectivity)?;
    debug!(%namespace, "ping ok");

    let submitted = records.len();
    if submitted == 0 {
        info!(%namespace, "no records to insert");
        return Ok(InsertReport::default());
    }

    let bulk = store
        .insert_unordered(database, collection, records)
        .await
        .map_err(|e| match e {
            StoreError::Unreachable(source) => InsertError::connectivity(source),
            other => InsertError::unclassified(namespace, other),
        })?;

    let inserted = bulk.inserted.min(submitted);
    if !bulk.failures.is_empty() {
        let details = serde_json::to_string(&bulk.failures).unwrap_or_default();
        error!(%namespace, rejected = bulk.failures.len(), %details, "Bulk write error");
    }

    if let Some(message) = bulk.write_concern_error {
        return Err(InsertError::BulkWrite {
            submitted,
            inserted,
            message,
            failures: bulk.failures,
        });
    }

    let report = InsertReport {
        submitted,
        inserted,
        failures: bulk.failures,
    };

    if !report.failures.is_empty() {
        warn!(
            %namespace,
            inserted,
            submitted,
            duplicates = report.duplicates(),
            "some documents were rejected"
        );
    }
    info!(%namespace, inserted, submitted, "bulk insert finished");

    Ok(report)
}
