use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::error::{BulkWriteFailure, Error as MongoError, ErrorKind};
use mongodb::options::{ClientOptions, InsertManyOptions, Tls, TlsOptions};
use mongodb::{Client, Collection};
use tracing::debug;

use crate::config::MongoSettings;
use crate::record::Record;
use crate::services::store::{BulkInsert, Connector, DocumentFailure, DocumentStore, StoreError};

const APP_NAME: &str = "csv-to-mongo";

pub async fn create_mongo_client(settings: &MongoSettings) -> Result<Client, StoreError> {
    let mut options = ClientOptions::parse(settings.uri()).await.map_err(classify)?;
    options.server_selection_timeout = Some(settings.server_selection_timeout());
    options.app_name.get_or_insert_with(|| APP_NAME.to_string());

    // Always encrypted; the driver's bundled roots apply unless a CA file is given.
    let tls = TlsOptions::builder()
        .ca_file_path(settings.tls_ca_file().cloned())
        .build();
    options.tls = Some(Tls::Enabled(tls));

    Client::with_options(options).map_err(classify)
}

pub fn get_collection(client: &Client, database: &str, collection: &str) -> Collection<Record> {
    client.database(database).collection::<Record>(collection)
}

/// Sort driver errors into the classes the inserter reports on.
pub fn classify(error: MongoError) -> StoreError {
    let unreachable = matches!(
        error.kind.as_ref(),
        ErrorKind::ServerSelection { .. }
            | ErrorKind::DnsResolve { .. }
            | ErrorKind::Io(_)
            | ErrorKind::InvalidTlsConfig { .. }
            | ErrorKind::ConnectionPoolCleared { .. }
    );
    if unreachable {
        return StoreError::Unreachable(Box::new(error));
    }
    if matches!(error.kind.as_ref(), ErrorKind::InvalidArgument { .. }) {
        return StoreError::InvalidOptions(error.to_string());
    }
    StoreError::Other(Box::new(error))
}

fn bulk_failure_report(submitted: usize, failure: &BulkWriteFailure) -> BulkInsert {
    let failures: Vec<DocumentFailure> = failure
        .write_errors
        .iter()
        .flatten()
        .map(|write_error| DocumentFailure {
            index: write_error.index,
            code: write_error.code,
            message: write_error.message.clone(),
        })
        .collect();

    BulkInsert {
        inserted: submitted.saturating_sub(failures.len()),
        failures,
        write_concern_error: failure
            .write_concern_error
            .as_ref()
            .map(|concern| concern.message.clone()),
    }
}

/// Opens one client per import run.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoConnector;

#[async_trait]
impl Connector for MongoConnector {
    type Store = MongoStore;

    async fn connect(&self, settings: &MongoSettings) -> Result<MongoStore, StoreError> {
        let client = create_mongo_client(settings).await?;
        Ok(MongoStore { client })
    }
}

pub struct MongoStore {
    client: Client,
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn ping(&self) -> Result<(), StoreError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(classify)?;
        Ok(())
    }

    async fn insert_unordered(
        &self,
        database: &str,
        collection: &str,
        records: &[Record],
    ) -> Result<BulkInsert, StoreError> {
        let collection = get_collection(&self.client, database, collection);
        let options = InsertManyOptions::builder().ordered(false).build();

        match collection.insert_many(records, options).await {
            Ok(result) => Ok(BulkInsert::complete(result.inserted_ids.len())),
            Err(error) => {
                if let ErrorKind::BulkWrite(failure) = error.kind.as_ref() {
                    return Ok(bulk_failure_report(records.len(), failure));
                }
                Err(classify(error))
            }
        }
    }

    async fn close(self) {
        debug!("shutting down MongoDB client");
        self.client.shutdown().await;
    }
}
