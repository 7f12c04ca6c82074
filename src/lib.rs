//! Load a CSV file into a MongoDB collection.
//!
//! The [`CsvLoader`] reads a header-keyed table into [`Record`]s with missing
//! cells normalized to `null`. The [`Inserter`] opens a TLS connection, pings
//! the server and writes the records as one unordered bulk insert, reporting
//! how many documents were persisted.
//!
//! ```rust,ignore
//! use csv_to_mongo::{CsvLoader, Inserter};
//!
//! let inserter = Inserter::from_env()?;
//! let records = CsvLoader::default().load("data.csv").await?;
//! let inserted = inserter.insert(&records, "db", "collection").await?;
//! ```

pub mod config;
pub mod error;
pub mod helpers;
pub mod record;
pub mod services;

pub use config::MongoSettings;
pub use error::{ConfigError, DataLoadError, Error, InsertError, Result};
pub use record::Record;
pub use services::database::MongoConnector;
pub use services::inserter::{InsertReport, Inserter};
pub use services::loader::{CsvLoader, LoadOptions, Source};
pub use services::validation::RecordSchema;
