//! CSV loader.
//!
//! Reads a header-keyed table from a local file or an S3 object and turns
//! each row into a [`Record`], preserving file order.

use std::fmt;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use csv_async::{AsyncReaderBuilder, StringRecord};
use tokio::io::AsyncRead;
use tokio_stream::StreamExt;
use tracing::{debug, info};

use crate::error::DataLoadError;
use crate::record::{ColumnKind, Record, column_names};
use crate::services::s3;

/// Where the CSV comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Local(PathBuf),
    S3 { bucket: String, key: String },
}

impl FromStr for Source {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let Some(location) = value.strip_prefix("s3://") else {
            return Ok(Source::Local(PathBuf::from(value)));
        };
        match location.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok(Source::S3 {
                bucket: bucket.to_string(),
                key: key.to_string(),
            }),
            _ => Err(format!("expected s3://<bucket>/<key>, got {value}")),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Local(path) => write!(f, "{}", path.display()),
            Source::S3 { bucket, key } => write!(f, "s3://{bucket}/{key}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub delimiter: u8,
    /// Convert numeric and boolean columns; otherwise keep every cell as text.
    pub infer_types: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            infer_types: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CsvLoader {
    options: LoadOptions,
}

impl CsvLoader {
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    /// Load every row of a local CSV file.
    pub async fn load(&self, path: impl AsRef<Path>) -> Result<Vec<Record>, DataLoadError> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => DataLoadError::NotFound(path.to_path_buf()),
            _ => DataLoadError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;
        self.read(file, &path.display().to_string()).await
    }

    pub async fn load_source(&self, source: &Source) -> Result<Vec<Record>, DataLoadError> {
        match source {
            Source::Local(path) => self.load(path).await,
            Source::S3 { bucket, key } => {
                let reader = s3::open_object(bucket, key).await?;
                self.read(reader, &source.to_string()).await
            }
        }
    }

    /// Parse CSV from any byte stream. `origin` names the input in errors.
    pub async fn read<R>(&self, reader: R, origin: &str) -> Result<Vec<Record>, DataLoadError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let csv_error = |source| DataLoadError::Csv {
            origin: origin.to_string(),
            source,
        };

        let mut reader = AsyncReaderBuilder::new()
            .delimiter(self.options.delimiter)
            .create_reader(reader);

        let headers = reader.headers().await.map_err(csv_error)?.clone();
        if headers.is_empty() {
            return Err(DataLoadError::MissingHeader(origin.to_string()));
        }
        let names = column_names(headers.iter());

        let mut rows: Vec<StringRecord> = Vec::new();
        let mut lines = reader.into_records();
        while let Some(row) = lines.next().await {
            rows.push(row.map_err(csv_error)?);
        }

        let kinds: Vec<ColumnKind> = (0..names.len())
            .map(|column| {
                if self.options.infer_types {
                    ColumnKind::infer(rows.iter().map(|row| row.get(column).unwrap_or("")))
                } else {
                    ColumnKind::Text
                }
            })
            .collect();
        let inferred: Vec<_> = names.iter().zip(&kinds).collect();
        debug!(%origin, columns = ?inferred, "inferred column kinds");

        let records: Vec<Record> = rows
            .iter()
            .map(|row| {
                names
                    .iter()
                    .zip(&kinds)
                    .enumerate()
                    .map(|(column, (name, kind))| {
                        (name.clone(), kind.convert(row.get(column).unwrap_or("")))
                    })
                    .collect()
            })
            .collect();

        info!(%origin, rows = records.len(), "loaded CSV");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::{Value, json};
    use tempfile::NamedTempFile;

    use super::*;

    fn fixture(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[tokio::test]
    async fn test_file_not_found() {
        let result = CsvLoader::default().load("nonexistent.csv").await;
        assert!(matches!(result, Err(DataLoadError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_cell_becomes_null() {
        let file = fixture("url,length,label\nhttp://a.com,12,1\nhttp://b.com,,-1\nhttp://c.com,7,1\n");

        let records = CsvLoader::default().load(file.path()).await.unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[1]["length"], Value::Null);
        assert_eq!(records[0]["length"], json!(12));
        assert_eq!(records[1]["label"], json!(-1));
    }

    #[tokio::test]
    async fn test_preserves_order_and_count() {
        let mut contents = String::from("n,name\n");
        for n in 0..50 {
            contents.push_str(&format!("{n},row-{n}\n"));
        }
        let file = fixture(&contents);

        let records = CsvLoader::default().load(file.path()).await.unwrap();

        assert_eq!(records.len(), 50);
        for (n, record) in records.iter().enumerate() {
            assert_eq!(record["n"], json!(n));
            assert_eq!(record["name"], json!(format!("row-{n}")));
        }
    }

    #[tokio::test]
    async fn test_nan_never_survives() {
        let file = fixture("a,b,c\nNaN,nan,1.5\n,NULL,N/A\n2.5,x,NaN\n");

        let records = CsvLoader::default().load(file.path()).await.unwrap();

        for record in &records {
            for value in record.values() {
                assert_ne!(value, &json!("NaN"));
                assert_ne!(value, &json!("nan"));
                if let Some(number) = value.as_f64() {
                    assert!(!number.is_nan());
                }
            }
        }
        assert_eq!(records[0]["a"], Value::Null);
        assert_eq!(records[2]["a"], json!(2.5));
        assert_eq!(records[2]["b"], json!("x"));
    }

    #[tokio::test]
    async fn test_without_type_inference() {
        let options = LoadOptions {
            infer_types: false,
            ..Default::default()
        };
        let records = CsvLoader::new(options)
            .read("id,flag\n1,true\n2,\n".as_bytes(), "inline")
            .await
            .unwrap();

        assert_eq!(records[0]["id"], json!("1"));
        assert_eq!(records[0]["flag"], json!("true"));
        assert_eq!(records[1]["flag"], Value::Null);
    }

    #[tokio::test]
    async fn test_quoted_fields_and_delimiter() {
        let mut writer = csv::WriterBuilder::new().delimiter(b';').from_writer(vec![]);
        writer.write_record(["title", "body"]).unwrap();
        writer.write_record(["semi;colon", "line\nbreak \"quoted\""]).unwrap();
        let bytes = writer.into_inner().unwrap();

        let options = LoadOptions {
            delimiter: b';',
            ..Default::default()
        };
        let records = CsvLoader::new(options)
            .read(bytes.as_slice(), "inline")
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["title"], json!("semi;colon"));
        assert_eq!(records[0]["body"], json!("line\nbreak \"quoted\""));
    }

    #[tokio::test]
    async fn test_ragged_row_is_rejected() {
        let result = CsvLoader::default()
            .read("a,b\n1,2\n3\n".as_bytes(), "inline")
            .await;
        assert!(matches!(result, Err(DataLoadError::Csv { .. })));
    }

    #[tokio::test]
    async fn test_empty_input() {
        let result = CsvLoader::default().read("".as_bytes(), "inline").await;
        assert!(matches!(result, Err(DataLoadError::MissingHeader(_))));
    }

    #[test]
    fn test_source_parsing() {
        assert_eq!(
            "s3://bucket/data/in.csv".parse::<Source>().unwrap(),
            Source::S3 {
                bucket: "bucket".into(),
                key: "data/in.csv".into()
            }
        );
        assert_eq!(
            "Network_Data/phisingData.csv".parse::<Source>().unwrap(),
            Source::Local(PathBuf::from("Network_Data/phisingData.csv"))
        );
        assert!("s3://bucket-only".parse::<Source>().is_err());
    }
}
