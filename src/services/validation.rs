//! Optional JSON Schema check applied to records before insertion.

use std::path::Path;

use jsonschema::JSONSchema;
use serde_json::Value;
use tracing::warn;

use crate::error::ConfigError;
use crate::record::Record;

pub struct RecordSchema {
    compiled: JSONSchema,
}

impl RecordSchema {
    pub fn compile(schema: &Value) -> Result<Self, String> {
        let compiled = JSONSchema::compile(schema).map_err(|e| e.to_string())?;
        Ok(Self { compiled })
    }

    pub async fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidSchema {
            path: path.to_path_buf(),
            message,
        };

        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| invalid(e.to_string()))?;
        let schema: Value = serde_json::from_str(&text).map_err(|e| invalid(e.to_string()))?;
        Self::compile(&schema).map_err(invalid)
    }

    /// Violations for one record, or `None` when it conforms.
    pub fn violations(&self, record: &Value) -> Option<String> {
        match self.compiled.validate(record) {
            Ok(()) => None,
            Err(errors) => Some(
                errors
                    .map(|error| format!("{}: {}", error.instance_path, error))
                    .collect::<Vec<_>>()
                    .join("; "),
            ),
        }
    }

    /// Keep conforming records in order and return how many were dropped.
    pub fn retain_valid(&self, records: Vec<Record>) -> (Vec<Record>, usize) {
        let mut valid = Vec::with_capacity(records.len());
        let mut rejected = 0;

        for (row, record) in records.into_iter().enumerate() {
            let value = Value::Object(record);
            match self.violations(&value) {
                None => {
                    if let Value::Object(record) = value {
                        valid.push(record);
                    }
                }
                Some(violations) => {
                    rejected += 1;
                    warn!(row = row + 1, %violations, "record failed schema validation");
                }
            }
        }

        (valid, rejected)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use serde_json::json;
    use tempfile::NamedTempFile;

    use super::*;

    fn schema() -> RecordSchema {
        RecordSchema::compile(&json!({
            "type": "object",
            "required": ["id"],
            "properties": {
                "id": {"type": "integer"},
                "url": {"type": ["string", "null"]}
            }
        }))
        .unwrap()
    }

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[test]
    fn test_retain_valid_keeps_order() {
        let records = vec![
            record(json!({"id": 1, "url": "a"})),
            record(json!({"id": "two"})),
            record(json!({"id": 3, "url": null})),
            record(json!({"url": "d"})),
        ];

        let (valid, rejected) = schema().retain_valid(records);

        assert_eq!(rejected, 2);
        assert_eq!(valid.len(), 2);
        assert_eq!(valid[0]["id"], json!(1));
        assert_eq!(valid[1]["id"], json!(3));
    }

    #[test]
    fn test_violations_name_the_field() {
        let violations = schema().violations(&json!({"id": "x"})).unwrap();
        assert!(violations.contains("/id"));
    }

    #[tokio::test]
    async fn test_invalid_schema_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"{ not json").unwrap();

        let result = RecordSchema::from_file(file.path()).await;

        assert!(matches!(result, Err(ConfigError::InvalidSchema { .. })));
    }
}
