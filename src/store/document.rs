//! Speed documents as stored in the `slot` collection

use crate::error::HeatmapError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw speed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreDocument {
    /// Document key
    pub id: String,
    /// Measurement instant
    pub datetime: DateTime<Utc>,
    /// Speed in km/hr
    pub speed: f64,
}

impl StoreDocument {
    pub fn new(id: impl Into<String>, datetime: DateTime<Utc>, speed: f64) -> Self {
        Self {
            id: id.into(),
            datetime,
            speed,
        }
    }

    /// Check the document can be bucketed and classified
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyId);
        }
        if !self.speed.is_finite() || self.speed < 0.0 {
            return Err(ValidationError::InvalidSpeed {
                id: self.id.clone(),
                speed: self.speed,
            });
        }
        Ok(())
    }
}

/// Validation errors for speed documents
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Document id is empty")]
    EmptyId,

    #[error("Document {id} has invalid speed {speed}: expected a finite, non-negative km/hr value")]
    InvalidSpeed { id: String, speed: f64 },
}

/// Result of document validation
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub id: Option<String>,
    pub error: ValidationError,
}

/// Parser for document dumps
pub struct DocumentAdapter;

impl DocumentAdapter {
    /// Parse a JSON string containing an array of documents
    pub fn parse_array(json: &str) -> Result<Vec<StoreDocument>, HeatmapError> {
        let documents: Vec<StoreDocument> = serde_json::from_str(json)?;
        Ok(documents)
    }

    /// Parse NDJSON (one document per line)
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<StoreDocument>, HeatmapError> {
        let mut documents = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<StoreDocument>(trimmed) {
                Ok(document) => documents.push(document),
                Err(e) => {
                    return Err(HeatmapError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(documents)
    }

    /// Parse either format, picking JSON array when the input starts with `[`
    pub fn parse_auto(input: &str) -> Result<Vec<StoreDocument>, HeatmapError> {
        if input.trim_start().starts_with('[') {
            Self::parse_array(input)
        } else {
            Self::parse_ndjson(input)
        }
    }

    /// Validate a batch of documents, returning only the failures
    pub fn validate_documents(documents: &[StoreDocument]) -> Vec<ValidationResult> {
        documents
            .iter()
            .enumerate()
            .filter_map(|(idx, doc)| {
                doc.validate().err().map(|error| ValidationResult {
                    index: idx,
                    id: (!doc.id.is_empty()).then(|| doc.id.clone()),
                    error,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_ndjson() {
        let input = r#"
{"id": "a1", "datetime": "2024-01-16T14:30:00Z", "speed": 12.5}

{"id": "a2", "datetime": "2024-01-16T15:30:00+07:00", "speed": 6.2}
"#;
        let docs = DocumentAdapter::parse_ndjson(input).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "a1");
        assert_eq!(
            docs[1].datetime,
            Utc.with_ymd_and_hms(2024, 1, 16, 8, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let input = "{\"id\": \"a1\", \"datetime\": \"2024-01-16T14:30:00Z\", \"speed\": 1.0}\nnot json\n";
        let err = DocumentAdapter::parse_ndjson(input).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_parse_auto_array() {
        let input = r#"[{"id": "a1", "datetime": "2024-01-16T14:30:00Z", "speed": 9.0}]"#;
        let docs = DocumentAdapter::parse_auto(input).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].speed, 9.0);
    }

    #[test]
    fn test_validate_documents() {
        let at = Utc.with_ymd_and_hms(2024, 1, 16, 14, 0, 0).unwrap();
        let docs = vec![
            StoreDocument::new("ok", at, 10.0),
            StoreDocument::new("", at, 10.0),
            StoreDocument::new("neg", at, -1.0),
            StoreDocument::new("nan", at, f64::NAN),
        ];
        let failures = DocumentAdapter::validate_documents(&docs);
        assert_eq!(failures.len(), 3);
        assert_eq!(failures[0].index, 1);
        assert_eq!(failures[0].error, ValidationError::EmptyId);
        assert_eq!(failures[1].id.as_deref(), Some("neg"));
        assert!(matches!(failures[2].error, ValidationError::InvalidSpeed { .. }));
    }
}
