//! Error types for naplan-etl
//!
//! Errors fall into two groups. Document errors (`Parse`, `SchemaMismatch`,
//! `DocumentTooLarge`) skip the offending input file; everything else aborts
//! the run.

use std::path::PathBuf;
use thiserror::Error;

/// ETL error type
#[derive(Debug, Error)]
pub enum EtlError {
    /// Input directory or file could not be read
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Input file is not valid JSON
    #[error("Failed to parse {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    /// Document is valid JSON but lacks the expected shape
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Input file exceeds the configured size ceiling
    #[error("Document too large: {file} ({size} bytes, limit {limit})")]
    DocumentTooLarge {
        file: PathBuf,
        size: u64,
        limit: u64,
    },

    /// CSV export failure
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Database failure while loading rows
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// naplan-common error
    #[error("Common error: {0}")]
    Common(#[from] naplan_common::Error),
}

impl EtlError {
    /// True for errors confined to a single input document
    pub fn is_document_error(&self) -> bool {
        matches!(
            self,
            EtlError::Parse { .. } | EtlError::SchemaMismatch(_) | EtlError::DocumentTooLarge { .. }
        )
    }
}

/// Result type for ETL operations
pub type EtlResult<T> = Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_errors_are_skippable() {
        let parse = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(EtlError::Parse {
            file: "2021.json".to_string(),
            source: parse
        }
        .is_document_error());
        assert!(EtlError::SchemaMismatch("missing array".to_string()).is_document_error());
        assert!(EtlError::DocumentTooLarge {
            file: PathBuf::from("big.json"),
            size: 10,
            limit: 5
        }
        .is_document_error());

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(!EtlError::Io(io).is_document_error());
    }
}
