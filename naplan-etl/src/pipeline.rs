//! Pipeline orchestrator
//!
//! Runs the three stages in strict order for each document: load, flatten
//! every record family, persist. Documents are processed one after another.
//!
//! # Error Handling
//! - Per-document isolation: a malformed, oversized or misshapen document is
//!   logged and skipped; the remaining documents still load
//! - I/O, database and CSV failures abort the run
//! - Data quality findings are collected and reported, never fatal
//!
//! # Example
//! ```rust,ignore
//! let summary = Pipeline::new(options).run().await?;
//! summary.log();
//! ```

use crate::error::{EtlError, EtlResult};
use crate::flatten::{flatten_document, FlatTables, QuestionOptions};
use crate::loader::{year_label, DocumentLoader, DEFAULT_MAX_FILE_SIZE};
use crate::quality::{duplicate_descriptors, QualityReport};
use crate::sink::{CsvExporter, SqliteSink, TableCounts};
use chrono::{DateTime, Utc};
use naplan_common::config::OutputMode;
use naplan_common::db::init::open_database;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Directory holding the JSON documents
    pub input_dir: PathBuf,
    /// Directory receiving CSV exports
    pub output_dir: PathBuf,
    /// SQLite database file
    pub database_path: PathBuf,
    /// Which sinks to write
    pub mode: OutputMode,
    /// Question column whitelist; every column when `None`
    pub question_columns: Option<Vec<String>>,
    /// Per-document size ceiling in bytes
    pub max_file_size: u64,
}

impl PipelineOptions {
    pub fn new(input_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        let output_dir = output_dir.into();
        Self {
            input_dir: input_dir.into(),
            database_path: output_dir.join(naplan_common::config::DEFAULT_DATABASE_FILE),
            output_dir,
            mode: OutputMode::default(),
            question_columns: None,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

/// A document left out of the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    pub file: String,
    pub reason: String,
}

/// Outcome of a pipeline run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Documents flattened and persisted
    pub documents_processed: usize,
    /// Documents skipped, with the reason
    pub skipped: Vec<SkippedDocument>,
    /// Database row counts per table (empty without a database sink)
    pub table_counts: BTreeMap<String, TableCounts>,
    /// CSV files written
    pub csv_files: Vec<PathBuf>,
    /// Data quality findings
    pub quality: QualityReport,
}

impl RunSummary {
    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    /// Rows inserted into `table`
    pub fn inserted(&self, table: &str) -> usize {
        self.table_counts.get(table).map_or(0, |c| c.inserted)
    }

    /// Log the run outcome
    pub fn log(&self) {
        info!(
            "Run complete in {} ms: {} documents processed, {} skipped",
            self.duration_ms(),
            self.documents_processed,
            self.skipped.len()
        );
        for skipped in &self.skipped {
            warn!("Skipped {}: {}", skipped.file, skipped.reason);
        }
        for (table, counts) in &self.table_counts {
            info!(
                "  {}: {} rows inserted, {} duplicates skipped",
                table, counts.inserted, counts.duplicates
            );
        }
        if !self.csv_files.is_empty() {
            info!("  {} CSV files written", self.csv_files.len());
        }
        if !self.quality.is_empty() {
            warn!(
                "{} data quality warnings ({} attempts without student ids, {} questions with duplicate descriptors)",
                self.quality.len(),
                self.quality.missing_student_ids(),
                self.quality.duplicate_descriptors()
            );
        }
    }
}

/// Pipeline orchestrator
pub struct Pipeline {
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(options: PipelineOptions) -> Self {
        Self { options }
    }

    /// Run the pipeline over every document in the input directory
    pub async fn run(&self) -> EtlResult<RunSummary> {
        let started_at = Utc::now();
        let mode = self.options.mode;
        info!(
            "Flattening {} (mode: {})",
            self.options.input_dir.display(),
            mode
        );

        let loader = DocumentLoader::new().with_max_file_size(self.options.max_file_size);
        let documents = loader.documents(&self.options.input_dir)?;
        info!("{} documents to process", documents.remaining());

        let mut sink = if mode.writes_database() {
            info!("Database: {}", self.options.database_path.display());
            let pool = open_database(&self.options.database_path).await?;
            let mut sink = SqliteSink::new(pool);
            sink.create_schema().await?;
            Some(sink)
        } else {
            None
        };

        let mut accumulated = FlatTables::default();
        let mut quality = QualityReport::default();
        let mut skipped = Vec::new();
        let mut documents_processed = 0;

        for (file, loaded) in documents {
            let root = match loaded {
                Ok(root) => root,
                Err(e) if e.is_document_error() => {
                    skipped.push(skip(&file, &e));
                    continue;
                }
                Err(e) => return Err(e),
            };

            let question_options = QuestionOptions::new(year_label(&file))
                .with_columns(self.options.question_columns.clone());

            let mut document_quality = QualityReport::default();
            let tables = match flatten_document(
                &root,
                &file,
                &question_options,
                FlatTables::default(),
                &mut document_quality,
            ) {
                Ok(tables) => tables,
                Err(e) if e.is_document_error() => {
                    skipped.push(skip(&file, &e));
                    continue;
                }
                Err(e) => return Err(e),
            };

            info!(
                "{}: {} rows flattened ({} answers, {} writing responses)",
                file,
                tables.total_rows(),
                tables.attempts.len(),
                tables.writing_responses.len()
            );

            if let Some(sink) = sink.as_mut() {
                sink.persist(&tables).await.map_err(|e| {
                    error!("{}: failed to persist: {}", file, e);
                    e
                })?;
            }

            quality.merge(document_quality);
            if mode.writes_csv() {
                accumulated.append(tables);
            } else {
                accumulated.descriptors.extend(tables.descriptors);
            }
            documents_processed += 1;
        }

        let duplicates = duplicate_descriptors(&accumulated.descriptors, &mut quality);

        let csv_files = if mode.writes_csv() {
            CsvExporter::new(&self.options.output_dir).export(&accumulated, &duplicates)?
        } else {
            Vec::new()
        };

        let table_counts = match sink {
            Some(sink) => {
                let counts: BTreeMap<String, TableCounts> = sink
                    .counts()
                    .iter()
                    .map(|(table, counts)| (table.to_string(), *counts))
                    .collect();
                sink.close().await;
                counts
            }
            None => BTreeMap::new(),
        };

        Ok(RunSummary {
            started_at,
            finished_at: Utc::now(),
            documents_processed,
            skipped,
            table_counts,
            csv_files,
            quality,
        })
    }
}

fn skip(file: &str, e: &EtlError) -> SkippedDocument {
    warn!("Skipping {}: {}", file, e);
    SkippedDocument {
        file: file.to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_input_directory_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let options = PipelineOptions::new(temp_dir.path().join("absent"), temp_dir.path());

        let result = Pipeline::new(options).run().await;
        assert!(matches!(result, Err(EtlError::Io(_))));
    }

    #[tokio::test]
    async fn test_csv_mode_writes_no_database() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("raw");
        let output = temp_dir.path().join("out");
        std::fs::create_dir_all(&input).unwrap();
        std::fs::write(
            input.join("2023.json"),
            json!({
                "domains": [], "subdomains": [], "proficiencyScoreCutOffPoints": [],
                "questions": [], "attempts": []
            })
            .to_string(),
        )
        .unwrap();

        let mut options = PipelineOptions::new(&input, &output);
        options.mode = OutputMode::Csv;
        let database_path = options.database_path.clone();

        let summary = Pipeline::new(options).run().await.unwrap();
        assert_eq!(summary.documents_processed, 1);
        assert_eq!(summary.csv_files.len(), 6);
        assert!(summary.table_counts.is_empty());
        assert!(!database_path.exists());
    }
}
