//! CSV exports of the accumulated tables
//!
//! Each table becomes one file whose header is the union of its rows' columns
//! in first-seen order. Absent and null cells are empty.

use crate::error::EtlResult;
use crate::flatten::table::text;
use crate::flatten::{FlatTables, Table};
use crate::quality::DescriptorRecord;
use csv::WriterBuilder;
use std::path::PathBuf;
use tracing::info;

pub const QUESTIONS_CSV: &str = "questions.csv";
pub const ATTEMPTS_CSV: &str = "attempts.csv";
pub const WRITING_ATTEMPTS_CSV: &str = "writing_attempts.csv";
pub const PROFICIENCY_CSV: &str = "proficiencySortorder.csv";
pub const DOMAINS_CSV: &str = "domains.csv";
pub const DUPLICATE_DESCRIPTORS_CSV: &str = "duplicate_descriptors.csv";

/// Header of the duplicate descriptor export
const DESCRIPTOR_HEADER: [&str; 3] = ["questionIdentifier", "descriptor", "year"];

/// Writes CSV exports into an output directory
pub struct CsvExporter {
    output_dir: PathBuf,
}

impl CsvExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Write every export, returning the files written
    pub fn export(
        &self,
        tables: &FlatTables,
        duplicates: &[DescriptorRecord],
    ) -> EtlResult<Vec<PathBuf>> {
        let files = vec![
            self.write_table(QUESTIONS_CSV, &tables.questions)?,
            self.write_table(ATTEMPTS_CSV, &tables.attempts)?,
            self.write_table(WRITING_ATTEMPTS_CSV, &tables.writing_responses)?,
            self.write_table(PROFICIENCY_CSV, &tables.cut_points)?,
            self.write_table(DOMAINS_CSV, &tables.domains)?,
            self.write_descriptors(duplicates)?,
        ];
        info!(
            "Wrote {} CSV files to {}",
            files.len(),
            self.output_dir.display()
        );
        Ok(files)
    }

    /// Write one table; an empty table produces an empty file
    pub fn write_table(&self, file_name: &str, table: &Table) -> EtlResult<PathBuf> {
        let path = self.prepare(file_name)?;
        let mut writer = WriterBuilder::new().from_path(&path)?;

        let columns = table.columns();
        if !columns.is_empty() {
            writer.write_record(&columns)?;
            for row in table {
                writer.write_record(
                    columns
                        .iter()
                        .map(|c| row.get(c).map(text).unwrap_or_default()),
                )?;
            }
        }

        writer.flush()?;
        Ok(path)
    }

    /// Write the duplicate descriptor diagnostic; the header is always present
    pub fn write_descriptors(&self, records: &[DescriptorRecord]) -> EtlResult<PathBuf> {
        let path = self.prepare(DUPLICATE_DESCRIPTORS_CSV)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_path(&path)?;

        writer.write_record(DESCRIPTOR_HEADER)?;
        for record in records {
            writer.serialize(record)?;
        }

        writer.flush()?;
        Ok(path)
    }

    fn prepare(&self, file_name: &str) -> EtlResult<PathBuf> {
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(self.output_dir.join(file_name))
    }
}
