//! Question projection

use super::table::{normalize_records, required_array, Table};
use crate::error::EtlResult;
use crate::quality::{descriptor_records, DescriptorRecord};
use serde_json::Value;

/// Column stamped with the document's year label
pub const YEAR_COLUMN: &str = "year";

/// Per-document question settings
#[derive(Debug, Clone, Default)]
pub struct QuestionOptions {
    /// Year label stamped on every question of the document
    pub year: String,
    /// Columns to keep; every column when `None`
    pub columns: Option<Vec<String>>,
}

impl QuestionOptions {
    pub fn new(year: impl Into<String>) -> Self {
        Self {
            year: year.into(),
            columns: None,
        }
    }

    pub fn with_columns(mut self, columns: Option<Vec<String>>) -> Self {
        self.columns = columns;
        self
    }
}

/// Append the document's questions
///
/// A question listed twice in one document is kept once. The year column is
/// always present, whitelist or not. Descriptor records are taken before the
/// whitelist applies and appended to `descriptors`.
pub fn questions(
    root: &Value,
    mut acc: Table,
    options: &QuestionOptions,
    descriptors: &mut Vec<DescriptorRecord>,
) -> EtlResult<Table> {
    let mut rows = normalize_records(required_array(root, "questions")?, "questions")?
        .dedup_by(&["questionId"])
        .stamp(YEAR_COLUMN, Value::from(options.year.as_str()));

    descriptors.extend(descriptor_records(&rows));

    if let Some(columns) = &options.columns {
        let mut kept = columns.clone();
        if !kept.iter().any(|c| c == YEAR_COLUMN) {
            kept.push(YEAR_COLUMN.to_string());
        }
        rows = rows.project(&kept);
    }

    acc.append(rows);
    Ok(acc)
}
