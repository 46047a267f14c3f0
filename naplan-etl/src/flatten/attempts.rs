//! Attempt and answer flattening
//!
//! An attempt is one student's sitting of one domain's test. Its `answers`
//! array is exploded into one row per answered question, each carrying every
//! attempt-level field.

use super::table::{explode_join, has_value, normalize_records, required_array, Row, Table};
use crate::error::EtlResult;
use crate::quality::{DataQualityWarning, QualityReport};
use serde_json::Value;
use tracing::warn;

/// Internal student identifier
pub const STUDENT_ID: &str = "student.studentId";

/// School-issued student identifier
pub const SCHOOL_STUDENT_ID: &str = "student.metadata.schoolStudentId";

/// Flag separating writing attempts from the rest
pub const WRITING_FLAG: &str = "domain.isWritingTask";

/// Noisy answer fields removed from answer rows
pub const STRIPPED_FIELDS: [&str; 6] = [
    "status",
    "isComplete",
    "locationInTestSection",
    "displayOrder",
    "writingResponse",
    "markingSchemeComponents",
];

/// Normalize the document's attempts, keeping only identifiable students
///
/// Attempts missing either student identifier are dropped and reported.
pub fn attempt_rows(root: &Value, document: &str, report: &mut QualityReport) -> EtlResult<Table> {
    let attempts = normalize_records(required_array(root, "attempts")?, "attempts")?;

    let mut retained = Table::new();
    for (index, row) in attempts.into_iter().enumerate() {
        match missing_identifier(&row) {
            Some(field) => {
                warn!(
                    "{}: dropping attempt {} without {}",
                    document, index, field
                );
                report.push(DataQualityWarning::MissingStudentId {
                    document: document.to_string(),
                    attempt: index,
                    field: field.to_string(),
                });
            }
            None => retained.push(row),
        }
    }
    Ok(retained)
}

fn missing_identifier(row: &Row) -> Option<&'static str> {
    [STUDENT_ID, SCHOOL_STUDENT_ID]
        .into_iter()
        .find(|field| !has_value(row, field))
}

/// True for attempts at a writing task; a missing flag counts as false
pub fn is_writing(row: &Row) -> bool {
    matches!(row.get(WRITING_FLAG), Some(Value::Bool(true)))
}

/// Append one row per answer of every non-writing attempt
pub fn answers(attempts: &Table, mut acc: Table) -> Table {
    let objective = attempts.clone().filter(|row| !is_writing(row));
    let rows = explode_join(&objective, "answers").strip(&STRIPPED_FIELDS);
    acc.append(rows);
    acc
}
