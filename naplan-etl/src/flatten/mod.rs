//! JSON-to-table flattening
//!
//! Every record family has a transform taking the document root and an
//! accumulator table and returning the accumulator with the document's rows
//! appended. [`flatten_document`] threads a [`FlatTables`] accumulator through
//! all of them.

pub mod attempts;
pub mod domains;
pub mod proficiency;
pub mod questions;
pub mod students;
pub mod table;
pub mod writing;

pub use proficiency::ProficiencyLevel;
pub use questions::QuestionOptions;
pub use table::{Row, Table};

use crate::error::EtlResult;
use crate::quality::{DescriptorRecord, QualityReport};
use serde_json::Value;

/// Flattened tables, one per output family
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatTables {
    pub domains: Table,
    pub subdomains: Table,
    pub cut_points: Table,
    pub questions: Table,
    pub students: Table,
    pub student_scores: Table,
    pub attempts: Table,
    pub marking_scheme: Table,
    pub writing_responses: Table,
    /// Question descriptors, unaffected by the question column whitelist
    pub descriptors: Vec<DescriptorRecord>,
}

impl FlatTables {
    /// Append another accumulator's rows, table by table
    pub fn append(&mut self, other: FlatTables) {
        self.domains.append(other.domains);
        self.subdomains.append(other.subdomains);
        self.cut_points.append(other.cut_points);
        self.questions.append(other.questions);
        self.students.append(other.students);
        self.student_scores.append(other.student_scores);
        self.attempts.append(other.attempts);
        self.marking_scheme.append(other.marking_scheme);
        self.writing_responses.append(other.writing_responses);
        self.descriptors.extend(other.descriptors);
    }

    /// Total rows across all tables (descriptor records excluded)
    pub fn total_rows(&self) -> usize {
        self.domains.len()
            + self.subdomains.len()
            + self.cut_points.len()
            + self.questions.len()
            + self.students.len()
            + self.student_scores.len()
            + self.attempts.len()
            + self.marking_scheme.len()
            + self.writing_responses.len()
    }
}

/// Flatten one document into `acc`
///
/// A missing required array fails the whole document with
/// [`crate::EtlError::SchemaMismatch`]; rows already in `acc` are dropped with
/// it, so callers pass a fresh accumulator per document. Data quality findings
/// go to `report`.
pub fn flatten_document(
    root: &Value,
    document: &str,
    question_options: &QuestionOptions,
    acc: FlatTables,
    report: &mut QualityReport,
) -> EtlResult<FlatTables> {
    let attempt_rows = attempts::attempt_rows(root, document, report)?;
    let mut descriptors = acc.descriptors;

    Ok(FlatTables {
        domains: domains::domains(root, acc.domains)?,
        subdomains: domains::subdomains(root, acc.subdomains)?,
        cut_points: proficiency::cut_points(root, acc.cut_points)?,
        questions: questions::questions(root, acc.questions, question_options, &mut descriptors)?,
        marking_scheme: writing::marking_scheme(root, acc.marking_scheme)?,
        students: students::students(&attempt_rows, acc.students),
        student_scores: students::student_scores(&attempt_rows, acc.student_scores),
        attempts: attempts::answers(&attempt_rows, acc.attempts),
        writing_responses: writing::writing_responses(&attempt_rows, acc.writing_responses),
        descriptors,
    })
}
