//! Data quality findings
//!
//! Findings never abort a run. They are collected while flattening, logged,
//! and counted in the run summary.

use crate::flatten::table::{text, Table};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// A recoverable problem found in the input data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataQualityWarning {
    /// Attempt dropped because a student identifier is missing
    MissingStudentId {
        document: String,
        attempt: usize,
        field: String,
    },
    /// One question identifier carries several descriptors
    DuplicateDescriptor {
        question_identifier: String,
        descriptors: Vec<String>,
    },
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataQualityWarning::MissingStudentId {
                document,
                attempt,
                field,
            } => write!(f, "{}: attempt {} dropped, missing {}", document, attempt, field),
            DataQualityWarning::DuplicateDescriptor {
                question_identifier,
                descriptors,
            } => write!(
                f,
                "question {} has {} different descriptors",
                question_identifier,
                descriptors.len()
            ),
        }
    }
}

/// Collected data quality warnings
#[derive(Debug, Clone, Default)]
pub struct QualityReport {
    warnings: Vec<DataQualityWarning>,
}

impl QualityReport {
    pub fn push(&mut self, warning: DataQualityWarning) {
        self.warnings.push(warning);
    }

    /// Take over another report's warnings
    pub fn merge(&mut self, other: QualityReport) {
        self.warnings.extend(other.warnings);
    }

    pub fn warnings(&self) -> &[DataQualityWarning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn missing_student_ids(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, DataQualityWarning::MissingStudentId { .. }))
            .count()
    }

    pub fn duplicate_descriptors(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, DataQualityWarning::DuplicateDescriptor { .. }))
            .count()
    }
}

/// One row of the duplicate descriptor export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptorRecord {
    pub question_identifier: String,
    pub descriptor: String,
    pub year: String,
}

/// Descriptor records of the questions carrying both an identifier and a
/// descriptor, in table order
pub fn descriptor_records(questions: &Table) -> Vec<DescriptorRecord> {
    questions
        .iter()
        .filter_map(|row| {
            let identifier = row.get("questionIdentifier").filter(|v| !v.is_null())?;
            let descriptor = row.get("descriptor").filter(|v| !v.is_null())?;
            Some(DescriptorRecord {
                question_identifier: text(identifier),
                descriptor: text(descriptor),
                year: row.get("year").map(text).unwrap_or_default(),
            })
        })
        .collect()
}

/// Find question identifiers whose descriptor differs between questions
///
/// Returns every distinct (questionIdentifier, descriptor, year) triple of the
/// divergent identifiers, in first-seen order, and records one warning per
/// identifier.
pub fn duplicate_descriptors(
    records: &[DescriptorRecord],
    report: &mut QualityReport,
) -> Vec<DescriptorRecord> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<DescriptorRecord>> = HashMap::new();

    for record in records {
        let group = groups
            .entry(record.question_identifier.clone())
            .or_insert_with(|| {
                order.push(record.question_identifier.clone());
                Vec::new()
            });
        if !group.contains(record) {
            group.push(record.clone());
        }
    }

    let mut divergent = Vec::new();
    for identifier in order {
        let Some(records) = groups.remove(&identifier) else {
            continue;
        };

        let mut descriptors: Vec<String> = Vec::new();
        for record in &records {
            if !descriptors.contains(&record.descriptor) {
                descriptors.push(record.descriptor.clone());
            }
        }
        if descriptors.len() < 2 {
            continue;
        }

        let warning = DataQualityWarning::DuplicateDescriptor {
            question_identifier: identifier,
            descriptors,
        };
        warn!("{}", warning);
        report.push(warning);
        divergent.extend(records);
    }

    divergent
}
