//! Students and per-domain scores derived from attempts

use super::attempts::STUDENT_ID;
use super::table::Table;

/// Student fields carried by every attempt
pub const STUDENT_FIELDS: [&str; 3] = [
    STUDENT_ID,
    "student.metadata.studentLOTE",
    "student.metadata.schoolStudentId",
];

/// Domain identifier carried by every attempt
pub const DOMAIN_ID: &str = "domain.domainId";

/// Attempt-level score fields
pub const SCORE_FIELDS: [&str; 5] = [
    STUDENT_ID,
    DOMAIN_ID,
    "possibleRawScore",
    "studentRawScore",
    "scaledScore",
];

/// Append the students seen in `attempts`, unique by student id
pub fn students(attempts: &Table, mut acc: Table) -> Table {
    acc.append(attempts.clone().project(&STUDENT_FIELDS));
    acc.dedup_by(&[STUDENT_ID])
}

/// Append one score row per (student, domain), first observation wins
pub fn student_scores(attempts: &Table, mut acc: Table) -> Table {
    acc.append(attempts.clone().project(&SCORE_FIELDS));
    acc.dedup_by(&[STUDENT_ID, DOMAIN_ID])
}
