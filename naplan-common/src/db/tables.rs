//! Output table definitions and schema lifecycle
//!
//! Column `source` fields name the flattened record field each value is read
//! from. Fields that keep their nested dot path after flattening
//! (`student.studentId`, `domain.domainId`) are mapped onto plain column names
//! here.

use crate::db::schema::{create_table, ColumnDefinition, ForeignKey, SchemaIntrospector, TableSchema};
use crate::{Error, Result};
use sqlx::SqlitePool;
use tracing::{info, warn};

/// SQLite's AUTOINCREMENT bookkeeping table, never dropped
pub const SEQUENCE_TABLE: &str = "sqlite_sequence";

pub struct DomainsTable;

impl TableSchema for DomainsTable {
    fn table_name() -> &'static str {
        "domains"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("domainId", "TEXT").primary_key(),
            ColumnDefinition::new("domainName", "TEXT"),
            ColumnDefinition::new("isWritingTask", "BOOLEAN"),
        ]
    }
}

pub struct SubdomainsTable;

impl TableSchema for SubdomainsTable {
    fn table_name() -> &'static str {
        "subdomains"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::surrogate_key("id"),
            ColumnDefinition::new("domain", "TEXT"),
            ColumnDefinition::new("title", "TEXT"),
            ColumnDefinition::new("domainId", "TEXT"),
        ]
    }

    fn foreign_keys() -> Vec<ForeignKey> {
        vec![ForeignKey::new("domainId", "domains", "domainId")]
    }
}

pub struct CutPointsTable;

impl TableSchema for CutPointsTable {
    fn table_name() -> &'static str {
        "proficiency_score_cut_off_points"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::surrogate_key("id"),
            ColumnDefinition::new("level", "TEXT"),
            ColumnDefinition::new("startPoint", "REAL"),
            ColumnDefinition::new("scoreCutPoint", "REAL"),
            ColumnDefinition::new("year", "INTEGER"),
            ColumnDefinition::new("domainId", "TEXT"),
        ]
    }

    fn foreign_keys() -> Vec<ForeignKey> {
        vec![ForeignKey::new("domainId", "domains", "domainId")]
    }
}

pub struct QuestionsTable;

impl QuestionsTable {
    /// Descriptive and statistical question attributes kept by default
    pub const ATTRIBUTES: [&'static str; 25] = [
        "questionId",
        "eventIdentifier",
        "questionIdentifier",
        "nodeIdentifier",
        "descriptor",
        "domain",
        "domainId",
        "subdomain",
        "subdomainAbbr",
        "subdomain3",
        "curriculumContentCode",
        "curriculumContentUrl",
        "exemplarItem",
        "testLevel",
        "difficulty",
        "proficiencyLevel",
        "attempts",
        "correct",
        "incorrect",
        "notAttempted",
        "correctPercentage",
        "domainAndYearLevelAttempts",
        "attemptedPercentage",
        "parallelTestSection",
        "locationInTestSection",
    ];
}

impl TableSchema for QuestionsTable {
    fn table_name() -> &'static str {
        "questions"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::surrogate_key("id"),
            ColumnDefinition::new("questionId", "TEXT"),
            ColumnDefinition::new("eventIdentifier", "TEXT"),
            ColumnDefinition::new("questionIdentifier", "TEXT"),
            ColumnDefinition::new("nodeIdentifier", "TEXT"),
            ColumnDefinition::new("descriptor", "TEXT"),
            ColumnDefinition::new("domain", "TEXT"),
            ColumnDefinition::new("domainId", "TEXT"),
            ColumnDefinition::new("subdomain", "TEXT"),
            ColumnDefinition::new("subdomainAbbr", "TEXT"),
            ColumnDefinition::new("subdomain3", "TEXT"),
            ColumnDefinition::new("curriculumContentCode", "TEXT"),
            ColumnDefinition::new("curriculumContentUrl", "TEXT"),
            ColumnDefinition::new("exemplarItem", "TEXT"),
            ColumnDefinition::new("testLevel", "INTEGER"),
            ColumnDefinition::new("difficulty", "INTEGER"),
            ColumnDefinition::new("proficiencyLevel", "TEXT"),
            ColumnDefinition::new("attempts", "INTEGER"),
            ColumnDefinition::new("correct", "INTEGER"),
            ColumnDefinition::new("incorrect", "INTEGER"),
            ColumnDefinition::new("notAttempted", "INTEGER"),
            ColumnDefinition::new("correctPercentage", "REAL"),
            ColumnDefinition::new("domainAndYearLevelAttempts", "INTEGER"),
            ColumnDefinition::new("attemptedPercentage", "REAL"),
            ColumnDefinition::new("parallelTestSection", "TEXT"),
            ColumnDefinition::new("locationInTestSection", "INTEGER"),
            ColumnDefinition::new("year", "TEXT"),
        ]
    }

    fn foreign_keys() -> Vec<ForeignKey> {
        vec![ForeignKey::new("domainId", "domains", "domainId")]
    }
}

pub struct StudentsTable;

impl TableSchema for StudentsTable {
    fn table_name() -> &'static str {
        "students"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("studentId", "TEXT")
                .primary_key()
                .from_field("student.studentId"),
            ColumnDefinition::new("studentLOTE", "TEXT").from_field("student.metadata.studentLOTE"),
            ColumnDefinition::new("schoolStudentId", "TEXT")
                .from_field("student.metadata.schoolStudentId"),
        ]
    }
}

pub struct StudentScoresTable;

impl TableSchema for StudentScoresTable {
    fn table_name() -> &'static str {
        "student_scores"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::surrogate_key("id"),
            ColumnDefinition::new("studentId", "TEXT").from_field("student.studentId"),
            ColumnDefinition::new("domainId", "TEXT").from_field("domain.domainId"),
            ColumnDefinition::new("possibleRawScore", "REAL"),
            ColumnDefinition::new("studentRawScore", "REAL"),
            ColumnDefinition::new("scaledScore", "REAL"),
        ]
    }

    fn foreign_keys() -> Vec<ForeignKey> {
        vec![
            ForeignKey::new("domainId", "domains", "domainId"),
            ForeignKey::new("studentId", "students", "studentId"),
        ]
    }
}

pub struct AttemptsTable;

impl TableSchema for AttemptsTable {
    fn table_name() -> &'static str {
        "attempts"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::surrogate_key("id"),
            ColumnDefinition::new("studentId", "TEXT").from_field("student.studentId"),
            ColumnDefinition::new("correct", "BOOLEAN"),
            ColumnDefinition::new("answeredOn", "TEXT"),
            ColumnDefinition::new("questionId", "TEXT"),
            ColumnDefinition::new("questionNo", "INTEGER"),
            ColumnDefinition::new("parallelTestSection", "TEXT"),
            ColumnDefinition::new("node", "TEXT"),
        ]
    }

    fn foreign_keys() -> Vec<ForeignKey> {
        vec![
            ForeignKey::new("questionId", "questions", "questionId"),
            ForeignKey::new("studentId", "students", "studentId"),
        ]
    }
}

pub struct WritingMarkingSchemeTable;

impl TableSchema for WritingMarkingSchemeTable {
    fn table_name() -> &'static str {
        "writing_marking_scheme"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::new("markingSchemeId", "TEXT")
                .primary_key()
                .from_field("id"),
            ColumnDefinition::new("questionId", "TEXT"),
            ColumnDefinition::new("name", "TEXT"),
            ColumnDefinition::new("description", "TEXT"),
            ColumnDefinition::new("domainId", "TEXT"),
            ColumnDefinition::new("testLevel", "INTEGER").primary_key(),
            ColumnDefinition::new("proficiency", "TEXT").from_field("proficiencyLevel"),
            ColumnDefinition::new("scoreD", "INTEGER").primary_key(),
            ColumnDefinition::new("sDescription", "TEXT"),
        ]
    }

    fn foreign_keys() -> Vec<ForeignKey> {
        vec![
            ForeignKey::new("questionId", "questions", "questionId"),
            ForeignKey::new("domainId", "domains", "domainId"),
        ]
    }
}

pub struct WritingResponsesTable;

impl TableSchema for WritingResponsesTable {
    fn table_name() -> &'static str {
        "writing_responses"
    }

    fn expected_columns() -> Vec<ColumnDefinition> {
        vec![
            ColumnDefinition::surrogate_key("id"),
            ColumnDefinition::new("studentId", "TEXT").from_field("student.studentId"),
            ColumnDefinition::new("writingResponse", "TEXT"),
            ColumnDefinition::new("questionId", "TEXT"),
            ColumnDefinition::new("markingSchemeId", "TEXT").from_field("rowguid"),
            ColumnDefinition::new("score", "INTEGER").from_field("effectiveScore"),
            ColumnDefinition::new("testLevel", "INTEGER").from_field("student.testLevel"),
        ]
    }

    fn foreign_keys() -> Vec<ForeignKey> {
        vec![
            ForeignKey::new("questionId", "questions", "questionId"),
            ForeignKey::new("studentId", "students", "studentId"),
            ForeignKey::composite(
                &["markingSchemeId", "testLevel", "score"],
                "writing_marking_scheme",
                &["markingSchemeId", "testLevel", "scoreD"],
            ),
        ]
    }
}

/// Names of every output table, in creation order
pub fn table_names() -> Vec<&'static str> {
    vec![
        DomainsTable::table_name(),
        SubdomainsTable::table_name(),
        CutPointsTable::table_name(),
        QuestionsTable::table_name(),
        StudentsTable::table_name(),
        WritingMarkingSchemeTable::table_name(),
        StudentScoresTable::table_name(),
        AttemptsTable::table_name(),
        WritingResponsesTable::table_name(),
    ]
}

/// Create every output table
///
/// Fails with [`Error::SchemaAlreadyExists`] on the first table that is already present.
pub async fn create_tables(pool: &SqlitePool) -> Result<()> {
    create_table::<DomainsTable>(pool).await?;
    create_table::<SubdomainsTable>(pool).await?;
    create_table::<CutPointsTable>(pool).await?;
    create_table::<QuestionsTable>(pool).await?;
    create_table::<StudentsTable>(pool).await?;
    create_table::<WritingMarkingSchemeTable>(pool).await?;
    create_table::<StudentScoresTable>(pool).await?;
    create_table::<AttemptsTable>(pool).await?;
    create_table::<WritingResponsesTable>(pool).await?;

    info!("Created {} tables", table_names().len());
    Ok(())
}

/// Create the output schema, wiping a stale database first if needed
///
/// Existing tables mean an earlier run left data behind. That run is
/// discarded: every table is dropped and the schema recreated empty.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    match create_tables(pool).await {
        Ok(()) => Ok(()),
        Err(Error::SchemaAlreadyExists(table)) => {
            warn!(
                "Table '{}' already exists; dropping all tables from the previous run",
                table
            );
            drop_all_tables(pool).await?;
            create_tables(pool).await
        }
        Err(e) => Err(e),
    }
}

/// Drop every table except SQLite's sequence bookkeeping table
///
/// Returns the number of tables dropped.
pub async fn drop_all_tables(pool: &SqlitePool) -> Result<usize> {
    // Dropping a referenced table deletes its rows first, which fails under
    // enforcement on pools opened elsewhere
    sqlx::query("PRAGMA foreign_keys = OFF").execute(pool).await?;

    let tables = SchemaIntrospector::list_tables(pool).await?;
    let mut dropped = 0;

    for table in tables {
        if table == SEQUENCE_TABLE {
            continue;
        }
        sqlx::query(&format!("DROP TABLE \"{}\"", table.replace('"', "\"\"")))
            .execute(pool)
            .await?;
        dropped += 1;
    }

    info!("Dropped {} tables", dropped);
    Ok(dropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::open_in_memory;

    #[test]
    fn test_writing_marking_scheme_composite_key() {
        assert_eq!(
            WritingMarkingSchemeTable::primary_key(),
            vec!["markingSchemeId", "testLevel", "scoreD"]
        );
        let sql = WritingMarkingSchemeTable::create_table_sql();
        assert!(sql.contains("PRIMARY KEY (markingSchemeId, testLevel, scoreD)"));
    }

    #[test]
    fn test_natural_keys() {
        let names = |cols: Vec<ColumnDefinition>| -> Vec<String> {
            cols.into_iter().map(|c| c.name).collect()
        };
        assert_eq!(names(DomainsTable::natural_key()), vec!["domainId"]);
        assert_eq!(names(StudentsTable::natural_key()), vec!["studentId"]);
        assert!(AttemptsTable::natural_key().is_empty());
        assert!(QuestionsTable::natural_key().is_empty());
    }

    #[test]
    fn test_question_attributes_match_columns() {
        let columns: Vec<String> = QuestionsTable::insert_columns()
            .into_iter()
            .map(|c| c.name)
            .collect();
        for attribute in QuestionsTable::ATTRIBUTES {
            assert!(columns.iter().any(|c| c == attribute), "missing column {}", attribute);
        }
    }

    #[tokio::test]
    async fn test_create_schema_on_empty_database() {
        let pool = open_in_memory().await.unwrap();
        create_schema(&pool).await.unwrap();

        let tables = SchemaIntrospector::list_tables(&pool).await.unwrap();
        for table in table_names() {
            assert!(tables.iter().any(|t| t == table), "table {} missing", table);
        }
    }

    #[tokio::test]
    async fn test_drop_all_tables_keeps_sequence_table() {
        let pool = open_in_memory().await.unwrap();
        create_tables(&pool).await.unwrap();

        // Populate sqlite_sequence through an AUTOINCREMENT insert
        sqlx::query("INSERT INTO subdomains (domain, title, domainId) VALUES ('Reading', 'Inference', 'D1')")
            .execute(&pool)
            .await
            .unwrap();

        let dropped = drop_all_tables(&pool).await.unwrap();
        assert_eq!(dropped, table_names().len());

        let remaining = SchemaIntrospector::list_tables(&pool).await.unwrap();
        assert!(remaining.iter().all(|t| t == SEQUENCE_TABLE), "left: {:?}", remaining);
    }

    #[tokio::test]
    async fn test_drop_all_tables_with_related_rows() {
        let pool = open_in_memory().await.unwrap();
        create_tables(&pool).await.unwrap();

        let enabled: i64 = sqlx::query_scalar("PRAGMA foreign_keys")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(enabled, 0);

        // Orphan child rows and rows referencing a non-unique parent column
        for sql in [
            "INSERT INTO domains (domainId, domainName, isWritingTask) VALUES ('D1', 'Reading', 0)",
            "INSERT INTO questions (questionId, domainId) VALUES ('Q1', 'D1')",
            "INSERT INTO questions (questionId, domainId) VALUES ('Q1', 'D9')",
            "INSERT INTO attempts (studentId, correct, questionId) VALUES ('S1', 1, 'Q1')",
        ] {
            sqlx::query(sql).execute(&pool).await.unwrap();
        }

        create_schema(&pool).await.unwrap();
        for table in table_names() {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(count, 0, "table {} should be empty after reset", table);
        }
    }
}
