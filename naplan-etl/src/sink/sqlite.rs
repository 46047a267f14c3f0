//! SQLite sink
//!
//! Rows are written with the INSERT statement rendered from each table's
//! [`TableSchema`]. Every `insert` call runs in its own transaction, so rows
//! committed for earlier documents survive a later failure.
//!
//! Tables keyed by values from the data (domains, students, writing marking
//! schemes) see the same entity in several yearly documents. The sink keeps a
//! registry of keys written during the run and skips repeats.

use crate::error::EtlResult;
use crate::flatten::{FlatTables, Row, Table};
use naplan_common::db::schema::{ColumnDefinition, TableSchema};
use naplan_common::db::tables::{
    self, AttemptsTable, CutPointsTable, DomainsTable, QuestionsTable, StudentScoresTable,
    StudentsTable, SubdomainsTable, WritingMarkingSchemeTable, WritingResponsesTable,
};
use serde_json::Value;
use sqlx::query::Query;
use sqlx::sqlite::{Sqlite, SqliteArguments};
use sqlx::SqlitePool;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, info};

/// Row counts for one table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    /// Rows written
    pub inserted: usize,
    /// Rows skipped because their key was already written this run
    pub duplicates: usize,
}

impl TableCounts {
    fn add(&mut self, other: TableCounts) {
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
    }
}

/// Writes flattened tables into the output database
pub struct SqliteSink {
    pool: SqlitePool,
    seen_keys: HashMap<&'static str, HashSet<String>>,
    counts: BTreeMap<&'static str, TableCounts>,
}

impl SqliteSink {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            seen_keys: HashMap::new(),
            counts: BTreeMap::new(),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the output tables, wiping data left by an earlier run
    pub async fn create_schema(&mut self) -> EtlResult<()> {
        tables::create_schema(&self.pool).await?;
        self.seen_keys.clear();
        self.counts.clear();
        Ok(())
    }

    /// Append rows to `T`'s table in input order, in one transaction
    pub async fn insert<T: TableSchema>(&mut self, rows: &Table) -> EtlResult<TableCounts> {
        let table = T::table_name();
        let columns = T::insert_columns();
        let key_columns = T::natural_key();
        let sql = T::insert_sql();

        let seen = self.seen_keys.entry(table).or_default();
        let mut outcome = TableCounts::default();
        let mut tx = self.pool.begin().await?;

        for row in rows {
            if !key_columns.is_empty() && !seen.insert(natural_key(row, &key_columns)) {
                outcome.duplicates += 1;
                continue;
            }

            let mut query = sqlx::query(&sql);
            for column in &columns {
                query = bind_value(query, row.get(column.source_field()));
            }
            query.execute(&mut *tx).await?;
            outcome.inserted += 1;
        }

        tx.commit().await?;

        debug!(
            "{}: inserted {} rows, skipped {} duplicates",
            table, outcome.inserted, outcome.duplicates
        );
        self.counts.entry(table).or_default().add(outcome);
        Ok(outcome)
    }

    /// Insert every table of one flattened document
    ///
    /// Parents go before children so the declared foreign keys would hold.
    pub async fn persist(&mut self, tables: &FlatTables) -> EtlResult<()> {
        self.insert::<DomainsTable>(&tables.domains).await?;
        self.insert::<SubdomainsTable>(&tables.subdomains).await?;
        self.insert::<CutPointsTable>(&tables.cut_points).await?;
        self.insert::<QuestionsTable>(&tables.questions).await?;
        self.insert::<StudentsTable>(&tables.students).await?;
        self.insert::<WritingMarkingSchemeTable>(&tables.marking_scheme).await?;
        self.insert::<StudentScoresTable>(&tables.student_scores).await?;
        self.insert::<AttemptsTable>(&tables.attempts).await?;
        self.insert::<WritingResponsesTable>(&tables.writing_responses).await?;
        Ok(())
    }

    /// Cumulative counts per table since the schema was created
    pub fn counts(&self) -> &BTreeMap<&'static str, TableCounts> {
        &self.counts
    }

    /// Close the connection pool
    pub async fn close(self) {
        info!("Closing output database");
        self.pool.close().await;
    }
}

fn natural_key(row: &Row, key_columns: &[ColumnDefinition]) -> String {
    key_columns
        .iter()
        .map(|c| row.get(c.source_field()).map(Value::to_string).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\u{1f}")
}

fn bind_value<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: Option<&Value>,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        None | Some(Value::Null) => query.bind(None::<String>),
        Some(Value::Bool(b)) => query.bind(*b),
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Some(Value::String(s)) => query.bind(s.clone()),
        Some(nested) => query.bind(nested.to_string()),
    }
}
