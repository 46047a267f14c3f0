//! Database Test Utilities

use naplan_etl::{Pipeline, PipelineOptions, RunSummary};
use sqlx::SqlitePool;
use std::path::Path;

/// Count rows in a table
pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Distinct non-null text values of one column, sorted
pub async fn distinct_values(pool: &SqlitePool, table: &str, column: &str) -> Vec<String> {
    sqlx::query_scalar(&format!(
        "SELECT DISTINCT {col} FROM {table} WHERE {col} IS NOT NULL ORDER BY {col}",
        col = column,
        table = table
    ))
    .fetch_all(pool)
    .await
    .unwrap()
}

/// Run the pipeline with default options over `input`, writing to `output`
///
/// Returns the summary and a pool on the resulting database.
pub async fn run_pipeline(input: &Path, output: &Path) -> (RunSummary, SqlitePool) {
    let options = PipelineOptions::new(input, output);
    let database_path = options.database_path.clone();

    let summary = Pipeline::new(options).run().await.unwrap();
    let pool = naplan_common::db::init::open_database(&database_path)
        .await
        .unwrap();
    (summary, pool)
}
