//! Declarative table schemas
//!
//! Each output table is described once in code: its columns, where each
//! column's value comes from in a flattened record, its keys and its foreign
//! keys. DDL and INSERT statements are rendered from these definitions.
//!
//! # Usage
//!
//! ```rust,ignore
//! pub struct DomainsTable;
//!
//! impl TableSchema for DomainsTable {
//!     fn table_name() -> &'static str { "domains" }
//!
//!     fn expected_columns() -> Vec<ColumnDefinition> {
//!         vec![
//!             ColumnDefinition::new("domainId", "TEXT").primary_key(),
//!             ColumnDefinition::new("domainName", "TEXT"),
//!         ]
//!     }
//! }
//!
//! create_table::<DomainsTable>(&pool).await?;
//! ```

use crate::{Error, Result};
use sqlx::SqlitePool;
use tracing::debug;

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,
    /// SQL type (e.g., "TEXT", "INTEGER", "REAL", "BOOLEAN")
    pub sql_type: String,
    /// PRIMARY KEY constraint
    pub primary_key: bool,
    /// AUTOINCREMENT surrogate key (value assigned by SQLite)
    pub autoincrement: bool,
    /// Flattened record field feeding this column (defaults to the column name)
    pub source: Option<String>,
}

impl ColumnDefinition {
    /// Create new column definition
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            primary_key: false,
            autoincrement: false,
            source: None,
        }
    }

    /// `INTEGER PRIMARY KEY AUTOINCREMENT` surrogate key
    pub fn surrogate_key(name: impl Into<String>) -> Self {
        Self::new(name, "INTEGER").primary_key().autoincrement()
    }

    /// Mark column as PRIMARY KEY
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Mark column as AUTOINCREMENT
    pub fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self
    }

    /// Read the value from a differently named flattened field
    pub fn from_field(mut self, field: impl Into<String>) -> Self {
        self.source = Some(field.into());
        self
    }

    /// Field name looked up in a flattened record
    pub fn source_field(&self) -> &str {
        self.source.as_deref().unwrap_or(&self.name)
    }

    /// Render the column clause of a CREATE TABLE statement
    fn to_sql(&self, inline_primary_key: bool) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);
        if self.primary_key && inline_primary_key {
            sql.push_str(" PRIMARY KEY");
            if self.autoincrement {
                sql.push_str(" AUTOINCREMENT");
            }
        }
        sql
    }
}

/// FOREIGN KEY clause
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    pub columns: Vec<String>,
    pub references_table: String,
    pub references_columns: Vec<String>,
}

impl ForeignKey {
    /// Single-column foreign key
    pub fn new(column: &str, references_table: &str, references_column: &str) -> Self {
        Self::composite(&[column], references_table, &[references_column])
    }

    /// Multi-column foreign key; columns pair up positionally
    pub fn composite(columns: &[&str], references_table: &str, references_columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            references_table: references_table.to_string(),
            references_columns: references_columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn to_sql(&self) -> String {
        format!(
            "FOREIGN KEY ({}) REFERENCES {}({})",
            self.columns.join(", "),
            self.references_table,
            self.references_columns.join(", ")
        )
    }
}

/// Defines the schema of one output table
pub trait TableSchema {
    /// Table name in database
    fn table_name() -> &'static str;

    /// Column definitions (order matters for table creation and inserts)
    fn expected_columns() -> Vec<ColumnDefinition>;

    /// Foreign keys declared on the table (not enforced at insert time)
    fn foreign_keys() -> Vec<ForeignKey> {
        Vec::new()
    }

    /// Columns of the primary key, in declaration order
    fn primary_key() -> Vec<String> {
        Self::expected_columns()
            .into_iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name)
            .collect()
    }

    /// Columns written by INSERT (everything except SQLite-assigned keys)
    fn insert_columns() -> Vec<ColumnDefinition> {
        Self::expected_columns()
            .into_iter()
            .filter(|c| !c.autoincrement)
            .collect()
    }

    /// Primary key columns whose values come from the data itself
    ///
    /// Empty for tables keyed by a surrogate id.
    fn natural_key() -> Vec<ColumnDefinition> {
        let columns = Self::expected_columns();
        if columns.iter().any(|c| c.primary_key && c.autoincrement) {
            return Vec::new();
        }
        columns.into_iter().filter(|c| c.primary_key).collect()
    }

    /// CREATE TABLE statement
    fn create_table_sql() -> String {
        let columns = Self::expected_columns();
        let pk_count = columns.iter().filter(|c| c.primary_key).count();
        let inline_pk = pk_count <= 1;

        let mut clauses: Vec<String> = columns.iter().map(|c| c.to_sql(inline_pk)).collect();
        if !inline_pk {
            let pk: Vec<&str> = columns
                .iter()
                .filter(|c| c.primary_key)
                .map(|c| c.name.as_str())
                .collect();
            clauses.push(format!("PRIMARY KEY ({})", pk.join(", ")));
        }
        clauses.extend(Self::foreign_keys().iter().map(ForeignKey::to_sql));

        format!(
            "CREATE TABLE {} (\n    {}\n)",
            Self::table_name(),
            clauses.join(",\n    ")
        )
    }

    /// Parameterized INSERT statement over `insert_columns`
    fn insert_sql() -> String {
        let columns = Self::insert_columns();
        let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
        let placeholders = vec!["?"; names.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            Self::table_name(),
            names.join(", "),
            placeholders
        )
    }
}

/// Create one table
///
/// A table left behind by an earlier run surfaces as
/// [`Error::SchemaAlreadyExists`] so the caller can reset the database.
pub async fn create_table<T: TableSchema>(pool: &SqlitePool) -> Result<()> {
    let sql = T::create_table_sql();
    debug!("Creating table {}", T::table_name());

    match sqlx::query(&sql).execute(pool).await {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db_err)) if db_err.message().contains("already exists") => {
            Err(Error::SchemaAlreadyExists(T::table_name().to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Schema introspection - read the tables actually present
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// All table names, SQLite bookkeeping tables included, alphabetical
    pub async fn list_tables(pool: &SqlitePool) -> Result<Vec<String>> {
        let tables = sqlx::query_scalar::<_, String>(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(pool)
        .await?;
        Ok(tables)
    }
}
