//! Output sinks for flattened tables

pub mod csv_export;
pub mod sqlite;

pub use csv_export::CsvExporter;
pub use sqlite::{SqliteSink, TableCounts};
