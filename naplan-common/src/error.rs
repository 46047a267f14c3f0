//! Common error types for the NAPLAN tooling

use thiserror::Error;

/// Common result type for NAPLAN operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the NAPLAN crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// CREATE TABLE hit a table left behind by an earlier run
    #[error("Table already exists: {0}")]
    SchemaAlreadyExists(String),

    /// Invalid input or parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
