//! # NAPLAN Common Library
//!
//! Shared code for the NAPLAN export tooling:
//! - Error and result types
//! - Bootstrap configuration loading and path resolution
//! - SQLite database access, declarative table schemas and schema reset

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
