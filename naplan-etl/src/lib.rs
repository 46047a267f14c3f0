//! naplan-etl library interface
//!
//! Flattens yearly NAPLAN JSON exports into a relational SQLite schema and
//! CSV files:
//! - [`loader`]: lists and parses the input documents
//! - [`flatten`]: per-family JSON-to-table transforms
//! - [`quality`]: data quality findings
//! - [`sink`]: SQLite and CSV writers
//! - [`pipeline`]: orchestration and run summary

pub mod error;
pub mod flatten;
pub mod loader;
pub mod pipeline;
pub mod quality;
pub mod sink;

pub use crate::error::{EtlError, EtlResult};
pub use crate::pipeline::{Pipeline, PipelineOptions, RunSummary};
