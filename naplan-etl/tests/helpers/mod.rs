//! Test Helper Utilities
//!
//! Shared fixtures and database queries for naplan-etl integration tests

#![allow(dead_code)]

pub mod db_utils;
pub mod documents;

pub use db_utils::{count_rows, distinct_values, run_pipeline};
pub use documents::{
    attempt, minimal_document, write_document, writing_attempt, writing_question, DocumentBuilder,
};
