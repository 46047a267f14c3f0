//! Domain and subdomain projections

use super::table::{normalize_records, required_array, Table};
use crate::error::EtlResult;
use serde_json::Value;

/// Append one row per element of the document's `domains` array
pub fn domains(root: &Value, mut acc: Table) -> EtlResult<Table> {
    let rows = normalize_records(required_array(root, "domains")?, "domains")?;
    acc.append(rows);
    Ok(acc)
}

/// Append one row per element of the document's `subdomains` array
pub fn subdomains(root: &Value, mut acc: Table) -> EtlResult<Table> {
    let rows = normalize_records(required_array(root, "subdomains")?, "subdomains")?;
    acc.append(rows);
    Ok(acc)
}
