//! Flat row tables and the primitive reshaping operations
//!
//! A [`Row`] is an ordered map from flattened field name to JSON scalar.
//! Nested objects become dot paths (`student.metadata.studentLOTE`); arrays are
//! kept as values until explicitly exploded.

use crate::error::{EtlError, EtlResult};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// One flattened record
pub type Row = Map<String, Value>;

/// Hidden column linking exploded children to their parent row
pub const PARENT_ID: &str = "__parent_id";

/// Ordered collection of flattened rows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    rows: Vec<Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Row>) -> Self {
        Self { rows }
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Append another table's rows after this table's rows
    pub fn append(&mut self, other: Table) {
        self.rows.extend(other.rows);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Union of column names across all rows, in first-seen order
    pub fn columns(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut columns = Vec::new();
        for row in &self.rows {
            for key in row.keys() {
                if seen.insert(key.as_str()) {
                    columns.push(key.clone());
                }
            }
        }
        columns
    }

    /// Keep rows matching the predicate
    pub fn filter<F>(self, mut predicate: F) -> Table
    where
        F: FnMut(&Row) -> bool,
    {
        Table {
            rows: self.rows.into_iter().filter(|row| predicate(row)).collect(),
        }
    }

    /// Keep the first row for each distinct combination of `keys`
    pub fn dedup_by(self, keys: &[&str]) -> Table {
        let mut seen = HashSet::new();
        let rows = self
            .rows
            .into_iter()
            .filter(|row| seen.insert(row_key(row, keys)))
            .collect();
        Table { rows }
    }

    /// Restrict every row to `columns`, in that order; absent fields become null
    pub fn project<S: AsRef<str>>(self, columns: &[S]) -> Table {
        let rows = self
            .rows
            .into_iter()
            .map(|mut row| {
                columns
                    .iter()
                    .map(|c| {
                        let name = c.as_ref();
                        (name.to_string(), row.remove(name).unwrap_or(Value::Null))
                    })
                    .collect::<Row>()
            })
            .collect();
        Table { rows }
    }

    /// Remove `columns` from every row
    pub fn strip(self, columns: &[&str]) -> Table {
        let rows = self
            .rows
            .into_iter()
            .map(|mut row| {
                for column in columns {
                    row.shift_remove(*column);
                }
                row
            })
            .collect();
        Table { rows }
    }

    /// Rename a field on every row that carries it, keeping its position
    pub fn rename(self, from: &str, to: &str) -> Table {
        let rows = self
            .rows
            .into_iter()
            .map(|row| {
                if !row.contains_key(from) {
                    return row;
                }
                row.into_iter()
                    .map(|(k, v)| if k == from { (to.to_string(), v) } else { (k, v) })
                    .collect::<Row>()
            })
            .collect();
        Table { rows }
    }

    /// Set the same value on every row
    pub fn stamp(self, column: &str, value: Value) -> Table {
        let rows = self
            .rows
            .into_iter()
            .map(|mut row| {
                row.insert(column.to_string(), value.clone());
                row
            })
            .collect();
        Table { rows }
    }
}

impl IntoIterator for Table {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Flatten one JSON object into a row of dot-path fields
///
/// Nested objects are walked recursively; arrays and scalars are kept as-is.
/// An empty nested object contributes no fields.
pub fn normalize(object: &Map<String, Value>) -> Row {
    let mut row = Row::new();
    flatten_into(&mut row, "", object);
    row
}

fn flatten_into(row: &mut Row, prefix: &str, object: &Map<String, Value>) {
    for (key, value) in object {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::Object(nested) => flatten_into(row, &path, nested),
            other => {
                row.insert(path, other.clone());
            }
        }
    }
}

/// Normalize every element of a record array
///
/// Elements must be objects; anything else means the document does not have
/// the expected shape.
pub fn normalize_records(records: &[Value], family: &str) -> EtlResult<Table> {
    records
        .iter()
        .enumerate()
        .map(|(i, record)| match record {
            Value::Object(object) => Ok(normalize(object)),
            other => Err(EtlError::SchemaMismatch(format!(
                "{}[{}] is {} instead of an object",
                family,
                i,
                type_name(other)
            ))),
        })
        .collect::<EtlResult<Vec<Row>>>()
        .map(Table::from_rows)
}

/// Look up a required top-level array
pub fn required_array<'a>(root: &'a Value, key: &str) -> EtlResult<&'a Vec<Value>> {
    match root.get(key) {
        Some(Value::Array(items)) => Ok(items),
        Some(other) => Err(EtlError::SchemaMismatch(format!(
            "'{}' is {} instead of an array",
            key,
            type_name(other)
        ))),
        None => Err(EtlError::SchemaMismatch(format!(
            "missing required array '{}'",
            key
        ))),
    }
}

/// Explode the array in `field` into one child row per element
///
/// Each child carries [`PARENT_ID`], the position of the parent row it came
/// from. Parents whose field is absent, null or an empty array yield no
/// children. Object elements are normalized; scalar elements land in a column
/// named after the field.
pub fn explode(parents: &Table, field: &str) -> Table {
    let mut children = Table::new();
    for (parent_id, parent) in parents.iter().enumerate() {
        let Some(Value::Array(elements)) = parent.get(field) else {
            continue;
        };
        for element in elements {
            let mut child = Row::new();
            child.insert(PARENT_ID.to_string(), Value::from(parent_id as u64));
            match element {
                Value::Object(object) => flatten_into(&mut child, "", object),
                Value::Null => continue,
                scalar => {
                    child.insert(field.to_string(), scalar.clone());
                }
            }
            children.push(child);
        }
    }
    children
}

/// Join exploded children back onto their parents
///
/// Every parent field except `exploded_field` is copied onto the child. On a
/// name collision the child's value wins. Children whose parent id does not
/// resolve are dropped.
pub fn join_parents(children: Table, parents: &Table, exploded_field: &str) -> Table {
    let by_id: HashMap<u64, &Row> = parents
        .iter()
        .enumerate()
        .map(|(i, row)| (i as u64, row))
        .collect();

    let mut joined = Table::new();
    for mut child in children {
        let parent = child
            .shift_remove(PARENT_ID)
            .and_then(|id| id.as_u64())
            .and_then(|id| by_id.get(&id));
        let Some(parent) = parent else {
            continue;
        };

        let mut row = Row::with_capacity(parent.len() + child.len());
        for (key, value) in parent.iter() {
            if key != exploded_field {
                row.insert(key.clone(), value.clone());
            }
        }
        for (key, value) in child {
            row.insert(key, value);
        }
        joined.push(row);
    }
    joined
}

/// Explode `field` and propagate parent fields onto each child
pub fn explode_join(parents: &Table, field: &str) -> Table {
    join_parents(explode(parents, field), parents, field)
}

/// True when the field is present and not null
pub fn has_value(row: &Row, field: &str) -> bool {
    !matches!(row.get(field), None | Some(Value::Null))
}

/// Render a value as plain text (strings unquoted, null empty)
pub fn text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn row_key(row: &Row, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .map(|k| row.get(*k).map(Value::to_string).unwrap_or_default())
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
