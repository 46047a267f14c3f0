//! Proficiency cut-point derivation
//!
//! Upstream documents carry four bands per (domain, year): Needs additional
//! support, Developing, Strong and Exceeding, each with the score at which the
//! band ends. The derived table has six contiguous bands with explicit start
//! points, adding two 20-point "just below" bands under Developing and
//! Exceeding.

use super::table::{normalize_records, required_array, Row, Table};
use crate::error::{EtlError, EtlResult};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Width of each synthesized "just below" band
pub const JUST_BELOW_WIDTH: f64 = 20.0;

/// Proficiency levels, in ascending order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ProficiencyLevel {
    NeedsAdditionalSupport,
    JustBelowDeveloping,
    Developing,
    Strong,
    JustBelowExceeding,
    Exceeding,
}

impl ProficiencyLevel {
    pub const ALL: [ProficiencyLevel; 6] = [
        ProficiencyLevel::NeedsAdditionalSupport,
        ProficiencyLevel::JustBelowDeveloping,
        ProficiencyLevel::Developing,
        ProficiencyLevel::Strong,
        ProficiencyLevel::JustBelowExceeding,
        ProficiencyLevel::Exceeding,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ProficiencyLevel::NeedsAdditionalSupport => "Needs additional support",
            ProficiencyLevel::JustBelowDeveloping => "Just below developing",
            ProficiencyLevel::Developing => "Developing",
            ProficiencyLevel::Strong => "Strong",
            ProficiencyLevel::JustBelowExceeding => "Just below exceeding",
            ProficiencyLevel::Exceeding => "Exceeding",
        }
    }

    /// The synthesized band sitting directly below this level, if any
    pub fn just_below(self) -> Option<ProficiencyLevel> {
        match self {
            ProficiencyLevel::Developing => Some(ProficiencyLevel::JustBelowDeveloping),
            ProficiencyLevel::Exceeding => Some(ProficiencyLevel::JustBelowExceeding),
            _ => None,
        }
    }

    /// Levels whose upper cut shrinks to make room for a synthesized band
    fn yields_to_just_below(self) -> bool {
        matches!(
            self,
            ProficiencyLevel::NeedsAdditionalSupport | ProficiencyLevel::Strong
        )
    }
}

impl FromStr for ProficiencyLevel {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProficiencyLevel::ALL
            .into_iter()
            .find(|level| level.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| EtlError::SchemaMismatch(format!("unknown proficiency level '{}'", s)))
    }
}

impl fmt::Display for ProficiencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Append the derived cut points of the document's `proficiencyScoreCutOffPoints`
pub fn cut_points(root: &Value, mut acc: Table) -> EtlResult<Table> {
    let raw = normalize_records(
        required_array(root, "proficiencyScoreCutOffPoints")?,
        "proficiencyScoreCutOffPoints",
    )?;
    acc.append(derive_cut_points(raw)?);
    Ok(acc)
}

struct CutPoint {
    level: ProficiencyLevel,
    row: Row,
}

/// Derive the six-band table from upstream cut points
///
/// Rows are partitioned by (domainId, year) and ranked by level. Within a
/// partition each missing `startPoint` is the previous level's
/// `scoreCutPoint` (zero for the first level). The two "just below" bands are
/// then inserted and the cuts of the levels beneath them lowered to match.
pub fn derive_cut_points(raw: Table) -> EtlResult<Table> {
    let mut points = raw
        .rename("disciplineId", "domainId")
        .into_iter()
        .map(|row| -> EtlResult<CutPoint> {
            let level = match row.get("level") {
                Some(Value::String(s)) => s.parse::<ProficiencyLevel>()?,
                other => {
                    return Err(EtlError::SchemaMismatch(format!(
                        "cut point without a level: {:?}",
                        other
                    )))
                }
            };
            Ok(CutPoint { level, row })
        })
        .collect::<EtlResult<Vec<_>>>()?;

    points.sort_by(|a, b| {
        partition_cmp(&a.row, &b.row).then_with(|| a.level.cmp(&b.level))
    });

    // Fill start points by scanning each partition in level order
    let mut previous: Option<usize> = None;
    for i in 0..points.len() {
        let same_partition = previous
            .map(|p| partition_cmp(&points[p].row, &points[i].row) == Ordering::Equal)
            .unwrap_or(false);

        let start = if same_partition {
            previous.map(|p| score(&points[p].row, "scoreCutPoint")).transpose()?
        } else {
            None
        };

        if !has_number(&points[i].row, "startPoint") {
            points[i]
                .row
                .insert("startPoint".to_string(), number(start.unwrap_or(0.0)));
        }
        previous = Some(i);
    }

    let mut derived = Vec::with_capacity(points.len() + points.len() / 2);
    for point in points {
        let start = score(&point.row, "startPoint")?;

        if let Some(below) = point.level.just_below() {
            let mut row = point.row.clone();
            row.insert("level".to_string(), Value::from(below.label()));
            row.insert("startPoint".to_string(), number(start - JUST_BELOW_WIDTH));
            row.insert("scoreCutPoint".to_string(), number(start));
            derived.push(CutPoint { level: below, row });
        }

        let mut point = point;
        if point.level.yields_to_just_below() {
            let cut = score(&point.row, "scoreCutPoint")?;
            point
                .row
                .insert("scoreCutPoint".to_string(), number(cut - JUST_BELOW_WIDTH));
        }
        derived.push(point);
    }

    derived.sort_by(|a, b| {
        partition_cmp(&a.row, &b.row).then_with(|| a.level.cmp(&b.level))
    });

    Ok(Table::from_rows(derived.into_iter().map(|p| p.row).collect()))
}

fn partition_cmp(a: &Row, b: &Row) -> Ordering {
    value_cmp(a.get("domainId"), b.get("domainId"))
        .then_with(|| value_cmp(a.get("year"), b.get("year")))
}

/// Total order over optional JSON scalars: missing/null, numbers, then text
fn value_cmp(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Number(_)) => 1,
            _ => 2,
        }
    }

    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)).then_with(|| {
            let x = a.map(Value::to_string).unwrap_or_default();
            let y = b.map(Value::to_string).unwrap_or_default();
            x.cmp(&y)
        }),
    }
}

fn has_number(row: &Row, field: &str) -> bool {
    matches!(row.get(field), Some(Value::Number(_)))
}

fn score(row: &Row, field: &str) -> EtlResult<f64> {
    row.get(field).and_then(Value::as_f64).ok_or_else(|| {
        EtlError::SchemaMismatch(format!(
            "cut point '{}' has no numeric {}",
            row.get("level").map(Value::to_string).unwrap_or_default(),
            field
        ))
    })
}

/// Whole scores stay integers so exports read `80` rather than `80.0`
fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}
