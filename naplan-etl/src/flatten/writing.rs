//! Writing task flattening
//!
//! Writing questions carry a marking scheme: a list of components (audience,
//! vocabulary, ...) each with a ladder of score descriptions. Writing attempts
//! carry, per response, the score awarded on every component.

use super::attempts::is_writing;
use super::table::{explode_join, has_value, normalize_records, required_array, Row, Table};
use crate::error::EtlResult;
use serde_json::Value;

/// `domain` value identifying writing questions
pub const WRITING_DOMAIN: &str = "Writing";

/// Append one row per (writing question component, score band)
///
/// Components are exploded with their question's fields, then each
/// component's `scoreDescriptions` (single-key `{score: text}` maps) is
/// scanned into `scoreD` / `sDescription` pairs.
pub fn marking_scheme(root: &Value, mut acc: Table) -> EtlResult<Table> {
    let writing_questions = normalize_records(required_array(root, "questions")?, "questions")?
        .filter(|row| matches!(row.get("domain"), Some(Value::String(d)) if d == WRITING_DOMAIN));

    let components = explode_join(&writing_questions, "markingSchemeComponents");

    for mut component in components {
        let descriptions = component.shift_remove("scoreDescriptions");
        let Some(Value::Array(descriptions)) = descriptions else {
            continue;
        };

        for description in descriptions {
            let Value::Object(bands) = description else {
                continue;
            };
            for (score, text) in bands {
                let mut row = component.clone();
                row.insert("scoreD".to_string(), score_value(&score));
                row.insert("sDescription".to_string(), text);
                acc.push(row);
            }
        }
    }

    Ok(acc)
}

fn score_value(score: &str) -> Value {
    score
        .trim()
        .parse::<i64>()
        .map(Value::from)
        .unwrap_or_else(|_| Value::from(score))
}

/// Append one row per (writing response, marked component)
///
/// Only answers carrying a `writingResponse` are kept; each is exploded over
/// its `markingSchemeComponents`.
pub fn writing_responses(attempts: &Table, mut acc: Table) -> Table {
    let writing = attempts.clone().filter(is_writing);
    let responses =
        explode_join(&writing, "answers").filter(|row: &Row| has_value(row, "writingResponse"));
    acc.append(explode_join(&responses, "markingSchemeComponents"));
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::attempts::attempt_rows;
    use crate::quality::QualityReport;
    use serde_json::json;

    #[test]
    fn test_marking_scheme_double_explosion() {
        let root = json!({ "questions": [
            { "questionId": "W1", "domain": "Writing", "domainId": "D2", "testLevel": 5,
              "proficiencyLevel": "Strong",
              "markingSchemeComponents": [
                  { "id": "M-AUD", "name": "Audience", "description": "Orients the reader",
                    "scoreDescriptions": [ { "0": "No evidence" }, { "1": "Some" }, { "2": "Consistent" } ] },
                  { "id": "M-VOC", "name": "Vocabulary", "description": "Word choice",
                    "scoreDescriptions": [ { "0": "Limited" }, { "1": "Precise" } ] }
              ] },
            { "questionId": "Q1", "domain": "Reading", "domainId": "D1",
              "markingSchemeComponents": [ { "id": "M-X", "scoreDescriptions": [ { "0": "n/a" } ] } ] }
        ]});

        let table = marking_scheme(&root, Table::new()).unwrap();
        assert_eq!(table.len(), 5);

        let first = &table.rows()[0];
        assert_eq!(first["id"], "M-AUD");
        assert_eq!(first["questionId"], "W1");
        assert_eq!(first["testLevel"], 5);
        assert_eq!(first["proficiencyLevel"], "Strong");
        assert_eq!(first["scoreD"], 0);
        assert_eq!(first["sDescription"], "No evidence");
        assert!(!first.contains_key("scoreDescriptions"));
        assert!(!first.contains_key("markingSchemeComponents"));

        assert_eq!(table.rows()[4]["id"], "M-VOC");
        assert_eq!(table.rows()[4]["scoreD"], 1);
    }

    #[test]
    fn test_writing_responses_per_component() {
        let root = json!({ "attempts": [
            {
                "student": { "studentId": "S1", "testLevel": 5,
                             "metadata": { "schoolStudentId": "X1" } },
                "domain": { "domainId": "D2", "isWritingTask": true },
                "answers": [
                    { "questionId": "W1", "writingResponse": "Dear council,",
                      "markingSchemeComponents": [
                          { "rowguid": "M-AUD", "effectiveScore": 2 },
                          { "rowguid": "M-VOC", "effectiveScore": 1 }
                      ] },
                    { "questionId": "W2", "writingResponse": null,
                      "markingSchemeComponents": [ { "rowguid": "M-AUD", "effectiveScore": 0 } ] }
                ]
            },
            {
                "student": { "studentId": "S2", "metadata": { "schoolStudentId": "X2" } },
                "domain": { "domainId": "D1", "isWritingTask": false },
                "answers": [ { "questionId": "Q1", "writingResponse": "stray" } ]
            }
        ]});

        let mut report = QualityReport::default();
        let attempts = attempt_rows(&root, "2023.json", &mut report).unwrap();
        let rows = writing_responses(&attempts, Table::new());

        assert_eq!(rows.len(), 2);
        for row in rows.iter() {
            assert_eq!(row["student.studentId"], "S1");
            assert_eq!(row["student.testLevel"], 5);
            assert_eq!(row["writingResponse"], "Dear council,");
            assert_eq!(row["questionId"], "W1");
        }
        assert_eq!(rows.rows()[1]["rowguid"], "M-VOC");
        assert_eq!(rows.rows()[1]["effectiveScore"], 1);
    }
}
