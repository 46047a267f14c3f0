//! Export document fixtures

use serde_json::{json, Value};
use std::path::{Path, PathBuf};

/// Builds export documents one record family at a time
pub struct DocumentBuilder {
    domains: Vec<Value>,
    subdomains: Vec<Value>,
    cut_points: Vec<Value>,
    questions: Vec<Value>,
    attempts: Vec<Value>,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self {
            domains: Vec::new(),
            subdomains: Vec::new(),
            cut_points: Vec::new(),
            questions: Vec::new(),
            attempts: Vec::new(),
        }
    }

    pub fn domain(mut self, id: &str, name: &str, writing: bool) -> Self {
        self.domains.push(json!({
            "domainId": id, "domainName": name, "isWritingTask": writing
        }));
        self
    }

    pub fn subdomain(mut self, domain_id: &str, domain: &str, title: &str) -> Self {
        self.subdomains.push(json!({
            "domain": domain, "title": title, "domainId": domain_id
        }));
        self
    }

    /// The four upstream cut points of one (domain, year), using `disciplineId`
    pub fn cut_points(mut self, domain_id: &str, year: i64, cuts: [i64; 4]) -> Self {
        let levels = ["Needs additional support", "Developing", "Strong", "Exceeding"];
        for (level, cut) in levels.iter().zip(cuts) {
            self.cut_points.push(json!({
                "level": level, "scoreCutPoint": cut, "year": year, "disciplineId": domain_id
            }));
        }
        self
    }

    pub fn question(mut self, question: Value) -> Self {
        self.questions.push(question);
        self
    }

    pub fn reading_question(self, id: &str, identifier: &str, descriptor: &str) -> Self {
        self.question(json!({
            "questionId": id,
            "eventIdentifier": "EV-1",
            "questionIdentifier": identifier,
            "descriptor": descriptor,
            "domain": "Reading",
            "domainId": "D1",
            "testLevel": 5,
            "difficulty": 3,
            "correctPercentage": 61.5
        }))
    }

    pub fn attempt(mut self, attempt: Value) -> Self {
        self.attempts.push(attempt);
        self
    }

    pub fn build(self) -> Value {
        json!({
            "domains": self.domains,
            "subdomains": self.subdomains,
            "proficiencyScoreCutOffPoints": self.cut_points,
            "questions": self.questions,
            "attempts": self.attempts
        })
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Objective attempt with one answer per question id
pub fn attempt(student_id: &str, domain_id: &str, question_ids: &[&str]) -> Value {
    let answers: Vec<Value> = question_ids
        .iter()
        .enumerate()
        .map(|(i, q)| {
            json!({
                "questionId": q,
                "questionNo": i + 1,
                "correct": i % 2 == 0,
                "answeredOn": "2023-03-15T09:30:00Z",
                "parallelTestSection": "A",
                "node": format!("N{}", i + 1),
                "status": "complete",
                "displayOrder": i
            })
        })
        .collect();

    json!({
        "student": {
            "studentId": student_id,
            "testLevel": 5,
            "metadata": { "studentLOTE": "N", "schoolStudentId": format!("SCH-{}", student_id) }
        },
        "domain": { "domainId": domain_id, "isWritingTask": false },
        "possibleRawScore": 40,
        "studentRawScore": 27,
        "scaledScore": 498.3,
        "answers": answers
    })
}

/// Writing attempt with one response scored on each `(rowguid, score)` component
pub fn writing_attempt(student_id: &str, question_id: &str, scores: &[(&str, i64)]) -> Value {
    let components: Vec<Value> = scores
        .iter()
        .map(|(guid, score)| json!({ "rowguid": guid, "effectiveScore": score }))
        .collect();

    json!({
        "student": {
            "studentId": student_id,
            "testLevel": 5,
            "metadata": { "studentLOTE": "Y", "schoolStudentId": format!("SCH-{}", student_id) }
        },
        "domain": { "domainId": "D2", "isWritingTask": true },
        "possibleRawScore": 48,
        "studentRawScore": 30,
        "scaledScore": 520.0,
        "answers": [ {
            "questionId": question_id,
            "writingResponse": "The council should build a new park because",
            "markingSchemeComponents": components
        } ]
    })
}

/// Writing question whose marking scheme has one component per id, scored 0-2
pub fn writing_question(question_id: &str, component_ids: &[&str]) -> Value {
    let components: Vec<Value> = component_ids
        .iter()
        .map(|id| {
            json!({
                "id": id,
                "name": format!("Criterion {}", id),
                "description": "Marking criterion",
                "scoreDescriptions": [ { "0": "No evidence" }, { "1": "Partial" }, { "2": "Consistent" } ]
            })
        })
        .collect();

    json!({
        "questionId": question_id,
        "questionIdentifier": format!("W-{}", question_id),
        "descriptor": "Persuasive text",
        "domain": "Writing",
        "domainId": "D2",
        "testLevel": 5,
        "proficiencyLevel": "Strong",
        "markingSchemeComponents": components
    })
}

/// One domain, six derived cut points, one student, two attempts
pub fn minimal_document() -> Value {
    DocumentBuilder::new()
        .domain("D1", "Reading", false)
        .subdomain("D1", "Reading", "Inference")
        .cut_points("D1", 2023, [100, 200, 300, 400])
        .reading_question("Q1", "R-001", "Infers meaning")
        .reading_question("Q2", "R-002", "Locates detail")
        .attempt(attempt("S1", "D1", &["Q1", "Q2"]))
        .attempt(attempt("S1", "D1", &["Q1"]))
        .build()
}

/// Write a document into `dir` as `name`
pub fn write_document(dir: &Path, name: &str, document: &Value) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_vec_pretty(document).unwrap()).unwrap();
    path
}
