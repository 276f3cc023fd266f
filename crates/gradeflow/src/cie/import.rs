use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use super::aggregator::ComponentIndex;
use super::domain::{
    AssessmentCategory, AssessmentComponent, ComponentId, DepartmentId, StudentAssessmentRecord,
    StudentId, TeachingAssignmentId,
};

/// Errors raised while loading a mark sheet export.
#[derive(Debug, thiserror::Error)]
pub enum MarkSheetImportError {
    #[error("failed to read mark sheet: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid mark sheet CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("line {line}: unknown assessment category '{value}'")]
    UnknownCategory { line: u64, value: String },
    #[error("line {line}: component {component_id} redefined with a different name, category, or max marks")]
    ConflictingComponent { line: u64, component_id: ComponentId },
    #[error("line {line}: marks {marks} for component {component_id} must be between 0 and {max_marks}")]
    MarksOutOfRange {
        line: u64,
        component_id: ComponentId,
        marks: f64,
        max_marks: f64,
    },
    #[error("line {line}: recorded_at '{value}' is neither RFC 3339 nor YYYY-MM-DD")]
    InvalidTimestamp { line: u64, value: String },
}

/// Components and marks loaded from one CSV export.
#[derive(Debug, Clone, Default)]
pub struct MarkSheet {
    pub components: ComponentIndex,
    pub records: Vec<StudentAssessmentRecord>,
}

impl MarkSheet {
    /// Records grouped per (student, assignment) pair, in first-seen order.
    pub fn scopes(&self) -> Vec<MarkSheetScope> {
        let mut order: Vec<(StudentId, TeachingAssignmentId)> = Vec::new();
        let mut grouped: HashMap<(StudentId, TeachingAssignmentId), Vec<StudentAssessmentRecord>> =
            HashMap::new();

        for record in &self.records {
            let key = (
                record.student_id.clone(),
                record.teaching_assignment_id.clone(),
            );
            let bucket = grouped.entry(key.clone()).or_default();
            if bucket.is_empty() {
                order.push(key);
            }
            bucket.push(record.clone());
        }

        order
            .into_iter()
            .map(|key| {
                let records = grouped.remove(&key).unwrap_or_default();
                MarkSheetScope {
                    student_id: key.0,
                    teaching_assignment_id: key.1,
                    records,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct MarkSheetScope {
    pub student_id: StudentId,
    pub teaching_assignment_id: TeachingAssignmentId,
    pub records: Vec<StudentAssessmentRecord>,
}

pub struct MarkSheetImporter;

impl MarkSheetImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        department_id: &DepartmentId,
    ) -> Result<MarkSheet, MarkSheetImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, department_id)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        department_id: &DepartmentId,
    ) -> Result<MarkSheet, MarkSheetImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv_reader.headers()?.clone();
        let mut sheet = MarkSheet::default();
        let mut sequences: BTreeMap<AssessmentCategory, u32> = BTreeMap::new();

        for result in csv_reader.records() {
            let raw = result?;
            // line where the record starts; quoted fields may span several
            let line = raw
                .position()
                .map(|position| position.line())
                .unwrap_or_default();
            let row: MarkRow = raw.deserialize(Some(&headers))?;

            let category = AssessmentCategory::from_label(&row.category).ok_or_else(|| {
                MarkSheetImportError::UnknownCategory {
                    line,
                    value: row.category.clone(),
                }
            })?;
            let component_id = ComponentId::new(row.component_id.clone());

            match sheet.components.get(&component_id) {
                Some(existing) => {
                    if existing.category != category
                        || existing.name != row.component_name
                        || existing.max_marks != row.max_marks
                    {
                        return Err(MarkSheetImportError::ConflictingComponent {
                            line,
                            component_id,
                        });
                    }
                }
                None => {
                    let sequence = sequences.entry(category).or_insert(0);
                    *sequence += 1;
                    sheet.components.insert(
                        component_id.clone(),
                        AssessmentComponent {
                            id: component_id.clone(),
                            department_id: department_id.clone(),
                            name: row.component_name.clone(),
                            category,
                            max_marks: row.max_marks,
                            sequence: Some(*sequence),
                        },
                    );
                }
            }

            if !row.marks.is_finite() || !(0.0..=row.max_marks).contains(&row.marks) {
                return Err(MarkSheetImportError::MarksOutOfRange {
                    line,
                    component_id,
                    marks: row.marks,
                    max_marks: row.max_marks,
                });
            }

            let recorded_at = match row.recorded_at.as_deref() {
                Some(value) => Some(parse_timestamp(value).ok_or_else(|| {
                    MarkSheetImportError::InvalidTimestamp {
                        line,
                        value: value.to_string(),
                    }
                })?),
                None => None,
            };

            sheet.records.push(StudentAssessmentRecord {
                student_id: StudentId::new(row.student_id),
                teaching_assignment_id: TeachingAssignmentId::new(row.teaching_assignment_id),
                component_id,
                marks: row.marks,
                recorded_at,
            });
        }

        Ok(sheet)
    }
}

#[derive(Debug, Deserialize)]
struct MarkRow {
    student_id: String,
    teaching_assignment_id: String,
    component_id: String,
    component_name: String,
    category: String,
    max_marks: f64,
    marks: f64,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    recorded_at: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
