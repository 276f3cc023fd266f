use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use crate::ids::{ComponentId, DepartmentId, StudentId, TeachingAssignmentId};

/// Category a component contributes to in the CIE formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssessmentCategory {
    Slip,
    Assignment,
    Midsem,
    Attendance,
}

impl AssessmentCategory {
    pub const ALL: [AssessmentCategory; 4] = [
        AssessmentCategory::Slip,
        AssessmentCategory::Assignment,
        AssessmentCategory::Midsem,
        AssessmentCategory::Attendance,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            AssessmentCategory::Slip => "SLIP",
            AssessmentCategory::Assignment => "ASSIGNMENT",
            AssessmentCategory::Midsem => "MIDSEM",
            AssessmentCategory::Attendance => "ATTENDANCE",
        }
    }

    /// Case-insensitive parse of the wire label.
    pub fn from_label(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.label().eq_ignore_ascii_case(trimmed))
    }
}

impl fmt::Display for AssessmentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Gradable item defined by a department.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentComponent {
    pub id: ComponentId,
    pub department_id: DepartmentId,
    pub name: String,
    pub category: AssessmentCategory,
    pub max_marks: f64,
    #[serde(default)]
    pub sequence: Option<u32>,
}

/// One mark entry for a (student, teaching assignment, component) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentAssessmentRecord {
    pub student_id: StudentId,
    pub teaching_assignment_id: TeachingAssignmentId,
    pub component_id: ComponentId,
    pub marks: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorded_at: Option<DateTime<Utc>>,
}

impl StudentAssessmentRecord {
    pub fn new(
        student_id: StudentId,
        teaching_assignment_id: TeachingAssignmentId,
        component_id: ComponentId,
        marks: f64,
    ) -> Self {
        Self {
            student_id,
            teaching_assignment_id,
            component_id,
            marks,
            recorded_at: None,
        }
    }

    pub fn recorded_at(mut self, at: DateTime<Utc>) -> Self {
        self.recorded_at = Some(at);
        self
    }

    /// True when both records address the same (student, assignment, component) triple.
    pub fn same_slot(&self, other: &StudentAssessmentRecord) -> bool {
        self.student_id == other.student_id
            && self.teaching_assignment_id == other.teaching_assignment_id
            && self.component_id == other.component_id
    }
}

/// Per-category CIE scores for one student in one teaching assignment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CieBreakdown {
    pub slip_score: f64,
    pub assignment_score: f64,
    pub midsem_score: f64,
    pub attendance_marks: f64,
    #[serde(rename = "totalCIE")]
    pub total_cie: f64,
}

impl CieBreakdown {
    pub fn new(
        slip_score: f64,
        assignment_score: f64,
        midsem_score: f64,
        attendance_marks: f64,
    ) -> Self {
        Self {
            slip_score,
            assignment_score,
            midsem_score,
            attendance_marks,
            total_cie: slip_score + assignment_score + midsem_score + attendance_marks,
        }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// Whether the total exceeds the configured maximum. Totals are never clamped.
    pub fn exceeds(&self, max_cie_marks: f64) -> bool {
        self.total_cie > max_cie_marks
    }
}

/// Cached CIE score for a (student, assignment) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentCieSnapshot {
    pub student_id: StudentId,
    pub teaching_assignment_id: TeachingAssignmentId,
    pub cie_score: f64,
    pub last_calculated_at: DateTime<Utc>,
}

impl StudentCieSnapshot {
    pub fn from_breakdown(
        student_id: StudentId,
        teaching_assignment_id: TeachingAssignmentId,
        breakdown: &CieBreakdown,
        calculated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            student_id,
            teaching_assignment_id,
            cie_score: breakdown.total_cie,
            last_calculated_at: calculated_at,
        }
    }
}
