use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::domain::{ComponentId, StudentAssessmentRecord, StudentId, TeachingAssignmentId};
use super::rules::AttendanceThresholds;

/// Step function from an attendance percentage to CIE marks.
///
/// Each threshold is inclusive. Anything below `marks3` earns nothing, and there is no
/// interpolation between bands.
pub fn percentage_to_marks(percentage: f64, thresholds: &AttendanceThresholds) -> u8 {
    if percentage >= thresholds.marks5 {
        5
    } else if percentage >= thresholds.marks4 {
        4
    } else if percentage >= thresholds.marks3 {
        3
    } else {
        0
    }
}

/// One class meeting and the students marked present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSession {
    pub teaching_assignment_id: TeachingAssignmentId,
    pub date: NaiveDate,
    pub present_student_ids: Vec<StudentId>,
}

/// Share of `sessions` the student attended, as a percentage.
///
/// Returns `None` when there are no sessions to measure against.
pub fn attendance_percentage(
    sessions: &[AttendanceSession],
    student_id: &StudentId,
) -> Option<f64> {
    if sessions.is_empty() {
        return None;
    }

    let attended = sessions
        .iter()
        .filter(|session| session.present_student_ids.contains(student_id))
        .count();

    Some(attended as f64 * 100.0 / sessions.len() as f64)
}

/// ATTENDANCE-category record carrying the banded mark for `percentage`.
pub fn banded_attendance_record(
    student_id: StudentId,
    teaching_assignment_id: TeachingAssignmentId,
    component_id: ComponentId,
    percentage: f64,
    thresholds: &AttendanceThresholds,
    recorded_at: DateTime<Utc>,
) -> StudentAssessmentRecord {
    let marks = percentage_to_marks(percentage, thresholds);
    StudentAssessmentRecord::new(student_id, teaching_assignment_id, component_id, f64::from(marks))
        .recorded_at(recorded_at)
}
