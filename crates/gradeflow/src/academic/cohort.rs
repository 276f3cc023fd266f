use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::calendar::{compute_academic_info, AcademicInfo};
use crate::ids::{BatchId, DepartmentId, SectionId};

/// Enrollment cohort identified by its start and end years.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    pub id: BatchId,
    pub name: String,
    pub department_id: DepartmentId,
    pub start_year: i32,
    pub end_year: i32,
}

impl Batch {
    pub fn academic_info(&self, reference: NaiveDate) -> AcademicInfo {
        compute_academic_info(self.start_year, self.end_year, reference)
    }
}

/// Section of a batch, with an optional cached year/semester snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: SectionId,
    pub name: String,
    pub department_id: DepartmentId,
    pub batch_id: BatchId,
    #[serde(default)]
    pub year: Option<u8>,
    #[serde(default)]
    pub semester: Option<u8>,
}

impl Section {
    pub fn cached_period(&self) -> Option<AcademicInfo> {
        match (self.year, self.semester) {
            (Some(year), Some(semester)) => Some(AcademicInfo { year, semester }),
            _ => None,
        }
    }

    /// Recompute the cached snapshot from `batch`. Returns true when it was absent or stale.
    pub fn refresh_period(&mut self, batch: &Batch, reference: NaiveDate) -> bool {
        let current = batch.academic_info(reference);
        if self.cached_period() == Some(current) {
            return false;
        }

        self.year = Some(current.year);
        self.semester = Some(current.semester);
        true
    }
}
