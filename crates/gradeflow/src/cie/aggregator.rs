use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, warn};

use super::domain::{
    AssessmentCategory, AssessmentComponent, CieBreakdown, ComponentId, StudentAssessmentRecord,
    StudentId, TeachingAssignmentId,
};
use super::rules::CieRuleConfiguration;

/// Lookup table from component id to its definition.
pub type ComponentIndex = HashMap<ComponentId, AssessmentComponent>;

/// Stateless aggregator applying a department's rule configuration to raw marks.
#[derive(Debug, Clone)]
pub struct AssessmentAggregator {
    config: CieRuleConfiguration,
}

impl AssessmentAggregator {
    pub fn new(config: CieRuleConfiguration) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CieRuleConfiguration {
        &self.config
    }

    /// Score one (student, teaching assignment) pair.
    ///
    /// An empty `records` slice yields an evaluation without a breakdown, which callers must
    /// keep apart from a computed score of zero. Records whose component is missing from
    /// `components` are reported in [`CieEvaluation::excluded`] and contribute nothing.
    pub fn evaluate(
        &self,
        records: &[StudentAssessmentRecord],
        components: &ComponentIndex,
    ) -> Result<CieEvaluation, AggregationError> {
        check_single_scope(records)?;

        if records.is_empty() {
            return Ok(CieEvaluation::no_data());
        }

        let partitioned = partition(records, components);
        for excluded in &partitioned.excluded {
            warn!(
                component_id = %excluded.component_id,
                position = excluded.position,
                "assessment record references an unknown component; excluded from CIE"
            );
        }

        let counted_slips = best_slips(&partitioned.slip, self.config.slip_tests_consider);
        let slip_score = mean(counted_slips.iter().map(|record| record.marks));
        let assignment_score = mean(partitioned.assignment.iter().map(|record| record.marks));
        let midsem_score = mean(partitioned.midsem.iter().map(|record| record.marks));

        let attendance = authoritative_attendance(&partitioned.attendance);
        let duplicate_attendance = partitioned.attendance.len().saturating_sub(1);
        if duplicate_attendance > 0 {
            warn!(
                student_id = %records[0].student_id,
                teaching_assignment_id = %records[0].teaching_assignment_id,
                duplicates = duplicate_attendance,
                "multiple attendance records found; using the most recent"
            );
        }
        let attendance_marks = attendance.map(|record| record.marks).unwrap_or(0.0);

        let breakdown =
            CieBreakdown::new(slip_score, assignment_score, midsem_score, attendance_marks);
        debug!(
            student_id = %records[0].student_id,
            total_cie = breakdown.total_cie,
            max_cie_marks = self.config.max_cie_marks,
            "computed CIE breakdown"
        );

        Ok(CieEvaluation {
            breakdown: Some(breakdown),
            counted_slips: counted_slips
                .iter()
                .map(|record| record.component_id.clone())
                .collect(),
            attendance_component: attendance.map(|record| record.component_id.clone()),
            duplicate_attendance,
            excluded: partitioned.excluded,
        })
    }
}

/// Breakdown for one student's records, or `None` when nothing has been graded yet.
pub fn compute_cie(
    records: &[StudentAssessmentRecord],
    components: &ComponentIndex,
    config: &CieRuleConfiguration,
) -> Result<Option<CieBreakdown>, AggregationError> {
    AssessmentAggregator::new(config.clone())
        .evaluate(records, components)
        .map(|evaluation| evaluation.breakdown)
}

/// Aggregation result plus the audit trail of what was counted and what was dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CieEvaluation {
    pub breakdown: Option<CieBreakdown>,
    /// SLIP components whose marks were averaged, best first.
    pub counted_slips: Vec<ComponentId>,
    pub attendance_component: Option<ComponentId>,
    pub duplicate_attendance: usize,
    pub excluded: Vec<ExcludedRecord>,
}

impl CieEvaluation {
    pub fn no_data() -> Self {
        Self {
            breakdown: None,
            counted_slips: Vec::new(),
            attendance_component: None,
            duplicate_attendance: 0,
            excluded: Vec::new(),
        }
    }

    pub fn is_no_data(&self) -> bool {
        self.breakdown.is_none()
    }
}

/// Record left out of the aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcludedRecord {
    /// Index of the record in the input slice.
    pub position: usize,
    pub component_id: ComponentId,
    pub reason: ExclusionReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    UnresolvedComponent,
}

/// Records grouped by category, in input order, after dropping unresolved ones.
#[derive(Debug, Default)]
pub struct PartitionedRecords<'r> {
    pub slip: Vec<&'r StudentAssessmentRecord>,
    pub assignment: Vec<&'r StudentAssessmentRecord>,
    pub midsem: Vec<&'r StudentAssessmentRecord>,
    pub attendance: Vec<&'r StudentAssessmentRecord>,
    pub excluded: Vec<ExcludedRecord>,
}

pub fn partition<'r>(
    records: &'r [StudentAssessmentRecord],
    components: &ComponentIndex,
) -> PartitionedRecords<'r> {
    let mut partitioned = PartitionedRecords::default();

    for (position, record) in records.iter().enumerate() {
        let Some(component) = components.get(&record.component_id) else {
            partitioned.excluded.push(ExcludedRecord {
                position,
                component_id: record.component_id.clone(),
                reason: ExclusionReason::UnresolvedComponent,
            });
            continue;
        };

        let bucket = match component.category {
            AssessmentCategory::Slip => &mut partitioned.slip,
            AssessmentCategory::Assignment => &mut partitioned.assignment,
            AssessmentCategory::Midsem => &mut partitioned.midsem,
            AssessmentCategory::Attendance => &mut partitioned.attendance,
        };
        bucket.push(record);
    }

    partitioned
}

/// Highest `consider` slip marks. The sort is stable, so equal marks keep input order.
fn best_slips<'r>(
    slips: &[&'r StudentAssessmentRecord],
    consider: u32,
) -> Vec<&'r StudentAssessmentRecord> {
    let mut ranked = slips.to_vec();
    ranked.sort_by(|a, b| b.marks.total_cmp(&a.marks));
    ranked.truncate(consider as usize);
    ranked
}

/// Latest-recorded attendance entry; untimestamped entries rank last, ties keep input order.
fn authoritative_attendance<'r>(
    attendance: &[&'r StudentAssessmentRecord],
) -> Option<&'r StudentAssessmentRecord> {
    attendance.iter().copied().fold(None, |chosen, record| match chosen {
        Some(current) if record.recorded_at <= current.recorded_at => Some(current),
        _ => Some(record),
    })
}

fn mean<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn check_single_scope(records: &[StudentAssessmentRecord]) -> Result<(), AggregationError> {
    let Some(first) = records.first() else {
        return Ok(());
    };

    match records.iter().find(|record| {
        record.student_id != first.student_id
            || record.teaching_assignment_id != first.teaching_assignment_id
    }) {
        Some(stray) => Err(AggregationError::MixedScope {
            expected_student: first.student_id.clone(),
            expected_assignment: first.teaching_assignment_id.clone(),
            found_student: stray.student_id.clone(),
            found_assignment: stray.teaching_assignment_id.clone(),
        }),
        None => Ok(()),
    }
}

/// Caller contract violations detected before aggregation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregationError {
    #[error(
        "records must belong to one student and teaching assignment: expected {expected_student}/{expected_assignment}, found {found_student}/{found_assignment}"
    )]
    MixedScope {
        expected_student: StudentId,
        expected_assignment: TeachingAssignmentId,
        found_student: StudentId,
        found_assignment: TeachingAssignmentId,
    },
}
