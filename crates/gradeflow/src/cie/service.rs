use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::aggregator::{AggregationError, AssessmentAggregator, CieEvaluation, ComponentIndex};
use super::attendance::banded_attendance_record;
use super::domain::{
    AssessmentCategory, AssessmentComponent, ComponentId, DepartmentId, StudentAssessmentRecord,
    StudentCieSnapshot, StudentId, TeachingAssignmentId,
};
use super::rules::{CieRuleConfiguration, ConfigurationError};
use crate::repository::{AssessmentRepository, CieConfigurationRepository, RepositoryError};

/// Faculty mark entry for one component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkEntry {
    pub student_id: StudentId,
    pub teaching_assignment_id: TeachingAssignmentId,
    pub component_id: ComponentId,
    pub marks: f64,
}

/// Attendance percentage to be banded into the department's ATTENDANCE component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    pub student_id: StudentId,
    pub teaching_assignment_id: TeachingAssignmentId,
    pub percentage: f64,
}

/// Service composing the repositories with the CIE aggregator.
pub struct CieService<A, C> {
    assessments: Arc<A>,
    configurations: Arc<C>,
    template: CieRuleConfiguration,
}

impl<A, C> CieService<A, C>
where
    A: AssessmentRepository + 'static,
    C: CieConfigurationRepository + 'static,
{
    pub fn new(assessments: Arc<A>, configurations: Arc<C>) -> Self {
        let template = CieRuleConfiguration::default_for(DepartmentId::new("template"));
        Self::with_template(assessments, configurations, template)
    }

    /// Seed departments lacking a configuration from `template` instead of the built-in defaults.
    pub fn with_template(
        assessments: Arc<A>,
        configurations: Arc<C>,
        template: CieRuleConfiguration,
    ) -> Self {
        Self {
            assessments,
            configurations,
            template,
        }
    }

    /// Active configuration, seeding and storing the default on first use.
    pub fn active_configuration(
        &self,
        department_id: &DepartmentId,
    ) -> Result<CieRuleConfiguration, CieServiceError> {
        if let Some(config) = self.configurations.active_configuration(department_id)? {
            return Ok(config);
        }

        let mut seeded = CieRuleConfiguration::from_template(&self.template, department_id.clone());
        seeded.is_active = true;
        let seeded = seeded.validated()?;
        self.configurations.save_configuration(seeded.clone())?;
        info!(%department_id, "seeded default CIE configuration");
        Ok(seeded)
    }

    /// Validate and store a department configuration.
    pub fn update_configuration(
        &self,
        department_id: &DepartmentId,
        mut config: CieRuleConfiguration,
    ) -> Result<CieRuleConfiguration, CieServiceError> {
        config.department_id = department_id.clone();
        let config = config.validated()?;
        self.configurations.save_configuration(config.clone())?;
        info!(
            %department_id,
            slip_tests_consider = config.slip_tests_consider,
            max_cie_marks = config.max_cie_marks,
            "updated CIE configuration"
        );
        Ok(config)
    }

    /// Evaluate the stored marks for a student in a teaching assignment.
    pub fn student_cie(
        &self,
        department_id: &DepartmentId,
        student_id: &StudentId,
        teaching_assignment_id: &TeachingAssignmentId,
    ) -> Result<CieEvaluation, CieServiceError> {
        let config = self.active_configuration(department_id)?;
        let records = self
            .assessments
            .records_for(student_id, teaching_assignment_id)?;
        let components = self.resolve_components(&records)?;

        let evaluation = AssessmentAggregator::new(config).evaluate(&records, &components)?;
        debug!(
            %student_id,
            %teaching_assignment_id,
            records = records.len(),
            no_data = evaluation.is_no_data(),
            "evaluated student CIE"
        );
        Ok(evaluation)
    }

    /// Store a mark and return the student's recomputed CIE.
    pub fn record_mark(
        &self,
        department_id: &DepartmentId,
        entry: MarkEntry,
    ) -> Result<CieEvaluation, CieServiceError> {
        let component = self
            .assessments
            .component(&entry.component_id)?
            .ok_or_else(|| CieServiceError::UnknownComponent(entry.component_id.clone()))?;

        if &component.department_id != department_id {
            return Err(CieServiceError::ComponentOutsideDepartment {
                component_id: component.id,
                owner: component.department_id,
                department_id: department_id.clone(),
            });
        }
        if !entry.marks.is_finite() || entry.marks < 0.0 || entry.marks > component.max_marks {
            return Err(CieServiceError::MarksOutOfRange {
                component_id: component.id,
                marks: entry.marks,
                max_marks: component.max_marks,
            });
        }

        let record = StudentAssessmentRecord::new(
            entry.student_id.clone(),
            entry.teaching_assignment_id.clone(),
            entry.component_id.clone(),
            entry.marks,
        )
        .recorded_at(Utc::now());
        self.assessments.upsert_record(record)?;
        info!(
            student_id = %entry.student_id,
            teaching_assignment_id = %entry.teaching_assignment_id,
            component_id = %entry.component_id,
            marks = entry.marks,
            "recorded assessment marks"
        );

        self.student_cie(
            department_id,
            &entry.student_id,
            &entry.teaching_assignment_id,
        )
    }

    /// Band an attendance percentage into the department's ATTENDANCE component.
    pub fn record_attendance(
        &self,
        department_id: &DepartmentId,
        entry: AttendanceEntry,
    ) -> Result<CieEvaluation, CieServiceError> {
        if !(0.0..=100.0).contains(&entry.percentage) {
            return Err(CieServiceError::InvalidPercentage(entry.percentage));
        }

        let config = self.active_configuration(department_id)?;
        let component = self
            .attendance_component(department_id)?
            .ok_or_else(|| CieServiceError::MissingAttendanceComponent(department_id.clone()))?;

        let record = banded_attendance_record(
            entry.student_id.clone(),
            entry.teaching_assignment_id.clone(),
            component.id,
            entry.percentage,
            &config.attendance_thresholds,
            Utc::now(),
        );
        info!(
            student_id = %entry.student_id,
            percentage = entry.percentage,
            marks = record.marks,
            "recorded banded attendance"
        );
        self.assessments.upsert_record(record)?;

        self.student_cie(
            department_id,
            &entry.student_id,
            &entry.teaching_assignment_id,
        )
    }

    /// Recompute every student holding marks in the assignment. Students without data are skipped.
    pub fn recalculate_assignment(
        &self,
        department_id: &DepartmentId,
        teaching_assignment_id: &TeachingAssignmentId,
        calculated_at: DateTime<Utc>,
    ) -> Result<Vec<StudentCieSnapshot>, CieServiceError> {
        let students = self
            .assessments
            .students_for_assignment(teaching_assignment_id)?;
        let mut snapshots = Vec::with_capacity(students.len());

        for student_id in students {
            let evaluation = self.student_cie(department_id, &student_id, teaching_assignment_id)?;
            if let Some(breakdown) = evaluation.breakdown {
                snapshots.push(StudentCieSnapshot::from_breakdown(
                    student_id,
                    teaching_assignment_id.clone(),
                    &breakdown,
                    calculated_at,
                ));
            }
        }

        info!(
            %teaching_assignment_id,
            students = snapshots.len(),
            "recalculated CIE for teaching assignment"
        );
        Ok(snapshots)
    }

    fn resolve_components(
        &self,
        records: &[StudentAssessmentRecord],
    ) -> Result<ComponentIndex, CieServiceError> {
        let ids: BTreeSet<&ComponentId> =
            records.iter().map(|record| &record.component_id).collect();
        let mut components = ComponentIndex::with_capacity(ids.len());

        for id in ids {
            if let Some(component) = self.assessments.component(id)? {
                components.insert(id.clone(), component);
            }
        }

        Ok(components)
    }

    fn attendance_component(
        &self,
        department_id: &DepartmentId,
    ) -> Result<Option<AssessmentComponent>, CieServiceError> {
        let component = self
            .assessments
            .components_for(department_id)?
            .into_iter()
            .filter(|component| component.category == AssessmentCategory::Attendance)
            .min_by_key(|component| component.sequence.unwrap_or(u32::MAX));
        Ok(component)
    }
}

/// Error raised by the CIE service.
#[derive(Debug, thiserror::Error)]
pub enum CieServiceError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Aggregation(#[from] AggregationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("unknown assessment component {0}")]
    UnknownComponent(ComponentId),
    #[error("component {component_id} belongs to department {owner}, not {department_id}")]
    ComponentOutsideDepartment {
        component_id: ComponentId,
        owner: DepartmentId,
        department_id: DepartmentId,
    },
    #[error("marks {marks} for component {component_id} must be between 0 and {max_marks}")]
    MarksOutOfRange {
        component_id: ComponentId,
        marks: f64,
        max_marks: f64,
    },
    #[error("attendance percentage must be between 0 and 100, got {0}")]
    InvalidPercentage(f64),
    #[error("department {0} has no ATTENDANCE component")]
    MissingAttendanceComponent(DepartmentId),
}
