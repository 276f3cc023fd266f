//! Storage seams for the services. The pure calculators never touch these.

use crate::academic::{Batch, Section};
use crate::cie::{
    AssessmentComponent, CieRuleConfiguration, ComponentId, DepartmentId,
    StudentAssessmentRecord, StudentId, TeachingAssignmentId,
};
use crate::ids::{BatchId, SectionId};

/// Marks and component definitions.
pub trait AssessmentRepository: Send + Sync {
    fn records_for(
        &self,
        student_id: &StudentId,
        teaching_assignment_id: &TeachingAssignmentId,
    ) -> Result<Vec<StudentAssessmentRecord>, RepositoryError>;

    /// Distinct students holding at least one record for the assignment.
    fn students_for_assignment(
        &self,
        teaching_assignment_id: &TeachingAssignmentId,
    ) -> Result<Vec<StudentId>, RepositoryError>;

    /// Insert or overwrite the record stored for the same (student, assignment, component).
    fn upsert_record(&self, record: StudentAssessmentRecord) -> Result<(), RepositoryError>;

    fn component(
        &self,
        component_id: &ComponentId,
    ) -> Result<Option<AssessmentComponent>, RepositoryError>;

    fn components_for(
        &self,
        department_id: &DepartmentId,
    ) -> Result<Vec<AssessmentComponent>, RepositoryError>;
}

/// Per-department CIE rule configurations.
pub trait CieConfigurationRepository: Send + Sync {
    fn active_configuration(
        &self,
        department_id: &DepartmentId,
    ) -> Result<Option<CieRuleConfiguration>, RepositoryError>;

    /// Store a configuration. Saving an active one deactivates the department's previous one.
    fn save_configuration(&self, config: CieRuleConfiguration) -> Result<(), RepositoryError>;
}

/// Batches and the sections that reference them.
pub trait CohortRepository: Send + Sync {
    fn batch(&self, batch_id: &BatchId) -> Result<Option<Batch>, RepositoryError>;
    fn section(&self, section_id: &SectionId) -> Result<Option<Section>, RepositoryError>;
    fn update_section(&self, section: Section) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
