use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::cie::{
    AssessmentCategory, AssessmentComponent, CieRuleConfiguration, CieService, ComponentId,
    ComponentIndex, DepartmentId, StudentAssessmentRecord, StudentId, TeachingAssignmentId,
};
use crate::repository::{AssessmentRepository, CieConfigurationRepository, RepositoryError};

pub(super) fn department() -> DepartmentId {
    DepartmentId::new("cse")
}

pub(super) fn student() -> StudentId {
    StudentId::new("stu-001")
}

pub(super) fn assignment() -> TeachingAssignmentId {
    TeachingAssignmentId::new("ta-dbms-3a")
}

pub(super) fn at(hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, hour, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn component(
    id: &str,
    category: AssessmentCategory,
    max_marks: f64,
    sequence: u32,
) -> AssessmentComponent {
    AssessmentComponent {
        id: ComponentId::new(id),
        department_id: department(),
        name: id.to_uppercase(),
        category,
        max_marks,
        sequence: Some(sequence),
    }
}

/// Three slips, two assignments, two midsems, and two attendance slots.
pub(super) fn components() -> Vec<AssessmentComponent> {
    vec![
        component("slip-1", AssessmentCategory::Slip, 10.0, 1),
        component("slip-2", AssessmentCategory::Slip, 10.0, 2),
        component("slip-3", AssessmentCategory::Slip, 10.0, 3),
        component("asg-1", AssessmentCategory::Assignment, 10.0, 1),
        component("asg-2", AssessmentCategory::Assignment, 10.0, 2),
        component("mid-1", AssessmentCategory::Midsem, 25.0, 1),
        component("mid-2", AssessmentCategory::Midsem, 25.0, 2),
        component("att-1", AssessmentCategory::Attendance, 5.0, 1),
        component("att-2", AssessmentCategory::Attendance, 5.0, 2),
    ]
}

pub(super) fn component_index() -> ComponentIndex {
    components()
        .into_iter()
        .map(|component| (component.id.clone(), component))
        .collect()
}

pub(super) fn record(component_id: &str, marks: f64) -> StudentAssessmentRecord {
    StudentAssessmentRecord::new(student(), assignment(), ComponentId::new(component_id), marks)
}

pub(super) fn config() -> CieRuleConfiguration {
    CieRuleConfiguration::default_for(department())
}

pub(super) fn build_service() -> (
    CieService<MemoryAssessments, MemoryConfigurations>,
    Arc<MemoryAssessments>,
    Arc<MemoryConfigurations>,
) {
    let assessments = Arc::new(MemoryAssessments::with_components(components()));
    let configurations = Arc::new(MemoryConfigurations::default());
    let service = CieService::new(assessments.clone(), configurations.clone());
    (service, assessments, configurations)
}

#[derive(Default, Clone)]
pub(super) struct MemoryAssessments {
    pub(super) records: Arc<Mutex<Vec<StudentAssessmentRecord>>>,
    pub(super) components: Arc<Mutex<HashMap<ComponentId, AssessmentComponent>>>,
}

impl MemoryAssessments {
    pub(super) fn with_components(components: Vec<AssessmentComponent>) -> Self {
        let repository = Self::default();
        {
            let mut guard = repository
                .components
                .lock()
                .expect("component mutex poisoned");
            for component in components {
                guard.insert(component.id.clone(), component);
            }
        }
        repository
    }

    pub(super) fn stored(&self) -> Vec<StudentAssessmentRecord> {
        self.records.lock().expect("record mutex poisoned").clone()
    }

    pub(super) fn push_raw(&self, record: StudentAssessmentRecord) {
        self.records
            .lock()
            .expect("record mutex poisoned")
            .push(record);
    }
}

impl AssessmentRepository for MemoryAssessments {
    fn records_for(
        &self,
        student_id: &StudentId,
        teaching_assignment_id: &TeachingAssignmentId,
    ) -> Result<Vec<StudentAssessmentRecord>, RepositoryError> {
        let guard = self.records.lock().expect("record mutex poisoned");
        Ok(guard
            .iter()
            .filter(|record| {
                &record.student_id == student_id
                    && &record.teaching_assignment_id == teaching_assignment_id
            })
            .cloned()
            .collect())
    }

    fn students_for_assignment(
        &self,
        teaching_assignment_id: &TeachingAssignmentId,
    ) -> Result<Vec<StudentId>, RepositoryError> {
        let guard = self.records.lock().expect("record mutex poisoned");
        let mut students: Vec<StudentId> = Vec::new();
        for record in guard.iter() {
            if &record.teaching_assignment_id == teaching_assignment_id
                && !students.contains(&record.student_id)
            {
                students.push(record.student_id.clone());
            }
        }
        Ok(students)
    }

    fn upsert_record(&self, record: StudentAssessmentRecord) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("record mutex poisoned");
        match guard.iter_mut().find(|stored| stored.same_slot(&record)) {
            Some(stored) => *stored = record,
            None => guard.push(record),
        }
        Ok(())
    }

    fn component(
        &self,
        component_id: &ComponentId,
    ) -> Result<Option<AssessmentComponent>, RepositoryError> {
        let guard = self.components.lock().expect("component mutex poisoned");
        Ok(guard.get(component_id).cloned())
    }

    fn components_for(
        &self,
        department_id: &DepartmentId,
    ) -> Result<Vec<AssessmentComponent>, RepositoryError> {
        let guard = self.components.lock().expect("component mutex poisoned");
        Ok(guard
            .values()
            .filter(|component| &component.department_id == department_id)
            .cloned()
            .collect())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryConfigurations {
    pub(super) saved: Arc<Mutex<Vec<CieRuleConfiguration>>>,
}

impl MemoryConfigurations {
    pub(super) fn history(&self) -> Vec<CieRuleConfiguration> {
        self.saved.lock().expect("configuration mutex poisoned").clone()
    }
}

impl CieConfigurationRepository for MemoryConfigurations {
    fn active_configuration(
        &self,
        department_id: &DepartmentId,
    ) -> Result<Option<CieRuleConfiguration>, RepositoryError> {
        let guard = self.saved.lock().expect("configuration mutex poisoned");
        Ok(guard
            .iter()
            .rev()
            .find(|config| &config.department_id == department_id && config.is_active)
            .cloned())
    }

    fn save_configuration(&self, config: CieRuleConfiguration) -> Result<(), RepositoryError> {
        let mut guard = self.saved.lock().expect("configuration mutex poisoned");
        if config.is_active {
            for stored in guard
                .iter_mut()
                .filter(|stored| stored.department_id == config.department_id)
            {
                stored.is_active = false;
            }
        }
        guard.push(config);
        Ok(())
    }
}

pub(super) struct UnavailableAssessments;

impl AssessmentRepository for UnavailableAssessments {
    fn records_for(
        &self,
        _student_id: &StudentId,
        _teaching_assignment_id: &TeachingAssignmentId,
    ) -> Result<Vec<StudentAssessmentRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn students_for_assignment(
        &self,
        _teaching_assignment_id: &TeachingAssignmentId,
    ) -> Result<Vec<StudentId>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn upsert_record(&self, _record: StudentAssessmentRecord) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn component(
        &self,
        _component_id: &ComponentId,
    ) -> Result<Option<AssessmentComponent>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn components_for(
        &self,
        _department_id: &DepartmentId,
    ) -> Result<Vec<AssessmentComponent>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
