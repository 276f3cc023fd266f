use chrono::NaiveDate;
use gradeflow::academic::{Batch, Section};
use gradeflow::cie::{
    AssessmentCategory, AssessmentComponent, AttendanceThresholds, CieRuleConfiguration,
    ComponentId, DepartmentId, StudentAssessmentRecord, StudentId, TeachingAssignmentId,
};
use gradeflow::config::parse_thresholds;
use gradeflow::ids::{BatchId, SectionId};
use gradeflow::repository::{
    AssessmentRepository, CieConfigurationRepository, CohortRepository, RepositoryError,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("in-memory store lock poisoned".to_string()))
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAssessmentRepository {
    records: Arc<Mutex<Vec<StudentAssessmentRecord>>>,
    components: Arc<Mutex<HashMap<ComponentId, AssessmentComponent>>>,
}

impl InMemoryAssessmentRepository {
    pub(crate) fn define_component(
        &self,
        component: AssessmentComponent,
    ) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.components)?;
        if guard.contains_key(&component.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(component.id.clone(), component);
        Ok(())
    }
}

impl AssessmentRepository for InMemoryAssessmentRepository {
    fn records_for(
        &self,
        student_id: &StudentId,
        teaching_assignment_id: &TeachingAssignmentId,
    ) -> Result<Vec<StudentAssessmentRecord>, RepositoryError> {
        let guard = lock(&self.records)?;
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
        let guard = lock(&self.records)?;
        let mut students = Vec::new();
        for record in guard
            .iter()
            .filter(|record| &record.teaching_assignment_id == teaching_assignment_id)
        {
            if !students.contains(&record.student_id) {
                students.push(record.student_id.clone());
            }
        }
        Ok(students)
    }

    fn upsert_record(&self, record: StudentAssessmentRecord) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.records)?;
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
        Ok(lock(&self.components)?.get(component_id).cloned())
    }

    fn components_for(
        &self,
        department_id: &DepartmentId,
    ) -> Result<Vec<AssessmentComponent>, RepositoryError> {
        let guard = lock(&self.components)?;
        let mut components: Vec<AssessmentComponent> = guard
            .values()
            .filter(|component| &component.department_id == department_id)
            .cloned()
            .collect();
        components.sort_by(|a, b| {
            (a.category, a.sequence, &a.id).cmp(&(b.category, b.sequence, &b.id))
        });
        Ok(components)
    }
}

/// Keeps only the active configuration of each department.
#[derive(Default, Clone)]
pub(crate) struct InMemoryConfigurationRepository {
    active: Arc<Mutex<HashMap<DepartmentId, CieRuleConfiguration>>>,
}

impl CieConfigurationRepository for InMemoryConfigurationRepository {
    fn active_configuration(
        &self,
        department_id: &DepartmentId,
    ) -> Result<Option<CieRuleConfiguration>, RepositoryError> {
        Ok(lock(&self.active)?.get(department_id).cloned())
    }

    fn save_configuration(&self, config: CieRuleConfiguration) -> Result<(), RepositoryError> {
        if config.is_active {
            lock(&self.active)?.insert(config.department_id.clone(), config);
        }
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryCohortRepository {
    batches: Arc<Mutex<HashMap<BatchId, Batch>>>,
    sections: Arc<Mutex<HashMap<SectionId, Section>>>,
}

impl InMemoryCohortRepository {
    pub(crate) fn insert_batch(&self, batch: Batch) -> Result<(), RepositoryError> {
        lock(&self.batches)?.insert(batch.id.clone(), batch);
        Ok(())
    }

    pub(crate) fn insert_section(&self, section: Section) -> Result<(), RepositoryError> {
        lock(&self.sections)?.insert(section.id.clone(), section);
        Ok(())
    }
}

impl CohortRepository for InMemoryCohortRepository {
    fn batch(&self, batch_id: &BatchId) -> Result<Option<Batch>, RepositoryError> {
        Ok(lock(&self.batches)?.get(batch_id).cloned())
    }

    fn section(&self, section_id: &SectionId) -> Result<Option<Section>, RepositoryError> {
        Ok(lock(&self.sections)?.get(section_id).cloned())
    }

    fn update_section(&self, section: Section) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.sections)?;
        match guard.get_mut(&section.id) {
            Some(stored) => {
                *stored = section;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

/// Backing stores shared by the services of one process.
#[derive(Default, Clone)]
pub(crate) struct InMemoryStore {
    pub(crate) assessments: Arc<InMemoryAssessmentRepository>,
    pub(crate) configurations: Arc<InMemoryConfigurationRepository>,
    pub(crate) cohorts: Arc<InMemoryCohortRepository>,
}

/// What [`seed_demo_department`] put into the store.
#[derive(Debug, Clone)]
pub(crate) struct SeedReport {
    pub(crate) department_id: DepartmentId,
    pub(crate) teaching_assignment_id: TeachingAssignmentId,
    pub(crate) students: Vec<StudentId>,
    pub(crate) components: Vec<AssessmentComponent>,
    pub(crate) batch: Batch,
    pub(crate) section: Section,
    pub(crate) configuration: CieRuleConfiguration,
}

impl SeedReport {
    pub(crate) fn component(
        &self,
        category: AssessmentCategory,
        sequence: u32,
    ) -> Option<&ComponentId> {
        self.components
            .iter()
            .find(|component| {
                component.category == category && component.sequence == Some(sequence)
            })
            .map(|component| &component.id)
    }
}

/// Seed one department with components, a batch, a section, and its CIE configuration.
pub(crate) fn seed_demo_department(
    store: &InMemoryStore,
    template: &CieRuleConfiguration,
) -> Result<SeedReport, RepositoryError> {
    let department_id = DepartmentId::new("cse");
    let components = demo_components(&department_id);
    for component in &components {
        store.assessments.define_component(component.clone())?;
    }

    let configuration = CieRuleConfiguration::from_template(template, department_id.clone());
    store.configurations.save_configuration(configuration.clone())?;

    let batch = Batch {
        id: BatchId::new("cse-2022"),
        name: "2022-2026".to_string(),
        department_id: department_id.clone(),
        start_year: 2022,
        end_year: 2026,
    };
    let section = Section {
        id: SectionId::new("cse-2022-a"),
        name: "A".to_string(),
        department_id: department_id.clone(),
        batch_id: batch.id.clone(),
        year: None,
        semester: None,
    };
    store.cohorts.insert_batch(batch.clone())?;
    store.cohorts.insert_section(section.clone())?;

    Ok(SeedReport {
        department_id,
        teaching_assignment_id: TeachingAssignmentId::new("ta-dbms-cse-2022-a"),
        students: ["1RV22CS001", "1RV22CS002", "1RV22CS003"]
            .into_iter()
            .map(StudentId::new)
            .collect(),
        components,
        batch,
        section,
        configuration,
    })
}

fn demo_components(department_id: &DepartmentId) -> Vec<AssessmentComponent> {
    let plan: [(&str, &str, AssessmentCategory, f64, u32); 8] = [
        ("slip-1", "Slip Test 1", AssessmentCategory::Slip, 10.0, 1),
        ("slip-2", "Slip Test 2", AssessmentCategory::Slip, 10.0, 2),
        ("slip-3", "Slip Test 3", AssessmentCategory::Slip, 10.0, 3),
        ("asg-1", "Assignment 1", AssessmentCategory::Assignment, 10.0, 1),
        ("asg-2", "Assignment 2", AssessmentCategory::Assignment, 10.0, 2),
        ("mid-1", "Midsem 1", AssessmentCategory::Midsem, 25.0, 1),
        ("mid-2", "Midsem 2", AssessmentCategory::Midsem, 25.0, 2),
        ("att", "Attendance", AssessmentCategory::Attendance, 5.0, 1),
    ];

    plan.into_iter()
        .map(|(id, name, category, max_marks, sequence)| AssessmentComponent {
            id: ComponentId::new(id),
            department_id: department_id.clone(),
            name: name.to_string(),
            category,
            max_marks,
            sequence: Some(sequence),
        })
        .collect()
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn parse_threshold_arg(raw: &str) -> Result<AttendanceThresholds, String> {
    parse_thresholds(raw)
        .ok_or_else(|| format!("expected three comma-separated percentages, got '{raw}'"))
}
