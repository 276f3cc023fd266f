use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use super::aggregator::CieEvaluation;
use super::domain::{CieBreakdown, DepartmentId, StudentId, TeachingAssignmentId};
use super::rules::{AttendanceThresholds, CieRuleConfiguration};
use super::service::{AttendanceEntry, CieService, CieServiceError, MarkEntry};
use crate::repository::{AssessmentRepository, CieConfigurationRepository, RepositoryError};

/// Router builder exposing CIE reads, mark entry, and rule configuration.
pub fn cie_router<A, C>(service: Arc<CieService<A, C>>) -> Router
where
    A: AssessmentRepository + 'static,
    C: CieConfigurationRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/departments/:department_id/assignments/:assignment_id/students/:student_id/cie",
            get(student_cie_handler::<A, C>),
        )
        .route(
            "/api/v1/departments/:department_id/marks",
            put(record_mark_handler::<A, C>),
        )
        .route(
            "/api/v1/departments/:department_id/attendance",
            post(record_attendance_handler::<A, C>),
        )
        .route(
            "/api/v1/departments/:department_id/cie-configuration",
            get(configuration_handler::<A, C>).put(update_configuration_handler::<A, C>),
        )
        .route(
            "/api/v1/departments/:department_id/assignments/:assignment_id/cie/recalculate",
            post(recalculate_handler::<A, C>),
        )
        .with_state(service)
}

/// Public view of a student's CIE; `cie` is null until something has been graded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentCieView {
    pub student_id: StudentId,
    pub teaching_assignment_id: TeachingAssignmentId,
    pub cie: Option<CieBreakdown>,
    pub excluded_records: usize,
    pub duplicate_attendance: usize,
}

impl StudentCieView {
    pub fn new(
        student_id: StudentId,
        teaching_assignment_id: TeachingAssignmentId,
        evaluation: &CieEvaluation,
    ) -> Self {
        Self {
            student_id,
            teaching_assignment_id,
            cie: evaluation.breakdown,
            excluded_records: evaluation.excluded.len(),
            duplicate_attendance: evaluation.duplicate_attendance,
        }
    }
}

/// Configuration payload; the department comes from the path.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CieConfigurationUpdate {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "maxCIEMarks")]
    pub max_cie_marks: f64,
    pub slip_tests_count: u32,
    pub slip_tests_consider: u32,
    pub attendance_max_marks: f64,
    #[serde(default)]
    pub attendance_thresholds: AttendanceThresholds,
}

impl CieConfigurationUpdate {
    pub fn into_configuration(self, department_id: DepartmentId) -> CieRuleConfiguration {
        CieRuleConfiguration {
            department_id,
            label: self.label,
            max_cie_marks: self.max_cie_marks,
            slip_tests_count: self.slip_tests_count,
            slip_tests_consider: self.slip_tests_consider,
            attendance_max_marks: self.attendance_max_marks,
            attendance_thresholds: self.attendance_thresholds,
            is_active: true,
        }
    }
}

pub(crate) async fn student_cie_handler<A, C>(
    State(service): State<Arc<CieService<A, C>>>,
    Path((department_id, assignment_id, student_id)): Path<(String, String, String)>,
) -> Response
where
    A: AssessmentRepository + 'static,
    C: CieConfigurationRepository + 'static,
{
    let department_id = DepartmentId(department_id);
    let student_id = StudentId(student_id);
    let assignment_id = TeachingAssignmentId(assignment_id);

    match service.student_cie(&department_id, &student_id, &assignment_id) {
        Ok(evaluation) => {
            let view = StudentCieView::new(student_id, assignment_id, &evaluation);
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn record_mark_handler<A, C>(
    State(service): State<Arc<CieService<A, C>>>,
    Path(department_id): Path<String>,
    Json(entry): Json<MarkEntry>,
) -> Response
where
    A: AssessmentRepository + 'static,
    C: CieConfigurationRepository + 'static,
{
    let student_id = entry.student_id.clone();
    let assignment_id = entry.teaching_assignment_id.clone();

    match service.record_mark(&DepartmentId(department_id), entry) {
        Ok(evaluation) => {
            let view = StudentCieView::new(student_id, assignment_id, &evaluation);
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn record_attendance_handler<A, C>(
    State(service): State<Arc<CieService<A, C>>>,
    Path(department_id): Path<String>,
    Json(entry): Json<AttendanceEntry>,
) -> Response
where
    A: AssessmentRepository + 'static,
    C: CieConfigurationRepository + 'static,
{
    let student_id = entry.student_id.clone();
    let assignment_id = entry.teaching_assignment_id.clone();

    match service.record_attendance(&DepartmentId(department_id), entry) {
        Ok(evaluation) => {
            let view = StudentCieView::new(student_id, assignment_id, &evaluation);
            (StatusCode::OK, Json(view)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn configuration_handler<A, C>(
    State(service): State<Arc<CieService<A, C>>>,
    Path(department_id): Path<String>,
) -> Response
where
    A: AssessmentRepository + 'static,
    C: CieConfigurationRepository + 'static,
{
    match service.active_configuration(&DepartmentId(department_id)) {
        Ok(config) => (StatusCode::OK, Json(config)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_configuration_handler<A, C>(
    State(service): State<Arc<CieService<A, C>>>,
    Path(department_id): Path<String>,
    Json(update): Json<CieConfigurationUpdate>,
) -> Response
where
    A: AssessmentRepository + 'static,
    C: CieConfigurationRepository + 'static,
{
    let department_id = DepartmentId(department_id);
    let config = update.into_configuration(department_id.clone());

    match service.update_configuration(&department_id, config) {
        Ok(stored) => (StatusCode::OK, Json(stored)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn recalculate_handler<A, C>(
    State(service): State<Arc<CieService<A, C>>>,
    Path((department_id, assignment_id)): Path<(String, String)>,
) -> Response
where
    A: AssessmentRepository + 'static,
    C: CieConfigurationRepository + 'static,
{
    match service.recalculate_assignment(
        &DepartmentId(department_id),
        &TeachingAssignmentId(assignment_id),
        Utc::now(),
    ) {
        Ok(snapshots) => (StatusCode::OK, Json(snapshots)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: CieServiceError) -> Response {
    let status = match &err {
        CieServiceError::Configuration(_)
        | CieServiceError::MarksOutOfRange { .. }
        | CieServiceError::InvalidPercentage(_)
        | CieServiceError::MissingAttendanceComponent(_)
        | CieServiceError::ComponentOutsideDepartment { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        CieServiceError::UnknownComponent(_)
        | CieServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        CieServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        CieServiceError::Repository(RepositoryError::Unavailable(_))
        | CieServiceError::Aggregation(_) => {
            error!(error = %err, "CIE request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({ "error": err.to_string() });
    (status, Json(payload)).into_response()
}
