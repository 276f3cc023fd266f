use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::cie::{cie_router, CieService};

fn router() -> axum::Router {
    let (service, _, _) = build_service();
    cie_router(Arc::new(service))
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

#[tokio::test]
async fn ungraded_student_reports_null_cie() {
    let response = router()
        .oneshot(
            Request::get("/api/v1/departments/cse/assignments/ta-dbms-3a/students/stu-001/cie")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert!(body["cie"].is_null());
    assert_eq!(body["studentId"], "stu-001");
}

#[tokio::test]
async fn mark_entry_returns_recomputed_breakdown() {
    let response = router()
        .oneshot(json_request(
            "PUT",
            "/api/v1/departments/cse/marks",
            json!({
                "studentId": "stu-001",
                "teachingAssignmentId": "ta-dbms-3a",
                "componentId": "mid-1",
                "marks": 21.5
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["cie"]["midsemScore"], 21.5);
    assert_eq!(body["cie"]["totalCIE"], 21.5);
}

#[tokio::test]
async fn out_of_range_mark_is_unprocessable() {
    let response = router()
        .oneshot(json_request(
            "PUT",
            "/api/v1/departments/cse/marks",
            json!({
                "studentId": "stu-001",
                "teachingAssignmentId": "ta-dbms-3a",
                "componentId": "slip-1",
                "marks": 12
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .contains("slip-1"));
}

#[tokio::test]
async fn unknown_component_is_not_found() {
    let response = router()
        .oneshot(json_request(
            "PUT",
            "/api/v1/departments/cse/marks",
            json!({
                "studentId": "stu-001",
                "teachingAssignmentId": "ta-dbms-3a",
                "componentId": "lab-7",
                "marks": 3
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn attendance_route_bands_percentage() {
    let response = router()
        .oneshot(json_request(
            "POST",
            "/api/v1/departments/cse/attendance",
            json!({
                "studentId": "stu-001",
                "teachingAssignmentId": "ta-dbms-3a",
                "percentage": 66.0
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["cie"]["attendanceMarks"], 3.0);
}

#[tokio::test]
async fn configuration_route_seeds_default() {
    let response = router()
        .oneshot(
            Request::get("/api/v1/departments/cse/cie-configuration")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["label"], "Default CIE Configuration");
    assert_eq!(body["isActive"], true);
}

#[tokio::test]
async fn invalid_configuration_update_is_unprocessable() {
    let response = router()
        .oneshot(json_request(
            "PUT",
            "/api/v1/departments/cse/cie-configuration",
            json!({
                "maxCIEMarks": 50,
                "slipTestsCount": 2,
                "slipTestsConsider": 3,
                "attendanceMaxMarks": 5
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn valid_configuration_update_is_stored() {
    let response = router()
        .oneshot(json_request(
            "PUT",
            "/api/v1/departments/cse/cie-configuration",
            json!({
                "label": "Autumn rules",
                "maxCIEMarks": 50,
                "slipTestsCount": 4,
                "slipTestsConsider": 3,
                "attendanceMaxMarks": 5,
                "attendanceThresholds": { "marks5": 90, "marks4": 80, "marks3": 70 }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["departmentId"], "cse");
    assert_eq!(body["slipTestsConsider"], 3);
    assert_eq!(body["attendanceThresholds"]["marks5"], 90.0);
}

#[tokio::test]
async fn recalculate_handler_returns_snapshots() {
    let (service, _, _) = build_service();
    service
        .record_mark(
            &department(),
            crate::cie::MarkEntry {
                student_id: student(),
                teaching_assignment_id: assignment(),
                component_id: crate::cie::ComponentId::new("asg-1"),
                marks: 9.0,
            },
        )
        .expect("stored");

    let response = crate::cie::router::recalculate_handler::<
        MemoryAssessments,
        MemoryConfigurations,
    >(
        State(Arc::new(service)),
        Path(("cse".to_string(), "ta-dbms-3a".to_string())),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body[0]["cieScore"], 9.0);
}

#[tokio::test]
async fn repository_outage_is_internal_error() {
    let service = CieService::new(
        Arc::new(UnavailableAssessments),
        Arc::new(MemoryConfigurations::default()),
    );

    let response = crate::cie::router::student_cie_handler::<
        UnavailableAssessments,
        MemoryConfigurations,
    >(
        State(Arc::new(service)),
        Path((
            "cse".to_string(),
            "ta-dbms-3a".to_string(),
            "stu-001".to_string(),
        )),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
