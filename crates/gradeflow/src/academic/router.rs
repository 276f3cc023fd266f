use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use serde_json::json;

use super::calendar::current_academic_year_label;
use super::service::{CohortService, CohortServiceError};
use crate::ids::SectionId;
use crate::repository::{CohortRepository, RepositoryError};

/// Router builder exposing section periods and the academic-year label.
pub fn academic_router<R>(service: Arc<CohortService<R>>) -> Router
where
    R: CohortRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/sections/:section_id/period",
            get(section_period_handler::<R>),
        )
        .route("/api/v1/academic-year", get(academic_year_handler))
        .with_state(service)
}

/// Optional reference date; defaults to today.
#[derive(Debug, Default, Deserialize)]
pub struct ReferenceDateQuery {
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl ReferenceDateQuery {
    fn resolve(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| Local::now().date_naive())
    }
}

pub(crate) async fn section_period_handler<R>(
    State(service): State<Arc<CohortService<R>>>,
    Path(section_id): Path<String>,
    Query(query): Query<ReferenceDateQuery>,
) -> Response
where
    R: CohortRepository + 'static,
{
    match service.section_period(&SectionId(section_id), query.resolve()) {
        Ok(period) => (StatusCode::OK, Json(period)).into_response(),
        Err(err) => {
            let status = match &err {
                CohortServiceError::UnknownSection(_)
                | CohortServiceError::UnknownBatch(_)
                | CohortServiceError::Repository(RepositoryError::NotFound) => {
                    StatusCode::NOT_FOUND
                }
                CohortServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(json!({ "error": err.to_string() }))).into_response()
        }
    }
}

pub(crate) async fn academic_year_handler(Query(query): Query<ReferenceDateQuery>) -> Response {
    let label = current_academic_year_label(query.resolve());
    (StatusCode::OK, Json(json!({ "academicYear": label }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::academic::{Batch, Section};
    use crate::ids::{BatchId, DepartmentId};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Default)]
    struct MemoryCohorts {
        batches: HashMap<BatchId, Batch>,
        sections: Mutex<HashMap<SectionId, Section>>,
    }

    impl CohortRepository for MemoryCohorts {
        fn batch(&self, batch_id: &BatchId) -> Result<Option<Batch>, RepositoryError> {
            Ok(self.batches.get(batch_id).cloned())
        }

        fn section(&self, section_id: &SectionId) -> Result<Option<Section>, RepositoryError> {
            let guard = self.sections.lock().expect("section mutex poisoned");
            Ok(guard.get(section_id).cloned())
        }

        fn update_section(&self, section: Section) -> Result<(), RepositoryError> {
            let mut guard = self.sections.lock().expect("section mutex poisoned");
            guard.insert(section.id.clone(), section);
            Ok(())
        }
    }

    fn repository() -> Arc<MemoryCohorts> {
        let mut repository = MemoryCohorts::default();
        repository.batches.insert(
            BatchId::new("b-2021"),
            Batch {
                id: BatchId::new("b-2021"),
                name: "2021-2025".to_string(),
                department_id: DepartmentId::new("cse"),
                start_year: 2021,
                end_year: 2025,
            },
        );
        repository
            .sections
            .lock()
            .expect("section mutex poisoned")
            .insert(
                SectionId::new("sec-a"),
                Section {
                    id: SectionId::new("sec-a"),
                    name: "A".to_string(),
                    department_id: DepartmentId::new("cse"),
                    batch_id: BatchId::new("b-2021"),
                    year: None,
                    semester: None,
                },
            );
        Arc::new(repository)
    }

    async fn get_json(router: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = router
            .oneshot(
                axum::http::Request::get(uri)
                    .body(axum::body::Body::empty())
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), 4096)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&body).expect("json payload"))
    }

    #[tokio::test]
    async fn section_period_route_reports_and_caches_period() {
        let repository = repository();
        let router = academic_router(Arc::new(CohortService::new(repository.clone())));

        let (status, body) =
            get_json(router, "/api/v1/sections/sec-a/period?date=2024-07-14").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["year"], 3);
        assert_eq!(body["semester"], 6);
        assert_eq!(body["academicYear"], "2023-24");
        let cached = repository
            .section(&SectionId::new("sec-a"))
            .expect("lookup succeeds")
            .expect("section present");
        assert_eq!(cached.semester, Some(6));
    }

    #[tokio::test]
    async fn section_period_route_returns_not_found_for_unknown_section() {
        let router = academic_router(Arc::new(CohortService::new(repository())));

        let (status, body) = get_json(router, "/api/v1/sections/missing/period").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap_or_default().contains("missing"));
    }

    #[tokio::test]
    async fn academic_year_route_formats_label() {
        let router = academic_router(Arc::new(CohortService::new(repository())));

        let (status, body) = get_json(router, "/api/v1/academic-year?date=2024-07-16").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["academicYear"], "2024-25");
    }
}
