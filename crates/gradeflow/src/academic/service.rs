use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use super::calendar::current_academic_year_label;
use crate::ids::{BatchId, SectionId};
use crate::repository::{CohortRepository, RepositoryError};

/// Display period for a section on a given date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionPeriod {
    pub section_id: SectionId,
    pub batch_id: BatchId,
    pub year: u8,
    pub semester: u8,
    pub academic_year: String,
}

/// Keeps section year/semester snapshots in step with the academic calendar.
pub struct CohortService<R> {
    repository: Arc<R>,
}

impl<R> CohortService<R>
where
    R: CohortRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        Self { repository }
    }

    /// Current period of a section, persisting the refreshed snapshot when it changed.
    pub fn section_period(
        &self,
        section_id: &SectionId,
        reference: NaiveDate,
    ) -> Result<SectionPeriod, CohortServiceError> {
        let mut section = self
            .repository
            .section(section_id)?
            .ok_or_else(|| CohortServiceError::UnknownSection(section_id.clone()))?;
        let batch = self
            .repository
            .batch(&section.batch_id)?
            .ok_or_else(|| CohortServiceError::UnknownBatch(section.batch_id.clone()))?;

        if section.refresh_period(&batch, reference) {
            info!(
                %section_id,
                year = ?section.year,
                semester = ?section.semester,
                "refreshed section period snapshot"
            );
            self.repository.update_section(section.clone())?;
        }

        let current = batch.academic_info(reference);
        Ok(SectionPeriod {
            section_id: section.id,
            batch_id: batch.id,
            year: current.year,
            semester: current.semester,
            academic_year: current_academic_year_label(reference),
        })
    }
}

/// Error raised by the cohort service.
#[derive(Debug, thiserror::Error)]
pub enum CohortServiceError {
    #[error("unknown section {0}")]
    UnknownSection(SectionId),
    #[error("unknown batch {0}")]
    UnknownBatch(BatchId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
