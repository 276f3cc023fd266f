//! Academic calendar: year of study and semester derived from batch years and a date.

pub mod calendar;
pub mod cohort;
pub mod router;
pub mod service;

pub use calendar::{
    academic_year_start, compute_academic_info, current_academic_year_label, AcademicInfo,
    PROGRAM_SEMESTERS, PROGRAM_YEARS,
};
pub use cohort::{Batch, Section};
pub use router::{academic_router, ReferenceDateQuery};
pub use service::{CohortService, CohortServiceError, SectionPeriod};
