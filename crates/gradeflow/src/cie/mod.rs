//! Continuous internal evaluation: rule configuration, attendance banding, and aggregation.
//!
//! CIE = average of the best `slipTestsConsider` slip tests + average of assignments
//! + average of midsems + attendance marks. Everything in [`aggregator`], [`attendance`],
//! and [`rules`] is pure; [`service`] and [`router`] bring in storage and HTTP.

pub mod aggregator;
pub mod attendance;
pub mod domain;
pub mod import;
pub mod router;
pub mod rules;
pub mod service;

#[cfg(test)]
mod tests;

pub use aggregator::{
    compute_cie, partition, AggregationError, AssessmentAggregator, CieEvaluation,
    ComponentIndex, ExcludedRecord, ExclusionReason, PartitionedRecords,
};
pub use attendance::{
    attendance_percentage, banded_attendance_record, percentage_to_marks, AttendanceSession,
};
pub use domain::{
    AssessmentCategory, AssessmentComponent, CieBreakdown, ComponentId, DepartmentId,
    StudentAssessmentRecord, StudentCieSnapshot, StudentId, TeachingAssignmentId,
};
pub use import::{MarkSheet, MarkSheetImportError, MarkSheetImporter, MarkSheetScope};
pub use router::{cie_router, CieConfigurationUpdate, StudentCieView};
pub use rules::{AttendanceThresholds, CieRuleConfiguration, ConfigurationError};
pub use service::{AttendanceEntry, CieService, CieServiceError, MarkEntry};
