use serde::{Deserialize, Serialize};

use super::attendance::percentage_to_marks;
use super::domain::DepartmentId;

pub const DEFAULT_LABEL: &str = "Default CIE Configuration";

/// Attendance percentages at which 5, 4, and 3 marks are awarded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceThresholds {
    pub marks5: f64,
    pub marks4: f64,
    pub marks3: f64,
}

impl Default for AttendanceThresholds {
    fn default() -> Self {
        Self {
            marks5: 85.0,
            marks4: 75.0,
            marks3: 65.0,
        }
    }
}

impl AttendanceThresholds {
    /// Banded attendance mark for a percentage.
    pub fn band(&self, percentage: f64) -> u8 {
        percentage_to_marks(percentage, self)
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        for (name, value) in [
            ("marks5", self.marks5),
            ("marks4", self.marks4),
            ("marks3", self.marks3),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigurationError::ThresholdOutOfRange { name, value });
            }
        }

        if self.marks5 < self.marks4 || self.marks4 < self.marks3 {
            return Err(ConfigurationError::ThresholdsNotDescending {
                marks5: self.marks5,
                marks4: self.marks4,
                marks3: self.marks3,
            });
        }

        Ok(())
    }
}

/// Department-level knobs consumed by the CIE aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CieRuleConfiguration {
    pub department_id: DepartmentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "maxCIEMarks")]
    pub max_cie_marks: f64,
    pub slip_tests_count: u32,
    pub slip_tests_consider: u32,
    pub attendance_max_marks: f64,
    #[serde(default)]
    pub attendance_thresholds: AttendanceThresholds,
    pub is_active: bool,
}

impl CieRuleConfiguration {
    /// Seeded configuration for a department without one.
    pub fn default_for(department_id: DepartmentId) -> Self {
        Self {
            department_id,
            label: Some(DEFAULT_LABEL.to_string()),
            max_cie_marks: 50.0,
            slip_tests_count: 3,
            slip_tests_consider: 2,
            attendance_max_marks: 5.0,
            attendance_thresholds: AttendanceThresholds::default(),
            is_active: true,
        }
    }

    /// Copy of `template` re-homed to another department.
    pub fn from_template(template: &CieRuleConfiguration, department_id: DepartmentId) -> Self {
        Self {
            department_id,
            ..template.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.max_cie_marks.is_finite() || self.max_cie_marks <= 0.0 {
            return Err(ConfigurationError::NonPositiveMarks {
                field: "maxCIEMarks",
                value: self.max_cie_marks,
            });
        }
        if !self.attendance_max_marks.is_finite() || self.attendance_max_marks <= 0.0 {
            return Err(ConfigurationError::NonPositiveMarks {
                field: "attendanceMaxMarks",
                value: self.attendance_max_marks,
            });
        }
        if self.slip_tests_consider == 0 {
            return Err(ConfigurationError::NoSlipTestsConsidered);
        }
        if self.slip_tests_consider > self.slip_tests_count {
            return Err(ConfigurationError::SlipConsiderExceedsCount {
                consider: self.slip_tests_consider,
                count: self.slip_tests_count,
            });
        }

        self.attendance_thresholds.validate()
    }

    pub fn validated(self) -> Result<Self, ConfigurationError> {
        self.validate()?;
        Ok(self)
    }
}

/// Rejection raised when a configuration would yield nonsensical scores.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error(
        "attendance thresholds must descend (marks5 {marks5} >= marks4 {marks4} >= marks3 {marks3})"
    )]
    ThresholdsNotDescending {
        marks5: f64,
        marks4: f64,
        marks3: f64,
    },
    #[error("attendance threshold {name} must be a percentage between 0 and 100, got {value}")]
    ThresholdOutOfRange { name: &'static str, value: f64 },
    #[error("slipTestsConsider ({consider}) cannot exceed slipTestsCount ({count})")]
    SlipConsiderExceedsCount { consider: u32, count: u32 },
    #[error("slipTestsConsider must be at least 1")]
    NoSlipTestsConsidered,
    #[error("{field} must be a positive number, got {value}")]
    NonPositiveMarks { field: &'static str, value: f64 },
}
