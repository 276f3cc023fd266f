use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Length of a programme in years of study.
pub const PROGRAM_YEARS: i64 = 4;
/// Length of a programme in semesters.
pub const PROGRAM_SEMESTERS: i64 = 8;

/// (month, day) on which a new academic year begins.
const ACADEMIC_YEAR_CUTOVER: (u32, u32) = (7, 15);
/// (month, day) on which the odd semester begins. One day after the year cutover.
const ODD_SEMESTER_START: (u32, u32) = (7, 16);

/// Year of study and semester number of a cohort on a given date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcademicInfo {
    pub year: u8,
    pub semester: u8,
}

/// Calendar year in which the academic year containing `reference` began.
pub fn academic_year_start(reference: NaiveDate) -> i32 {
    if (reference.month(), reference.day()) >= ACADEMIC_YEAR_CUTOVER {
        reference.year()
    } else {
        reference.year() - 1
    }
}

/// Year of study and semester for a batch on `reference`.
///
/// A batch that has not started or has already finished is clamped to the nearest year of
/// study and reported in semester 1. `batch_end_year` is accepted but does not influence
/// the result.
pub fn compute_academic_info(
    batch_start_year: i32,
    batch_end_year: i32,
    reference: NaiveDate,
) -> AcademicInfo {
    let _ = batch_end_year;
    let year_of_study =
        i64::from(academic_year_start(reference)) - i64::from(batch_start_year) + 1;

    if !(1..=PROGRAM_YEARS).contains(&year_of_study) {
        return AcademicInfo {
            year: year_of_study.clamp(1, PROGRAM_YEARS) as u8,
            semester: 1,
        };
    }

    let odd_semester = (reference.month(), reference.day()) >= ODD_SEMESTER_START;
    let semester = (year_of_study - 1) * 2 + if odd_semester { 1 } else { 2 };

    AcademicInfo {
        year: year_of_study as u8,
        semester: semester.clamp(1, PROGRAM_SEMESTERS) as u8,
    }
}

/// Academic year containing `reference`, formatted as `YYYY-YY` (e.g. `2024-25`).
pub fn current_academic_year_label(reference: NaiveDate) -> String {
    let start = academic_year_start(reference);
    format!("{}-{:02}", start, (start + 1).rem_euclid(100))
}
