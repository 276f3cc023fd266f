use crate::infra::{parse_date, parse_threshold_arg, seed_demo_department, InMemoryStore};
use chrono::{Local, NaiveDate};
use clap::Args;
use gradeflow::academic::{compute_academic_info, current_academic_year_label, CohortService};
use gradeflow::cie::{
    attendance_percentage, AssessmentAggregator, AssessmentCategory, AttendanceEntry,
    AttendanceSession, AttendanceThresholds, CieBreakdown, CieEvaluation, CieService,
    CieServiceError, DepartmentId, MarkEntry, MarkSheetImporter, StudentId,
    TeachingAssignmentId,
};
use gradeflow::config::AppConfig;
use gradeflow::error::AppError;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct ComputeArgs {
    /// Mark sheet CSV export
    #[arg(long)]
    pub(crate) marks: PathBuf,
    /// Department owning the components in the sheet
    #[arg(long, default_value = "default")]
    pub(crate) department: String,
    /// Override how many of the best slip tests are averaged
    #[arg(long)]
    pub(crate) slip_consider: Option<u32>,
    /// Override attendance thresholds as marks5,marks4,marks3 (e.g. 85,75,65)
    #[arg(long, value_parser = parse_threshold_arg)]
    pub(crate) thresholds: Option<AttendanceThresholds>,
}

#[derive(Args, Debug)]
pub(crate) struct BandArgs {
    /// Attendance percentage between 0 and 100
    #[arg(long)]
    pub(crate) percentage: f64,
    /// Override attendance thresholds as marks5,marks4,marks3
    #[arg(long, value_parser = parse_threshold_arg)]
    pub(crate) thresholds: Option<AttendanceThresholds>,
}

#[derive(Args, Debug)]
pub(crate) struct PeriodArgs {
    /// First calendar year of the batch
    #[arg(long)]
    pub(crate) start_year: i32,
    /// Final calendar year of the batch
    #[arg(long)]
    pub(crate) end_year: i32,
    /// Reference date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) date: Option<NaiveDate>,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Reference date for the section period (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = parse_date)]
    pub(crate) date: Option<NaiveDate>,
}

pub(crate) fn run_cie_compute(args: ComputeArgs) -> Result<(), AppError> {
    let ComputeArgs {
        marks,
        department,
        slip_consider,
        thresholds,
    } = args;

    let department_id = DepartmentId::new(department);
    let mut config = AppConfig::load()?.cie_defaults;
    config.department_id = department_id.clone();
    if let Some(consider) = slip_consider {
        config.slip_tests_consider = consider;
        config.slip_tests_count = config.slip_tests_count.max(consider);
    }
    if let Some(thresholds) = thresholds {
        config.attendance_thresholds = thresholds;
    }
    let config = config.validated().map_err(CieServiceError::from)?;

    let sheet = MarkSheetImporter::from_path(&marks, &department_id)?;
    let aggregator = AssessmentAggregator::new(config);

    println!(
        "CIE breakdown for {} ({} components, best {} slip tests)",
        marks.display(),
        sheet.components.len(),
        aggregator.config().slip_tests_consider
    );
    for scope in sheet.scopes() {
        let evaluation = aggregator
            .evaluate(&scope.records, &sheet.components)
            .map_err(CieServiceError::from)?;
        print!("- {} / {}: ", scope.student_id, scope.teaching_assignment_id);
        render_evaluation(&evaluation, aggregator.config().max_cie_marks);
    }

    Ok(())
}

pub(crate) fn run_band(args: BandArgs) -> Result<(), AppError> {
    if !(0.0..=100.0).contains(&args.percentage) {
        return Err(CieServiceError::InvalidPercentage(args.percentage).into());
    }

    let thresholds = args.thresholds.unwrap_or_default();
    println!(
        "{:.2}% attendance -> {} marks (bands {}/{}/{})",
        args.percentage,
        thresholds.band(args.percentage),
        thresholds.marks5,
        thresholds.marks4,
        thresholds.marks3
    );
    Ok(())
}

pub(crate) fn run_period(args: PeriodArgs) -> Result<(), AppError> {
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let info = compute_academic_info(args.start_year, args.end_year, date);

    println!(
        "Batch {}-{} on {}: year {} semester {} (academic year {})",
        args.start_year,
        args.end_year,
        date,
        info.year,
        info.semester,
        current_academic_year_label(date)
    );
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let config = AppConfig::load()?;

    let store = InMemoryStore::default();
    let seed =
        seed_demo_department(&store, &config.cie_defaults).map_err(CieServiceError::from)?;
    let cie = Arc::new(CieService::with_template(
        store.assessments.clone(),
        store.configurations.clone(),
        config.cie_defaults.clone(),
    ));
    let cohorts = CohortService::new(store.cohorts.clone());

    println!("GradeFlow demo");
    println!(
        "- Department {} with {} assessment components",
        seed.department_id,
        seed.components.len()
    );
    let period = cohorts.section_period(&seed.section.id, date)?;
    println!(
        "- Section {} of batch {} is in year {} semester {} ({})",
        seed.section.name, seed.batch.name, period.year, period.semester, period.academic_year
    );

    let plan: [(usize, AssessmentCategory, u32, f64); 9] = [
        (0, AssessmentCategory::Slip, 1, 4.0),
        (0, AssessmentCategory::Slip, 2, 9.0),
        (0, AssessmentCategory::Slip, 3, 7.0),
        (0, AssessmentCategory::Assignment, 1, 8.0),
        (0, AssessmentCategory::Assignment, 2, 6.0),
        (0, AssessmentCategory::Midsem, 1, 20.0),
        (1, AssessmentCategory::Slip, 1, 6.5),
        (1, AssessmentCategory::Assignment, 1, 9.0),
        (1, AssessmentCategory::Midsem, 1, 17.5),
    ];
    for (student, category, sequence, marks) in plan {
        let Some(component_id) = seed.component(category, sequence) else {
            continue;
        };
        cie.record_mark(
            &seed.department_id,
            MarkEntry {
                student_id: seed.students[student].clone(),
                teaching_assignment_id: seed.teaching_assignment_id.clone(),
                component_id: component_id.clone(),
                marks,
            },
        )?;
    }

    let sessions = demo_sessions(&seed.teaching_assignment_id, date, &seed.students);
    println!("\nAttendance over {} sessions", sessions.len());
    for student_id in &seed.students[..2] {
        let Some(percentage) = attendance_percentage(&sessions, student_id) else {
            continue;
        };
        let evaluation = cie.record_attendance(
            &seed.department_id,
            AttendanceEntry {
                student_id: student_id.clone(),
                teaching_assignment_id: seed.teaching_assignment_id.clone(),
                percentage,
            },
        )?;
        println!(
            "- {}: {:.1}% -> {} marks",
            student_id,
            percentage,
            evaluation
                .breakdown
                .map(|breakdown| breakdown.attendance_marks)
                .unwrap_or_default()
        );
    }

    println!("\nStudent CIE");
    for student_id in &seed.students {
        let evaluation =
            cie.student_cie(&seed.department_id, student_id, &seed.teaching_assignment_id)?;
        print!("- {}: ", student_id);
        render_evaluation(&evaluation, seed.configuration.max_cie_marks);
    }

    let snapshots = cie.recalculate_assignment(
        &seed.department_id,
        &seed.teaching_assignment_id,
        chrono::Utc::now(),
    )?;
    println!(
        "\nRecalculated {} cached scores for {}",
        snapshots.len(),
        seed.teaching_assignment_id
    );
    match serde_json::to_string_pretty(&snapshots) {
        Ok(json) => println!("{}", json),
        Err(err) => println!("  Snapshot payload unavailable: {}", err),
    }

    Ok(())
}

fn render_evaluation(evaluation: &CieEvaluation, max_cie_marks: f64) {
    match evaluation.breakdown {
        None => println!("no marks recorded"),
        Some(breakdown) => {
            println!("{}", describe_breakdown(&breakdown, max_cie_marks));
            if !evaluation.excluded.is_empty() {
                println!(
                    "  {} record(s) skipped for unknown components",
                    evaluation.excluded.len()
                );
            }
            if evaluation.duplicate_attendance > 0 {
                println!(
                    "  {} older attendance record(s) ignored",
                    evaluation.duplicate_attendance
                );
            }
        }
    }
}

fn describe_breakdown(breakdown: &CieBreakdown, max_cie_marks: f64) -> String {
    let mut line = format!(
        "slip {:.2} + assignment {:.2} + midsem {:.2} + attendance {:.0} = {:.2} / {}",
        breakdown.slip_score,
        breakdown.assignment_score,
        breakdown.midsem_score,
        breakdown.attendance_marks,
        breakdown.total_cie,
        max_cie_marks
    );
    if breakdown.exceeds(max_cie_marks) {
        line.push_str(" (above maximum)");
    }
    line
}

/// Ten sessions two days apart, ending on `end`. Student n misses every (4 - n)-th class;
/// from the fourth student on, every class.
fn demo_sessions(
    teaching_assignment_id: &TeachingAssignmentId,
    end: NaiveDate,
    students: &[StudentId],
) -> Vec<AttendanceSession> {
    (0..10u32)
        .filter_map(|offset| {
            let date = end.checked_sub_signed(chrono::Duration::days(i64::from(offset) * 2))?;
            let present_student_ids = students
                .iter()
                .enumerate()
                .filter(|(index, _)| {
                    (offset + 1) % 4u32.saturating_sub(*index as u32).max(1) != 0
                })
                .map(|(_, student)| student.clone())
                .collect();
            Some(AttendanceSession {
                teaching_assignment_id: teaching_assignment_id.clone(),
                date,
                present_student_ids,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breakdown_line_flags_totals_above_maximum() {
        let line = describe_breakdown(&CieBreakdown::new(10.0, 10.0, 25.0, 5.0), 40.0);
        assert!(line.contains("= 50.00 / 40"));
        assert!(line.ends_with("(above maximum)"));
    }

    #[test]
    fn demo_sessions_give_students_different_attendance() {
        let students = vec![StudentId::new("a"), StudentId::new("b")];
        let end = NaiveDate::from_ymd_opt(2025, 10, 31).expect("valid date");
        let sessions = demo_sessions(&TeachingAssignmentId::new("ta"), end, &students);

        assert_eq!(sessions.len(), 10);
        let first = attendance_percentage(&sessions, &students[0]).expect("sessions exist");
        let second = attendance_percentage(&sessions, &students[1]).expect("sessions exist");
        assert_eq!(first, 80.0);
        assert!((second - 70.0).abs() < 1e-9);
    }

    #[test]
    fn demo_sessions_handle_more_students_than_patterns() {
        let students: Vec<StudentId> = (0..6)
            .map(|index| StudentId::new(format!("s-{index}")))
            .collect();
        let end = NaiveDate::from_ymd_opt(2025, 10, 31).expect("valid date");
        let sessions = demo_sessions(&TeachingAssignmentId::new("ta"), end, &students);

        assert_eq!(sessions.len(), 10);
        assert_eq!(attendance_percentage(&sessions, &students[2]), Some(50.0));
        assert_eq!(attendance_percentage(&sessions, &students[5]), Some(0.0));
    }

    #[test]
    fn band_rejects_out_of_range_percentage() {
        let result = run_band(BandArgs {
            percentage: 101.0,
            thresholds: None,
        });
        assert!(matches!(
            result,
            Err(AppError::Cie(CieServiceError::InvalidPercentage(_)))
        ));
    }
}
