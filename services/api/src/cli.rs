use crate::demo::{
    run_band, run_cie_compute, run_demo, run_period, BandArgs, ComputeArgs, DemoArgs, PeriodArgs,
};
use crate::server;
use clap::{Args, Parser, Subcommand};
use gradeflow::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "GradeFlow",
    about = "Compute continuous internal evaluation scores and academic periods",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score mark sheets and band attendance without starting the server
    Cie {
        #[command(subcommand)]
        command: CieCommand,
    },
    /// Print the year of study and semester of a batch on a date
    Period(PeriodArgs),
    /// Seed an in-memory department and walk through mark entry and recalculation
    Demo(DemoArgs),
}

#[derive(Subcommand, Debug)]
enum CieCommand {
    /// Compute CIE breakdowns for every student in a mark sheet CSV
    Compute(ComputeArgs),
    /// Convert an attendance percentage into attendance marks
    Band(BandArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Cie {
            command: CieCommand::Compute(args),
        } => run_cie_compute(args),
        Command::Cie {
            command: CieCommand::Band(args),
        } => run_band(args),
        Command::Period(args) => run_period(args),
        Command::Demo(args) => run_demo(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn compute_accepts_threshold_override() {
        let cli = Cli::try_parse_from([
            "gradeflow",
            "cie",
            "compute",
            "--marks",
            "marks.csv",
            "--slip-consider",
            "3",
            "--thresholds",
            "90,80,70",
        ])
        .expect("arguments parse");

        match cli.command {
            Some(Command::Cie {
                command: CieCommand::Compute(args),
            }) => {
                assert_eq!(args.slip_consider, Some(3));
                assert_eq!(args.thresholds.map(|t| t.marks5), Some(90.0));
            }
            other => panic!("expected compute command, got {other:?}"),
        }
    }

    #[test]
    fn period_rejects_malformed_date() {
        assert!(Cli::try_parse_from([
            "gradeflow",
            "period",
            "--start-year",
            "2022",
            "--end-year",
            "2026",
            "--date",
            "15/07/2024",
        ])
        .is_err());
    }
}
