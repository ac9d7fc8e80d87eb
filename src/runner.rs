use std::io::{self, Write};
use std::path::PathBuf;

use clap::{ArgAction, Parser};
use log::{error, info, LevelFilter};

use crate::error::SeirError;
use crate::execution_stats::{
    log_execution_statistics, print_execution_statistics, ExecutionProfilingCollector,
};
use crate::log::{apply_log_level_spec, set_log_level, LogLevelSpec};
use crate::parameters::{load_parameters_from_json, Parameters};
use crate::report::{write_report, ReportKind, ReportOptions};
use crate::sweep::{run_sweep, ExecutionMode, SweepOptions, SweepResults};

/// Command line arguments of the sweep runner
#[derive(Parser, Debug, Default)]
#[command(name = "seir-sweep", version, about)]
pub struct BaseArgs {
    /// Optional path for a JSON parameters file. Absent keys keep their defaults
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Run each scenario on its own thread
    #[arg(long)]
    pub parallel: bool,

    /// Write one summary row per scenario instead of the full trajectories
    #[arg(long)]
    pub summary: bool,

    /// Add columns with absolute counts for the configured population size
    #[arg(long)]
    pub absolute_counts: bool,

    /// Show a scenario progress bar. The bar is drawn on stdout, ahead of the report
    #[arg(long)]
    pub progress: bool,

    /// Print execution statistics to stderr when the sweep finishes
    #[arg(long)]
    pub stats: bool,

    /// Log level filters, e.g. `info` or `info,seir_sweep::integrator=trace`
    #[arg(long)]
    pub log_level: Option<LogLevelSpec>,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl BaseArgs {
    fn verbosity_level(&self) -> Option<LevelFilter> {
        match self.verbose {
            0 => None,
            1 => Some(LevelFilter::Info),
            2 => Some(LevelFilter::Debug),
            _ => Some(LevelFilter::Trace),
        }
    }

    fn report_options(&self, parameters: &Parameters) -> ReportOptions {
        ReportOptions {
            kind: if self.summary {
                ReportKind::Summary
            } else {
                ReportKind::Trajectories
            },
            population_size: self
                .absolute_counts
                .then(|| parameters.population_size()),
        }
    }

    fn sweep_options(&self) -> SweepOptions {
        SweepOptions {
            mode: if self.parallel {
                ExecutionMode::Parallel
            } else {
                ExecutionMode::Sequential
            },
            progress: self.progress,
        }
    }
}

fn configure_logging(args: &BaseArgs) {
    if let Some(level) = args.verbosity_level() {
        set_log_level(level);
    }
    if let Some(spec) = &args.log_level {
        apply_log_level_spec(spec);
    }
}

/// Runs a sweep with already parsed arguments and writes the report to `out`.
///
/// Scenarios that fail are left out of the report; inspect `SweepResults::failures()` for them.
///
/// # Errors
/// Returns an error if the parameters cannot be loaded or the report cannot be written.
pub fn run_with_args<W: Write>(args: &BaseArgs, out: W) -> Result<SweepResults, SeirError> {
    configure_logging(args);

    let parameters = match &args.config {
        Some(path) => load_parameters_from_json(path)?,
        None => {
            info!("No parameters file given, using defaults");
            Parameters::default()
        }
    };

    let mut collector = ExecutionProfilingCollector::new();
    let results = run_sweep(&parameters, args.sweep_options());
    let statistics = collector.compute_final_statistics(results.scenarios.len());

    for (scenario, e) in results.failures() {
        error!("Scenario {} is missing from the report: {}", scenario.label, e);
    }
    write_report(&results.successful(), args.report_options(&parameters), out)?;

    log_execution_statistics(&statistics);
    if args.stats {
        print_execution_statistics(&statistics);
    }
    Ok(results)
}

/// Parses the command line, runs the sweep and writes the report to stdout.
///
/// Returns the number of scenarios that failed.
///
/// # Errors
/// Returns an error if the parameters cannot be loaded or the report cannot be written.
pub fn run() -> Result<usize, SeirError> {
    let args = BaseArgs::parse();
    let results = run_with_args(&args, io::stdout().lock())?;
    let mut failures = 0;
    for (scenario, e) in results.failures() {
        eprintln!("{}: {}", scenario.label, e);
        failures += 1;
    }
    Ok(failures)
}
