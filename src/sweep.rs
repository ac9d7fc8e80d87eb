//! Runs the path solver once per reproduction number in the scenario set.
//!
//! Scenarios share nothing but the immutable `Parameters`, so they can run on separate threads.
//! Results always come back in scenario order, and a failing scenario does not prevent the
//! others from completing.

use std::thread;

use log::{debug, error, info};

use crate::error::SeirError;
use crate::parameters::{Intervention, Parameters};
use crate::progress::{increment_scenario_progress, init_scenario_progress_bar};
use crate::solver::{solve_path, Trajectory};
use crate::transmission::{ConstantR0, ReproductionNumber, StepR0};

/// One entry of the sweep: a reproduction number, an optional intervention scaling it, and the
/// display label.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    /// R0 at the start of the epidemic.
    pub r0: f64,
    pub label: String,
    pub intervention: Option<Intervention>,
}

impl Scenario {
    #[must_use]
    pub fn new(r0: f64) -> Self {
        Self {
            r0,
            label: format!("R0 = {r0:.2}"),
            intervention: None,
        }
    }

    #[must_use]
    pub fn with_intervention(r0: f64, intervention: Intervention) -> Self {
        Self {
            intervention: Some(intervention),
            ..Self::new(r0)
        }
    }

    /// The schedule integrated for this scenario.
    #[must_use]
    pub fn reproduction_number(&self) -> Box<dyn ReproductionNumber> {
        match self.intervention {
            Some(Intervention { change_time, scale }) => {
                Box::new(StepR0::new(self.r0, self.r0 * scale, change_time))
            }
            None => Box::new(ConstantR0(self.r0)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    #[default]
    Sequential,
    /// One thread per scenario.
    Parallel,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SweepOptions {
    pub mode: ExecutionMode,
    /// Show a progress bar that advances as scenarios complete.
    pub progress: bool,
}

#[derive(Debug)]
pub struct ScenarioResult {
    pub scenario: Scenario,
    pub outcome: Result<Trajectory, SeirError>,
}

/// Every scenario's outcome, in scenario order, plus the shared time grid.
#[derive(Debug)]
pub struct SweepResults {
    pub times: Vec<f64>,
    pub scenarios: Vec<ScenarioResult>,
}

/// A sweep in which every scenario succeeded, laid out as parallel sequences indexed by
/// scenario position.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedSweep {
    pub times: Vec<f64>,
    pub labels: Vec<String>,
    pub r0_values: Vec<f64>,
    pub infectious_paths: Vec<Vec<f64>>,
    pub cumulative_paths: Vec<Vec<f64>>,
}

impl SweepResults {
    /// Scenarios whose integration failed.
    pub fn failures(&self) -> impl Iterator<Item = (&Scenario, &SeirError)> {
        self.scenarios
            .iter()
            .filter_map(|result| match &result.outcome {
                Ok(_) => None,
                Err(error) => Some((&result.scenario, error)),
            })
    }

    /// Scenarios that produced a trajectory, in order.
    pub fn successes(&self) -> impl Iterator<Item = (&Scenario, &Trajectory)> {
        self.scenarios
            .iter()
            .filter_map(|result| match &result.outcome {
                Ok(trajectory) => Some((&result.scenario, trajectory)),
                Err(_) => None,
            })
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Collapses the results into parallel path collections.
    ///
    /// # Errors
    ///
    /// Returns `SeirError::ScenarioFailed` for the first scenario that failed.
    pub fn completed(self) -> Result<CompletedSweep, SeirError> {
        let mut completed = CompletedSweep {
            times: self.times,
            labels: Vec::with_capacity(self.scenarios.len()),
            r0_values: Vec::with_capacity(self.scenarios.len()),
            infectious_paths: Vec::with_capacity(self.scenarios.len()),
            cumulative_paths: Vec::with_capacity(self.scenarios.len()),
        };
        for ScenarioResult { scenario, outcome } in self.scenarios {
            let trajectory = outcome.map_err(|source| SeirError::ScenarioFailed {
                label: scenario.label.clone(),
                source: Box::new(source),
            })?;
            completed.labels.push(scenario.label);
            completed.r0_values.push(scenario.r0);
            completed.infectious_paths.push(trajectory.infectious);
            completed.cumulative_paths.push(trajectory.cumulative);
        }
        Ok(completed)
    }

    /// The scenarios that succeeded, laid out like `completed()`. Failed scenarios are skipped.
    #[must_use]
    pub fn successful(&self) -> CompletedSweep {
        let mut completed = CompletedSweep {
            times: self.times.clone(),
            labels: Vec::new(),
            r0_values: Vec::new(),
            infectious_paths: Vec::new(),
            cumulative_paths: Vec::new(),
        };
        for (scenario, trajectory) in self.successes() {
            completed.labels.push(scenario.label.clone());
            completed.r0_values.push(scenario.r0);
            completed.infectious_paths.push(trajectory.infectious.clone());
            completed.cumulative_paths.push(trajectory.cumulative.clone());
        }
        completed
    }
}

fn run_scenario(parameters: &Parameters, times: &[f64], scenario: &Scenario) -> ScenarioResult {
    debug!("Running scenario {}", scenario.label);
    let outcome = solve_path(
        &parameters.model(),
        scenario.reproduction_number().as_ref(),
        times,
        parameters.initial_state(),
    );
    if let Err(e) = &outcome {
        error!("Scenario {} failed: {}", scenario.label, e);
    }
    ScenarioResult {
        scenario: scenario.clone(),
        outcome,
    }
}

/// Runs `run` on one scoped thread per scenario and joins them in scenario order. A worker that
/// panics becomes an error for its scenario.
fn run_parallel<F>(scenarios: &[Scenario], run: &F) -> Vec<ScenarioResult>
where
    F: Fn(&Scenario) -> ScenarioResult + Sync,
{
    thread::scope(|scope| {
        let handles: Vec<_> = scenarios
            .iter()
            .map(|scenario| (scenario, scope.spawn(move || run(scenario))))
            .collect();
        handles
            .into_iter()
            .map(|(scenario, handle)| {
                handle.join().unwrap_or_else(|_| ScenarioResult {
                    scenario: scenario.clone(),
                    outcome: Err(SeirError::SeirError(format!(
                        "worker thread for {} panicked",
                        scenario.label
                    ))),
                })
            })
            .collect()
    })
}

/// Runs every scenario of `parameters` over its time grid.
#[must_use]
pub fn run_sweep(parameters: &Parameters, options: SweepOptions) -> SweepResults {
    let times = parameters.time_grid();
    let scenarios = parameters.scenario_set();
    info!(
        "Running {} scenarios over {} time points ({:?})",
        scenarios.len(),
        times.len(),
        options.mode
    );
    if options.progress {
        init_scenario_progress_bar(scenarios.len());
    }

    let run = |scenario: &Scenario| {
        let result = run_scenario(parameters, &times, scenario);
        if options.progress {
            increment_scenario_progress();
        }
        result
    };

    let results = match options.mode {
        ExecutionMode::Sequential => scenarios.iter().map(&run).collect(),
        ExecutionMode::Parallel => run_parallel(&scenarios, &run),
    };

    SweepResults {
        times,
        scenarios: results,
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::parameters::ParametersValues;

    fn parameters_with(r0_values: Vec<f64>) -> Parameters {
        Parameters::new(ParametersValues {
            r0_values: Some(r0_values),
            ..ParametersValues::default()
        })
        .unwrap()
    }

    #[test]
    fn labels_use_two_decimals() {
        assert_eq!(Scenario::new(1.6).label, "R0 = 1.60");
        assert_eq!(Scenario::new(2.08).label, "R0 = 2.08");
        assert_eq!(Scenario::new(3.0).label, "R0 = 3.00");
    }

    #[test]
    fn default_sweep_is_ordered_and_complete() {
        let results = run_sweep(&Parameters::default(), SweepOptions::default());
        assert!(results.is_complete());
        let completed = results.completed().unwrap();
        assert_eq!(
            completed.labels,
            vec![
                "R0 = 1.60",
                "R0 = 1.88",
                "R0 = 2.16",
                "R0 = 2.44",
                "R0 = 2.72",
                "R0 = 3.00"
            ]
        );
        assert_eq!(completed.infectious_paths.len(), 6);
        assert_eq!(completed.cumulative_paths.len(), 6);
        assert_eq!(completed.times.len(), 1000);
        for path in completed
            .infectious_paths
            .iter()
            .chain(&completed.cumulative_paths)
        {
            assert_eq!(path.len(), completed.times.len());
        }
    }

    #[test]
    fn higher_r0_means_higher_peak_and_final_size() {
        let parameters = parameters_with(vec![1.6, 2.08, 2.56, 3.0]);
        let completed = run_sweep(&parameters, SweepOptions::default())
            .completed()
            .unwrap();
        let peaks: Vec<f64> = completed
            .infectious_paths
            .iter()
            .map(|path| path.iter().copied().fold(f64::MIN, f64::max))
            .collect();
        let finals: Vec<f64> = completed
            .cumulative_paths
            .iter()
            .map(|path| *path.last().unwrap())
            .collect();
        for pair in peaks.windows(2) {
            assert!(pair[1] > pair[0], "peaks not increasing: {peaks:?}");
        }
        for pair in finals.windows(2) {
            assert!(pair[1] > pair[0], "final sizes not increasing: {finals:?}");
        }
    }

    #[test]
    fn parallel_matches_sequential() {
        let parameters = Parameters::default();
        let sequential = run_sweep(&parameters, SweepOptions::default())
            .completed()
            .unwrap();
        let parallel = run_sweep(
            &parameters,
            SweepOptions {
                mode: ExecutionMode::Parallel,
                progress: false,
            },
        )
        .completed()
        .unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn scenarios_are_independent_of_their_neighbours() {
        let alone = run_sweep(&parameters_with(vec![2.5]), SweepOptions::default())
            .completed()
            .unwrap();
        let parameters = parameters_with(vec![1.7, 2.5, 2.9]);
        let among_others = run_sweep(&parameters, SweepOptions::default())
            .completed()
            .unwrap();
        assert_eq!(alone.infectious_paths[0], among_others.infectious_paths[1]);
        assert_eq!(alone.cumulative_paths[0], among_others.cumulative_paths[1]);
    }

    #[test]
    fn failed_scenario_is_isolated() {
        let failing = ScenarioResult {
            scenario: Scenario::new(9.0),
            outcome: Err(SeirError::IntegrationFailure {
                time: 1.0,
                message: "step size underflow".to_string(),
            }),
        };
        let mut results = run_sweep(&parameters_with(vec![1.6, 2.0]), SweepOptions::default());
        results.scenarios.insert(1, failing);

        assert!(!results.is_complete());
        assert_eq!(results.successes().count(), 2);
        let failures: Vec<_> = results.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0.label, "R0 = 9.00");

        let successful = results.successful();
        assert_eq!(successful.labels, vec!["R0 = 1.60", "R0 = 2.00"]);
        assert_eq!(successful.infectious_paths.len(), 2);

        match results.completed() {
            Err(SeirError::ScenarioFailed { label, source }) => {
                assert_eq!(label, "R0 = 9.00");
                assert!(matches!(*source, SeirError::IntegrationFailure { .. }));
            }
            other => panic!("expected a scenario failure, got {other:?}"),
        }
    }

    #[test]
    fn failing_scenario_does_not_stop_the_sweep() {
        let parameters = parameters_with(vec![2.0, 1e9]);
        for mode in [ExecutionMode::Sequential, ExecutionMode::Parallel] {
            let results = run_sweep(
                &parameters,
                SweepOptions {
                    mode,
                    progress: false,
                },
            );
            assert_eq!(results.scenarios.len(), 2);
            assert!(results.scenarios[0].outcome.is_ok());
            assert!(
                matches!(
                    results.scenarios[1].outcome,
                    Err(SeirError::IntegrationFailure { .. })
                ),
                "unexpected outcome {:?}",
                results.scenarios[1].outcome
            );
            let successful = results.successful();
            assert_eq!(successful.labels, vec!["R0 = 2.00"]);
            assert_eq!(successful.infectious_paths[0].len(), 1000);
            assert!(matches!(
                results.completed(),
                Err(SeirError::ScenarioFailed { .. })
            ));
        }
    }

    #[test]
    fn panicking_worker_becomes_scenario_error() {
        let scenarios = vec![Scenario::new(1.5), Scenario::new(2.5), Scenario::new(3.5)];
        let run = |scenario: &Scenario| {
            assert!(scenario.r0 < 3.0, "worker gave up on {}", scenario.label);
            ScenarioResult {
                scenario: scenario.clone(),
                outcome: Err(SeirError::from("not integrated")),
            }
        };
        let results = run_parallel(&scenarios, &run);
        let labels: Vec<&str> = results.iter().map(|r| r.scenario.label.as_str()).collect();
        assert_eq!(labels, vec!["R0 = 1.50", "R0 = 2.50", "R0 = 3.50"]);
        match &results[2].outcome {
            Err(SeirError::SeirError(message)) => {
                assert_eq!(message, "worker thread for R0 = 3.50 panicked");
            }
            other => panic!("expected a panic to be reported, got {other:?}"),
        }
        assert!(matches!(
            &results[0].outcome,
            Err(SeirError::SeirError(message)) if message == "not integrated"
        ));
    }

    #[test]
    fn scenario_schedule_follows_intervention() {
        let plain = Scenario::new(2.5);
        let schedule = plain.reproduction_number();
        assert_eq!(schedule.evaluate(0.0), 2.5);
        assert_eq!(schedule.evaluate(400.0), 2.5);

        let intervention = Intervention {
            change_time: 60.0,
            scale: 0.4,
        };
        let stepped = Scenario::with_intervention(2.5, intervention);
        assert_eq!(stepped.label, plain.label);
        let schedule = stepped.reproduction_number();
        assert_eq!(schedule.evaluate(59.9), 2.5);
        assert_eq!(schedule.evaluate(60.0), 1.0);
        assert_eq!(
            schedule.evaluate(100.0),
            StepR0::new(2.5, 1.0, 60.0).evaluate(100.0)
        );
        assert_eq!(
            Scenario::new(1.7).reproduction_number().evaluate(5.0),
            ConstantR0(1.7).evaluate(5.0)
        );
    }

    #[test]
    fn intervention_reduces_epidemic() {
        let with_intervention = |change_time: f64| {
            Parameters::new(ParametersValues {
                r0_values: Some(vec![2.0, 3.0]),
                intervention: Some(Intervention {
                    change_time,
                    scale: 0.4,
                }),
                ..ParametersValues::default()
            })
            .unwrap()
        };
        let baseline = run_sweep(&parameters_with(vec![2.0, 3.0]), SweepOptions::default())
            .completed()
            .unwrap();
        let mitigated = run_sweep(&with_intervention(60.0), SweepOptions::default())
            .completed()
            .unwrap();
        assert_eq!(mitigated.labels, baseline.labels);
        for index in 0..2 {
            let base_final = *baseline.cumulative_paths[index].last().unwrap();
            let mitigated_final = *mitigated.cumulative_paths[index].last().unwrap();
            assert!(
                mitigated_final < base_final / 2.0,
                "intervention barely changed final size: {mitigated_final} vs {base_final}"
            );
        }

        // A change after the horizon never takes effect.
        let late = run_sweep(&with_intervention(1000.0), SweepOptions::default())
            .completed()
            .unwrap();
        assert_eq!(late, baseline);
    }
}
