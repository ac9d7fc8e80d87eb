//! Integrates one transmission scenario over the shared time grid.

use log::debug;

use crate::error::SeirError;
use crate::integrator::{integrate, Tolerances};
use crate::model::{SeirModel, StateVector};
use crate::transmission::ReproductionNumber;

/// The sampled paths of one scenario, aligned index-for-index with the time grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub susceptible: Vec<f64>,
    pub exposed: Vec<f64>,
    pub infectious: Vec<f64>,
    /// `1 - S - E` at every sample: everyone currently infectious or already recovered.
    pub cumulative: Vec<f64>,
}

impl Trajectory {
    fn from_states(states: &[StateVector]) -> Self {
        let susceptible: Vec<f64> = states.iter().map(|x| x.susceptible).collect();
        let exposed: Vec<f64> = states.iter().map(|x| x.exposed).collect();
        let infectious: Vec<f64> = states.iter().map(|x| x.infectious).collect();
        let cumulative = susceptible
            .iter()
            .zip(&exposed)
            .map(|(s, e)| 1.0 - s - e)
            .collect();
        Self {
            susceptible,
            exposed,
            infectious,
            cumulative,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.infectious.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.infectious.is_empty()
    }

    /// Index and value of the largest infectious fraction.
    #[must_use]
    pub fn peak(&self) -> Option<(usize, f64)> {
        peak_of(&self.infectious)
    }

    #[must_use]
    pub fn final_cumulative(&self) -> Option<f64> {
        self.cumulative.last().copied()
    }
}

/// Index and value of the largest entry of `path`, `None` if it is empty.
#[must_use]
pub fn peak_of(path: &[f64]) -> Option<(usize, f64)> {
    path.iter()
        .copied()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
}

/// Integrates `model` under `r0` from `initial`, sampling at every entry of `times`.
///
/// Uses the integrator's default tolerances. Every sample is checked against the compartment
/// invariants.
///
/// # Errors
///
/// - `SeirError::InvalidConfig` for an unusable time grid or initial state.
/// - `SeirError::IntegrationFailure` if the integrator does not converge.
/// - `SeirError::InvariantViolation` if a sample leaves the unit simplex.
pub fn solve_path<R>(
    model: &SeirModel,
    r0: &R,
    times: &[f64],
    initial: StateVector,
) -> Result<Trajectory, SeirError>
where
    R: ReproductionNumber + ?Sized,
{
    if times.len() < 2 {
        return Err(SeirError::InvalidConfig(format!(
            "the time grid needs at least 2 points, got {}",
            times.len()
        )));
    }
    initial.check_invariants(times[0]).map_err(|error| {
        SeirError::InvalidConfig(format!("initial state is not a valid state: {error}"))
    })?;

    let rhs = |y: &[f64; 3], t: f64| {
        model
            .derivative(&StateVector::from_array(*y), t, r0)
            .to_array()
    };
    let solution = integrate(rhs, initial.to_array(), times, &Tolerances::default())?;
    debug!(
        "integrated {} samples: {} accepted steps, {} rejected steps, {} derivative evaluations",
        times.len(),
        solution.stats.accepted_steps,
        solution.stats.rejected_steps,
        solution.stats.rhs_evaluations
    );

    let states: Vec<StateVector> = solution
        .samples
        .into_iter()
        .map(StateVector::from_array)
        .collect();
    for (state, &t) in states.iter().zip(times) {
        state.check_invariants(t)?;
    }

    Ok(Trajectory::from_states(&states))
}
