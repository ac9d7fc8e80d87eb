//! The SEIR dynamics on population fractions.
//!
//! Only S, E and I are integrated; the recovered/removed fraction is implied by
//! `R = 1 - S - E - I`.

use crate::error::SeirError;
use crate::numeric::{is_fraction, COMPARTMENT_TOLERANCE};
use crate::transmission::ReproductionNumber;

/// Fractions of the population in the Susceptible, Exposed and Infectious compartments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVector {
    pub susceptible: f64,
    pub exposed: f64,
    pub infectious: f64,
}

impl StateVector {
    #[must_use]
    pub fn new(susceptible: f64, exposed: f64, infectious: f64) -> Self {
        Self {
            susceptible,
            exposed,
            infectious,
        }
    }

    /// Seeds a near-fully-susceptible population with `infectious` infectious and
    /// `exposed_ratio * infectious` exposed.
    #[must_use]
    pub fn seeded(infectious: f64, exposed_ratio: f64) -> Self {
        let exposed = exposed_ratio * infectious;
        Self::new(1.0 - infectious - exposed, exposed, infectious)
    }

    /// The recovered/removed remainder.
    #[must_use]
    pub fn recovered(&self) -> f64 {
        1.0 - self.susceptible - self.exposed - self.infectious
    }

    /// The fraction that has ever left S+E, i.e. currently infectious or recovered.
    #[must_use]
    pub fn cumulative(&self) -> f64 {
        1.0 - self.susceptible - self.exposed
    }

    #[must_use]
    pub fn to_array(self) -> [f64; 3] {
        [self.susceptible, self.exposed, self.infectious]
    }

    #[must_use]
    pub fn from_array([susceptible, exposed, infectious]: [f64; 3]) -> Self {
        Self::new(susceptible, exposed, infectious)
    }

    /// Checks that every compartment lies in `[0, 1]` and that `S + E + I <= 1`, each up to
    /// `COMPARTMENT_TOLERANCE`.
    ///
    /// # Errors
    ///
    /// Returns `SeirError::InvariantViolation` naming the offending compartment.
    pub fn check_invariants(&self, time: f64) -> Result<(), SeirError> {
        let compartments = [
            ("susceptible", self.susceptible),
            ("exposed", self.exposed),
            ("infectious", self.infectious),
        ];
        for (name, value) in compartments {
            if !is_fraction(value, COMPARTMENT_TOLERANCE) {
                return Err(SeirError::InvariantViolation {
                    time,
                    message: format!("{name} fraction {value} is outside [0, 1]"),
                });
            }
        }
        let total = self.susceptible + self.exposed + self.infectious;
        if total > 1.0 + COMPARTMENT_TOLERANCE {
            return Err(SeirError::InvariantViolation {
                time,
                message: format!("S + E + I = {total} exceeds 1"),
            });
        }
        Ok(())
    }
}

/// Rates of the SEIR system. Both rates are per unit of time (days).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeirModel {
    /// gamma, the inverse of the mean infectious period.
    pub recovery_rate: f64,
    /// sigma, the inverse of the mean latent period.
    pub incubation_rate: f64,
}

impl SeirModel {
    #[must_use]
    pub fn new(recovery_rate: f64, incubation_rate: f64) -> Self {
        Self {
            recovery_rate,
            incubation_rate,
        }
    }

    /// Instantaneous rate of change of `state` at time `t` under reproduction number `r0`.
    ///
    /// New exposures follow mass-action mixing, `beta(t) * S * I`. The function is pure and may
    /// be evaluated at any `t`, not just grid points.
    #[must_use]
    pub fn derivative<R>(&self, state: &StateVector, t: f64, r0: &R) -> StateVector
    where
        R: ReproductionNumber + ?Sized,
    {
        let beta = r0.beta(t, self.recovery_rate);
        let new_exposures = beta * state.susceptible * state.infectious;
        let progressions = self.incubation_rate * state.exposed;
        let recoveries = self.recovery_rate * state.infectious;

        StateVector {
            susceptible: -new_exposures,
            exposed: new_exposures - progressions,
            infectious: progressions - recoveries,
        }
    }
}
