//! An SEIR compartmental epidemic model swept over a set of basic reproduction numbers.
//!
//! The population is split into four compartments tracked as fractions of the total:
//! susceptible (S), exposed (E), infectious (I) and removed (R = 1 - S - E - I). For each value
//! of R0 in the scenario set the model is integrated over a shared time grid, yielding the
//! infectious fraction and the cumulative fraction ever infected (C = 1 - S - E) at every grid
//! point.
//!
//! The pieces fit together as follows:
//! * `parameters` loads and validates the run configuration and derives the time grid,
//!   initial state and scenario set from it.
//! * `transmission` describes R0, either constant or as a function of time.
//! * `model` holds the state vector and the right hand side of the SEIR equations.
//! * `integrator` is an adaptive Dormand-Prince 5(4) solver sampled on the output grid.
//! * `solver` integrates a single scenario into a `Trajectory`.
//! * `sweep` runs every scenario, sequentially or one thread per scenario.
//! * `report` writes the results as CSV.
//!
//! ```rust
//! use seir_sweep::prelude::*;
//!
//! let parameters = Parameters::default();
//! let results = run_sweep(&parameters, SweepOptions::default());
//! let sweep = results.completed().unwrap();
//! assert_eq!(sweep.labels[0], "R0 = 1.60");
//! assert_eq!(sweep.infectious_paths[0].len(), sweep.times.len());
//! ```
pub mod error;
pub mod execution_stats;
pub mod integrator;
pub mod log;
pub mod model;
pub mod numeric;
pub mod parameters;
pub mod prelude;
pub mod progress;
pub mod report;
pub mod runner;
pub mod solver;
pub mod sweep;
pub mod transmission;
