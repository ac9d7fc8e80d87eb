//! Run configuration.
//!
//! `ParametersValues` is the raw, deserializable form (every field has a default reproducing the
//! reference US scenario). `Parameters` is the validated, immutable configuration handed to the
//! path solver and scenario sweep; it is scoped to one simulation run.

use std::fs;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::SeirError;
use crate::model::{SeirModel, StateVector};
use crate::sweep::Scenario;

/// An inclusive, evenly spaced range of reproduction numbers.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct R0Range {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

impl Default for R0Range {
    fn default() -> Self {
        Self {
            start: 1.6,
            end: 3.0,
            count: 6,
        }
    }
}

/// A single change in transmission shared by every scenario: from `change_time` on, each
/// scenario's R0 is multiplied by `scale`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Intervention {
    pub change_time: f64,
    pub scale: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ParametersValues {
    /// Only used to convert fractions to absolute counts when reporting.
    pub population_size: f64,
    /// gamma
    pub recovery_rate: f64,
    /// sigma
    pub incubation_rate: f64,
    pub initial_infectious_fraction: f64,
    /// E(0) = exposed_to_infectious_ratio * I(0)
    pub exposed_to_infectious_ratio: f64,
    /// Total simulated time in days.
    pub horizon: f64,
    /// Number of samples in the time grid, endpoints included.
    pub grid_resolution: usize,
    /// Explicit sweep values. Takes precedence over `r0_range` when present.
    pub r0_values: Option<Vec<f64>>,
    pub r0_range: R0Range,
    /// Turns every scenario into a step schedule when present.
    pub intervention: Option<Intervention>,
}

impl Default for ParametersValues {
    fn default() -> Self {
        Self {
            population_size: 3.3e8,
            recovery_rate: 1.0 / 18.0,
            incubation_rate: 1.0 / 5.2,
            initial_infectious_fraction: 1e-7,
            exposed_to_infectious_ratio: 4.0,
            horizon: 550.0,
            grid_resolution: 1000,
            r0_values: None,
            r0_range: R0Range::default(),
            intervention: None,
        }
    }
}

fn require(condition: bool, message: impl FnOnce() -> String) -> Result<(), SeirError> {
    if condition {
        Ok(())
    } else {
        Err(SeirError::InvalidConfig(message()))
    }
}

fn require_positive(name: &str, value: f64) -> Result<(), SeirError> {
    require(value.is_finite() && value > 0.0, || {
        format!("{name} must be positive and finite, got {value}")
    })
}

impl ParametersValues {
    /// The reproduction numbers of the sweep, in order.
    #[must_use]
    pub fn r0_sweep(&self) -> Vec<f64> {
        match &self.r0_values {
            Some(values) => values.clone(),
            None => linspace(self.r0_range.start, self.r0_range.end, self.r0_range.count),
        }
    }

    /// Checks every value before any integration runs.
    ///
    /// # Errors
    ///
    /// Returns `SeirError::InvalidConfig` describing the first invalid value.
    pub fn validate(&self) -> Result<(), SeirError> {
        require_positive("population_size", self.population_size)?;
        require_positive("recovery_rate", self.recovery_rate)?;
        require_positive("incubation_rate", self.incubation_rate)?;
        require_positive("horizon", self.horizon)?;

        let seed = self.initial_infectious_fraction;
        require(seed.is_finite() && seed > 0.0 && seed < 1.0, || {
            format!("initial_infectious_fraction must be in (0, 1), got {seed}")
        })?;
        let ratio = self.exposed_to_infectious_ratio;
        require(ratio.is_finite() && ratio >= 0.0, || {
            format!("exposed_to_infectious_ratio must be non-negative, got {ratio}")
        })?;
        let initial = StateVector::seeded(seed, ratio);
        require(initial.susceptible >= 0.0, || {
            format!(
                "initial exposed and infectious fractions sum to {}, leaving no susceptibles",
                seed + initial.exposed
            )
        })?;

        require(self.grid_resolution >= 2, || {
            format!(
                "grid_resolution must be at least 2, got {}",
                self.grid_resolution
            )
        })?;

        let sweep = self.r0_sweep();
        require(!sweep.is_empty(), || "the scenario set is empty".to_string())?;
        if let Some(bad) = sweep.iter().find(|r0| !r0.is_finite() || **r0 < 0.0) {
            return Err(SeirError::InvalidConfig(format!(
                "R0 values must be finite and non-negative, got {bad}"
            )));
        }
        if let Some(Intervention { change_time, scale }) = self.intervention {
            require(change_time.is_finite() && change_time >= 0.0, || {
                format!(
                    "intervention change_time must be finite and non-negative, got {change_time}"
                )
            })?;
            require(scale.is_finite() && scale >= 0.0, || {
                format!("intervention scale must be finite and non-negative, got {scale}")
            })?;
        }
        Ok(())
    }
}

/// Reads `ParametersValues` from a JSON file. Absent keys take their default values.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or if the values do not validate.
pub fn load_parameters_from_json(file_path: &Path) -> Result<Parameters, SeirError> {
    info!("Loading parameters from: {}", file_path.display());
    let contents = fs::read_to_string(file_path)?;
    let values: ParametersValues = serde_json::from_str(&contents)?;
    Parameters::new(values)
}

/// Validated configuration for one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    values: ParametersValues,
}

impl Parameters {
    /// # Errors
    ///
    /// Returns `SeirError::InvalidConfig` if `values` fails validation.
    pub fn new(values: ParametersValues) -> Result<Self, SeirError> {
        values.validate()?;
        debug!("Parameters: {values:?}");
        Ok(Self { values })
    }

    #[must_use]
    pub fn values(&self) -> &ParametersValues {
        &self.values
    }

    #[must_use]
    pub fn population_size(&self) -> f64 {
        self.values.population_size
    }

    #[must_use]
    pub fn model(&self) -> SeirModel {
        SeirModel::new(self.values.recovery_rate, self.values.incubation_rate)
    }

    #[must_use]
    pub fn initial_state(&self) -> StateVector {
        StateVector::seeded(
            self.values.initial_infectious_fraction,
            self.values.exposed_to_infectious_ratio,
        )
    }

    /// `grid_resolution` evenly spaced times over `[0, horizon]`.
    #[must_use]
    pub fn time_grid(&self) -> Vec<f64> {
        linspace(0.0, self.values.horizon, self.values.grid_resolution)
    }

    #[must_use]
    pub fn scenario_set(&self) -> Vec<Scenario> {
        self.values
            .r0_sweep()
            .into_iter()
            .map(|r0| match self.values.intervention {
                Some(intervention) => Scenario::with_intervention(r0, intervention),
                None => Scenario::new(r0),
            })
            .collect()
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive. The endpoints are exact.
#[must_use]
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            #[allow(clippy::cast_precision_loss)]
            let step = (end - start) / (n - 1) as f64;
            #[allow(clippy::cast_precision_loss)]
            let mut values: Vec<f64> = (0..n).map(|k| start + step * k as f64).collect();
            values[n - 1] = end;
            values
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;
    use crate::assert_almost_eq;

    #[test]
    fn defaults_reproduce_reference_run() {
        let parameters = Parameters::default();
        let grid = parameters.time_grid();
        assert_eq!(grid.len(), 1000);
        assert_eq!(grid[0], 0.0);
        assert_eq!(grid[999], 550.0);

        let r0s: Vec<f64> = parameters.scenario_set().iter().map(|s| s.r0).collect();
        let expected = [1.6, 1.88, 2.16, 2.44, 2.72, 3.0];
        assert_eq!(r0s.len(), expected.len());
        for (r0, e) in r0s.iter().zip(expected) {
            assert_almost_eq!(*r0, e, 1e-12);
        }

        let initial = parameters.initial_state();
        assert_eq!(initial.infectious, 1e-7);
        assert_almost_eq!(initial.exposed, 4e-7, 1e-20);
        assert!(Parameters::new(ParametersValues::default()).is_ok());
    }

    #[test]
    fn linspace_endpoints_and_spacing() {
        let values = linspace(1.6, 3.0, 6);
        assert_eq!(values[0], 1.6);
        assert_eq!(values[5], 3.0);
        assert!(values.windows(2).all(|w| w[1] > w[0]));
        assert_eq!(linspace(2.0, 5.0, 1), vec![2.0]);
        assert!(linspace(2.0, 5.0, 0).is_empty());
    }

    #[test]
    fn explicit_values_override_range() {
        let values = ParametersValues {
            r0_values: Some(vec![1.1, 4.0]),
            ..ParametersValues::default()
        };
        assert_eq!(values.r0_sweep(), vec![1.1, 4.0]);
    }

    #[test]
    fn rejects_invalid_configuration() {
        let cases = [
            ParametersValues {
                recovery_rate: 0.0,
                ..ParametersValues::default()
            },
            ParametersValues {
                incubation_rate: -1.0,
                ..ParametersValues::default()
            },
            ParametersValues {
                population_size: f64::NAN,
                ..ParametersValues::default()
            },
            ParametersValues {
                grid_resolution: 1,
                ..ParametersValues::default()
            },
            ParametersValues {
                horizon: 0.0,
                ..ParametersValues::default()
            },
            ParametersValues {
                r0_values: Some(Vec::new()),
                ..ParametersValues::default()
            },
            ParametersValues {
                r0_range: R0Range {
                    start: 1.0,
                    end: 2.0,
                    count: 0,
                },
                ..ParametersValues::default()
            },
            ParametersValues {
                r0_values: Some(vec![2.0, f64::INFINITY]),
                ..ParametersValues::default()
            },
            ParametersValues {
                initial_infectious_fraction: 0.0,
                ..ParametersValues::default()
            },
            ParametersValues {
                initial_infectious_fraction: 0.3,
                exposed_to_infectious_ratio: 4.0,
                ..ParametersValues::default()
            },
        ];
        for values in cases {
            let result = Parameters::new(values.clone());
            assert!(
                matches!(result, Err(SeirError::InvalidConfig(_))),
                "expected {values:?} to be rejected"
            );
        }
    }

    #[test]
    fn load_partial_json_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "horizon": 200.0, "grid_resolution": 50, "r0_values": [1.5, 2.5] }}"#
        )
        .unwrap();
        let parameters = load_parameters_from_json(file.path()).unwrap();
        assert_eq!(parameters.time_grid().len(), 50);
        assert_eq!(parameters.time_grid()[49], 200.0);
        assert_eq!(parameters.scenario_set().len(), 2);
        assert_eq!(parameters.values().recovery_rate, 1.0 / 18.0);
    }

    #[test]
    fn load_json_rejects_unknown_fields() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "gamma": 0.1 }}"#).unwrap();
        assert!(matches!(
            load_parameters_from_json(file.path()),
            Err(SeirError::JsonError(_))
        ));
    }

    #[test]
    fn load_json_validates() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "grid_resolution": 1 }}"#).unwrap();
        assert!(matches!(
            load_parameters_from_json(file.path()),
            Err(SeirError::InvalidConfig(_))
        ));
    }

    #[test]
    fn load_json_with_intervention() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "r0_values": [2.0, 3.0], "intervention": {{ "change_time": 60.0, "scale": 0.4 }} }}"#
        )
        .unwrap();
        let parameters = load_parameters_from_json(file.path()).unwrap();
        let intervention = Intervention {
            change_time: 60.0,
            scale: 0.4,
        };
        assert_eq!(parameters.values().intervention, Some(intervention));
        let scenarios = parameters.scenario_set();
        assert_eq!(scenarios.len(), 2);
        assert!(scenarios
            .iter()
            .all(|scenario| scenario.intervention == Some(intervention)));
        assert_eq!(scenarios[1].label, "R0 = 3.00");

        assert!(Parameters::default()
            .scenario_set()
            .iter()
            .all(|scenario| scenario.intervention.is_none()));
    }

    #[test]
    fn intervention_is_validated() {
        let cases = [
            (-1.0, 0.5),
            (f64::NAN, 0.5),
            (10.0, -0.1),
            (10.0, f64::INFINITY),
        ];
        for (change_time, scale) in cases {
            let values = ParametersValues {
                intervention: Some(Intervention { change_time, scale }),
                ..ParametersValues::default()
            };
            assert!(
                matches!(values.validate(), Err(SeirError::InvalidConfig(_))),
                "expected change_time={change_time}, scale={scale} to be rejected"
            );
        }

        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "intervention": {{ "change_time": 60.0, "after": 1.2 }} }}"#
        )
        .unwrap();
        assert!(matches!(
            load_parameters_from_json(file.path()),
            Err(SeirError::JsonError(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        assert!(matches!(
            load_parameters_from_json(Path::new("does/not/exist.json")),
            Err(SeirError::IoError(_))
        ));
    }
}
