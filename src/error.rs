use std::fmt::{self, Debug, Display};
use std::io;

/// Provides `SeirError` and maps to other errors to
/// convert to a `SeirError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum SeirError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CSVError(csv::Error),
    /// Rejected before any integration is attempted.
    InvalidConfig(String),
    /// The integrator could not produce a solution at `time` within its tolerances.
    IntegrationFailure {
        time: f64,
        message: String,
    },
    /// A computed compartment left the unit simplex.
    InvariantViolation {
        time: f64,
        message: String,
    },
    /// A scenario-level failure tagged with the scenario label.
    ScenarioFailed {
        label: String,
        source: Box<SeirError>,
    },
    SeirError(String),
}

impl From<io::Error> for SeirError {
    fn from(error: io::Error) -> Self {
        SeirError::IoError(error)
    }
}

impl From<serde_json::Error> for SeirError {
    fn from(error: serde_json::Error) -> Self {
        SeirError::JsonError(error)
    }
}

impl From<csv::Error> for SeirError {
    fn from(error: csv::Error) -> Self {
        SeirError::CSVError(error)
    }
}

impl From<String> for SeirError {
    fn from(error: String) -> Self {
        SeirError::SeirError(error)
    }
}

impl From<&str> for SeirError {
    fn from(error: &str) -> Self {
        SeirError::SeirError(error.to_string())
    }
}

impl std::error::Error for SeirError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SeirError::IoError(error) => Some(error),
            SeirError::JsonError(error) => Some(error),
            SeirError::CSVError(error) => Some(error),
            SeirError::ScenarioFailed { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl Display for SeirError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SeirError::IoError(error) => write!(f, "I/O error: {error}"),
            SeirError::JsonError(error) => write!(f, "invalid JSON: {error}"),
            SeirError::CSVError(error) => write!(f, "CSV error: {error}"),
            SeirError::InvalidConfig(message) => write!(f, "invalid configuration: {message}"),
            SeirError::IntegrationFailure { time, message } => {
                write!(f, "integration failed at t={time}: {message}")
            }
            SeirError::InvariantViolation { time, message } => {
                write!(f, "compartment invariant violated at t={time}: {message}")
            }
            SeirError::ScenarioFailed { label, source } => {
                write!(f, "scenario '{label}' failed: {source}")
            }
            SeirError::SeirError(message) => write!(f, "Error: {message}"),
        }
    }
}
