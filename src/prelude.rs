pub use crate::error::SeirError;
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::model::{SeirModel, StateVector};
pub use crate::parameters::{
    load_parameters_from_json, Intervention, Parameters, ParametersValues,
};
pub use crate::report::{write_report, ReportKind, ReportOptions};
pub use crate::solver::{solve_path, Trajectory};
pub use crate::sweep::{
    run_sweep, CompletedSweep, ExecutionMode, Scenario, SweepOptions, SweepResults,
};
pub use crate::transmission::{ConstantR0, ReproductionNumber, StepR0, TimeVaryingR0};
