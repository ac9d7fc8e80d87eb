//! Tabular output of a completed sweep.
//!
//! This is the presentation boundary: trajectories are written as CSV rows to any `io::Write`.
//! Fractions are converted to absolute counts here, and only here, when requested.

use std::io;

use csv::Writer;
use log::debug;
use serde_derive::Serialize;

use crate::error::SeirError;
use crate::solver::peak_of;
use crate::sweep::CompletedSweep;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportKind {
    /// One row per scenario and time point.
    #[default]
    Trajectories,
    /// One row per scenario.
    Summary,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub kind: ReportKind,
    /// Multiply fractions by this population size and add count columns.
    pub population_size: Option<f64>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SweepReportRow<'a> {
    pub scenario: &'a str,
    pub r0: f64,
    pub time: f64,
    pub infectious: f64,
    pub cumulative: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infectious_count: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cumulative_count: Option<f64>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SummaryRow<'a> {
    pub scenario: &'a str,
    pub r0: f64,
    pub peak_time: f64,
    pub peak_infectious: f64,
    pub final_cumulative: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_infectious_count: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_cumulative_count: Option<f64>,
}

/// Builds one `SummaryRow` per scenario.
#[must_use]
pub fn summarize(sweep: &CompletedSweep, population_size: Option<f64>) -> Vec<SummaryRow<'_>> {
    sweep
        .labels
        .iter()
        .enumerate()
        .map(|(index, label)| {
            let (peak_index, peak_infectious) =
                peak_of(&sweep.infectious_paths[index]).unwrap_or((0, 0.0));
            let final_cumulative = sweep.cumulative_paths[index]
                .last()
                .copied()
                .unwrap_or(0.0);
            SummaryRow {
                scenario: label,
                r0: sweep.r0_values[index],
                peak_time: sweep.times.get(peak_index).copied().unwrap_or(0.0),
                peak_infectious,
                final_cumulative,
                peak_infectious_count: population_size.map(|n| n * peak_infectious),
                final_cumulative_count: population_size.map(|n| n * final_cumulative),
            }
        })
        .collect()
}

/// Writes `sweep` as CSV to `out`.
///
/// # Errors
///
/// Returns a `SeirError` if serialization or the underlying writer fails.
pub fn write_report<W: io::Write>(
    sweep: &CompletedSweep,
    options: ReportOptions,
    out: W,
) -> Result<(), SeirError> {
    let mut writer = Writer::from_writer(out);
    let population_size = options.population_size;
    match options.kind {
        ReportKind::Trajectories => {
            for (index, label) in sweep.labels.iter().enumerate() {
                let infectious = &sweep.infectious_paths[index];
                let cumulative = &sweep.cumulative_paths[index];
                for (k, &time) in sweep.times.iter().enumerate() {
                    writer.serialize(SweepReportRow {
                        scenario: label,
                        r0: sweep.r0_values[index],
                        time,
                        infectious: infectious[k],
                        cumulative: cumulative[k],
                        infectious_count: population_size.map(|n| n * infectious[k]),
                        cumulative_count: population_size.map(|n| n * cumulative[k]),
                    })?;
                }
            }
        }
        ReportKind::Summary => {
            for row in summarize(sweep, population_size) {
                writer.serialize(row)?;
            }
        }
    }
    writer.flush()?;
    debug!("Wrote {:?} report for {} scenarios", options.kind, sweep.labels.len());
    Ok(())
}
