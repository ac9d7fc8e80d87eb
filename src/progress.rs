//! Provides functions to set up and update a progress bar over the scenarios of a sweep.
//!
//! The bar counts completed scenarios. Only one progress bar can be active at a time; starting a
//! second sweep with progress enabled replaces the first bar.
//!
//! ```ignore
//! /// Initializes the progress bar with the number of scenarios in the sweep.
//! pub fn init_scenario_progress_bar(scenario_count: usize);
//! /// Marks one more scenario as complete. Finalizes the bar after the last scenario.
//! pub fn increment_scenario_progress();
//! ```
//!
//! When the crate is built without the `progress_bar` feature these functions only log.

use log::trace;
#[cfg(feature = "progress_bar")]
use progress_bar::{
    finalize_progress_bar, inc_progress_bar, init_progress_bar, set_progress_bar_action, Color,
    Style,
};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Scenario count of the active bar, zero when no bar is active.
static TOTAL: AtomicUsize = AtomicUsize::new(0);
/// Scenarios completed so far.
static DONE: AtomicUsize = AtomicUsize::new(0);

/// Initializes the progress bar with the number of scenarios in the sweep.
pub fn init_scenario_progress_bar(scenario_count: usize) {
    trace!(
        "initializing scenario progress bar with {} scenarios",
        scenario_count
    );
    TOTAL.store(scenario_count, Ordering::SeqCst);
    DONE.store(0, Ordering::SeqCst);
    #[cfg(feature = "progress_bar")]
    {
        init_progress_bar(scenario_count);
        set_progress_bar_action("Scenarios", Color::Blue, Style::Bold);
    }
}

/// Increments the progress bar by one completed scenario. Safe to call from worker threads.
pub fn increment_scenario_progress() {
    let total = TOTAL.load(Ordering::SeqCst);
    if total == 0 {
        trace!("scenario completed without an active progress bar");
        return;
    }
    let done = DONE.fetch_add(1, Ordering::SeqCst) + 1;
    trace!("{done} of {total} scenarios complete");
    #[cfg(feature = "progress_bar")]
    {
        inc_progress_bar();
        if done == total {
            finalize_progress_bar();
        }
    }
    if done >= total {
        TOTAL.store(0, Ordering::SeqCst);
    }
}

/// Number of scenarios completed since the bar was last initialized.
#[cfg(test)]
fn completed_scenarios() -> usize {
    DONE.load(Ordering::SeqCst)
}
