// Loss of precision is allowable in this module's use cases.
#![allow(clippy::cast_precision_loss)]

use std::time::{Duration, Instant};

use bytesize::ByteSize;
use humantime::format_duration;
use log::{debug, error, info};
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Resource usage of one sweep. If no scenarios ran, the per scenario statistics are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionStatistics {
    pub max_memory_usage: u64,
    pub cpu_time: Duration,
    pub wall_time: Duration,

    pub scenarios: usize,
    pub wall_time_per_scenario: Duration,
}

/// Measures a sweep from construction until `compute_final_statistics` is called.
pub struct ExecutionProfilingCollector {
    start_time: Instant,
    /// Accumulated CPU time of the process in CPU-milliseconds when collection started.
    start_cpu_time: u64,
    max_memory_usage: u64,
    system: System,
    /// `None` on platforms `sysinfo` does not support.
    process_id: Option<Pid>,
}

impl Default for ExecutionProfilingCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionProfilingCollector {
    #[must_use]
    pub fn new() -> ExecutionProfilingCollector {
        let process_id = sysinfo::get_current_pid().ok();
        let mut collector = ExecutionProfilingCollector {
            start_time: Instant::now(),
            start_cpu_time: 0,
            max_memory_usage: 0,
            system: System::new(),
            process_id,
        };
        if let Some(pid) = process_id {
            debug!("Process ID: {}", pid);
            collector.update_system_info(ProcessRefreshKind::nothing().with_cpu().with_memory());
            if let Some(process) = collector.system.process(pid) {
                collector.max_memory_usage = process.memory();
                collector.start_cpu_time = process.accumulated_cpu_time();
            }
        }
        collector
    }

    /// Refreshes the internal `sysinfo::System` object for this process.
    fn update_system_info(&mut self, process_refresh_kind: ProcessRefreshKind) {
        if let Some(pid) = self.process_id {
            if self.system.refresh_processes_specifics(
                ProcessesToUpdate::Some(&[pid]),
                true,
                process_refresh_kind,
            ) < 1
            {
                error!("could not refresh process statistics");
            }
        }
    }

    /// Computes the final summary statistics for a sweep of `scenarios` scenarios.
    pub fn compute_final_statistics(&mut self, scenarios: usize) -> ExecutionStatistics {
        let mut cpu_time_millis = 0;
        self.update_system_info(ProcessRefreshKind::nothing().with_cpu().with_memory());
        if let Some(process) = self.process_id.and_then(|pid| self.system.process(pid)) {
            self.max_memory_usage = self.max_memory_usage.max(process.memory());
            cpu_time_millis = process
                .accumulated_cpu_time()
                .saturating_sub(self.start_cpu_time);
        }

        let wall_time = self.start_time.elapsed();
        let wall_time_per_scenario = if scenarios > 0 {
            Duration::from_secs_f64(wall_time.as_secs_f64() / scenarios as f64)
        } else {
            Duration::ZERO
        };

        ExecutionStatistics {
            max_memory_usage: self.max_memory_usage,
            cpu_time: Duration::from_millis(cpu_time_millis),
            wall_time,
            scenarios,
            wall_time_per_scenario,
        }
    }
}

/// Prints execution statistics to stderr.
pub fn print_execution_statistics(summary: &ExecutionStatistics) {
    eprintln!("━━━━ Execution Summary ━━━━");
    if summary.max_memory_usage == 0 {
        eprintln!("Memory and CPU statistics are not available on your platform.");
    } else {
        eprintln!(
            "{:<25}{}",
            "Max memory usage:",
            ByteSize::b(summary.max_memory_usage)
        );
        eprintln!("{:<25}{}", "CPU time:", format_duration(summary.cpu_time));
    }
    eprintln!("{:<25}{}", "Wall time:", format_duration(summary.wall_time));
    if summary.scenarios > 0 {
        eprintln!("{:<25}{}", "Scenarios:", summary.scenarios);
        eprintln!(
            "{:<25}{}",
            "Wall time per scenario:",
            format_duration(summary.wall_time_per_scenario)
        );
    }
}

/// Logs execution statistics with the logging system.
pub fn log_execution_statistics(stats: &ExecutionStatistics) {
    info!("Sweep complete.");
    if stats.max_memory_usage == 0 {
        info!("Memory and CPU statistics are not available on your platform.");
    } else {
        info!("Max memory usage: {}", ByteSize::b(stats.max_memory_usage));
        info!("CPU time: {}", format_duration(stats.cpu_time));
    }
    info!("Wall time: {}", format_duration(stats.wall_time));
    if stats.scenarios > 0 {
        info!("Scenarios: {}", stats.scenarios);
        info!(
            "Wall time per scenario: {}",
            format_duration(stats.wall_time_per_scenario)
        );
    }
}
