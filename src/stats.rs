/*!
Timing statistics: per-process ledgers, system totals, and the derived
metrics comparing the multiprogrammed run against a uniprogrammed baseline.

Naming convention (matching the reported metrics):
- `_multi`: measured in the actual multiprogrammed system.
- `_mono`: reconstructed for a hypothetical uniprogrammed system where each
  process runs alone with no OS overhead (`t_mono = t_active + t_sys_mono`).

Billing is the single cost model: every OS service records its cost here at
the moment it is performed. Per-process ledgers outlive the process itself so
completed-process aggregates keep recomputing after teardown.
*/

use std::collections::BTreeMap;

use crate::process::{Pid, ProcessState, ProcessTable};

/// Per-process time ledger.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ProcessTimeStats {
    /// Ticks spent executing on a CPU or an IO controller.
    pub t_active: f64,
    /// Ticks spent waiting in a queue.
    pub t_passive: f64,
    /// OS overhead attributable to this process in the multiprogrammed run.
    pub t_sys_multi: f64,
    /// OS overhead this process would also pay in a uniprogrammed run.
    pub t_sys_mono: f64,
    /// Tick at which the process was loaded.
    pub t_start: f64,
    /// Tick at which the process terminated (0 while live).
    pub t_end: f64,
    /// Turnaround in the uniprogrammed baseline.
    pub t_mono: f64,
    /// Turnaround in the multiprogrammed run (`t_end - t_start`).
    pub t_multi: f64,
    /// Slowdown versus the baseline, percent.
    pub d_exe: f64,
    /// Share of the turnaround spent queued, percent.
    pub d_ready: f64,
}

/// System-wide totals and derived metrics.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct OsStats {
    /// Tasks admitted since the start of the run.
    pub tasks_loaded: u64,
    /// Simulated time, in ticks plus billed OS service costs.
    pub t_multi: f64,
    /// OS overhead accumulated by the multiprogrammed system.
    pub t_sys_multi: f64,
    /// Completed processes.
    pub m_multi: f64,
    /// Mean turnaround of completed processes (multiprogrammed).
    pub t_proc_avg_multi: f64,
    /// Mean turnaround of completed processes (uniprogrammed baseline).
    pub t_proc_avg_mono: f64,
    /// Time a uniprogrammed system would need for the completed workload.
    pub t_mono: f64,
    /// Processes a uniprogrammed system would have completed in `t_multi`.
    pub m_mono: f64,
    /// Throughput relative to the uniprogrammed baseline, percent.
    pub d_multi: f64,
    /// OS overhead share of total time, percent.
    pub d_system: f64,
}

/// Averages over completed processes.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct AvgProcessTimeStats {
    pub t_mono_avg: f64,
    pub t_multi_avg: f64,
    pub d_exe_avg: f64,
    pub d_ready_avg: f64,
}

/// Ledger category for per-process billing.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimeBucket {
    Active,
    Passive,
    SysMulti,
    SysMono,
}

#[derive(Debug, Default)]
pub struct Statistics {
    process_stats: BTreeMap<Pid, ProcessTimeStats>,
    os_stats: OsStats,
    avg_process_stats: AvgProcessTimeStats,
}

impl Statistics {
    pub fn new() -> Self {
        Self::default()
    }

    // -------------- Accrual and billing --------------

    /// Once per tick: active states accrue `t_active`, queued states accrue
    /// `t_passive`, every other state accrues nothing.
    pub fn tick_accrue(&mut self, table: &ProcessTable) {
        for (&pid, process) in table {
            match process.state() {
                ProcessState::Running | ProcessState::IoRunning => {
                    self.bill(pid, TimeBucket::Active, 1.0);
                }
                ProcessState::Ready | ProcessState::IoBlocked => {
                    self.bill(pid, TimeBucket::Passive, 1.0);
                }
                _ => {}
            }
        }
    }

    /// Add `value` ticks to one bucket of a process ledger.
    pub fn bill(&mut self, pid: Pid, bucket: TimeBucket, value: f64) {
        let entry = self.process_stats.entry(pid).or_default();
        match bucket {
            TimeBucket::Active => entry.t_active += value,
            TimeBucket::Passive => entry.t_passive += value,
            TimeBucket::SysMulti => entry.t_sys_multi += value,
            TimeBucket::SysMono => entry.t_sys_mono += value,
        }
    }

    pub fn bill_os_multi(&mut self, value: f64) {
        self.os_stats.t_multi += value;
    }

    pub fn bill_os_sys_multi(&mut self, value: f64) {
        self.os_stats.t_sys_multi += value;
    }

    // -------------- Lifecycle events --------------

    /// Record the admission time of a process.
    pub fn mark_start(&mut self, pid: Pid) {
        let t_start = self.os_stats.t_multi;
        let entry = self.process_stats.entry(pid).or_default();
        entry.t_start = t_start;
    }

    /// Record the completion time and derive the per-process metrics.
    pub fn mark_end(&mut self, pid: Pid) {
        let t_end = self.os_stats.t_multi;
        let entry = self.process_stats.entry(pid).or_default();
        entry.t_end = t_end;
        entry.t_multi = entry.t_end - entry.t_start;
        entry.t_sys_multi = entry.t_multi - entry.t_active - entry.t_passive;
        entry.t_mono = entry.t_active + entry.t_sys_mono;
        entry.d_exe = if entry.t_mono != 0.0 {
            entry.t_multi / entry.t_mono * 100.0
        } else {
            0.0
        };
        entry.d_ready = if entry.t_multi != 0.0 {
            entry.t_passive / entry.t_multi * 100.0
        } else {
            0.0
        };
    }

    /// Count one more completed process.
    pub fn note_completed(&mut self) {
        self.os_stats.m_multi += 1.0;
    }

    /// Count one more admitted task.
    pub fn note_task_loaded(&mut self) {
        self.os_stats.tasks_loaded += 1;
    }

    // -------------- Derived metrics --------------

    /// Recompute every derived aggregate from the per-process ledgers.
    /// Runs at the end of every tick; all divisions are guarded.
    pub fn recompute(&mut self) {
        let completed: Vec<ProcessTimeStats> = self
            .process_stats
            .values()
            .copied()
            .filter(|s| s.t_end != 0.0)
            .collect();

        let count = completed.len() as f64;
        if count > 0.0 {
            self.os_stats.t_proc_avg_multi =
                completed.iter().map(|s| s.t_multi).sum::<f64>() / count;
            self.os_stats.t_mono = completed.iter().map(|s| s.t_mono).sum::<f64>();
            self.os_stats.t_proc_avg_mono = self.os_stats.t_mono / count;

            self.avg_process_stats.t_mono_avg = self.os_stats.t_proc_avg_mono;
            self.avg_process_stats.t_multi_avg = self.os_stats.t_proc_avg_multi;
            self.avg_process_stats.d_exe_avg =
                completed.iter().map(|s| s.d_exe).sum::<f64>() / count;
            self.avg_process_stats.d_ready_avg =
                completed.iter().map(|s| s.d_ready).sum::<f64>() / count;
        }

        if self.os_stats.t_proc_avg_mono != 0.0 {
            self.os_stats.m_mono = self.os_stats.t_multi / self.os_stats.t_proc_avg_mono;
        }
        if self.os_stats.m_mono != 0.0 {
            self.os_stats.d_multi = self.os_stats.m_multi / self.os_stats.m_mono * 100.0;
        }
        if self.os_stats.t_multi != 0.0 {
            self.os_stats.d_system = self.os_stats.t_sys_multi / self.os_stats.t_multi * 100.0;
        }
    }

    // -------------- Accessors --------------

    pub fn os_stats(&self) -> &OsStats {
        &self.os_stats
    }

    pub fn avg_process_stats(&self) -> &AvgProcessTimeStats {
        &self.avg_process_stats
    }

    pub fn process_stats(&self, pid: Pid) -> Option<&ProcessTimeStats> {
        self.process_stats.get(&pid)
    }

    pub fn all_process_stats(&self) -> &BTreeMap<Pid, ProcessTimeStats> {
        &self.process_stats
    }

    /// Drop every ledger and total. Used by model shutdown.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
