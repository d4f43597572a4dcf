/*!
Dispatcher: the only code that rebinds devices or flips a process state.

Kept as free functions over explicit borrows (the structures involved are
all owned by the model, and each operation touches a different subset).
Every operation bills its cost at the moment it runs; the billed amounts are
part of the simulated cost model, not instrumentation.
*/

use crate::config::TimeCosts;
use crate::devices::{Cpu, DeviceState, IoController};
use crate::error::SimError;
use crate::process::{Pid, ProcessState, ProcessTable};
use crate::scheduler::Scheduler;
use crate::stats::{Statistics, TimeBucket};

/// Switch a process to `new_state`. A no-op transition costs nothing; a real
/// one bills the state-switch and shared-structure costs to the OS ledgers.
pub(crate) fn change_state(
    table: &mut ProcessTable,
    stats: &mut Statistics,
    costs: &TimeCosts,
    pid: Pid,
    new_state: ProcessState,
) -> Result<(), SimError> {
    let process = table.get_mut(&pid).ok_or(SimError::ProcessMissing(pid))?;
    if process.state() != new_state {
        stats.bill_os_multi(costs.t_state + costs.t_global);
        stats.bill_os_sys_multi(costs.t_state + costs.t_global);
        process.set_state(new_state);
    }
    Ok(())
}

/// Bind `pid` to `cpu` and mark it RUNNING. The load itself costs `t_load`,
/// billed both to the process (it would pay it in a uniprogrammed system
/// too) and to the OS.
pub(crate) fn load_to_cpu(
    cpu: &mut Cpu,
    pid: Pid,
    table: &mut ProcessTable,
    stats: &mut Statistics,
    costs: &TimeCosts,
) -> Result<(), SimError> {
    if !table.contains_key(&pid) {
        return Err(SimError::ProcessMissing(pid));
    }
    cpu.set_current_process(Some(pid));
    change_state(table, stats, costs, pid, ProcessState::Running)?;
    stats.bill(pid, TimeBucket::SysMono, costs.t_load);
    stats.bill_os_multi(costs.t_load);
    stats.bill_os_sys_multi(costs.t_global);
    Ok(())
}

/// Bind `pid` to `io` and mark it IO_RUNNING.
pub(crate) fn load_to_io(
    io: &mut IoController,
    pid: Pid,
    table: &mut ProcessTable,
    stats: &mut Statistics,
    costs: &TimeCosts,
) -> Result<(), SimError> {
    if !table.contains_key(&pid) {
        return Err(SimError::ProcessMissing(pid));
    }
    io.set_current_process(Some(pid));
    change_state(table, stats, costs, pid, ProcessState::IoRunning)
}

/// Clear a CPU binding. The setter contract makes the device IDLE and zeroes
/// its quantum counter. Returns the unloaded PID, if any.
pub(crate) fn unload_cpu(cpu: &mut Cpu) -> Option<Pid> {
    let pid = cpu.current_process();
    cpu.set_current_process(None);
    pid
}

/// Clear an IO binding.
pub(crate) fn unload_io(io: &mut IoController) -> Option<Pid> {
    let pid = io.current_process();
    io.set_current_process(None);
    pid
}

/// Opportunistic idle-fill: if the CPU is free and a process is waiting,
/// load the queue head.
pub(crate) fn dispatch_cpu(
    cpu: &mut Cpu,
    table: &mut ProcessTable,
    scheduler: &mut Scheduler,
    stats: &mut Statistics,
    costs: &TimeCosts,
) -> Result<(), SimError> {
    if cpu.state() == DeviceState::Idle {
        if let Some(pid) = scheduler.dequeue_cpu(stats, costs) {
            load_to_cpu(cpu, pid, table, stats, costs)?;
        }
    }
    Ok(())
}

/// Opportunistic idle-fill for an IO controller.
pub(crate) fn dispatch_io(
    io: &mut IoController,
    table: &mut ProcessTable,
    scheduler: &mut Scheduler,
    stats: &mut Statistics,
    costs: &TimeCosts,
) -> Result<(), SimError> {
    if io.state() == DeviceState::Idle {
        if let Some(pid) = scheduler.dequeue_io(stats, costs) {
            load_to_io(io, pid, table, stats, costs)?;
        }
    }
    Ok(())
}
