/*!
Interrupt handler: drains the per-tick interrupt queue in arrival order.

Each kind performs a fixed transaction over the kernel structures, using the
dispatcher for every binding or state change and the scheduler for every
queue move. The handler is the only place a process transitions into
TERMINATED and the only caller of `schedule_free`.

Borrowing note: the handler holds no state of its own. `HandlerContext`
bundles short-lived mutable borrows of the structures a transaction touches;
it exists for the duration of one drain and is dropped before the tick
continues.
*/

use crate::config::TimeCosts;
use crate::devices::{Cpu, IoController};
use crate::error::SimError;
use crate::interrupt::{Interrupt, InterruptKind};
use crate::memory_manager::MemoryManager;
use crate::os::dispatcher;
use crate::process::{Pid, ProcessState, ProcessTable};
use crate::scheduler::Scheduler;
use crate::stats::{Statistics, TimeBucket};

/// Borrowed view of the kernel structures interrupt transactions operate on.
pub(crate) struct HandlerContext<'a> {
    pub cpus: &'a mut [Cpu],
    pub ios: &'a mut [IoController],
    pub table: &'a mut ProcessTable,
    pub scheduler: &'a mut Scheduler,
    pub memory_manager: &'a mut MemoryManager,
    pub stats: &'a mut Statistics,
    pub costs: &'a TimeCosts,
}

/// Process every pending interrupt in arrival order, leaving `pending`
/// empty.
pub(crate) fn drain(
    pending: &mut Vec<Interrupt>,
    ctx: &mut HandlerContext<'_>,
) -> Result<(), SimError> {
    for interrupt in pending.drain(..) {
        handle(interrupt, ctx)?;
    }
    Ok(())
}

fn handle(interrupt: Interrupt, ctx: &mut HandlerContext<'_>) -> Result<(), SimError> {
    let pid = interrupt.pid;

    // Stale interrupts: the subject died earlier in this same drain (for
    // example a kill followed by the quantum interrupt its CPU had already
    // raised). Acting on them would resurrect the process.
    match ctx.table.get(&pid) {
        None => {
            log::debug!("dropping stale interrupt {:?} for dead pid {pid}", interrupt.kind);
            return Ok(());
        }
        Some(process) if process.state() == ProcessState::Terminated => {
            log::debug!(
                "dropping stale interrupt {:?} for terminated pid {pid}",
                interrupt.kind
            );
            return Ok(());
        }
        Some(_) => {}
    }

    log::debug!("interrupt {:?}: pid {pid}, device {:?}", interrupt.kind, interrupt.device);

    match interrupt.kind {
        InterruptKind::QuantumEnded => {
            let device = cpu_index(ctx, interrupt)?;
            dispatcher::change_state(ctx.table, ctx.stats, ctx.costs, pid, ProcessState::Ready)?;
            dispatcher::unload_cpu(&mut ctx.cpus[device]);
            ctx.scheduler.enqueue_cpu(pid, ctx.stats, ctx.costs);
            fill_cpu(ctx, device)?;
        }
        InterruptKind::ProcessTerminated => {
            let device = cpu_index(ctx, interrupt)?;
            dispatcher::change_state(
                ctx.table,
                ctx.stats,
                ctx.costs,
                pid,
                ProcessState::Terminated,
            )?;
            dispatcher::unload_cpu(&mut ctx.cpus[device]);
            retire(ctx, pid);
            fill_cpu(ctx, device)?;
        }
        InterruptKind::ProcessIoInit => {
            let device = cpu_index(ctx, interrupt)?;
            let cost = ctx.costs.t_init_io;
            bill_service(ctx, pid, cost);
            dispatcher::change_state(
                ctx.table,
                ctx.stats,
                ctx.costs,
                pid,
                ProcessState::IoBlocked,
            )?;
            dispatcher::unload_cpu(&mut ctx.cpus[device]);
            ctx.scheduler.enqueue_io(pid, ctx.stats, ctx.costs);
            fill_cpu(ctx, device)?;
        }
        InterruptKind::ProcessIoEnd => {
            let device = io_index(ctx, interrupt)?;
            let cost = ctx.costs.t_end_io;
            bill_service(ctx, pid, cost);
            dispatcher::change_state(ctx.table, ctx.stats, ctx.costs, pid, ProcessState::Ready)?;
            dispatcher::unload_io(&mut ctx.ios[device]);
            ctx.scheduler.enqueue_cpu(pid, ctx.stats, ctx.costs);
            fill_io(ctx, device)?;
        }
        InterruptKind::ProcessStoppedCpu => {
            let device = cpu_index(ctx, interrupt)?;
            dispatcher::change_state(
                ctx.table,
                ctx.stats,
                ctx.costs,
                pid,
                ProcessState::StoppedCpu,
            )?;
            dispatcher::unload_cpu(&mut ctx.cpus[device]);
            fill_cpu(ctx, device)?;
        }
        InterruptKind::ProcessStoppedIo => {
            let device = io_index(ctx, interrupt)?;
            let cost = ctx.costs.t_end_io;
            bill_service(ctx, pid, cost);
            dispatcher::change_state(
                ctx.table,
                ctx.stats,
                ctx.costs,
                pid,
                ProcessState::StoppedIo,
            )?;
            dispatcher::unload_io(&mut ctx.ios[device]);
            fill_io(ctx, device)?;
        }
        InterruptKind::ProcessResumedCpu => {
            let cost = ctx.costs.t_end_io;
            bill_service(ctx, pid, cost);
            dispatcher::change_state(ctx.table, ctx.stats, ctx.costs, pid, ProcessState::Ready)?;
            ctx.scheduler.enqueue_cpu(pid, ctx.stats, ctx.costs);
        }
        InterruptKind::ProcessResumedIo => {
            let cost = ctx.costs.t_init_io;
            bill_service(ctx, pid, cost);
            dispatcher::change_state(
                ctx.table,
                ctx.stats,
                ctx.costs,
                pid,
                ProcessState::IoBlocked,
            )?;
            ctx.scheduler.enqueue_io(pid, ctx.stats, ctx.costs);
        }
        InterruptKind::ProcessKilled => {
            // The victim may be bound to either device kind, queued, or
            // stopped; release whatever it holds, then retire it.
            if let Some(device) = ctx
                .cpus
                .iter()
                .position(|cpu| cpu.current_process() == Some(pid))
            {
                dispatcher::unload_cpu(&mut ctx.cpus[device]);
                fill_cpu(ctx, device)?;
            } else if let Some(device) = ctx
                .ios
                .iter()
                .position(|io| io.current_process() == Some(pid))
            {
                dispatcher::unload_io(&mut ctx.ios[device]);
                fill_io(ctx, device)?;
            } else {
                ctx.scheduler.forget(pid);
            }
            dispatcher::change_state(
                ctx.table,
                ctx.stats,
                ctx.costs,
                pid,
                ProcessState::Terminated,
            )?;
            retire(ctx, pid);
        }
    }
    Ok(())
}

/// Teardown bookkeeping shared by normal termination and kill: queue the
/// memory reclaim and close the statistics ledger.
fn retire(ctx: &mut HandlerContext<'_>, pid: Pid) {
    ctx.memory_manager.schedule_free(pid);
    ctx.stats.note_completed();
    ctx.stats.mark_end(pid);
}

/// Bill an IO service cost: the process would pay it alone too, and the OS
/// pays it now.
fn bill_service(ctx: &mut HandlerContext<'_>, pid: Pid, cost: f64) {
    ctx.stats.bill(pid, TimeBucket::SysMono, cost);
    ctx.stats.bill_os_multi(cost);
    ctx.stats.bill_os_sys_multi(cost);
}

fn fill_cpu(ctx: &mut HandlerContext<'_>, device: usize) -> Result<(), SimError> {
    dispatcher::dispatch_cpu(
        &mut ctx.cpus[device],
        ctx.table,
        ctx.scheduler,
        ctx.stats,
        ctx.costs,
    )
}

fn fill_io(ctx: &mut HandlerContext<'_>, device: usize) -> Result<(), SimError> {
    dispatcher::dispatch_io(
        &mut ctx.ios[device],
        ctx.table,
        ctx.scheduler,
        ctx.stats,
        ctx.costs,
    )
}

// Device-originated kinds must carry a valid device index; anything else is
// a programmer error and halts the run.

fn cpu_index(ctx: &HandlerContext<'_>, interrupt: Interrupt) -> Result<usize, SimError> {
    interrupt
        .device
        .filter(|&d| d < ctx.cpus.len())
        .ok_or(SimError::BadInterruptDevice { pid: interrupt.pid })
}

fn io_index(ctx: &HandlerContext<'_>, interrupt: Interrupt) -> Result<usize, SimError> {
    interrupt
        .device
        .filter(|&d| d < ctx.ios.len())
        .ok_or(SimError::BadInterruptDevice { pid: interrupt.pid })
}
