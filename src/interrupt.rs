//! Interrupts: the values devices and the control plane push into the
//! per-tick queue, drained in arrival order by the handler.

use crate::process::Pid;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum InterruptKind {
    /// A process exhausted its CPU quantum.
    QuantumEnded,
    /// A process executed its Exit command.
    ProcessTerminated,
    /// A process issued an IO command.
    ProcessIoInit,
    /// An IO transfer finished its countdown.
    ProcessIoEnd,
    /// Operator suspended a process holding a CPU.
    ProcessStoppedCpu,
    /// Operator suspended a process holding an IO controller.
    ProcessStoppedIo,
    /// Operator resumed a CPU-suspended process.
    ProcessResumedCpu,
    /// Operator resumed an IO-suspended process.
    ProcessResumedIo,
    /// Operator killed a process outright.
    ProcessKilled,
}

/// One pending interrupt. `device` is the index of the raising device;
/// operator-raised interrupts that do not originate from a device carry
/// `None`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Interrupt {
    pub kind: InterruptKind,
    pub pid: Pid,
    pub device: Option<usize>,
}

impl Interrupt {
    pub fn new(kind: InterruptKind, pid: Pid, device: Option<usize>) -> Self {
        Self { kind, pid, device }
    }
}
