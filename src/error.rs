/*!
Crate-wide error type for the simulation engine.

Two broad classes share the enum:
- Recoverable conditions surfaced to callers of the control-plane API
  (`TableFull`, `NotEnoughMemory`, `ProcessMissing`, `NotExecuting`,
  `NotStopped`). The tick loop itself never produces these.
- Fatal conditions that indicate a corrupt simulation (`OutOfRange`,
  `UninitializedRead`, `DivisionByZero`, `CorruptSegmentMap`,
  `NotAnIoCommand`). The tick loop catches them, logs, and halts the model;
  it never panics.
*/

use thiserror::Error;

use crate::process::Pid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimError {
    #[error("memory access out of range: address {addr}, memory size {size}")]
    OutOfRange { addr: usize, size: usize },

    #[error("read of uninitialized memory cell at address {0}")]
    UninitializedRead(usize),

    #[error("integer division by zero")]
    DivisionByZero,

    #[error("process table is full ({capacity} entries)")]
    TableFull { capacity: usize },

    #[error("not enough memory for process {pid} (requested {requested} words)")]
    NotEnoughMemory { pid: Pid, requested: usize },

    #[error("process {0} is not present in the process table")]
    ProcessMissing(Pid),

    #[error("process {0} has no memory block assigned")]
    NotPlaced(Pid),

    #[error("segment map is inconsistent near address {addr}")]
    CorruptSegmentMap { addr: usize },

    #[error("IO controller {device} ticked a process without a pending IO command")]
    NotAnIoCommand { device: usize },

    #[error("interrupt for process {pid} carries no valid device index")]
    BadInterruptDevice { pid: Pid },

    #[error("process {0} is not currently executing")]
    NotExecuting(Pid),

    #[error("process {0} is not stopped")]
    NotStopped(Pid),
}

impl SimError {
    /// True for conditions the control plane is expected to handle; false for
    /// conditions that corrupt the run and stop the tick loop.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SimError::TableFull { .. }
                | SimError::NotEnoughMemory { .. }
                | SimError::ProcessMissing(_)
                | SimError::NotExecuting(_)
                | SimError::NotStopped(_)
        )
    }
}
