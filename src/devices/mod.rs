//! Devices: the CPU and IO-controller state machines.
//!
//! Both execute at most one operation per tick and signal every state
//! transition by pushing an interrupt into the queue owned by the tick loop.
//! They hold the bound process by PID only; the PCB itself stays in the
//! process table.

pub mod cpu;
pub mod io;

pub use cpu::Cpu;
pub use io::IoController;

/// Occupancy of a device. Tied to the binding by the setter contract:
/// a device is `Running` exactly when it holds a process.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DeviceState {
    Idle,
    Running,
}
