/*!
CPU device: executes one command per tick for its bound process and tracks
the quantum.

Per-tick order of operations:
1. Bump the tick counters.
2. On the quantum boundary, raise `QuantumEnded` and stop; the boundary tick
   itself executes no command, so a quantum of size `q` delivers `q - 1`
   commands.
3. Otherwise ask the process for its next command and dispatch on its kind:
   ALU commands read both operands back from memory, run the ALU, and write
   the result into the process's result cell; IO commands and Exit raise the
   corresponding interrupt for the handler to act on.

An idle CPU does nothing, and a CPU whose process has already been marked
TERMINATED does nothing (teardown runs through the interrupt path).
*/

use crate::alu;
use crate::command::Command;
use crate::devices::DeviceState;
use crate::error::SimError;
use crate::interrupt::{Interrupt, InterruptKind};
use crate::memory::Memory;
use crate::process::{Pid, ProcessState, ProcessTable};
use crate::random::RandomSource;

#[derive(Debug)]
pub struct Cpu {
    device_id: usize,
    state: DeviceState,
    current_process: Option<Pid>,
    /// Ticks executed inside the current quantum.
    ticks_executed: u64,
    /// Ticks executed over the whole run.
    total_commands_executed: u64,
    quantum_size: u64,
}

impl Cpu {
    pub fn new(device_id: usize, quantum_size: u64) -> Self {
        Self {
            device_id,
            state: DeviceState::Idle,
            current_process: None,
            ticks_executed: 0,
            total_commands_executed: 0,
            quantum_size,
        }
    }

    #[inline]
    pub fn device_id(&self) -> usize {
        self.device_id
    }

    #[inline]
    pub fn state(&self) -> DeviceState {
        self.state
    }

    #[inline]
    pub fn current_process(&self) -> Option<Pid> {
        self.current_process
    }

    #[inline]
    pub fn ticks_executed(&self) -> u64 {
        self.ticks_executed
    }

    #[inline]
    pub fn total_commands_executed(&self) -> u64 {
        self.total_commands_executed
    }

    #[inline]
    pub fn quantum_size(&self) -> u64 {
        self.quantum_size
    }

    /// Binding setter contract: clearing the process makes the device IDLE
    /// and resets the quantum counter; setting one makes it RUNNING.
    pub(crate) fn set_current_process(&mut self, process: Option<Pid>) {
        self.current_process = process;
        match process {
            None => {
                self.state = DeviceState::Idle;
                self.ticks_executed = 0;
            }
            Some(_) => self.state = DeviceState::Running,
        }
    }

    /// Full reset, used by model shutdown.
    pub(crate) fn reset(&mut self) {
        self.set_current_process(None);
        self.total_commands_executed = 0;
    }

    /// Execute one simulation tick.
    pub(crate) fn execute_tick(
        &mut self,
        table: &mut ProcessTable,
        memory: &mut Memory,
        rng: &mut RandomSource,
        interrupts: &mut Vec<Interrupt>,
    ) -> Result<(), SimError> {
        let Some(pid) = self.current_process else {
            return Ok(());
        };
        let process = table.get_mut(&pid).ok_or(SimError::ProcessMissing(pid))?;
        if process.state() == ProcessState::Terminated {
            return Ok(());
        }

        self.total_commands_executed += 1;
        self.ticks_executed += 1;
        if self.ticks_executed == self.quantum_size {
            interrupts.push(Interrupt::new(
                InterruptKind::QuantumEnded,
                pid,
                Some(self.device_id),
            ));
            return Ok(());
        }

        match process.generate_command(memory, rng)? {
            Command::Alu { addr1, addr2, op } => {
                let op_1 = memory
                    .read(addr1)?
                    .ok_or(SimError::UninitializedRead(addr1))?;
                let op_2 = memory
                    .read(addr2)?
                    .ok_or(SimError::UninitializedRead(addr2))?;
                let result = alu::execute(op, op_1, op_2)?;
                let result_addr = process
                    .memory_config
                    .result_addr
                    .ok_or(SimError::NotPlaced(pid))?;
                memory.write(result_addr, result)?;
                process.counters.total_commands += 1;
            }
            Command::Exit => {
                interrupts.push(Interrupt::new(
                    InterruptKind::ProcessTerminated,
                    pid,
                    Some(self.device_id),
                ));
            }
            Command::Io { .. } => {
                process.counters.io_commands += 1;
                process.counters.total_commands += 1;
                interrupts.push(Interrupt::new(
                    InterruptKind::ProcessIoInit,
                    pid,
                    Some(self.device_id),
                ));
            }
        }
        Ok(())
    }
}
