/*!
Process model: the PCB held in the process table plus the synthetic
instruction stream generator.

A PCB carries identity (PID), lifecycle state, its memory placement, the
parameters governing command generation, running command counters, and the
most recently generated command. PIDs are issued monotonically by the model;
the PCB itself never invents one.

Ownership note: the PCB lives only in the process table. Devices and queues
refer to it by PID; nothing else holds a long-lived reference.
*/

use std::collections::BTreeMap;

use crate::command::{Command, OpType};
use crate::error::SimError;
use crate::memory::Memory;
use crate::random::RandomSource;

/// Process identifier, unique over a run.
pub type Pid = u32;

/// The process table: PID -> PCB, the single owner of every live process.
pub type ProcessTable = BTreeMap<Pid, Process>;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProcessState {
    /// Created, not yet placed in memory.
    New,
    /// Waiting in the CPU queue.
    Ready,
    /// Bound to a CPU and executing.
    Running,
    /// Finished; memory reclaim is pending.
    Terminated,
    /// IO requested (transitional).
    IoInit,
    /// IO countdown finished (transitional).
    IoEnd,
    /// Waiting in the IO queue.
    IoBlocked,
    /// Bound to an IO controller and transferring.
    IoRunning,
    /// Suspended by the operator while it held a CPU.
    StoppedCpu,
    /// Suspended by the operator while it held an IO controller.
    StoppedIo,
}

/// Memory placement of a process. Addresses are absolute and derived from the
/// block start plus configured shifts once the allocator has placed the block.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ProcessMemoryConfig {
    pub block_start: Option<usize>,
    pub block_size: usize,
    pub operands_addr: Option<usize>,
    pub result_addr: Option<usize>,
}

impl ProcessMemoryConfig {
    pub fn unplaced(block_size: usize) -> Self {
        Self {
            block_start: None,
            block_size,
            operands_addr: None,
            result_addr: None,
        }
    }
}

/// Parameters governing command generation for one process.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ProcessCommandsConfig {
    /// Commands the process executes before `Exit` (ALU + IO combined).
    pub total_commands: u64,
    /// Probability that a generated command is an IO command.
    pub io_ratio: f64,
    pub io_duration_min: u64,
    pub io_duration_max: u64,
    pub operand_min: i64,
    pub operand_max: i64,
}

impl Default for ProcessCommandsConfig {
    fn default() -> Self {
        Self {
            total_commands: 10,
            io_ratio: 0.5,
            io_duration_min: 1,
            io_duration_max: 5,
            operand_min: 1,
            operand_max: 10,
        }
    }
}

/// Running command counters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessCounters {
    /// Commands executed so far (ALU + IO).
    pub total_commands: u64,
    /// IO commands executed so far.
    pub io_commands: u64,
}

pub struct Process {
    pid: Pid,
    state: ProcessState,
    pub memory_config: ProcessMemoryConfig,
    pub commands_config: ProcessCommandsConfig,
    pub counters: ProcessCounters,
    current_command: Option<Command>,
}

impl Process {
    pub fn new(pid: Pid, commands_config: ProcessCommandsConfig, block_size: usize) -> Self {
        Self {
            pid,
            state: ProcessState::New,
            memory_config: ProcessMemoryConfig::unplaced(block_size),
            commands_config,
            counters: ProcessCounters::default(),
            current_command: None,
        }
    }

    #[inline]
    pub fn pid(&self) -> Pid {
        self.pid
    }

    #[inline]
    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// State transitions belong to the dispatcher (and to process setup);
    /// nothing outside the crate flips this directly.
    #[inline]
    pub(crate) fn set_state(&mut self, state: ProcessState) {
        self.state = state;
    }

    /// The most recently generated command, if any.
    #[inline]
    pub fn current_command(&self) -> Option<Command> {
        self.current_command
    }

    /// Generate the next command of the stream.
    ///
    /// Once the command budget is exhausted this always yields `Exit`.
    /// Otherwise an IO command is drawn with probability `io_ratio`; an ALU
    /// command writes its two fresh operands to memory at `operands_addr`
    /// and `operands_addr + 1` so the CPU can read them back.
    pub fn generate_command(
        &mut self,
        memory: &mut Memory,
        rng: &mut RandomSource,
    ) -> Result<Command, SimError> {
        let config = self.commands_config;

        if self.counters.total_commands >= config.total_commands {
            self.current_command = Some(Command::Exit);
            return Ok(Command::Exit);
        }

        let p = rng.float_in(0.0, 1.0);
        let command = if p < config.io_ratio {
            let duration =
                rng.int_in(config.io_duration_min as i64, config.io_duration_max as i64) as u64;
            Command::Io { duration }
        } else {
            let operands_addr = self
                .memory_config
                .operands_addr
                .ok_or(SimError::NotPlaced(self.pid))?;
            let addr1 = operands_addr;
            let addr2 = operands_addr + 1;

            let op_1 = rng.int_in(config.operand_min, config.operand_max);
            let op_2 = rng.int_in(config.operand_min, config.operand_max);
            memory.write(addr1, op_1)?;
            memory.write(addr2, op_2)?;

            let op = OpType::from_index(rng.int_in(0, OpType::COUNT - 1));
            Command::Alu { addr1, addr2, op }
        };

        self.current_command = Some(command);
        Ok(command)
    }
}

impl std::fmt::Debug for Process {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("state", &self.state)
            .field("memory_config", &self.memory_config)
            .field("counters", &self.counters)
            .field("current_command", &self.current_command)
            .finish()
    }
}
