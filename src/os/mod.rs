/*!
OsModel: the simulation façade owning every kernel structure and advancing
simulated time.

One `perform_tick` is the atomic quantum of simulated time:
1. admit new processes while memory and the process table allow;
2. accrue active/passive runtime to every process by state;
3. every CPU, then every IO controller, executes one tick (raising
   interrupts by value into the queue owned here);
4. the handler drains the interrupt queue in arrival order;
5. opportunistic dispatch refills any still-idle device;
6. deferred frees reclaim memory and drop finished PCBs;
7. derived statistics are recomputed.

The loop is single-threaded and never yields mid-tick; external readers look
at the model between ticks through the accessor methods. `step` is the
public driver: it catches fatal errors, logs them, and halts the model
instead of panicking.

Modules: `dispatcher` (sole mutator of bindings and process states) and
`handler` (interrupt transactions) are free-function modules over borrows of
the structures owned here.
*/

pub(crate) mod dispatcher;
pub(crate) mod handler;

#[cfg(test)]
mod tests;

use crate::config::OsConfig;
use crate::devices::{Cpu, IoController};
use crate::error::SimError;
use crate::interrupt::{Interrupt, InterruptKind};
use crate::memory::Memory;
use crate::memory_manager::MemoryManager;
use crate::process::{Pid, Process, ProcessCommandsConfig, ProcessState, ProcessTable};
use crate::random::RandomSource;
use crate::scheduler::Scheduler;
use crate::speed::Speed;
use crate::stats::Statistics;

pub struct OsModel {
    config: OsConfig,
    rng: RandomSource,

    memory: Memory,
    memory_manager: MemoryManager,
    proc_table: ProcessTable,
    scheduler: Scheduler,
    stats: Statistics,
    cpus: Vec<Cpu>,
    ios: Vec<IoController>,
    speed: Speed,

    /// Interrupts raised during the current tick, drained in arrival order.
    pending_interrupts: Vec<Interrupt>,

    /// Monotonic PID issue counter.
    next_pid: Pid,

    running: bool,
    loading_enabled: bool,
    kill_on_finish: bool,
}

impl OsModel {
    pub fn new(config: OsConfig) -> Self {
        let rng = RandomSource::from_seed(config.random.random_seed);
        let memory = Memory::new(config.memory.total_memory);
        let memory_manager = MemoryManager::new(config.memory.total_memory);
        let cpus = (0..config.cpu.cpus_num)
            .map(|id| Cpu::new(id, config.cpu.quantum_size))
            .collect();
        let ios = (0..config.io.ios_num).map(IoController::new).collect();
        let speed = Speed::new(&config.speed);

        Self {
            config,
            rng,
            memory,
            memory_manager,
            proc_table: ProcessTable::new(),
            scheduler: Scheduler::new(),
            stats: Statistics::new(),
            cpus,
            ios,
            speed,
            pending_interrupts: Vec::new(),
            next_pid: 0,
            running: true,
            loading_enabled: true,
            kill_on_finish: false,
        }
    }

    // -------------- Tick loop --------------

    /// Advance one tick. Fatal errors stop the model; they never propagate.
    pub fn step(&mut self) {
        if !self.running {
            return;
        }
        if let Err(err) = self.perform_tick() {
            log::error!("simulation halted: {err}");
            self.running = false;
        }
    }

    /// One tick of simulated time. See the module docs for the phase order.
    pub fn perform_tick(&mut self) -> Result<(), SimError> {
        if self.loading_enabled {
            self.fill_processes_if_possible()?;
        }

        self.stats.tick_accrue(&self.proc_table);
        self.stats.bill_os_multi(1.0);

        for cpu in &mut self.cpus {
            cpu.execute_tick(
                &mut self.proc_table,
                &mut self.memory,
                &mut self.rng,
                &mut self.pending_interrupts,
            )?;
        }
        for io in &mut self.ios {
            io.execute_tick(&self.proc_table, &mut self.pending_interrupts)?;
        }

        let mut ctx = handler::HandlerContext {
            cpus: &mut self.cpus,
            ios: &mut self.ios,
            table: &mut self.proc_table,
            scheduler: &mut self.scheduler,
            memory_manager: &mut self.memory_manager,
            stats: &mut self.stats,
            costs: &self.config.time_costs,
        };
        handler::drain(&mut self.pending_interrupts, &mut ctx)?;

        for i in 0..self.cpus.len() {
            dispatcher::dispatch_cpu(
                &mut self.cpus[i],
                &mut self.proc_table,
                &mut self.scheduler,
                &mut self.stats,
                &self.config.time_costs,
            )?;
        }
        for i in 0..self.ios.len() {
            dispatcher::dispatch_io(
                &mut self.ios[i],
                &mut self.proc_table,
                &mut self.scheduler,
                &mut self.stats,
                &self.config.time_costs,
            )?;
        }

        self.memory_manager
            .drain_frees(&mut self.proc_table, &mut self.memory)?;

        self.stats.recompute();

        if self.kill_on_finish && self.proc_table.is_empty() {
            log::info!("workload drained, stopping the model");
            self.running = false;
        }
        Ok(())
    }

    // -------------- Process admission --------------

    /// Build a PCB with a freshly issued PID. The process is not admitted
    /// until it is passed to `load_new_task`.
    pub fn build_process(
        &mut self,
        commands_config: ProcessCommandsConfig,
        block_size: usize,
    ) -> Process {
        let pid = self.next_pid;
        self.next_pid += 1;
        Process::new(pid, commands_config, block_size)
    }

    /// Build a PCB with randomized parameters drawn from the configured
    /// generation ranges.
    pub fn generate_process(&mut self) -> Process {
        let generation = self.config.process_generation;
        let block_size =
            self.rng
                .int_in(generation.min_memory as i64, generation.max_memory as i64) as usize;
        let commands_config = self.random_commands_config();
        self.build_process(commands_config, block_size)
    }

    fn random_commands_config(&mut self) -> ProcessCommandsConfig {
        let generation = self.config.process_generation;
        let commands = self.config.command_generation;
        ProcessCommandsConfig {
            total_commands: self.rng.int_in(
                generation.total_commands_min as i64,
                generation.total_commands_max as i64,
            ) as u64,
            io_ratio: self
                .rng
                .float_in(generation.io_percentage_min, generation.io_percentage_max),
            io_duration_min: generation.io_command_duration_min,
            io_duration_max: generation.io_command_duration_max,
            operand_min: commands.operand_min,
            operand_max: commands.operand_max,
        }
    }

    /// Admit a process: capacity checks, table insert, CPU-queue entry,
    /// first-fit placement, and the derived operand/result addresses. A
    /// placement miss under fragmentation rolls the admission back so every
    /// live PID keeps exactly one owning segment.
    pub fn load_new_task(&mut self, process: Process) -> Result<Pid, SimError> {
        if self.proc_table.len() >= self.config.memory.proc_table_size {
            return Err(SimError::TableFull {
                capacity: self.config.memory.proc_table_size,
            });
        }
        let pid = process.pid();
        let block_size = process.memory_config.block_size;
        if self.memory_manager.available_memory() < block_size {
            return Err(SimError::NotEnoughMemory {
                pid,
                requested: block_size,
            });
        }

        self.proc_table.insert(pid, process);
        self.scheduler
            .enqueue_cpu(pid, &mut self.stats, &self.config.time_costs);

        let Some(block_start) = self.memory_manager.allocate(pid, block_size) else {
            // Enough words in total but no contiguous fit.
            self.scheduler.forget(pid);
            self.proc_table.remove(&pid);
            return Err(SimError::NotEnoughMemory {
                pid,
                requested: block_size,
            });
        };

        let process = self
            .proc_table
            .get_mut(&pid)
            .ok_or(SimError::ProcessMissing(pid))?;
        process.memory_config.block_start = Some(block_start);
        process.memory_config.operands_addr =
            Some(block_start + self.config.command_generation.operands_block_shift);
        process.memory_config.result_addr =
            Some(block_start + self.config.command_generation.result_block_shift);
        process.set_state(ProcessState::Ready);

        self.stats.mark_start(pid);
        self.stats.note_task_loaded();
        log::debug!("admitted process {pid}: {block_size} words at {block_start}");
        Ok(pid)
    }

    /// Admit randomized processes while memory and table capacity allow.
    /// Stops at the first drawn block size that no longer fits.
    fn fill_processes_if_possible(&mut self) -> Result<(), SimError> {
        let generation = self.config.process_generation;
        loop {
            let block_size =
                self.rng
                    .int_in(generation.min_memory as i64, generation.max_memory as i64)
                    as usize;
            if self.memory_manager.available_memory() < block_size
                || self.proc_table.len() >= self.config.memory.proc_table_size
            {
                return Ok(());
            }
            let commands_config = self.random_commands_config();
            let process = self.build_process(commands_config, block_size);
            match self.load_new_task(process) {
                Ok(_) => {}
                Err(SimError::NotEnoughMemory { .. }) | Err(SimError::TableFull { .. }) => {
                    return Ok(());
                }
                Err(err) => return Err(err),
            }
        }
    }

    // -------------- Control plane --------------

    /// Equivalent in all respects to a device-raised interrupt.
    pub fn raise_interrupt(&mut self, interrupt: Interrupt) {
        self.pending_interrupts.push(interrupt);
    }

    /// Kill a live process. Takes effect during the next drain.
    pub fn kill_process(&mut self, pid: Pid) -> Result<(), SimError> {
        if !self.proc_table.contains_key(&pid) {
            return Err(SimError::ProcessMissing(pid));
        }
        self.raise_interrupt(Interrupt::new(InterruptKind::ProcessKilled, pid, None));
        Ok(())
    }

    /// Suspend a process currently executing on a CPU or an IO controller.
    pub fn stop_process(&mut self, pid: Pid) -> Result<(), SimError> {
        let process = self
            .proc_table
            .get(&pid)
            .ok_or(SimError::ProcessMissing(pid))?;
        match process.state() {
            ProcessState::Running => {
                let device = self
                    .cpus
                    .iter()
                    .position(|cpu| cpu.current_process() == Some(pid))
                    .ok_or(SimError::NotExecuting(pid))?;
                self.raise_interrupt(Interrupt::new(
                    InterruptKind::ProcessStoppedCpu,
                    pid,
                    Some(device),
                ));
                Ok(())
            }
            ProcessState::IoRunning => {
                let device = self
                    .ios
                    .iter()
                    .position(|io| io.current_process() == Some(pid))
                    .ok_or(SimError::NotExecuting(pid))?;
                self.raise_interrupt(Interrupt::new(
                    InterruptKind::ProcessStoppedIo,
                    pid,
                    Some(device),
                ));
                Ok(())
            }
            _ => Err(SimError::NotExecuting(pid)),
        }
    }

    /// Resume a process suspended by `stop_process`.
    pub fn resume_process(&mut self, pid: Pid) -> Result<(), SimError> {
        let process = self
            .proc_table
            .get(&pid)
            .ok_or(SimError::ProcessMissing(pid))?;
        let kind = match process.state() {
            ProcessState::StoppedCpu => InterruptKind::ProcessResumedCpu,
            ProcessState::StoppedIo => InterruptKind::ProcessResumedIo,
            _ => return Err(SimError::NotStopped(pid)),
        };
        self.raise_interrupt(Interrupt::new(kind, pid, None));
        Ok(())
    }

    /// Idempotent shutdown: wipe every kernel structure and stop the loop.
    pub fn terminate(&mut self) {
        self.proc_table.clear();
        self.scheduler.clear();
        self.pending_interrupts.clear();
        for cpu in &mut self.cpus {
            cpu.reset();
        }
        for io in &mut self.ios {
            io.reset();
        }
        self.memory.clear_all();
        self.memory_manager.reset();
        self.running = false;
    }

    /// Gate for the automatic per-tick admission.
    pub fn set_loading_enabled(&mut self, enabled: bool) {
        self.loading_enabled = enabled;
    }

    pub fn loading_enabled(&self) -> bool {
        self.loading_enabled
    }

    /// Stop admitting work and halt once the current workload drains.
    pub fn finish_after_drain(&mut self) {
        self.loading_enabled = false;
        self.kill_on_finish = true;
    }

    /// Reseed the random stream; affects only future draws.
    pub fn reseed(&mut self, seed: i64) {
        self.rng.reseed(seed);
        self.config.random.random_seed = seed;
    }

    // -------------- Speed --------------

    pub fn speed(&self) -> f64 {
        self.speed.value()
    }

    pub fn change_speed(&mut self, increase: bool) -> f64 {
        self.speed.change(increase)
    }

    pub fn set_speed(&mut self, value: f64) -> f64 {
        self.speed.set(value)
    }

    // -------------- Reads for external observers --------------

    pub fn running(&self) -> bool {
        self.running
    }

    pub fn config(&self) -> &OsConfig {
        &self.config
    }

    pub fn proc_table(&self) -> &ProcessTable {
        &self.proc_table
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_manager(&self) -> &MemoryManager {
        &self.memory_manager
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    pub fn cpus(&self) -> &[Cpu] {
        &self.cpus
    }

    pub fn ios(&self) -> &[IoController] {
        &self.ios
    }

    pub fn available_memory(&self) -> usize {
        self.memory_manager.available_memory()
    }

    pub fn used_memory(&self) -> usize {
        self.memory_manager.used_memory()
    }
}
