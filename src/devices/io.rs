/*!
IO controller: counts down the duration of the bound process's IO command.

The countdown increments once per tick; on the tick after it reaches the
command duration the controller raises `ProcessIoEnd`, and the handler
returns the process to the CPU queue and refills the controller within the
same tick. The bound process's current command must be an IO command; the
dispatcher only ever loads IO-blocked processes here, so anything else means
the run is corrupt.
*/

use crate::command::Command;
use crate::devices::DeviceState;
use crate::error::SimError;
use crate::interrupt::{Interrupt, InterruptKind};
use crate::process::{Pid, ProcessTable};

#[derive(Debug)]
pub struct IoController {
    device_id: usize,
    state: DeviceState,
    current_process: Option<Pid>,
    /// Ticks of the current transfer already serviced.
    current_ticks_executed: u64,
    /// Ticks serviced over the whole run.
    total_ticks_executed: u64,
}

impl IoController {
    pub fn new(device_id: usize) -> Self {
        Self {
            device_id,
            state: DeviceState::Idle,
            current_process: None,
            current_ticks_executed: 0,
            total_ticks_executed: 0,
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
    pub fn current_ticks_executed(&self) -> u64 {
        self.current_ticks_executed
    }

    #[inline]
    pub fn total_ticks_executed(&self) -> u64 {
        self.total_ticks_executed
    }

    /// Same setter contract as the CPU: no process means IDLE and a reset
    /// transfer counter.
    pub(crate) fn set_current_process(&mut self, process: Option<Pid>) {
        self.current_process = process;
        match process {
            None => {
                self.state = DeviceState::Idle;
                self.current_ticks_executed = 0;
            }
            Some(_) => self.state = DeviceState::Running,
        }
    }

    pub(crate) fn reset(&mut self) {
        self.set_current_process(None);
        self.total_ticks_executed = 0;
    }

    /// Execute one simulation tick of the transfer countdown.
    pub(crate) fn execute_tick(
        &mut self,
        table: &ProcessTable,
        interrupts: &mut Vec<Interrupt>,
    ) -> Result<(), SimError> {
        let Some(pid) = self.current_process else {
            return Ok(());
        };
        let process = table.get(&pid).ok_or(SimError::ProcessMissing(pid))?;
        let Some(Command::Io { duration }) = process.current_command() else {
            return Err(SimError::NotAnIoCommand {
                device: self.device_id,
            });
        };

        if self.current_ticks_executed == duration {
            interrupts.push(Interrupt::new(
                InterruptKind::ProcessIoEnd,
                pid,
                Some(self.device_id),
            ));
        } else {
            self.current_ticks_executed += 1;
            self.total_ticks_executed += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{Process, ProcessCommandsConfig, ProcessState};

    fn table_with_io_process(duration: u64) -> ProcessTable {
        let mut table = ProcessTable::new();
        let mut process = Process::new(0, ProcessCommandsConfig::default(), 4);
        process.set_state(ProcessState::IoRunning);
        // Plant the IO command the CPU would have generated.
        let mut memory = crate::memory::Memory::new(4);
        let mut rng = crate::random::RandomSource::from_seed(1);
        process.commands_config.io_ratio = 1.0;
        process.commands_config.io_duration_min = duration;
        process.commands_config.io_duration_max = duration;
        process.generate_command(&mut memory, &mut rng).unwrap();
        table.insert(0, process);
        table
    }

    #[test]
    fn countdown_raises_end_after_duration_ticks() {
        let table = table_with_io_process(3);
        let mut io = IoController::new(0);
        io.set_current_process(Some(0));
        let mut interrupts = Vec::new();

        for _ in 0..3 {
            io.execute_tick(&table, &mut interrupts).unwrap();
            assert!(interrupts.is_empty());
        }
        assert_eq!(io.current_ticks_executed(), 3);

        io.execute_tick(&table, &mut interrupts).unwrap();
        assert_eq!(
            interrupts,
            vec![Interrupt::new(InterruptKind::ProcessIoEnd, 0, Some(0))]
        );
        assert_eq!(io.total_ticks_executed(), 3);
    }

    #[test]
    fn idle_controller_does_nothing() {
        let table = ProcessTable::new();
        let mut io = IoController::new(0);
        let mut interrupts = Vec::new();
        io.execute_tick(&table, &mut interrupts).unwrap();
        assert!(interrupts.is_empty());
    }

    #[test]
    fn non_io_command_is_a_corrupt_run() {
        let mut table = ProcessTable::new();
        let mut process = Process::new(0, ProcessCommandsConfig::default(), 4);
        process.set_state(ProcessState::IoRunning);
        table.insert(0, process);

        let mut io = IoController::new(2);
        io.set_current_process(Some(0));
        let mut interrupts = Vec::new();
        assert_eq!(
            io.execute_tick(&table, &mut interrupts),
            Err(SimError::NotAnIoCommand { device: 2 })
        );
    }
}
