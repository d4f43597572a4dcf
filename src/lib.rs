#![doc = r#"
osim library crate.

A discrete-event simulator of a multiprogrammed operating system: synthetic
processes execute over multiple CPUs and IO controllers, every state
transition is mediated by interrupts, and detailed timing statistics compare
the multiprogrammed run against a hypothetical uniprogrammed baseline.

Modules:
- alu: pure arithmetic over two machine words
- command: the closed command set (ALU / IO / Exit)
- config: configuration sections, defaults, JSON loader
- control: interactive command parser and executor
- devices: CPU and IO-controller state machines
- error: crate-wide error type
- interrupt: interrupt values drained once per tick
- memory: bounded array of optional machine words
- memory_manager: first-fit allocator with coalescing and deferred frees
- os: the OsModel tick loop, dispatcher, and interrupt handler
- process: PCB, process states, and the command-stream generator
- random: seedable uniform random source
- scheduler: the two FIFO device queues
- speed: real-time throttle parameters for the outer loop
- stats: per-process and system-wide timing statistics

In tests, shared builders are available under `crate::test_utils`.
"#]

pub mod alu;
pub mod command;
pub mod config;
pub mod control;
pub mod devices;
pub mod error;
pub mod interrupt;
pub mod memory;
pub mod memory_manager;
pub mod os;
pub mod process;
pub mod random;
pub mod scheduler;
pub mod speed;
pub mod stats;

// Re-export commonly used types at the crate root for convenience.
pub use config::OsConfig;
pub use error::SimError;
pub use os::OsModel;
pub use process::{Pid, Process, ProcessState};

// Shared test utilities (only compiled for tests)
#[cfg(test)]
pub mod test_utils;
