//! Shared test utilities: compact builders for configurations and injected
//! workloads.
//!
//! These de-duplicate setup across the device, allocator, and scenario
//! tests. They intentionally support just what the test suite needs: small
//! fully-specified configs with deterministic seeds, automatic admission
//! turned off, and processes whose command mix is forced to a single kind
//! via an `io_ratio` of exactly 0.0 or 1.0.

#![allow(dead_code)]

use crate::config::{CpuConfig, IoConfig, MemoryConfig, OsConfig, RandomConfig};
use crate::os::OsModel;
use crate::process::{Pid, ProcessCommandsConfig};

/// A small deterministic config: `cpus` CPUs with the given quantum, `ios`
/// controllers, `total_memory` words, and an admission cap of `proc_table_size`.
pub fn small_config(
    cpus: usize,
    ios: usize,
    quantum_size: u64,
    total_memory: usize,
    proc_table_size: usize,
) -> OsConfig {
    OsConfig {
        memory: MemoryConfig {
            total_memory,
            proc_table_size,
        },
        cpu: CpuConfig {
            cpus_num: cpus,
            quantum_size,
        },
        io: IoConfig { ios_num: ios },
        random: RandomConfig { random_seed: 1 },
        ..OsConfig::default()
    }
}

/// A model over `config` with automatic admission disabled, so tests inject
/// exactly the workload they mean to.
pub fn manual_model(config: OsConfig) -> OsModel {
    let mut model = OsModel::new(config);
    model.set_loading_enabled(false);
    model
}

/// A command mix of `total` pure-ALU commands.
pub fn alu_only(total: u64) -> ProcessCommandsConfig {
    ProcessCommandsConfig {
        total_commands: total,
        io_ratio: 0.0,
        ..ProcessCommandsConfig::default()
    }
}

/// A command mix of `total` IO commands, each taking exactly `duration`
/// controller ticks.
pub fn io_only(total: u64, duration: u64) -> ProcessCommandsConfig {
    ProcessCommandsConfig {
        total_commands: total,
        io_ratio: 1.0,
        io_duration_min: duration,
        io_duration_max: duration,
        ..ProcessCommandsConfig::default()
    }
}

/// Build and admit one process; panics on rejection (tests size their
/// configs to fit).
pub fn inject(model: &mut OsModel, commands: ProcessCommandsConfig, block_size: usize) -> Pid {
    let process = model.build_process(commands, block_size);
    model
        .load_new_task(process)
        .expect("test workload should be admitted")
}
