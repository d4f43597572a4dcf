/*!
Engine configuration: sections, defaults, and the JSON loader.

The on-disk format mirrors the section layout consumed at construction:
`memory`, `cpu`, `io`, `speed`, `process_generation`, `command_generation`,
`random`, `time_costs`. Every section and every field is optional; missing
pieces fall back to the documented defaults, and a missing or malformed file
is equivalent to an empty one (a warning is logged, the engine starts with
defaults). Unknown keys are ignored.
*/

use std::path::Path;

use serde::Deserialize;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// Physical memory size in machine words.
    pub total_memory: usize,
    /// Maximum number of simultaneously loaded processes.
    pub proc_table_size: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            total_memory: 1024,
            proc_table_size: 64,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CpuConfig {
    pub cpus_num: usize,
    /// Consecutive ticks a process may hold a CPU before preemption.
    pub quantum_size: u64,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            cpus_num: 3,
            quantum_size: 5,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct IoConfig {
    pub ios_num: usize,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self { ios_num: 3 }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    /// Ticks per real-time second driven by the outer loop.
    pub speed: f64,
    /// Relative step applied by speed+/speed-.
    pub speed_multiplier: f64,
    pub min_speed: f64,
    pub max_speed: f64,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            speed: 1.0,
            speed_multiplier: 0.1,
            min_speed: 0.1,
            max_speed: 10.0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProcessGenerationConfig {
    pub min_memory: usize,
    pub max_memory: usize,
    pub total_commands_min: u64,
    pub total_commands_max: u64,
    pub io_percentage_min: f64,
    pub io_percentage_max: f64,
    pub io_command_duration_min: u64,
    pub io_command_duration_max: u64,
}

impl Default for ProcessGenerationConfig {
    fn default() -> Self {
        Self {
            min_memory: 3,
            max_memory: 10,
            total_commands_min: 1,
            total_commands_max: 10,
            io_percentage_min: 0.0,
            io_percentage_max: 0.5,
            io_command_duration_min: 1,
            io_command_duration_max: 5,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CommandGenerationConfig {
    pub operand_min: i64,
    pub operand_max: i64,
    /// Word offset of the operand pair inside a process block.
    pub operands_block_shift: usize,
    /// Word offset of the result cell inside a process block.
    pub result_block_shift: usize,
}

impl Default for CommandGenerationConfig {
    fn default() -> Self {
        Self {
            operand_min: 1,
            operand_max: 10,
            operands_block_shift: 0,
            result_block_shift: 2,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RandomConfig {
    /// Negative selects a nondeterministic stream.
    pub random_seed: i64,
}

impl Default for RandomConfig {
    fn default() -> Self {
        Self { random_seed: 1 }
    }
}

/// Fixed costs (in ticks) billed for OS services.
#[derive(Copy, Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct TimeCosts {
    /// Picking the next process off the CPU queue.
    pub t_next: f64,
    /// Switching a process state.
    pub t_state: f64,
    /// Initiating an IO transfer.
    pub t_init_io: f64,
    /// Servicing an IO-completion signal.
    pub t_end_io: f64,
    /// Loading a task onto a CPU.
    pub t_load: f64,
    /// Touching shared OS structures.
    pub t_global: f64,
}

impl Default for TimeCosts {
    fn default() -> Self {
        Self {
            t_next: 1.0,
            t_state: 1.0,
            t_init_io: 1.0,
            t_end_io: 1.0,
            t_load: 1.0,
            t_global: 1.0,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OsConfig {
    pub memory: MemoryConfig,
    pub cpu: CpuConfig,
    pub io: IoConfig,
    pub speed: SpeedConfig,
    pub process_generation: ProcessGenerationConfig,
    pub command_generation: CommandGenerationConfig,
    pub random: RandomConfig,
    pub time_costs: TimeCosts,
}

impl OsConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Load a configuration file, falling back to defaults when the file is
    /// missing or malformed.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) => {
                log::warn!("config {}: {err}; using defaults", path.display());
                return Self::default();
            }
        };
        match Self::from_json_str(&text) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("config {}: {err}; using defaults", path.display());
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_all_defaults() {
        let config = OsConfig::from_json_str("{}").unwrap();
        assert_eq!(config, OsConfig::default());
        assert_eq!(config.memory.total_memory, 1024);
        assert_eq!(config.cpu.quantum_size, 5);
        assert_eq!(config.time_costs.t_global, 1.0);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = OsConfig::from_json_str(
            r#"{
                "memory": { "total_memory": 64 },
                "cpu": { "cpus_num": 1, "quantum_size": 2 },
                "random": { "random_seed": -5 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.memory.total_memory, 64);
        assert_eq!(config.memory.proc_table_size, 64);
        assert_eq!(config.cpu.cpus_num, 1);
        assert_eq!(config.io.ios_num, 3);
        assert_eq!(config.random.random_seed, -5);
    }

    #[test]
    fn malformed_json_is_rejected_by_the_parser() {
        assert!(OsConfig::from_json_str("{ not json").is_err());
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = OsConfig::load("definitely/not/a/config.json");
        assert_eq!(config, OsConfig::default());
    }
}
