use std::fmt;

use crate::kernel::{Pid, ProcessState};

/// Rejected configuration. Raised before any memory manager or driver exists.
#[derive(Debug)]
pub enum ConfigError {
    ZeroTotalMemory,
    InvalidMemoryPerProcess { memory_per_process: usize, total_memory: usize },
    ProcessMemoryTooLarge { name: String, memory: usize, total_memory: usize },
    EmptyProcess { name: String },
    UnknownAlgorithm(u8),
    ZeroQuantum,
    NoMlfqLevels,
    ZeroAgingThreshold,
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroTotalMemory => write!(f, "total memory must be greater than zero"),
            ConfigError::InvalidMemoryPerProcess { memory_per_process, total_memory } => write!(
                f,
                "memory per process ({} KB) must be in 1..={} KB",
                memory_per_process, total_memory
            ),
            ConfigError::ProcessMemoryTooLarge { name, memory, total_memory } => write!(
                f,
                "process '{}' requires {} KB but total memory is {} KB",
                name, memory, total_memory
            ),
            ConfigError::EmptyProcess { name } => {
                write!(f, "process '{}' has no instructions", name)
            }
            ConfigError::UnknownAlgorithm(id) => {
                write!(f, "unknown scheduling algorithm {} (expected 1-6)", id)
            }
            ConfigError::ZeroQuantum => write!(f, "quantum must be at least one instruction"),
            ConfigError::NoMlfqLevels => write!(f, "MLFQ needs at least one level"),
            ConfigError::ZeroAgingThreshold => write!(f, "MLFQ aging threshold must be non-zero"),
            ConfigError::Io(err) => write!(f, "failed to read configuration: {}", err),
            ConfigError::Parse(err) => write!(f, "malformed configuration: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> ConfigError {
        ConfigError::Io(err)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> ConfigError {
        ConfigError::Parse(err)
    }
}

/// Failure of a running simulation. Both variants indicate an engine defect,
/// never a property of a valid workload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimulationError {
    IllegalTransition { pid: Pid, from: ProcessState, to: ProcessState },
    Stalled { cycle: u64 },
    /// A worker or the clock hung up before the run finished.
    Disconnected,
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::IllegalTransition { pid, from, to } => write!(
                f,
                "process {} cannot move from {} to {}",
                pid, from, to
            ),
            SimulationError::Stalled { cycle } => {
                write!(f, "simulation made no progress before cycle {}", cycle)
            }
            SimulationError::Disconnected => f.write_str("worker channel closed unexpectedly"),
        }
    }
}

impl std::error::Error for SimulationError {}
