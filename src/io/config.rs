use serde::{Deserialize, Serialize};

use super::ProcessConfig;

use crate::error::ConfigError;
use crate::kernel::{AllocationMode, EvictionPolicy, SchedulingAlgorithm};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MlfqConfig {
    pub quantums: Vec<u32>,
    pub aging_threshold: u32,
}

impl Default for MlfqConfig {
    fn default() -> MlfqConfig {
        MlfqConfig {
            quantums: vec![1, 2, 4],
            aging_threshold: 5,
        }
    }
}

/// Settings for the thread-pool runner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrentConfig {
    pub workers: usize,
    pub tick_ms: u64,
    pub resource_permits: usize,
}

impl Default for ConcurrentConfig {
    fn default() -> ConcurrentConfig {
        ConcurrentConfig {
            workers: 2,
            tick_ms: 5,
            resource_permits: 1,
        }
    }
}

/// Everything a run needs, handed to the driver once before it starts.
/// Missing keys fall back to the stock configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Display only; cycles are logical.
    pub cycle_duration_ms: u64,
    pub total_memory: usize,
    pub memory_per_process: usize,
    pub allocation: AllocationMode,
    pub algorithm: SchedulingAlgorithm,
    pub round_robin_quantum: u32,
    pub mlfq: MlfqConfig,
    pub eviction_policy: EvictionPolicy,
    /// Consecutive driver iterations without any progress before a run is
    /// declared stalled. Long workloads never hit it.
    pub stall_limit: u64,
    pub concurrent: ConcurrentConfig,
    pub processes: Vec<ProcessConfig>,
}

impl Default for SimulationConfig {
    fn default() -> SimulationConfig {
        SimulationConfig {
            cycle_duration_ms: 1000,
            total_memory: 1024,
            memory_per_process: 128,
            allocation: AllocationMode::Fixed,
            algorithm: SchedulingAlgorithm::Fcfs,
            round_robin_quantum: 2,
            mlfq: MlfqConfig::default(),
            eviction_policy: EvictionPolicy::LongestResident,
            stall_limit: 1_000,
            concurrent: ConcurrentConfig::default(),
            processes: vec![
                ProcessConfig::io_bound("Process A", 10, 3, 2, 3),
                ProcessConfig::cpu_bound("Process B", 7, 1),
                ProcessConfig::io_bound("Process C", 8, 4, 2, 2),
                ProcessConfig::cpu_bound("Process D", 5, 4),
                ProcessConfig::io_bound("Process E", 12, 3, 2, 5),
                ProcessConfig::cpu_bound("Process F", 9, 2),
            ],
        }
    }
}

impl SimulationConfig {
    /// Same system parameters, different workload.
    pub fn with_processes(mut self, processes: Vec<ProcessConfig>) -> SimulationConfig {
        self.processes = processes;
        self
    }

    pub fn with_algorithm(mut self, algorithm: SchedulingAlgorithm) -> SimulationConfig {
        self.algorithm = algorithm;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.total_memory == 0 {
            return Err(ConfigError::ZeroTotalMemory);
        }
        if self.memory_per_process == 0 || self.memory_per_process > self.total_memory {
            return Err(ConfigError::InvalidMemoryPerProcess {
                memory_per_process: self.memory_per_process,
                total_memory: self.total_memory,
            });
        }
        if self.round_robin_quantum == 0 {
            return Err(ConfigError::ZeroQuantum);
        }
        if self.mlfq.quantums.is_empty() {
            return Err(ConfigError::NoMlfqLevels);
        }
        if self.mlfq.quantums.contains(&0) {
            return Err(ConfigError::ZeroQuantum);
        }
        if self.mlfq.aging_threshold == 0 {
            return Err(ConfigError::ZeroAgingThreshold);
        }

        for process in &self.processes {
            if process.instructions == 0 {
                return Err(ConfigError::EmptyProcess {
                    name: process.name.clone(),
                });
            }
            if self.allocation == AllocationMode::Requested
                && (process.memory == 0 || process.memory > self.total_memory)
            {
                return Err(ConfigError::ProcessMemoryTooLarge {
                    name: process.name.clone(),
                    memory: process.memory,
                    total_memory: self.total_memory,
                });
            }
        }

        Ok(())
    }
}
