use serde::{Deserialize, Serialize};

const DEFAULT_IO_DURATION: u32 = 2;
const DEFAULT_PRIORITY: u32 = 1;
const DEFAULT_MEMORY_KB: usize = 128;

/// Description of one process, as handed over by the configuration provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub name: String,
    pub instructions: u32,
    #[serde(default)]
    pub cpu_bound: bool,
    /// Instructions between I/O requests. Zero disables I/O.
    #[serde(default)]
    pub io_interval: u32,
    /// Cycles spent blocked per I/O request.
    #[serde(default = "default_io_duration")]
    pub io_duration: u32,
    /// Lower value means higher priority.
    #[serde(default = "default_priority")]
    pub priority: u32,
    #[serde(default = "default_memory")]
    pub memory: usize,
    /// Program counter at which the process requests the shared resource.
    /// Only the concurrent runner honours it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_at: Option<u32>,
}

impl ProcessConfig {
    pub fn cpu_bound(name: &str, instructions: u32, priority: u32) -> ProcessConfig {
        ProcessConfig {
            name: name.to_string(),
            instructions,
            cpu_bound: true,
            io_interval: 0,
            io_duration: DEFAULT_IO_DURATION,
            priority,
            memory: DEFAULT_MEMORY_KB,
            resource_at: None,
        }
    }

    pub fn io_bound(
        name: &str,
        instructions: u32,
        io_interval: u32,
        io_duration: u32,
        priority: u32,
    ) -> ProcessConfig {
        ProcessConfig {
            name: name.to_string(),
            instructions,
            cpu_bound: false,
            io_interval,
            io_duration,
            priority,
            memory: DEFAULT_MEMORY_KB,
            resource_at: None,
        }
    }

    pub fn with_memory(mut self, memory: usize) -> ProcessConfig {
        self.memory = memory;
        self
    }
}

fn default_io_duration() -> u32 {
    DEFAULT_IO_DURATION
}

fn default_priority() -> u32 {
    DEFAULT_PRIORITY
}

fn default_memory() -> usize {
    DEFAULT_MEMORY_KB
}
