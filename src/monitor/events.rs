use std::collections::VecDeque;
use std::fmt;

use log::Level;

use crate::kernel::{Pid, Process, ProcessState};

const DEFAULT_CAPACITY: usize = 1000;
const LOG_TARGET: &str = "simulation";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SwapDirection {
    In,
    Out,
}

/// Identity of the process an event is about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessRef {
    pub pid: Pid,
    pub name: String,
}

impl From<&Process> for ProcessRef {
    fn from(process: &Process) -> ProcessRef {
        ProcessRef {
            pid: process.get_id(),
            name: process.get_name().to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SimulationEvent {
    Admission {
        process: ProcessRef,
        cpu_bound: bool,
        instructions: u32,
        priority: u32,
    },
    Selection {
        process: ProcessRef,
        scheduler: String,
        program_counter: u32,
        total: u32,
    },
    StateChange {
        process: ProcessRef,
        from: ProcessState,
        to: ProcessState,
    },
    Block {
        process: ProcessRef,
        program_counter: u32,
    },
    Unblock {
        process: ProcessRef,
    },
    Swap {
        process: ProcessRef,
        policy: &'static str,
        direction: SwapDirection,
    },
    Termination {
        process: ProcessRef,
        program_counter: u32,
        total: u32,
    },
    QuantumExpired {
        process: ProcessRef,
        quantum: u32,
    },
    CpuIdle {
        reason: String,
    },
    LongTerm {
        admitted: usize,
        waiting: usize,
    },
    MediumTerm {
        resumed: usize,
    },
    Execution {
        process: ProcessRef,
        executed: u32,
        program_counter: u32,
        total: u32,
    },
    System(String),
    Warning(String),
    Error(String),
}

impl SimulationEvent {
    pub fn level(&self) -> Level {
        match self {
            SimulationEvent::Execution { .. }
            | SimulationEvent::CpuIdle { .. }
            | SimulationEvent::StateChange { .. } => Level::Debug,
            SimulationEvent::Warning(_) => Level::Warn,
            SimulationEvent::Error(_) => Level::Error,
            _ => Level::Info,
        }
    }

    pub fn process(&self) -> Option<&ProcessRef> {
        match self {
            SimulationEvent::Admission { process, .. }
            | SimulationEvent::Selection { process, .. }
            | SimulationEvent::StateChange { process, .. }
            | SimulationEvent::Block { process, .. }
            | SimulationEvent::Unblock { process }
            | SimulationEvent::Swap { process, .. }
            | SimulationEvent::Termination { process, .. }
            | SimulationEvent::QuantumExpired { process, .. }
            | SimulationEvent::Execution { process, .. } => Some(process),
            _ => None,
        }
    }
}

impl fmt::Display for SimulationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationEvent::Admission { process, cpu_bound, instructions, priority } => write!(
                f,
                "ADMISSION: {} (ID:{}, {}, {} inst, Prior:{})",
                process.name,
                process.pid,
                if *cpu_bound { "CPU-bound" } else { "I/O-bound" },
                instructions,
                priority
            ),
            SimulationEvent::Selection { process, scheduler, program_counter, total } => write!(
                f,
                "SCHEDULER ({}) -> selects {} (ID:{}, PC:{}/{})",
                scheduler, process.name, process.pid, program_counter, total
            ),
            SimulationEvent::StateChange { process, from, to } => {
                write!(f, "STATE: {} {} -> {}", process.name, from, to)
            }
            SimulationEvent::Block { process, program_counter } => {
                write!(f, "BLOCK: {} -> I/O request (PC:{})", process.name, program_counter)
            }
            SimulationEvent::Unblock { process } => write!(f, "UNBLOCK: {} -> READY", process.name),
            SimulationEvent::Swap { process, policy, direction } => {
                let operation = match direction {
                    SwapDirection::In => "SWAP IN",
                    SwapDirection::Out => "SWAP OUT",
                };
                write!(f, "{}: {} (policy: {})", operation, process.name, policy)
            }
            SimulationEvent::Termination { process, program_counter, total } => write!(
                f,
                "TERMINATED: {} (instructions: {}/{})",
                process.name, program_counter, total
            ),
            SimulationEvent::QuantumExpired { process, quantum } => write!(
                f,
                "QUANTUM EXPIRED: {} (q={}) -> ready queue",
                process.name, quantum
            ),
            SimulationEvent::CpuIdle { reason } => write!(f, "CPU IDLE: {}", reason),
            SimulationEvent::LongTerm { admitted, waiting } => write!(
                f,
                "LONG-TERM: {} processes loaded, {} waiting",
                admitted, waiting
            ),
            SimulationEvent::MediumTerm { resumed } => {
                write!(f, "MEDIUM-TERM: {} processes resumed", resumed)
            }
            SimulationEvent::Execution { process, executed, program_counter, total } => write!(
                f,
                "EXECUTION: {} ran {} instructions (PC:{}/{})",
                process.name, executed, program_counter, total
            ),
            SimulationEvent::System(message) => f.write_str(message),
            SimulationEvent::Warning(message) => write!(f, "WARNING: {}", message),
            SimulationEvent::Error(message) => write!(f, "ERROR: {}", message),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggedEvent {
    pub cycle: u64,
    pub event: SimulationEvent,
}

impl fmt::Display for LoggedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Cycle {}] {}", self.cycle, self.event)
    }
}

/// Receives every scheduling decision the driver makes.
pub trait SimulationLogger {
    fn log(&mut self, cycle: u64, event: SimulationEvent);
}

/// Forwards events to the `log` facade and keeps the most recent ones.
pub struct EventLog {
    enabled: bool,
    capacity: usize,
    buffer: VecDeque<LoggedEvent>,
    total: usize,
}

impl EventLog {
    pub fn new() -> EventLog {
        EventLog::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> EventLog {
        EventLog {
            enabled: true,
            capacity: capacity.max(1),
            buffer: VecDeque::new(),
            total: 0,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Number of events recorded since creation, including evicted ones.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Up to `n` most recent events, oldest first.
    pub fn recent(&self, n: usize) -> impl Iterator<Item = &LoggedEvent> {
        let skip = self.buffer.len().saturating_sub(n);
        self.buffer.iter().skip(skip)
    }

    pub fn all(&self) -> impl Iterator<Item = &LoggedEvent> {
        self.buffer.iter()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for EventLog {
    fn default() -> EventLog {
        EventLog::new()
    }
}

impl SimulationLogger for EventLog {
    fn log(&mut self, cycle: u64, event: SimulationEvent) {
        if !self.enabled {
            return;
        }

        log::log!(target: LOG_TARGET, event.level(), "[Cycle {}] {}", cycle, event);

        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(LoggedEvent { cycle, event });
        self.total += 1;
    }
}
