mod cpu;
mod memory;
mod multilevel_queues;
mod process_control_block;
mod queue;

pub mod concurrent;
pub mod driver;
pub mod short_term_scheduler;

pub use cpu::{Burst, BurstEnd, Cpu, ExecutionMode};
pub use memory::{Allocation, AllocationMode, EvictionPolicy, MemoryManager};
pub use multilevel_queues::MultilevelQueues;
pub use process_control_block::{InstructionOutcome, Pid, Process, ProcessState};
pub use queue::ProcessQueue;
pub use short_term_scheduler::{Scheduler, SchedulingAlgorithm};

pub use concurrent::{ConcurrentReport, ConcurrentRunner};
pub use driver::{Driver, SimulationReport, StepOutcome};
