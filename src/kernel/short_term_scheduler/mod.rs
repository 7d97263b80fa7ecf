mod fcfs;
mod hrrn;
mod mlfq;
mod priority;
mod round_robin;
mod sjf;

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Process, ProcessQueue};

use crate::error::ConfigError;
use crate::io::MlfqConfig;

pub use fcfs::Fcfs;
pub use hrrn::Hrrn;
pub use mlfq::Mlfq;
pub use priority::Priority;
pub use round_robin::RoundRobin;
pub use sjf::Sjf;

/// Selection policy over the ready queue, plus the few capabilities the
/// driver asks about instead of inspecting the concrete strategy.
pub trait Scheduler {
    fn name(&self) -> &str;

    /// Removes and returns the next process to dispatch. The rest of the
    /// queue keeps its order.
    fn select(&mut self, ready: &mut ProcessQueue) -> Option<Process>;

    /// Instruction limit for one burst of `process`; `None` runs it until
    /// it terminates or blocks.
    fn quantum_for(&self, _process: &Process) -> Option<u32> {
        None
    }

    fn is_preemptive(&self) -> bool {
        false
    }

    /// Called once per driver iteration, right before `select`.
    fn before_selection(&mut self, _ready: &mut ProcessQueue) {}

    /// Called when a process used its whole quantum, before it is requeued.
    fn on_quantum_expired(&mut self, _process: &mut Process) {}
}

/// Strategy identifier, numbered the way the CLI presents them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SchedulingAlgorithm {
    Fcfs = 1,
    Sjf = 2,
    RoundRobin = 3,
    Priority = 4,
    Hrrn = 5,
    Mlfq = 6,
}

impl SchedulingAlgorithm {
    pub const ALL: [SchedulingAlgorithm; 6] = [
        SchedulingAlgorithm::Fcfs,
        SchedulingAlgorithm::Sjf,
        SchedulingAlgorithm::RoundRobin,
        SchedulingAlgorithm::Priority,
        SchedulingAlgorithm::Hrrn,
        SchedulingAlgorithm::Mlfq,
    ];

    pub fn build(self, round_robin_quantum: u32, mlfq: &MlfqConfig) -> Box<dyn Scheduler> {
        match self {
            SchedulingAlgorithm::Fcfs => Box::new(Fcfs::new()),
            SchedulingAlgorithm::Sjf => Box::new(Sjf::new()),
            SchedulingAlgorithm::RoundRobin => Box::new(RoundRobin::new(round_robin_quantum)),
            SchedulingAlgorithm::Priority => Box::new(Priority::new()),
            SchedulingAlgorithm::Hrrn => Box::new(Hrrn::new()),
            SchedulingAlgorithm::Mlfq => Box::new(Mlfq::new(&mlfq.quantums, mlfq.aging_threshold)),
        }
    }
}

impl TryFrom<u8> for SchedulingAlgorithm {
    type Error = ConfigError;

    fn try_from(id: u8) -> Result<SchedulingAlgorithm, ConfigError> {
        SchedulingAlgorithm::ALL
            .into_iter()
            .find(|algorithm| *algorithm as u8 == id)
            .ok_or(ConfigError::UnknownAlgorithm(id))
    }
}

impl From<SchedulingAlgorithm> for u8 {
    fn from(algorithm: SchedulingAlgorithm) -> u8 {
        algorithm as u8
    }
}

impl fmt::Display for SchedulingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SchedulingAlgorithm::Fcfs => "FCFS (First Come, First Served)",
            SchedulingAlgorithm::Sjf => "SJF (Shortest Job First)",
            SchedulingAlgorithm::RoundRobin => "Round Robin",
            SchedulingAlgorithm::Priority => "Priority",
            SchedulingAlgorithm::Hrrn => "HRRN (Highest Response Ratio Next)",
            SchedulingAlgorithm::Mlfq => "MLFQ (Multilevel Feedback Queue)",
        };
        f.write_str(name)
    }
}

/// Index of the first process minimising `key`; earlier entries win ties.
fn position_of_min<K, F>(ready: &ProcessQueue, mut key: F) -> Option<usize>
where
    K: Ord,
    F: FnMut(&Process) -> K,
{
    let mut best: Option<(usize, K)> = None;

    for (index, process) in ready.iter().enumerate() {
        let candidate = key(process);
        match &best {
            Some((_, current)) if *current <= candidate => {}
            _ => best = Some((index, candidate)),
        }
    }

    best.map(|(index, _)| index)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    use crate::io::ProcessConfig;
    use crate::kernel::{Pid, ProcessState};

    pub fn ready_process(id: Pid, config: ProcessConfig) -> Process {
        let mut process = Process::new(id, &config);
        process.transition_to(ProcessState::Ready).unwrap();
        process
    }

    pub fn ready_queue(configs: Vec<ProcessConfig>) -> ProcessQueue {
        let mut queue = ProcessQueue::new();
        for (index, config) in configs.into_iter().enumerate() {
            queue.enqueue(ready_process(index as Pid + 1, config));
        }
        queue
    }

    pub fn drain(scheduler: &mut dyn Scheduler, ready: &mut ProcessQueue) -> Vec<Pid> {
        let mut order = Vec::new();
        scheduler.before_selection(ready);
        while let Some(process) = scheduler.select(ready) {
            order.push(process.get_id());
            scheduler.before_selection(ready);
        }
        order
    }
}
