use super::{Process, ProcessQueue, Scheduler};

/// Head of the ready queue with a fixed quantum. The driver puts a
/// preempted process back at the tail.
pub struct RoundRobin {
    quantum: u32,
}

impl RoundRobin {
    pub fn new(quantum: u32) -> RoundRobin {
        RoundRobin {
            quantum: quantum.max(1),
        }
    }

    pub fn get_quantum(&self) -> u32 {
        self.quantum
    }
}

impl Scheduler for RoundRobin {
    fn name(&self) -> &str {
        "Round Robin"
    }

    fn select(&mut self, ready: &mut ProcessQueue) -> Option<Process> {
        ready.dequeue()
    }

    fn quantum_for(&self, _process: &Process) -> Option<u32> {
        Some(self.quantum)
    }

    fn is_preemptive(&self) -> bool {
        true
    }
}
