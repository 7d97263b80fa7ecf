use super::{position_of_min, Process, ProcessQueue, Scheduler};

/// Shortest job first over remaining instructions. Non-preemptive.
pub struct Sjf;

impl Sjf {
    pub fn new() -> Sjf {
        Sjf
    }
}

impl Scheduler for Sjf {
    fn name(&self) -> &str {
        "SJF"
    }

    fn select(&mut self, ready: &mut ProcessQueue) -> Option<Process> {
        let index = position_of_min(ready, Process::remaining_instructions)?;
        ready.remove_at(index)
    }
}
