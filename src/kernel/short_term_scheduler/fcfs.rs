use super::{Process, ProcessQueue, Scheduler};

/// First come, first served: always the head of the ready queue.
pub struct Fcfs;

impl Fcfs {
    pub fn new() -> Fcfs {
        Fcfs
    }
}

impl Scheduler for Fcfs {
    fn name(&self) -> &str {
        "FCFS"
    }

    fn select(&mut self, ready: &mut ProcessQueue) -> Option<Process> {
        ready.dequeue()
    }
}
