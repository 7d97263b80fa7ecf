use std::fmt;

use super::{MemoryManager, Pid, Process, ProcessQueue, ProcessState};

use crate::error::SimulationError;

/// Owns every queue a process can wait in, plus the memory manager that
/// decides who may be resident.
pub struct MultilevelQueues {
    memory: MemoryManager,
    new_queue: ProcessQueue,
    ready_queue: ProcessQueue,
    blocked_queue: ProcessQueue,
    suspended_queue: ProcessQueue,
    terminated_queue: ProcessQueue,
    swap_outs: usize,
    swap_ins: usize,
}

impl MultilevelQueues {
    pub fn new(memory: MemoryManager) -> MultilevelQueues {
        MultilevelQueues {
            memory,
            new_queue: ProcessQueue::new(),
            ready_queue: ProcessQueue::new(),
            blocked_queue: ProcessQueue::new(),
            suspended_queue: ProcessQueue::new(),
            terminated_queue: ProcessQueue::new(),
            swap_outs: 0,
            swap_ins: 0,
        }
    }

    /// Registers a NEW process for long-term scheduling.
    pub fn admit_process(&mut self, process: Process) {
        self.new_queue.enqueue(process);
    }

    /// Loads NEW processes into memory, in arrival order, while they fit.
    pub fn run_long_term_scheduling(&mut self, cycle: u64) -> Result<Vec<Pid>, SimulationError> {
        let mut admitted = Vec::new();

        while let Some(process) = self.new_queue.front() {
            if !self.memory.has_space_for(process) {
                break;
            }

            let Some(mut process) = self.new_queue.dequeue() else {
                break;
            };
            if !self.memory.admit(&mut process, cycle)? {
                self.new_queue.enqueue_front(process);
                break;
            }
            process.set_arrival_cycle(cycle);

            admitted.push(process.get_id());
            self.ready_queue.enqueue(process);
        }

        Ok(admitted)
    }

    /// Swaps SUSPENDED processes back in, in suspension order, while they fit.
    /// A resumed process keeps its feedback-queue level.
    pub fn run_medium_term_scheduling(&mut self, cycle: u64) -> Result<Vec<Pid>, SimulationError> {
        let mut resumed = Vec::new();

        while let Some(process) = self.suspended_queue.front() {
            if !self.memory.has_space_for(process) {
                break;
            }

            let Some(mut process) = self.suspended_queue.dequeue() else {
                break;
            };
            if !self.memory.admit(&mut process, cycle)? {
                self.suspended_queue.enqueue_front(process);
                break;
            }

            resumed.push(process.get_id());
            self.ready_queue.enqueue(process);
        }

        self.swap_ins += resumed.len();
        Ok(resumed)
    }

    /// True when the head of the NEW queue is waiting only for memory.
    pub fn admission_blocked(&self) -> bool {
        self.new_queue
            .front()
            .map_or(false, |process| !self.memory.has_space_for(process))
    }

    /// Evicts one resident process, READY or BLOCKED, into the suspended queue.
    /// Returns the victim together with the state it was evicted from.
    pub fn perform_swap(&mut self) -> Result<Option<(Pid, ProcessState)>, SimulationError> {
        let candidates = self.ready_queue.iter().chain(self.blocked_queue.iter());
        let Some(victim_id) = self.memory.select_victim(candidates) else {
            return Ok(None);
        };

        let victim = match self.ready_queue.remove(victim_id) {
            Some(process) => Some(process),
            None => self.blocked_queue.remove(victim_id),
        };
        let Some(mut victim) = victim else {
            return Ok(None);
        };

        let from = victim.get_state();
        self.memory.evict(&mut victim)?;
        self.suspended_queue.enqueue(victim);
        self.swap_outs += 1;

        Ok(Some((victim_id, from)))
    }

    /// Moves the running process to BLOCKED with a fresh I/O countdown
    /// starting at `cycle`.
    pub fn block(&mut self, mut process: Process, cycle: u64) -> Result<(), SimulationError> {
        process.transition_to(ProcessState::Blocked)?;
        process.start_io(cycle);
        self.blocked_queue.enqueue(process);
        Ok(())
    }

    /// Returns a BLOCKED process to the tail of the ready queue.
    pub fn unblock(&mut self, pid: Pid) -> Result<bool, SimulationError> {
        let Some(mut process) = self.blocked_queue.remove(pid) else {
            return Ok(false);
        };

        process.clear_io();
        process.transition_to(ProcessState::Ready)?;
        self.ready_queue.enqueue(process);
        Ok(true)
    }

    /// Charges every blocked process with the I/O cycles elapsed up to
    /// `cycle` and unblocks the ones that are done, in blocked-queue order.
    pub fn tick_blocked(&mut self, cycle: u64) -> Result<Vec<Pid>, SimulationError> {
        let finished: Vec<Pid> = self
            .blocked_queue
            .iter_mut()
            .filter_map(|process| process.tick_io(cycle).then(|| process.get_id()))
            .collect();

        for &pid in &finished {
            self.unblock(pid)?;
        }

        Ok(finished)
    }

    /// Puts a preempted process back at the tail of the ready queue.
    pub fn requeue(&mut self, mut process: Process) -> Result<(), SimulationError> {
        process.transition_to(ProcessState::Ready)?;
        self.ready_queue.enqueue(process);
        Ok(())
    }

    /// Frees the memory of a finished process and retires it.
    pub fn terminate(&mut self, mut process: Process) -> Result<(), SimulationError> {
        process.transition_to(ProcessState::Terminated)?;
        self.memory.release(&process);
        self.terminated_queue.enqueue(process);
        Ok(())
    }

    /// Work that can still reach the ready queue without a dispatch.
    pub fn has_pending_work(&self) -> bool {
        !self.blocked_queue.is_empty()
            || !self.suspended_queue.is_empty()
            || !self.new_queue.is_empty()
    }

    pub fn get_memory(&self) -> &MemoryManager {
        &self.memory
    }

    pub fn get_memory_mut(&mut self) -> &mut MemoryManager {
        &mut self.memory
    }

    pub fn get_new_queue(&self) -> &ProcessQueue {
        &self.new_queue
    }

    pub fn get_ready_queue(&self) -> &ProcessQueue {
        &self.ready_queue
    }

    pub fn get_ready_queue_mut(&mut self) -> &mut ProcessQueue {
        &mut self.ready_queue
    }

    pub fn get_blocked_queue(&self) -> &ProcessQueue {
        &self.blocked_queue
    }

    pub fn get_suspended_queue(&self) -> &ProcessQueue {
        &self.suspended_queue
    }

    pub fn get_terminated_queue(&self) -> &ProcessQueue {
        &self.terminated_queue
    }

    pub fn get_swap_outs(&self) -> usize {
        self.swap_outs
    }

    pub fn get_swap_ins(&self) -> usize {
        self.swap_ins
    }

    /// Finds a process in any queue.
    pub fn find(&self, pid: Pid) -> Option<&Process> {
        self.ready_queue
            .get(pid)
            .or_else(|| self.blocked_queue.get(pid))
            .or_else(|| self.suspended_queue.get(pid))
            .or_else(|| self.new_queue.get(pid))
            .or_else(|| self.terminated_queue.get(pid))
    }
}

impl fmt::Display for MultilevelQueues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Queues: new={} ready={} blocked={} suspended={} terminated={}",
            self.new_queue.len(),
            self.ready_queue.len(),
            self.blocked_queue.len(),
            self.suspended_queue.len(),
            self.terminated_queue.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::io::ProcessConfig;
    use crate::kernel::{AllocationMode, EvictionPolicy};

    fn queues_with_slots(slots: usize) -> MultilevelQueues {
        let memory = MemoryManager::new(
            slots * 128,
            128,
            AllocationMode::Fixed,
            EvictionPolicy::LongestResident,
        )
        .unwrap();
        MultilevelQueues::new(memory)
    }

    fn add(queues: &mut MultilevelQueues, id: Pid) {
        queues.admit_process(Process::new(id, &ProcessConfig::io_bound("P", 10, 3, 2, 1)));
    }

    fn run(queues: &mut MultilevelQueues) -> Process {
        let mut process = queues.get_ready_queue_mut().dequeue().unwrap();
        process.transition_to(ProcessState::Running).unwrap();
        process
    }

    #[test]
    fn test_multilevel_queues_long_term_admits_while_memory_allows() {
        let mut queues = queues_with_slots(2);
        for id in 1..=3 {
            add(&mut queues, id);
        }

        let admitted = queues.run_long_term_scheduling(0).unwrap();

        assert_eq!(admitted, vec![1, 2]);
        assert_eq!(queues.get_ready_queue().ids(), vec![1, 2]);
        assert_eq!(queues.get_new_queue().ids(), vec![3]);
        assert!(queues.admission_blocked());
    }

    #[test]
    fn test_multilevel_queues_admits_waiting_process_once_memory_frees() {
        let mut queues = queues_with_slots(2);
        for id in 1..=3 {
            add(&mut queues, id);
        }
        queues.run_long_term_scheduling(0).unwrap();

        let first = run(&mut queues);
        queues.terminate(first).unwrap();
        let admitted = queues.run_long_term_scheduling(7).unwrap();

        assert_eq!(admitted, vec![3]);
        assert_eq!(queues.get_ready_queue().get(3).unwrap().get_arrival_cycle(), 7);
        assert!(!queues.admission_blocked());
    }

    #[test]
    fn test_multilevel_queues_swap_moves_victim_to_suspended() {
        let mut queues = queues_with_slots(2);
        for id in 1..=3 {
            add(&mut queues, id);
        }
        queues.run_long_term_scheduling(0).unwrap();
        let used_before = queues.get_memory().get_used_memory();

        let victim = queues.perform_swap().unwrap();

        assert_eq!(victim, Some((1, ProcessState::Ready)));
        assert!(queues.get_memory().get_used_memory() < used_before);
        assert_eq!(queues.get_suspended_queue().ids(), vec![1]);
        assert!(!queues.get_ready_queue().contains(1));
        assert_eq!(
            queues.get_suspended_queue().get(1).unwrap().get_state(),
            ProcessState::Suspended
        );
        assert_eq!(queues.get_swap_outs(), 1);
    }

    #[test]
    fn test_multilevel_queues_swap_can_evict_blocked_process() {
        let mut queues = queues_with_slots(2);
        add(&mut queues, 1);
        queues.run_long_term_scheduling(0).unwrap();
        add(&mut queues, 2);
        add(&mut queues, 3);
        queues.run_long_term_scheduling(1).unwrap();
        let first = run(&mut queues);
        queues.block(first, 1).unwrap();

        let victim = queues.perform_swap().unwrap();

        assert_eq!(victim, Some((1, ProcessState::Blocked)));
        assert!(queues.get_blocked_queue().is_empty());
        let suspended = queues.get_suspended_queue().get(1).unwrap();
        assert_eq!(suspended.get_io_remaining(), 0);
    }

    #[test]
    fn test_multilevel_queues_swap_without_residents_returns_none() {
        let mut queues = queues_with_slots(1);
        add(&mut queues, 1);

        assert_eq!(queues.perform_swap().unwrap(), None);
    }

    #[test]
    fn test_multilevel_queues_medium_term_resumes_suspended() {
        let mut queues = queues_with_slots(1);
        add(&mut queues, 1);
        add(&mut queues, 2);
        queues.run_long_term_scheduling(0).unwrap();
        queues.perform_swap().unwrap();

        assert_eq!(queues.run_long_term_scheduling(1).unwrap(), vec![2]);
        assert!(queues.run_medium_term_scheduling(1).unwrap().is_empty());

        let second = run(&mut queues);
        queues.terminate(second).unwrap();
        let resumed = queues.run_medium_term_scheduling(5).unwrap();

        assert_eq!(resumed, vec![1]);
        assert_eq!(queues.get_ready_queue().ids(), vec![1]);
        assert_eq!(queues.get_swap_ins(), 1);
    }

    #[test]
    fn test_multilevel_queues_io_countdown_unblocks() {
        let mut queues = queues_with_slots(2);
        add(&mut queues, 1);
        queues.run_long_term_scheduling(0).unwrap();
        let process = run(&mut queues);
        queues.block(process, 3).unwrap();

        assert!(queues.tick_blocked(3).unwrap().is_empty());
        assert!(queues.tick_blocked(4).unwrap().is_empty());
        assert_eq!(queues.tick_blocked(5).unwrap(), vec![1]);
        assert_eq!(
            queues.get_ready_queue().get(1).unwrap().get_state(),
            ProcessState::Ready
        );
        assert!(!queues.has_pending_work());
    }

    #[test]
    fn test_multilevel_queues_rejected_admission_stays_at_head_of_new() {
        let mut queues = queues_with_slots(2);
        add(&mut queues, 1);
        queues.run_long_term_scheduling(0).unwrap();

        add(&mut queues, 1);
        add(&mut queues, 2);
        let admitted = queues.run_long_term_scheduling(1).unwrap();

        assert!(admitted.is_empty());
        assert_eq!(queues.get_new_queue().ids(), vec![1, 2]);
        assert_eq!(queues.get_new_queue().front().unwrap().get_state(), ProcessState::New);
        assert_eq!(queues.get_ready_queue().ids(), vec![1]);
    }

    #[test]
    fn test_multilevel_queues_terminate_releases_memory() {
        let mut queues = queues_with_slots(1);
        add(&mut queues, 1);
        queues.run_long_term_scheduling(0).unwrap();

        let process = run(&mut queues);
        queues.terminate(process).unwrap();

        assert_eq!(queues.get_memory().get_used_memory(), 0);
        assert_eq!(queues.get_terminated_queue().ids(), vec![1]);
        assert!(queues.find(1).is_some());
    }
}
