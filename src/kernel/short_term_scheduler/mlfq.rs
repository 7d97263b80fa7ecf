use std::collections::{HashSet, VecDeque};

use super::{Process, ProcessQueue, Scheduler};

use crate::kernel::Pid;

/// Multilevel feedback queue.
///
/// The processes themselves stay in the ready queue; the levels only hold
/// ids and are reconciled with the ready queue before every selection, so
/// anything that arrives there (admission, unblock, swap-in, preemption)
/// joins the tail of the level recorded on the process, and anything that
/// left it (eviction) is dropped.
///
/// Level 0 is served first. A process that uses its whole quantum is
/// demoted one level; one that waits `aging_threshold` selections at its
/// level is promoted one level.
pub struct Mlfq {
    levels: Vec<VecDeque<Pid>>,
    quantums: Vec<u32>,
    aging_threshold: u32,
    queued: HashSet<Pid>,
}

impl Mlfq {
    pub fn new(quantums: &[u32], aging_threshold: u32) -> Mlfq {
        let quantums: Vec<u32> = if quantums.is_empty() {
            vec![1]
        } else {
            quantums.iter().map(|&quantum| quantum.max(1)).collect()
        };

        Mlfq {
            levels: vec![VecDeque::new(); quantums.len()],
            quantums,
            aging_threshold: aging_threshold.max(1),
            queued: HashSet::new(),
        }
    }

    pub fn get_level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn get_quantum_for_level(&self, level: usize) -> u32 {
        self.quantums[level.min(self.quantums.len() - 1)]
    }

    fn last_level(&self) -> usize {
        self.levels.len() - 1
    }

    /// Appends the process to the tail of its current level.
    pub fn enqueue(&mut self, process: &mut Process) {
        process.clamp_mlfq_level(self.last_level());

        if self.queued.insert(process.get_id()) {
            self.levels[process.get_mlfq_level()].push_back(process.get_id());
        }
    }

    /// Drops ids that are no longer ready and enqueues newcomers in
    /// ready-queue order.
    pub fn sync(&mut self, ready: &mut ProcessQueue) {
        let present: HashSet<Pid> = ready.iter().map(Process::get_id).collect();
        for level in &mut self.levels {
            level.retain(|pid| present.contains(pid));
        }
        self.queued.retain(|pid| present.contains(pid));

        for process in ready.iter_mut() {
            self.enqueue(process);
        }
    }

    /// One aging tick for every queued process. A process whose counter
    /// reaches the threshold moves up one level with its counter reset.
    pub fn apply_aging(&mut self, ready: &mut ProcessQueue) {
        let mut promoted = Vec::new();

        for process in ready.iter_mut() {
            if !self.queued.contains(&process.get_id()) {
                continue;
            }

            process.increment_mlfq_wait();
            if process.get_mlfq_wait() >= self.aging_threshold {
                let from = process.get_mlfq_level();
                process.promote();
                if from != process.get_mlfq_level() {
                    promoted.push((process.get_id(), from));
                }
            }
        }

        for (pid, from) in promoted {
            self.levels[from].retain(|queued| *queued != pid);
            self.levels[from - 1].push_back(pid);
        }
    }

    /// Head of the lowest non-empty level.
    pub fn select_next(&mut self, ready: &mut ProcessQueue) -> Option<Process> {
        for level in 0..self.levels.len() {
            while let Some(pid) = self.levels[level].pop_front() {
                self.queued.remove(&pid);
                if let Some(process) = ready.remove(pid) {
                    return Some(process);
                }
            }
        }

        None
    }

    pub fn get_level_ids(&self, level: usize) -> Vec<Pid> {
        self.levels
            .get(level)
            .map(|queue| queue.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl Scheduler for Mlfq {
    fn name(&self) -> &str {
        "MLFQ"
    }

    fn select(&mut self, ready: &mut ProcessQueue) -> Option<Process> {
        self.select_next(ready)
    }

    fn quantum_for(&self, process: &Process) -> Option<u32> {
        Some(self.get_quantum_for_level(process.get_mlfq_level()))
    }

    fn is_preemptive(&self) -> bool {
        true
    }

    fn before_selection(&mut self, ready: &mut ProcessQueue) {
        self.sync(ready);
        self.apply_aging(ready);
    }

    fn on_quantum_expired(&mut self, process: &mut Process) {
        process.demote(self.last_level());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::io::ProcessConfig;
    use crate::kernel::short_term_scheduler::test_support::{ready_process, ready_queue};

    fn at_level(id: Pid, level: usize) -> Process {
        let mut process = ready_process(id, ProcessConfig::cpu_bound("P", 20, 1));
        for _ in 0..level {
            process.demote(level);
        }
        process
    }

    #[test]
    fn test_mlfq_levels_and_quantums() {
        let mlfq = Mlfq::new(&[1, 2, 4], 5);

        assert_eq!(mlfq.get_level_count(), 3);
        assert_eq!(mlfq.get_quantum_for_level(0), 1);
        assert_eq!(mlfq.get_quantum_for_level(2), 4);
        assert_eq!(mlfq.get_quantum_for_level(9), 4);
    }

    #[test]
    fn test_mlfq_prefers_lower_level() {
        let mut mlfq = Mlfq::new(&[1, 2, 4], 50);
        let mut ready = ProcessQueue::new();
        ready.enqueue(at_level(1, 2));
        ready.enqueue(at_level(2, 1));
        ready.enqueue(at_level(3, 0));
        ready.enqueue(at_level(4, 1));

        mlfq.before_selection(&mut ready);
        let order: Vec<Pid> = std::iter::from_fn(|| mlfq.select(&mut ready))
            .map(|process| process.get_id())
            .collect();

        assert_eq!(order, vec![3, 2, 4, 1]);
    }

    #[test]
    fn test_mlfq_aging_promotes_exactly_one_level() {
        let mut mlfq = Mlfq::new(&[1, 2, 4], 5);
        let mut ready = ProcessQueue::new();
        ready.enqueue(at_level(1, 2));
        mlfq.sync(&mut ready);

        for _ in 0..4 {
            mlfq.apply_aging(&mut ready);
        }
        assert_eq!(ready.get(1).unwrap().get_mlfq_level(), 2);
        assert_eq!(ready.get(1).unwrap().get_mlfq_wait(), 4);

        mlfq.apply_aging(&mut ready);

        let process = ready.get(1).unwrap();
        assert_eq!(process.get_mlfq_level(), 1);
        assert_eq!(process.get_mlfq_wait(), 0);
        assert_eq!(mlfq.get_level_ids(1), vec![1]);
        assert!(mlfq.get_level_ids(2).is_empty());
    }

    #[test]
    fn test_mlfq_demotion_stops_at_last_level() {
        let mut mlfq = Mlfq::new(&[1, 2, 4], 5);
        let mut process = ready_process(1, ProcessConfig::cpu_bound("A", 20, 1));

        for _ in 0..10 {
            mlfq.on_quantum_expired(&mut process);
        }

        assert_eq!(process.get_mlfq_level(), mlfq.get_level_count() - 1);
        assert_eq!(mlfq.quantum_for(&process), Some(4));
    }

    #[test]
    fn test_mlfq_sync_drops_evicted_processes() {
        let mut mlfq = Mlfq::new(&[1, 2], 5);
        let mut ready = ready_queue(vec![
            ProcessConfig::cpu_bound("A", 5, 1),
            ProcessConfig::cpu_bound("B", 5, 1),
        ]);
        mlfq.sync(&mut ready);

        ready.remove(1);
        mlfq.sync(&mut ready);

        assert_eq!(mlfq.get_level_ids(0), vec![2]);
        assert_eq!(mlfq.select(&mut ready).unwrap().get_id(), 2);
        assert!(mlfq.select(&mut ready).is_none());
    }

    #[test]
    fn test_mlfq_resumed_process_keeps_level() {
        let mut mlfq = Mlfq::new(&[1, 2, 4], 5);
        let mut ready = ProcessQueue::new();
        ready.enqueue(at_level(7, 2));

        mlfq.sync(&mut ready);

        assert_eq!(mlfq.get_level_ids(2), vec![7]);
    }
}
