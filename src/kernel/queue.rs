use std::collections::VecDeque;

use super::{Pid, Process};

/// FIFO of owned processes. Strategies may pick from the middle, but only
/// through `remove_at`, so the relative order of the rest never changes.
#[derive(Debug, Default)]
pub struct ProcessQueue {
    processes: VecDeque<Process>,
}

impl ProcessQueue {
    pub fn new() -> ProcessQueue {
        ProcessQueue {
            processes: VecDeque::new(),
        }
    }

    pub fn enqueue(&mut self, process: Process) {
        self.processes.push_back(process);
    }

    /// Puts a process back at the head, ahead of everything queued.
    pub fn enqueue_front(&mut self, process: Process) {
        self.processes.push_front(process);
    }

    pub fn dequeue(&mut self) -> Option<Process> {
        self.processes.pop_front()
    }

    pub fn front(&self) -> Option<&Process> {
        self.processes.front()
    }

    pub fn position(&self, pid: Pid) -> Option<usize> {
        self.processes.iter().position(|p| p.get_id() == pid)
    }

    pub fn remove_at(&mut self, index: usize) -> Option<Process> {
        self.processes.remove(index)
    }

    pub fn remove(&mut self, pid: Pid) -> Option<Process> {
        let index = self.position(pid)?;
        self.processes.remove(index)
    }

    pub fn get(&self, pid: Pid) -> Option<&Process> {
        self.processes.iter().find(|p| p.get_id() == pid)
    }

    pub fn get_mut(&mut self, pid: Pid) -> Option<&mut Process> {
        self.processes.iter_mut().find(|p| p.get_id() == pid)
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.position(pid).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Process> {
        self.processes.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Process> {
        self.processes.iter_mut()
    }

    pub fn ids(&self) -> Vec<Pid> {
        self.processes.iter().map(Process::get_id).collect()
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}
