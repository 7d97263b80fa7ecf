use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Pid, Process, ProcessState};

use crate::error::{ConfigError, SimulationError};

/// How much memory a resident process occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllocationMode {
    /// Every process takes one slot of `memory_per_process`.
    Fixed,
    /// Every process takes the memory it asked for.
    Requested,
}

/// Victim selection for swap-out. Ties go to the candidate seen first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EvictionPolicy {
    LongestResident,
    LowestPriority,
    LeastRecentlyDispatched,
}

impl EvictionPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            EvictionPolicy::LongestResident => "Longest Resident",
            EvictionPolicy::LowestPriority => "Lowest Priority",
            EvictionPolicy::LeastRecentlyDispatched => "LRU",
        }
    }

    // Lower score is evicted first.
    fn score(&self, process: &Process, allocation: &Allocation) -> u64 {
        match self {
            EvictionPolicy::LongestResident => allocation.admitted_at,
            EvictionPolicy::LowestPriority => u64::from(u32::MAX - process.get_priority()),
            EvictionPolicy::LeastRecentlyDispatched => allocation.last_used,
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Allocation {
    pub size: usize,
    pub admitted_at: u64,
    pub last_used: u64,
}

pub struct MemoryManager {
    total_memory: usize,
    memory_per_process: usize,
    mode: AllocationMode,
    policy: EvictionPolicy,
    allocations: HashMap<Pid, Allocation>,
    used_memory: usize,
}

impl MemoryManager {
    pub fn new(
        total_memory: usize,
        memory_per_process: usize,
        mode: AllocationMode,
        policy: EvictionPolicy,
    ) -> Result<MemoryManager, ConfigError> {
        if total_memory == 0 {
            return Err(ConfigError::ZeroTotalMemory);
        }
        if memory_per_process == 0 || memory_per_process > total_memory {
            return Err(ConfigError::InvalidMemoryPerProcess {
                memory_per_process,
                total_memory,
            });
        }

        Ok(MemoryManager {
            total_memory,
            memory_per_process,
            mode,
            policy,
            allocations: HashMap::new(),
            used_memory: 0,
        })
    }

    pub fn allocation_for(&self, process: &Process) -> usize {
        match self.mode {
            AllocationMode::Fixed => self.memory_per_process,
            AllocationMode::Requested => process.get_memory_required(),
        }
    }

    /// True if one more standard slot fits.
    pub fn has_available_space(&self) -> bool {
        self.used_memory + self.memory_per_process <= self.total_memory
    }

    pub fn has_space_for(&self, process: &Process) -> bool {
        self.used_memory + self.allocation_for(process) <= self.total_memory
    }

    /// Loads a NEW or SUSPENDED process into memory and makes it READY.
    /// Returns false, leaving the process untouched, if it does not fit.
    pub fn admit(&mut self, process: &mut Process, cycle: u64) -> Result<bool, SimulationError> {
        if self.allocations.contains_key(&process.get_id()) || !self.has_space_for(process) {
            return Ok(false);
        }

        process.transition_to(ProcessState::Ready)?;

        let size = self.allocation_for(process);
        self.allocations.insert(
            process.get_id(),
            Allocation {
                size,
                admitted_at: cycle,
                last_used: cycle,
            },
        );
        self.used_memory += size;

        Ok(true)
    }

    pub fn release(&mut self, process: &Process) {
        if let Some(allocation) = self.allocations.remove(&process.get_id()) {
            self.used_memory -= allocation.size;
        }
    }

    /// Records a dispatch for recency-based eviction.
    pub fn touch(&mut self, pid: Pid, cycle: u64) {
        if let Some(allocation) = self.allocations.get_mut(&pid) {
            allocation.last_used = cycle;
        }
    }

    /// Picks at most one resident candidate according to the eviction policy.
    pub fn select_victim<'a, I>(&self, candidates: I) -> Option<Pid>
    where
        I: IntoIterator<Item = &'a Process>,
    {
        let mut victim: Option<(Pid, u64)> = None;

        for process in candidates {
            let Some(allocation) = self.allocations.get(&process.get_id()) else {
                continue;
            };
            let score = self.policy.score(process, allocation);

            match victim {
                Some((_, best)) if best <= score => {}
                _ => victim = Some((process.get_id(), score)),
            }
        }

        victim.map(|(pid, _)| pid)
    }

    /// Swaps a process out: its memory is freed and it becomes SUSPENDED.
    pub fn evict(&mut self, process: &mut Process) -> Result<(), SimulationError> {
        process.transition_to(ProcessState::Suspended)?;
        process.clear_io();
        self.release(process);
        Ok(())
    }

    pub fn is_resident(&self, pid: Pid) -> bool {
        self.allocations.contains_key(&pid)
    }

    pub fn get_allocation(&self, pid: Pid) -> Option<&Allocation> {
        self.allocations.get(&pid)
    }

    pub fn resident_count(&self) -> usize {
        self.allocations.len()
    }

    pub fn get_used_memory(&self) -> usize {
        self.used_memory
    }

    pub fn get_total_memory(&self) -> usize {
        self.total_memory
    }

    pub fn get_free_memory(&self) -> usize {
        self.total_memory - self.used_memory
    }

    pub fn max_processes(&self) -> usize {
        self.total_memory / self.memory_per_process
    }

    pub fn get_policy(&self) -> EvictionPolicy {
        self.policy
    }
}

impl fmt::Display for MemoryManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Memory: {}/{} KB used, {} resident, policy {}",
            self.used_memory,
            self.total_memory,
            self.allocations.len(),
            self.policy
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::io::ProcessConfig;

    fn process(id: Pid, priority: u32) -> Process {
        Process::new(id, &ProcessConfig::cpu_bound("P", 5, priority))
    }

    fn memory(total: usize, policy: EvictionPolicy) -> MemoryManager {
        MemoryManager::new(total, 128, AllocationMode::Fixed, policy).unwrap()
    }

    #[test]
    fn test_memory_rejects_invalid_configuration() {
        assert!(matches!(
            MemoryManager::new(0, 128, AllocationMode::Fixed, EvictionPolicy::LongestResident),
            Err(ConfigError::ZeroTotalMemory)
        ));
        assert!(matches!(
            MemoryManager::new(256, 0, AllocationMode::Fixed, EvictionPolicy::LongestResident),
            Err(ConfigError::InvalidMemoryPerProcess { .. })
        ));
        assert!(matches!(
            MemoryManager::new(256, 512, AllocationMode::Fixed, EvictionPolicy::LongestResident),
            Err(ConfigError::InvalidMemoryPerProcess { .. })
        ));
    }

    #[test]
    fn test_memory_admits_until_full() {
        let mut memory = memory(256, EvictionPolicy::LongestResident);
        let mut a = process(1, 1);
        let mut b = process(2, 1);
        let mut c = process(3, 1);

        assert!(memory.admit(&mut a, 0).unwrap());
        assert!(memory.admit(&mut b, 0).unwrap());
        assert!(!memory.has_available_space());
        assert!(!memory.admit(&mut c, 0).unwrap());
        assert_eq!(c.get_state(), ProcessState::New);

        memory.release(&a);
        assert!(memory.admit(&mut c, 1).unwrap());
        assert_eq!(c.get_state(), ProcessState::Ready);
        assert_eq!(memory.get_used_memory(), 256);
        assert_eq!(memory.max_processes(), 2);
    }

    #[test]
    fn test_memory_requested_mode_uses_process_size() {
        let mut memory =
            MemoryManager::new(300, 100, AllocationMode::Requested, EvictionPolicy::LongestResident)
                .unwrap();
        let mut big = Process::new(1, &ProcessConfig::cpu_bound("Big", 3, 1).with_memory(250));
        let mut small = Process::new(2, &ProcessConfig::cpu_bound("Small", 3, 1).with_memory(100));

        assert!(memory.admit(&mut big, 0).unwrap());
        assert!(!memory.has_space_for(&small));
        assert!(!memory.admit(&mut small, 0).unwrap());
        assert_eq!(memory.get_free_memory(), 50);
    }

    #[test]
    fn test_memory_evict_frees_and_suspends() {
        let mut memory = memory(256, EvictionPolicy::LongestResident);
        let mut a = process(1, 1);
        memory.admit(&mut a, 0).unwrap();

        memory.evict(&mut a).unwrap();

        assert_eq!(a.get_state(), ProcessState::Suspended);
        assert_eq!(memory.get_used_memory(), 0);
        assert!(!memory.is_resident(1));

        assert!(memory.admit(&mut a, 4).unwrap());
        assert_eq!(a.get_state(), ProcessState::Ready);
    }

    #[test]
    fn test_memory_longest_resident_victim_breaks_ties_by_order() {
        let mut memory = memory(1024, EvictionPolicy::LongestResident);
        let mut a = process(1, 1);
        let mut b = process(2, 1);
        let mut c = process(3, 1);
        memory.admit(&mut b, 0).unwrap();
        memory.admit(&mut a, 0).unwrap();
        memory.admit(&mut c, 3).unwrap();

        assert_eq!(memory.select_victim([&c, &b, &a]), Some(2));
        assert_eq!(memory.select_victim([&c, &a, &b]), Some(1));
    }

    #[test]
    fn test_memory_lowest_priority_victim() {
        let mut memory = memory(1024, EvictionPolicy::LowestPriority);
        let mut a = process(1, 2);
        let mut b = process(2, 7);
        let mut c = process(3, 7);
        for p in [&mut a, &mut b, &mut c] {
            memory.admit(p, 0).unwrap();
        }

        assert_eq!(memory.select_victim([&a, &b, &c]), Some(2));
    }

    #[test]
    fn test_memory_least_recently_dispatched_victim() {
        let mut memory = memory(1024, EvictionPolicy::LeastRecentlyDispatched);
        let mut a = process(1, 1);
        let mut b = process(2, 1);
        memory.admit(&mut a, 0).unwrap();
        memory.admit(&mut b, 1).unwrap();

        memory.touch(1, 5);

        assert_eq!(memory.select_victim([&a, &b]), Some(2));
    }

    #[test]
    fn test_memory_no_victim_without_resident_candidates() {
        let memory = memory(256, EvictionPolicy::LongestResident);
        let a = process(1, 1);

        assert_eq!(memory.select_victim([&a]), None);
        assert_eq!(memory.select_victim(std::iter::empty()), None);
    }
}
