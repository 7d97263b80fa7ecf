use super::{position_of_min, Process, ProcessQueue, Scheduler};

/// Static priority, lowest value first. Non-preemptive.
pub struct Priority;

impl Priority {
    pub fn new() -> Priority {
        Priority
    }
}

impl Scheduler for Priority {
    fn name(&self) -> &str {
        "Priority"
    }

    fn select(&mut self, ready: &mut ProcessQueue) -> Option<Process> {
        let index = position_of_min(ready, Process::get_priority)?;
        ready.remove_at(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::io::ProcessConfig;
    use crate::kernel::short_term_scheduler::test_support::{drain, ready_queue};

    #[test]
    fn test_priority_lowest_value_first() {
        let mut ready = ready_queue(vec![
            ProcessConfig::cpu_bound("A", 3, 4),
            ProcessConfig::cpu_bound("B", 3, 1),
            ProcessConfig::cpu_bound("C", 3, 2),
        ]);

        assert_eq!(drain(&mut Priority::new(), &mut ready), vec![2, 3, 1]);
    }

    #[test]
    fn test_priority_ties_keep_fifo_order() {
        let mut ready = ready_queue(vec![
            ProcessConfig::cpu_bound("A", 3, 2),
            ProcessConfig::cpu_bound("B", 3, 2),
            ProcessConfig::cpu_bound("C", 3, 1),
            ProcessConfig::cpu_bound("D", 3, 2),
        ]);

        assert_eq!(drain(&mut Priority::new(), &mut ready), vec![3, 1, 2, 4]);
    }
}
