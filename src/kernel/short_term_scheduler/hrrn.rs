use std::cmp::Ordering;

use super::{Process, ProcessQueue, Scheduler};

/// Highest response ratio next, ratio = (wait + service) / service with
/// service being the remaining instructions. Non-preemptive.
pub struct Hrrn;

impl Hrrn {
    pub fn new() -> Hrrn {
        Hrrn
    }

    pub fn response_ratio(process: &Process) -> f64 {
        let service = f64::from(process.remaining_instructions().max(1));
        (f64::from(process.get_wait_time()) + service) / service
    }

    // Exact comparison of the two ratios by cross-multiplication.
    fn compare(a: &Process, b: &Process) -> Ordering {
        let service_a = u64::from(a.remaining_instructions().max(1));
        let service_b = u64::from(b.remaining_instructions().max(1));
        let lhs = (u64::from(a.get_wait_time()) + service_a) * service_b;
        let rhs = (u64::from(b.get_wait_time()) + service_b) * service_a;
        lhs.cmp(&rhs)
    }
}

impl Scheduler for Hrrn {
    fn name(&self) -> &str {
        "HRRN"
    }

    fn select(&mut self, ready: &mut ProcessQueue) -> Option<Process> {
        let mut best: Option<(usize, &Process)> = None;

        for (index, process) in ready.iter().enumerate() {
            match best {
                Some((_, current)) if Hrrn::compare(process, current) != Ordering::Greater => {}
                _ => best = Some((index, process)),
            }
        }

        let index = best.map(|(index, _)| index)?;
        ready.remove_at(index)
    }

    /// Every process still waiting in the ready queue ages by one.
    fn before_selection(&mut self, ready: &mut ProcessQueue) {
        for process in ready.iter_mut() {
            process.increment_wait();
        }
    }
}
