//! Cycle-stepped simulation of CPU scheduling and memory admission.
//!
//! [`kernel::Driver`] runs a workload described by [`io::SimulationConfig`]
//! under one of six short-term strategies, swapping processes out when
//! memory is full. [`kernel::ConcurrentRunner`] runs the same workload on a
//! thread pool instead.

pub mod error;
pub mod io;
pub mod kernel;
pub mod monitor;

#[cfg(test)]
mod tests {
    use crate::io::SimulationConfig;
    use crate::kernel::{Driver, SchedulingAlgorithm};

    #[test]
    fn test_stock_workload_completes_under_every_algorithm() {
        for id in 1..=6 {
            let algorithm = SchedulingAlgorithm::try_from(id).unwrap();
            let config = SimulationConfig::default().with_algorithm(algorithm);
            let mut driver = Driver::new(&config).unwrap();

            let report = driver.run().unwrap();
            let mut terminated = report.terminated.clone();
            terminated.sort_unstable();

            assert_eq!(terminated, vec![1, 2, 3, 4, 5, 6], "algorithm {}", id);
            assert_eq!(driver.get_metrics().iter().count(), 6);
        }
    }
}
