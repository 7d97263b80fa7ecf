use std::collections::BTreeMap;

use crate::kernel::{Pid, Process};

/// Receives timing facts from the driver. Only the first dispatch of a
/// process counts towards its response time.
pub trait MetricsCollector {
    fn record_arrival(&mut self, process: &Process, cycle: u64);
    fn record_dispatch(&mut self, process: &Process, cycle: u64);
    fn record_burst(&mut self, process: &Process, executed: u32, cycle: u64);
    fn record_finish(&mut self, process: &Process, cycle: u64);
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProcessTimes {
    pub name: String,
    pub priority: u32,
    pub arrival: u64,
    pub first_dispatch: Option<u64>,
    pub finish: Option<u64>,
    pub executed: u64,
    pub bursts: u32,
}

impl ProcessTimes {
    pub fn turnaround(&self) -> Option<u64> {
        self.finish.map(|finish| finish - self.arrival)
    }

    pub fn response(&self) -> Option<u64> {
        self.first_dispatch.map(|first| first - self.arrival)
    }

    /// Time in the system not spent executing.
    pub fn waiting(&self) -> Option<u64> {
        self.turnaround()
            .map(|turnaround| turnaround.saturating_sub(self.executed))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MetricsSummary {
    pub finished: usize,
    pub avg_turnaround: f64,
    pub avg_waiting: f64,
    pub avg_response: f64,
    /// Finished processes per cycle.
    pub throughput: f64,
}

#[derive(Debug, Default)]
pub struct SimulationMetrics {
    processes: BTreeMap<Pid, ProcessTimes>,
    last_cycle: u64,
}

impl SimulationMetrics {
    pub fn new() -> SimulationMetrics {
        SimulationMetrics::default()
    }

    pub fn get(&self, pid: Pid) -> Option<&ProcessTimes> {
        self.processes.get(&pid)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Pid, &ProcessTimes)> {
        self.processes.iter()
    }

    pub fn summary(&self) -> MetricsSummary {
        let finished: Vec<&ProcessTimes> = self
            .processes
            .values()
            .filter(|times| times.finish.is_some())
            .collect();

        if finished.is_empty() {
            return MetricsSummary::default();
        }

        let count = finished.len() as f64;
        let average = |value: fn(&ProcessTimes) -> Option<u64>| {
            finished.iter().filter_map(|times| value(times)).sum::<u64>() as f64 / count
        };

        MetricsSummary {
            finished: finished.len(),
            avg_turnaround: average(ProcessTimes::turnaround),
            avg_waiting: average(ProcessTimes::waiting),
            avg_response: average(ProcessTimes::response),
            throughput: if self.last_cycle == 0 {
                0.0
            } else {
                count / self.last_cycle as f64
            },
        }
    }

    fn entry(&mut self, process: &Process) -> &mut ProcessTimes {
        self.processes
            .entry(process.get_id())
            .or_insert_with(|| ProcessTimes {
                name: process.get_name().to_string(),
                priority: process.get_priority(),
                arrival: process.get_arrival_cycle(),
                ..ProcessTimes::default()
            })
    }
}

impl MetricsCollector for SimulationMetrics {
    fn record_arrival(&mut self, process: &Process, cycle: u64) {
        self.entry(process).arrival = cycle;
    }

    fn record_dispatch(&mut self, process: &Process, cycle: u64) {
        let times = self.entry(process);
        times.first_dispatch.get_or_insert(cycle);
    }

    fn record_burst(&mut self, process: &Process, executed: u32, cycle: u64) {
        let times = self.entry(process);
        times.executed += u64::from(executed);
        times.bursts += 1;
        self.last_cycle = self.last_cycle.max(cycle);
    }

    fn record_finish(&mut self, process: &Process, cycle: u64) {
        self.entry(process).finish = Some(cycle);
        self.last_cycle = self.last_cycle.max(cycle);
    }
}
