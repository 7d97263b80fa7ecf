use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::{InstructionOutcome, Pid, Process, ProcessState};

use crate::error::{ConfigError, SimulationError};
use crate::io::SimulationConfig;
use crate::monitor::{EventLog, ProcessRef, SimulationEvent, SimulationLogger};

/// Counting semaphore guarding the shared resource.
pub struct Semaphore {
    permits: Mutex<usize>,
    capacity: usize,
}

impl Semaphore {
    pub fn new(capacity: usize) -> Semaphore {
        Semaphore {
            permits: Mutex::new(capacity),
            capacity,
        }
    }

    pub fn try_acquire(&self) -> bool {
        let mut permits = self.permits.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *permits == 0 {
            return false;
        }
        *permits -= 1;
        true
    }

    pub fn release(&self) {
        let mut permits = self.permits.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *permits < self.capacity {
            *permits += 1;
        }
    }

    pub fn available(&self) -> usize {
        *self.permits.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

enum Job {
    Run { process: Process, stop_at_resource: bool },
    Shutdown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StopReason {
    Terminated,
    IoRequest,
    ResourceRequest,
}

enum Message {
    Tick,
    Returned {
        process: Process,
        executed: u32,
        reason: StopReason,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConcurrentReport {
    /// Process ids in completion order.
    pub terminated: Vec<Pid>,
    pub ticks: u64,
    pub dispatches: usize,
    pub io_blocks: usize,
    pub resource_waits: usize,
}

/// Runs the workload on a pool of worker threads. Processes travel as
/// plain data; only the coordinator (the calling thread) touches queues.
pub struct ConcurrentRunner {
    processes: Vec<Process>,
    workers: usize,
    tick: Duration,
    semaphore: Semaphore,
    logger: EventLog,
}

impl ConcurrentRunner {
    pub fn new(config: &SimulationConfig) -> Result<ConcurrentRunner, ConfigError> {
        config.validate()?;

        let processes = config
            .processes
            .iter()
            .enumerate()
            .map(|(index, process)| Process::new(index as Pid + 1, process))
            .collect();

        Ok(ConcurrentRunner {
            processes,
            workers: config.concurrent.workers.max(1),
            tick: Duration::from_millis(config.concurrent.tick_ms.max(1)),
            semaphore: Semaphore::new(config.concurrent.resource_permits.max(1)),
            logger: EventLog::new(),
        })
    }

    pub fn get_semaphore(&self) -> &Semaphore {
        &self.semaphore
    }

    pub fn get_logger(&self) -> &EventLog {
        &self.logger
    }

    pub fn run(&mut self) -> Result<ConcurrentReport, SimulationError> {
        let (message_sender, messages) = mpsc::channel();
        let (job_sender, jobs) = mpsc::channel();
        let jobs = Arc::new(Mutex::new(jobs));

        let workers: Vec<JoinHandle<()>> = (0..self.workers)
            .map(|_| spawn_worker(Arc::clone(&jobs), message_sender.clone()))
            .collect();

        let stop_clock = Arc::new(AtomicBool::new(false));
        let clock = spawn_clock(self.tick, Arc::clone(&stop_clock), message_sender);

        let result = self.coordinate(&job_sender, &messages);

        stop_clock.store(true, Ordering::Relaxed);
        for _ in &workers {
            let _ = job_sender.send(Job::Shutdown);
        }
        drop(messages);
        for worker in workers {
            let _ = worker.join();
        }
        let _ = clock.join();

        result
    }

    fn coordinate(
        &mut self,
        jobs: &Sender<Job>,
        messages: &Receiver<Message>,
    ) -> Result<ConcurrentReport, SimulationError> {
        let total = self.processes.len();
        let mut report = ConcurrentReport::default();
        let mut ready: VecDeque<Process> = VecDeque::new();
        let mut blocked: Vec<Process> = Vec::new();
        let mut resource_waiting: VecDeque<Process> = VecDeque::new();
        let mut holders: HashSet<Pid> = HashSet::new();
        let mut idle_workers = self.workers;

        for mut process in self.processes.drain(..) {
            process.transition_to(ProcessState::Ready)?;
            ready.push_back(process);
        }

        while report.terminated.len() < total {
            while idle_workers > 0 {
                let Some(mut process) = ready.pop_front() else {
                    break;
                };
                process.transition_to(ProcessState::Running)?;
                self.logger.log(
                    report.ticks,
                    SimulationEvent::Selection {
                        process: ProcessRef::from(&process),
                        scheduler: "worker pool".to_string(),
                        program_counter: process.get_program_counter(),
                        total: process.get_total_instructions(),
                    },
                );

                let stop_at_resource = !holders.contains(&process.get_id());
                jobs.send(Job::Run { process, stop_at_resource })
                    .map_err(|_| SimulationError::Disconnected)?;
                idle_workers -= 1;
                report.dispatches += 1;
            }

            let message = messages.recv().map_err(|_| SimulationError::Disconnected)?;
            match message {
                Message::Tick => {
                    report.ticks += 1;
                    let mut index = 0;
                    while index < blocked.len() {
                        if blocked[index].tick_io(report.ticks) {
                            let mut process = blocked.remove(index);
                            process.clear_io();
                            process.transition_to(ProcessState::Ready)?;
                            self.logger.log(
                                report.ticks,
                                SimulationEvent::Unblock {
                                    process: ProcessRef::from(&process),
                                },
                            );
                            ready.push_back(process);
                        } else {
                            index += 1;
                        }
                    }
                }
                Message::Returned { mut process, executed, reason } => {
                    idle_workers += 1;
                    self.logger.log(
                        report.ticks,
                        SimulationEvent::Execution {
                            process: ProcessRef::from(&process),
                            executed,
                            program_counter: process.get_program_counter(),
                            total: process.get_total_instructions(),
                        },
                    );

                    match reason {
                        StopReason::Terminated => {
                            process.transition_to(ProcessState::Terminated)?;
                            self.logger.log(
                                report.ticks,
                                SimulationEvent::Termination {
                                    process: ProcessRef::from(&process),
                                    program_counter: process.get_program_counter(),
                                    total: process.get_total_instructions(),
                                },
                            );
                            report.terminated.push(process.get_id());

                            if holders.remove(&process.get_id()) {
                                self.semaphore.release();
                                self.grant_waiting(&mut resource_waiting, &mut holders, &mut ready)?;
                            }
                        }
                        StopReason::IoRequest => {
                            process.transition_to(ProcessState::Blocked)?;
                            process.start_io(report.ticks);
                            self.logger.log(
                                report.ticks,
                                SimulationEvent::Block {
                                    process: ProcessRef::from(&process),
                                    program_counter: process.get_program_counter(),
                                },
                            );
                            report.io_blocks += 1;
                            blocked.push(process);
                        }
                        StopReason::ResourceRequest => {
                            process.transition_to(ProcessState::Blocked)?;
                            if self.semaphore.try_acquire() {
                                holders.insert(process.get_id());
                                process.transition_to(ProcessState::Ready)?;
                                ready.push_back(process);
                            } else {
                                self.logger.log(
                                    report.ticks,
                                    SimulationEvent::Warning(format!(
                                        "{} waits for the shared resource",
                                        process.get_name()
                                    )),
                                );
                                report.resource_waits += 1;
                                resource_waiting.push_back(process);
                            }
                        }
                    }
                }
            }
        }

        Ok(report)
    }

    fn grant_waiting(
        &self,
        waiting: &mut VecDeque<Process>,
        holders: &mut HashSet<Pid>,
        ready: &mut VecDeque<Process>,
    ) -> Result<(), SimulationError> {
        while !waiting.is_empty() && self.semaphore.try_acquire() {
            let Some(mut process) = waiting.pop_front() else {
                self.semaphore.release();
                break;
            };
            holders.insert(process.get_id());
            process.transition_to(ProcessState::Ready)?;
            ready.push_back(process);
        }
        Ok(())
    }
}

fn spawn_worker(jobs: Arc<Mutex<Receiver<Job>>>, messages: Sender<Message>) -> JoinHandle<()> {
    thread::spawn(move || loop {
        let job = match jobs.lock() {
            Ok(receiver) => receiver.recv(),
            Err(_) => break,
        };

        let (process, stop_at_resource) = match job {
            Ok(Job::Run { process, stop_at_resource }) => (process, stop_at_resource),
            Ok(Job::Shutdown) | Err(_) => break,
        };

        let returned = run_until_stop(process, stop_at_resource);
        if messages.send(returned).is_err() {
            break;
        }
    })
}

/// Executes until the next I/O boundary, resource request or termination.
fn run_until_stop(mut process: Process, stop_at_resource: bool) -> Message {
    let mut executed = 0;

    let reason = loop {
        if process.is_finished() {
            break StopReason::Terminated;
        }
        if stop_at_resource && process.get_resource_at() == Some(process.get_program_counter()) {
            break StopReason::ResourceRequest;
        }

        executed += 1;
        match process.execute_instruction() {
            InstructionOutcome::Finished => break StopReason::Terminated,
            InstructionOutcome::IoRequest => break StopReason::IoRequest,
            InstructionOutcome::Continue => {}
        }
    };

    Message::Returned { process, executed, reason }
}

fn spawn_clock(tick: Duration, stop: Arc<AtomicBool>, messages: Sender<Message>) -> JoinHandle<()> {
    thread::spawn(move || {
        while !stop.load(Ordering::Relaxed) {
            thread::sleep(tick);
            if messages.send(Message::Tick).is_err() {
                break;
            }
        }
    })
}
