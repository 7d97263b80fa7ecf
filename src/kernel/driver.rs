use super::*;

use crate::error::{ConfigError, SimulationError};
use crate::io::SimulationConfig;
use crate::monitor::{
    EventLog, MetricsCollector, ProcessRef, SimulationEvent, SimulationLogger, SimulationMetrics,
    SwapDirection,
};

/// Result of one driver iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// A process was dispatched and ran one burst.
    Dispatched,
    /// Nothing was ready; one cycle passed.
    Idle,
    /// No work is left anywhere.
    Finished,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimulationReport {
    pub final_cycle: u64,
    /// Process ids in completion order.
    pub terminated: Vec<Pid>,
    pub dispatches: usize,
    pub swap_outs: usize,
    pub swap_ins: usize,
    pub idle_cycles: u64,
}

/// Counts consecutive iterations in which nothing moved: no instruction
/// ran, nobody was admitted, resumed or swapped, and no I/O was in service.
struct ProgressGuard {
    limit: u64,
    stuck: u64,
}

impl ProgressGuard {
    fn new(limit: u64) -> ProgressGuard {
        ProgressGuard {
            limit: limit.max(1),
            stuck: 0,
        }
    }

    /// Returns true once the limit is exceeded.
    fn observe(&mut self, progressed: bool) -> bool {
        if progressed {
            self.stuck = 0;
            return false;
        }
        self.stuck += 1;
        self.stuck > self.limit
    }
}

/// Cycle-stepped simulation of one CPU over a fixed workload.
pub struct Driver<L: SimulationLogger = EventLog, M: MetricsCollector = SimulationMetrics> {
    cycle: u64,
    stall_guard: ProgressGuard,
    queues: MultilevelQueues,
    cpu: Cpu,
    scheduler: Box<dyn Scheduler>,
    logger: L,
    metrics: M,
    dispatches: usize,
    idle_cycles: u64,
}

impl Driver {
    pub fn new(config: &SimulationConfig) -> Result<Driver, ConfigError> {
        Driver::with_observers(config, EventLog::new(), SimulationMetrics::new())
    }
}

impl<L: SimulationLogger, M: MetricsCollector> Driver<L, M> {
    pub fn with_observers(
        config: &SimulationConfig,
        mut logger: L,
        metrics: M,
    ) -> Result<Driver<L, M>, ConfigError> {
        config.validate()?;

        let memory = MemoryManager::new(
            config.total_memory,
            config.memory_per_process,
            config.allocation,
            config.eviction_policy,
        )?;
        let mut queues = MultilevelQueues::new(memory);
        let scheduler = config
            .algorithm
            .build(config.round_robin_quantum, &config.mlfq);

        logger.log(
            0,
            SimulationEvent::System(format!(
                "Memory initialized: {} KB, {} processes max, scheduler {}",
                config.total_memory,
                queues.get_memory().max_processes(),
                scheduler.name()
            )),
        );

        for (index, process_config) in config.processes.iter().enumerate() {
            let process = Process::new(index as Pid + 1, process_config);
            logger.log(
                0,
                SimulationEvent::Admission {
                    process: ProcessRef::from(&process),
                    cpu_bound: process.is_cpu_bound(),
                    instructions: process.get_total_instructions(),
                    priority: process.get_priority(),
                },
            );
            queues.admit_process(process);
        }

        Ok(Driver {
            cycle: 0,
            stall_guard: ProgressGuard::new(config.stall_limit),
            queues,
            cpu: Cpu::new(),
            scheduler,
            logger,
            metrics,
            dispatches: 0,
            idle_cycles: 0,
        })
    }

    /// Runs iterations until no work is left.
    pub fn run(&mut self) -> Result<SimulationReport, SimulationError> {
        self.logger
            .log(self.cycle, SimulationEvent::System("=== SIMULATION START ===".to_string()));

        while self.step()? != StepOutcome::Finished {}

        self.logger
            .log(self.cycle, SimulationEvent::System("=== SIMULATION END ===".to_string()));

        Ok(self.report())
    }

    /// One driver iteration: admission, resumption, swap check, I/O countdown,
    /// selection and one burst, in that order.
    pub fn step(&mut self) -> Result<StepOutcome, SimulationError> {
        let admitted = self.run_admission()?;
        let swapped = self.run_swap_check()?;
        let io_moved = self.run_io_countdown()?;

        if self.queues.get_ready_queue().is_empty() {
            if !self.queues.has_pending_work() {
                return Ok(StepOutcome::Finished);
            }

            if self.stall_guard.observe(admitted || swapped || io_moved) {
                self.logger.log(
                    self.cycle,
                    SimulationEvent::Error("no process can make progress".to_string()),
                );
                return Err(SimulationError::Stalled { cycle: self.cycle });
            }

            self.cycle += 1;
            self.idle_cycles += 1;
            self.logger.log(
                self.cycle,
                SimulationEvent::CpuIdle {
                    reason: "ready queue empty".to_string(),
                },
            );
            return Ok(StepOutcome::Idle);
        }

        self.scheduler
            .before_selection(self.queues.get_ready_queue_mut());
        let Some(process) = self.scheduler.select(self.queues.get_ready_queue_mut()) else {
            return Ok(StepOutcome::Finished);
        };

        self.stall_guard.observe(true);
        self.dispatch(process)?;
        self.execute()?;

        Ok(StepOutcome::Dispatched)
    }

    fn log_transition(&mut self, process: ProcessRef, from: ProcessState, to: ProcessState) {
        self.logger
            .log(self.cycle, SimulationEvent::StateChange { process, from, to });
    }

    /// Returns true if any process was admitted or resumed.
    fn run_admission(&mut self) -> Result<bool, SimulationError> {
        let admitted = self.queues.run_long_term_scheduling(self.cycle)?;
        for &pid in &admitted {
            let Some(process) = self.queues.get_ready_queue().get(pid) else {
                continue;
            };
            self.metrics.record_arrival(process, self.cycle);
            let process = ProcessRef::from(process);
            self.log_transition(process, ProcessState::New, ProcessState::Ready);
        }
        if !admitted.is_empty() {
            self.logger.log(
                self.cycle,
                SimulationEvent::LongTerm {
                    admitted: admitted.len(),
                    waiting: self.queues.get_new_queue().len(),
                },
            );
        }

        let resumed = self.queues.run_medium_term_scheduling(self.cycle)?;
        for &pid in &resumed {
            let Some(process) = self.queues.get_ready_queue().get(pid) else {
                continue;
            };
            let process = ProcessRef::from(process);
            self.logger.log(
                self.cycle,
                SimulationEvent::Swap {
                    process: process.clone(),
                    policy: self.queues.get_memory().get_policy().name(),
                    direction: SwapDirection::In,
                },
            );
            self.log_transition(process, ProcessState::Suspended, ProcessState::Ready);
        }
        if !resumed.is_empty() {
            self.logger.log(
                self.cycle,
                SimulationEvent::MediumTerm {
                    resumed: resumed.len(),
                },
            );
        }

        Ok(!admitted.is_empty() || !resumed.is_empty())
    }

    /// Returns true if a process was swapped out.
    fn run_swap_check(&mut self) -> Result<bool, SimulationError> {
        if !self.queues.admission_blocked() {
            return Ok(false);
        }

        let Some((pid, from)) = self.queues.perform_swap()? else {
            self.logger.log(
                self.cycle,
                SimulationEvent::Warning("memory full but no process can be swapped out".to_string()),
            );
            return Ok(false);
        };

        if let Some(victim) = self.queues.get_suspended_queue().get(pid) {
            let victim = ProcessRef::from(victim);
            self.logger.log(
                self.cycle,
                SimulationEvent::Swap {
                    process: victim.clone(),
                    policy: self.queues.get_memory().get_policy().name(),
                    direction: SwapDirection::Out,
                },
            );
            self.log_transition(victim, from, ProcessState::Suspended);
        }

        Ok(true)
    }

    /// Returns true while any I/O is in service, since its countdown
    /// advances with the clock.
    fn run_io_countdown(&mut self) -> Result<bool, SimulationError> {
        let in_service = !self.queues.get_blocked_queue().is_empty();

        for pid in self.queues.tick_blocked(self.cycle)? {
            let Some(process) = self.queues.get_ready_queue().get(pid) else {
                continue;
            };
            let process = ProcessRef::from(process);
            self.logger.log(
                self.cycle,
                SimulationEvent::Unblock {
                    process: process.clone(),
                },
            );
            self.log_transition(process, ProcessState::Blocked, ProcessState::Ready);
        }

        Ok(in_service)
    }

    fn dispatch(&mut self, process: Process) -> Result<(), SimulationError> {
        self.queues
            .get_memory_mut()
            .touch(process.get_id(), self.cycle);
        self.metrics.record_dispatch(&process, self.cycle);
        let process_ref = ProcessRef::from(&process);
        self.logger.log(
            self.cycle,
            SimulationEvent::Selection {
                process: process_ref.clone(),
                scheduler: self.scheduler.name().to_string(),
                program_counter: process.get_program_counter(),
                total: process.get_total_instructions(),
            },
        );

        self.cpu.load(process)?;
        self.log_transition(process_ref, ProcessState::Ready, ProcessState::Running);
        self.dispatches += 1;
        Ok(())
    }

    fn execute(&mut self) -> Result<(), SimulationError> {
        let quantum = self
            .cpu
            .get_current()
            .and_then(|process| self.scheduler.quantum_for(process));
        let Some(burst) = self.cpu.execute(quantum, &mut self.cycle) else {
            return Ok(());
        };
        let Some(mut process) = self.cpu.release() else {
            return Ok(());
        };
        let process_ref = ProcessRef::from(&process);

        self.metrics.record_burst(&process, burst.executed, self.cycle);
        self.logger.log(
            self.cycle,
            SimulationEvent::Execution {
                process: process_ref.clone(),
                executed: burst.executed,
                program_counter: process.get_program_counter(),
                total: process.get_total_instructions(),
            },
        );

        let next = match burst.end {
            BurstEnd::Terminated => {
                self.metrics.record_finish(&process, self.cycle);
                self.logger.log(
                    self.cycle,
                    SimulationEvent::Termination {
                        process: process_ref.clone(),
                        program_counter: process.get_program_counter(),
                        total: process.get_total_instructions(),
                    },
                );
                self.queues.terminate(process)?;
                ProcessState::Terminated
            }
            BurstEnd::Blocked => {
                self.logger.log(
                    self.cycle,
                    SimulationEvent::Block {
                        process: process_ref.clone(),
                        program_counter: process.get_program_counter(),
                    },
                );
                self.queues.block(process, self.cycle)?;
                ProcessState::Blocked
            }
            BurstEnd::QuantumExpired => {
                self.logger.log(
                    self.cycle,
                    SimulationEvent::QuantumExpired {
                        process: process_ref.clone(),
                        quantum: burst.executed,
                    },
                );
                self.scheduler.on_quantum_expired(&mut process);
                self.queues.requeue(process)?;
                ProcessState::Ready
            }
        };
        self.log_transition(process_ref, ProcessState::Running, next);

        Ok(())
    }

    pub fn report(&self) -> SimulationReport {
        SimulationReport {
            final_cycle: self.cycle,
            terminated: self.queues.get_terminated_queue().ids(),
            dispatches: self.dispatches,
            swap_outs: self.queues.get_swap_outs(),
            swap_ins: self.queues.get_swap_ins(),
            idle_cycles: self.idle_cycles,
        }
    }

    pub fn get_cycle(&self) -> u64 {
        self.cycle
    }

    pub fn get_queues(&self) -> &MultilevelQueues {
        &self.queues
    }

    pub fn get_scheduler_name(&self) -> &str {
        self.scheduler.name()
    }

    pub fn get_logger(&self) -> &L {
        &self.logger
    }

    pub fn get_metrics(&self) -> &M {
        &self.metrics
    }
}
