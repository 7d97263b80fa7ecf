use std::fmt;

use super::{InstructionOutcome, Process, ProcessState};

use crate::error::SimulationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionMode {
    /// The scheduler is running.
    Kernel,
    /// A process is running.
    User,
}

/// Why a burst gave the CPU back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BurstEnd {
    Terminated,
    Blocked,
    QuantumExpired,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Burst {
    pub executed: u32,
    pub end: BurstEnd,
}

pub struct Cpu {
    current: Option<Process>,
    mode: ExecutionMode,
}

impl Cpu {
    pub fn new() -> Cpu {
        Cpu {
            current: None,
            mode: ExecutionMode::Kernel,
        }
    }

    /// Dispatches a READY process. Its HRRN and aging counters restart here.
    pub fn load(&mut self, mut process: Process) -> Result<(), SimulationError> {
        process.transition_to(ProcessState::Running)?;
        process.reset_wait();
        process.reset_mlfq_wait();

        self.current = Some(process);
        self.mode = ExecutionMode::User;
        Ok(())
    }

    /// Runs the loaded process one instruction per cycle until it finishes,
    /// requests I/O, or uses up `quantum` instructions. Without a quantum the
    /// burst only ends on one of the first two.
    pub fn execute(&mut self, quantum: Option<u32>, cycle: &mut u64) -> Option<Burst> {
        let process = self.current.as_mut()?;
        let mut executed = 0;

        if process.is_finished() {
            return Some(Burst {
                executed,
                end: BurstEnd::Terminated,
            });
        }

        loop {
            if quantum.map_or(false, |quantum| executed >= quantum) {
                return Some(Burst {
                    executed,
                    end: BurstEnd::QuantumExpired,
                });
            }

            let outcome = process.execute_instruction();
            executed += 1;
            *cycle += 1;

            match outcome {
                InstructionOutcome::Finished => {
                    return Some(Burst {
                        executed,
                        end: BurstEnd::Terminated,
                    })
                }
                InstructionOutcome::IoRequest => {
                    return Some(Burst {
                        executed,
                        end: BurstEnd::Blocked,
                    })
                }
                InstructionOutcome::Continue => {}
            }
        }
    }

    /// Takes the process off the CPU and switches back to kernel mode.
    pub fn release(&mut self) -> Option<Process> {
        self.mode = ExecutionMode::Kernel;
        self.current.take()
    }

    pub fn get_current(&self) -> Option<&Process> {
        self.current.as_ref()
    }

    pub fn get_mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn is_busy(&self) -> bool {
        self.current.is_some()
    }
}

impl fmt::Display for Cpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.current {
            Some(process) => write!(f, "Running {} ({:?} mode)", process, self.mode),
            None => write!(f, "CPU idle ({:?} mode)", self.mode),
        }
    }
}
