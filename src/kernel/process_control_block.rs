use std::fmt;

use crate::error::SimulationError;
use crate::io::ProcessConfig;

pub type Pid = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProcessState {
    New,
    Ready,
    Running,
    Blocked,
    Suspended,
    Terminated,
}

impl ProcessState {
    /// Edges of the process state machine. Everything else is illegal.
    pub fn can_transition_to(self, next: ProcessState) -> bool {
        use ProcessState::*;

        matches!(
            (self, next),
            (New, Ready)
                | (Ready, Running)
                | (Running, Terminated)
                | (Running, Blocked)
                | (Running, Ready)
                | (Blocked, Ready)
                | (Ready, Suspended)
                | (Blocked, Suspended)
                | (Suspended, Ready)
        )
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessState::New => "NEW",
            ProcessState::Ready => "READY",
            ProcessState::Running => "RUNNING",
            ProcessState::Blocked => "BLOCKED",
            ProcessState::Suspended => "SUSPENDED",
            ProcessState::Terminated => "TERMINATED",
        };
        f.write_str(name)
    }
}

/// What happened after a single instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstructionOutcome {
    Continue,
    IoRequest,
    Finished,
}

#[derive(Clone, Debug)]
pub struct Process {
    id: Pid,
    name: String,
    program_counter: u32,
    total_instructions: u32,
    state: ProcessState,

    cpu_bound: bool,
    io_interval: u32,
    io_duration: u32,
    io_remaining: u32,
    io_charged_at: u64,

    priority: u32,
    arrival_cycle: u64,
    wait_time: u32,

    mlfq_level: usize,
    mlfq_wait: u32,

    memory_required: usize,
    resource_at: Option<u32>,
}

impl Process {
    pub fn new(id: Pid, config: &ProcessConfig) -> Process {
        Process {
            id,
            name: config.name.clone(),
            program_counter: 0,
            total_instructions: config.instructions,
            state: ProcessState::New,
            cpu_bound: config.cpu_bound,
            io_interval: if config.cpu_bound { 0 } else { config.io_interval },
            io_duration: config.io_duration,
            io_remaining: 0,
            io_charged_at: 0,
            priority: config.priority,
            arrival_cycle: 0,
            wait_time: 0,
            mlfq_level: 0,
            mlfq_wait: 0,
            memory_required: config.memory,
            resource_at: config.resource_at,
        }
    }

    pub fn get_id(&self) -> Pid {
        self.id
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_program_counter(&self) -> u32 {
        self.program_counter
    }

    pub fn get_total_instructions(&self) -> u32 {
        self.total_instructions
    }

    pub fn remaining_instructions(&self) -> u32 {
        self.total_instructions - self.program_counter
    }

    pub fn is_finished(&self) -> bool {
        self.program_counter >= self.total_instructions
    }

    pub fn get_state(&self) -> ProcessState {
        self.state
    }

    pub fn is_cpu_bound(&self) -> bool {
        self.cpu_bound
    }

    pub fn get_io_interval(&self) -> u32 {
        self.io_interval
    }

    pub fn get_io_duration(&self) -> u32 {
        self.io_duration
    }

    pub fn get_priority(&self) -> u32 {
        self.priority
    }

    pub fn get_memory_required(&self) -> usize {
        self.memory_required
    }

    pub fn get_resource_at(&self) -> Option<u32> {
        self.resource_at
    }

    pub fn get_arrival_cycle(&self) -> u64 {
        self.arrival_cycle
    }

    pub fn set_arrival_cycle(&mut self, cycle: u64) {
        self.arrival_cycle = cycle;
    }

    pub fn transition_to(&mut self, next: ProcessState) -> Result<(), SimulationError> {
        if !self.state.can_transition_to(next) {
            return Err(SimulationError::IllegalTransition {
                pid: self.id,
                from: self.state,
                to: next,
            });
        }

        self.state = next;
        Ok(())
    }

    /// Executes one instruction. The program counter never passes the
    /// instruction count, and no I/O is requested on the final instruction.
    pub fn execute_instruction(&mut self) -> InstructionOutcome {
        if self.is_finished() {
            return InstructionOutcome::Finished;
        }

        self.program_counter += 1;

        if self.is_finished() {
            InstructionOutcome::Finished
        } else if self.reached_io_boundary() {
            InstructionOutcome::IoRequest
        } else {
            InstructionOutcome::Continue
        }
    }

    fn reached_io_boundary(&self) -> bool {
        !self.cpu_bound
            && self.io_interval > 0
            && self.program_counter > 0
            && self.program_counter % self.io_interval == 0
            && self.program_counter < self.total_instructions
    }

    // I/O countdown

    /// Seeds the countdown with the service duration at `cycle`.
    pub fn start_io(&mut self, cycle: u64) {
        self.io_remaining = self.io_duration;
        self.io_charged_at = cycle;
    }

    /// Charges the countdown with the cycles elapsed since it was last
    /// charged. Returns true once the service is done.
    pub fn tick_io(&mut self, cycle: u64) -> bool {
        let elapsed = cycle.saturating_sub(self.io_charged_at);
        let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
        self.io_remaining = self.io_remaining.saturating_sub(elapsed);
        self.io_charged_at = self.io_charged_at.max(cycle);
        self.io_remaining == 0
    }

    pub fn get_io_remaining(&self) -> u32 {
        self.io_remaining
    }

    pub fn clear_io(&mut self) {
        self.io_remaining = 0;
    }

    // HRRN

    pub fn get_wait_time(&self) -> u32 {
        self.wait_time
    }

    pub fn increment_wait(&mut self) {
        self.wait_time += 1;
    }

    pub fn reset_wait(&mut self) {
        self.wait_time = 0;
    }

    // MLFQ

    pub fn get_mlfq_level(&self) -> usize {
        self.mlfq_level
    }

    pub fn get_mlfq_wait(&self) -> u32 {
        self.mlfq_wait
    }

    pub fn increment_mlfq_wait(&mut self) {
        self.mlfq_wait += 1;
    }

    pub fn reset_mlfq_wait(&mut self) {
        self.mlfq_wait = 0;
    }

    /// Moves one level towards level 0 and restarts the aging counter.
    pub fn promote(&mut self) {
        self.mlfq_level = self.mlfq_level.saturating_sub(1);
        self.mlfq_wait = 0;
    }

    /// Moves one level down, never past `last_level`.
    pub fn demote(&mut self, last_level: usize) {
        if self.mlfq_level < last_level {
            self.mlfq_level += 1;
        }
        self.mlfq_wait = 0;
    }

    pub(crate) fn clamp_mlfq_level(&mut self, last_level: usize) {
        self.mlfq_level = self.mlfq_level.min(last_level);
    }
}

impl fmt::Display for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (ID:{}, PC:{}/{}, {})",
            self.name, self.id, self.program_counter, self.total_instructions, self.state
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cpu_process(instructions: u32) -> Process {
        Process::new(1, &ProcessConfig::cpu_bound("A", instructions, 1))
    }

    fn io_process(instructions: u32, interval: u32, duration: u32) -> Process {
        Process::new(2, &ProcessConfig::io_bound("B", instructions, interval, duration, 1))
    }

    #[test]
    fn test_process_starts_new_at_zero() {
        let process = cpu_process(5);
        assert_eq!(process.get_state(), ProcessState::New);
        assert_eq!(process.get_program_counter(), 0);
        assert_eq!(process.remaining_instructions(), 5);
    }

    #[test]
    fn test_process_program_counter_never_exceeds_total() {
        let mut process = cpu_process(3);
        let outcomes: Vec<_> = (0..5).map(|_| process.execute_instruction()).collect();

        assert_eq!(
            outcomes,
            vec![
                InstructionOutcome::Continue,
                InstructionOutcome::Continue,
                InstructionOutcome::Finished,
                InstructionOutcome::Finished,
                InstructionOutcome::Finished,
            ]
        );
        assert_eq!(process.get_program_counter(), 3);
    }

    #[test]
    fn test_process_io_boundary_skips_final_instruction() {
        let mut process = io_process(9, 3, 2);
        let mut requests = Vec::new();

        while process.execute_instruction() != InstructionOutcome::Finished {
            if process.reached_io_boundary() {
                requests.push(process.get_program_counter());
            }
        }

        assert_eq!(requests, vec![3, 6]);
    }

    #[test]
    fn test_process_cpu_bound_ignores_io_interval() {
        let config = ProcessConfig {
            io_interval: 2,
            ..ProcessConfig::cpu_bound("C", 6, 1)
        };
        let mut process = Process::new(3, &config);

        for _ in 0..5 {
            assert_eq!(process.execute_instruction(), InstructionOutcome::Continue);
        }
        assert_eq!(process.execute_instruction(), InstructionOutcome::Finished);
    }

    #[test]
    fn test_process_legal_transitions() {
        let mut process = cpu_process(2);

        process.transition_to(ProcessState::Ready).unwrap();
        process.transition_to(ProcessState::Running).unwrap();
        process.transition_to(ProcessState::Blocked).unwrap();
        process.transition_to(ProcessState::Suspended).unwrap();
        process.transition_to(ProcessState::Ready).unwrap();
        process.transition_to(ProcessState::Running).unwrap();
        process.transition_to(ProcessState::Terminated).unwrap();

        assert_eq!(process.get_state(), ProcessState::Terminated);
    }

    #[test]
    fn test_process_terminated_is_absorbing() {
        let mut process = cpu_process(1);
        process.transition_to(ProcessState::Ready).unwrap();
        process.transition_to(ProcessState::Running).unwrap();
        process.transition_to(ProcessState::Terminated).unwrap();

        for next in [
            ProcessState::New,
            ProcessState::Ready,
            ProcessState::Running,
            ProcessState::Blocked,
            ProcessState::Suspended,
        ] {
            assert_eq!(
                process.transition_to(next),
                Err(SimulationError::IllegalTransition {
                    pid: 1,
                    from: ProcessState::Terminated,
                    to: next,
                })
            );
        }
    }

    #[test]
    fn test_process_cannot_skip_ready() {
        let mut process = cpu_process(1);
        assert!(process.transition_to(ProcessState::Running).is_err());
        assert_eq!(process.get_state(), ProcessState::New);
    }

    #[test]
    fn test_process_io_countdown() {
        let mut process = io_process(10, 3, 2);
        process.start_io(3);

        assert_eq!(process.get_io_remaining(), 2);
        assert!(!process.tick_io(3));
        assert_eq!(process.get_io_remaining(), 2);
        assert!(!process.tick_io(4));
        assert!(process.tick_io(5));
    }

    #[test]
    fn test_process_io_countdown_charges_elapsed_cycles() {
        let mut process = io_process(10, 3, 4);
        process.start_io(10);

        assert!(!process.tick_io(13));
        assert_eq!(process.get_io_remaining(), 1);
        assert!(process.tick_io(20));
    }

    #[test]
    fn test_process_mlfq_level_bounds() {
        let mut process = cpu_process(10);

        process.promote();
        assert_eq!(process.get_mlfq_level(), 0);

        for _ in 0..5 {
            process.demote(2);
        }
        assert_eq!(process.get_mlfq_level(), 2);

        process.increment_mlfq_wait();
        process.promote();
        assert_eq!(process.get_mlfq_level(), 1);
        assert_eq!(process.get_mlfq_wait(), 0);
    }
}
