use super::{adopt_outcome, should_stop};
use crate::command::{Command, CommandRef};
use crate::errors::ExecError;
use crate::log::RunContext;
use crate::state_machine::CommandCore;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Runs the core command a fixed number of times
pub struct CyclicCommand {
    core: CommandCore,
    core_command: CommandRef,
    number_of_repeats: usize,
    current_cycle: AtomicUsize,
}

impl CyclicCommand {
    pub fn new(core_command: CommandRef, number_of_repeats: usize) -> Self {
        Self::with_name("Cyclic", core_command, number_of_repeats)
    }

    pub fn with_name(
        name: impl Into<String>,
        core_command: CommandRef,
        number_of_repeats: usize,
    ) -> Self {
        Self {
            core: CommandCore::new(name),
            core_command,
            number_of_repeats,
            current_cycle: AtomicUsize::new(0),
        }
    }

    pub fn core_command(&self) -> &CommandRef {
        &self.core_command
    }

    pub fn number_of_repeats(&self) -> usize {
        self.number_of_repeats
    }

    /// 1-based index of the cycle in progress (or last run); 0 before any cycle
    pub fn current_cycle(&self) -> usize {
        self.current_cycle.load(Ordering::SeqCst)
    }
}

impl Command for CyclicCommand {
    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn children(&self) -> Vec<CommandRef> {
        vec![self.core_command.clone()]
    }

    fn execute(&self, ctx: &RunContext) -> Result<(), ExecError> {
        self.current_cycle.store(0, Ordering::SeqCst);
        for _ in 0..self.number_of_repeats {
            self.current_cycle.fetch_add(1, Ordering::SeqCst);
            self.core_command.run_with(ctx)?;
            self.core.checkpoint();
            if should_stop(&self.core, &self.core_command) {
                break;
            }
        }
        Ok(())
    }

    fn check_errors(&self) {
        if self.current_cycle() > 0 {
            adopt_outcome(&self.core, &self.core_command);
        }
    }
}
