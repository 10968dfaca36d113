use crate::command::{Command, CommandRef, State};
use crate::errors::ExecError;
use crate::log::RunContext;
use crate::state_machine::CommandCore;
use std::sync::atomic::{AtomicBool, Ordering};

/// Runs a finally command after the core, whatever the core's outcome
///
/// Only an abort (of the core or of this command) skips the finally command.
pub struct TryCatchFinallyCommand {
    core: CommandCore,
    core_command: CommandRef,
    finally_command: CommandRef,
    finally_ran: AtomicBool,
}

impl TryCatchFinallyCommand {
    pub fn new(core_command: CommandRef, finally_command: CommandRef) -> Self {
        Self::with_name("Try-Catch-Finally", core_command, finally_command)
    }

    pub fn with_name(
        name: impl Into<String>,
        core_command: CommandRef,
        finally_command: CommandRef,
    ) -> Self {
        Self {
            core: CommandCore::new(name),
            core_command,
            finally_command,
            finally_ran: AtomicBool::new(false),
        }
    }

    pub fn core_command(&self) -> &CommandRef {
        &self.core_command
    }

    pub fn finally_command(&self) -> &CommandRef {
        &self.finally_command
    }
}

impl Command for TryCatchFinallyCommand {
    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn children(&self) -> Vec<CommandRef> {
        vec![self.core_command.clone(), self.finally_command.clone()]
    }

    fn execute(&self, ctx: &RunContext) -> Result<(), ExecError> {
        self.finally_ran.store(false, Ordering::SeqCst);
        self.core_command.run_with(ctx)?;
        self.core.checkpoint();

        if self.core_command.state() == State::Aborted || self.core.state() == State::Aborted {
            return Ok(());
        }
        if self.core_command.state() == State::Failed {
            self.core.set_exception(self.core_command.exception());
        }
        self.finally_ran.store(true, Ordering::SeqCst);
        self.finally_command.run_with(ctx)?;
        self.core.checkpoint();
        Ok(())
    }

    fn check_errors(&self) {
        let core_state = self.core_command.state();
        let finally_state = if self.finally_ran.load(Ordering::SeqCst) {
            self.finally_command.state()
        } else {
            State::Idle
        };

        if core_state == State::Aborted || finally_state == State::Aborted {
            self.core.set_aborted();
        } else if finally_state == State::Failed {
            self.core.set_failed(self.finally_command.exception());
        } else if core_state == State::Failed {
            self.core.set_failed(self.core_command.exception());
        }
    }
}
