use super::recovered_message;
use crate::command::{Command, CommandRef, State};
use crate::errors::ExecError;
use crate::log::RunContext;
use crate::state_machine::CommandCore;
use std::sync::atomic::{AtomicBool, Ordering};

/// Runs a recovery command when the core fails with a recovery-allowed error
///
/// A successful recovery completes this command while keeping the core's
/// error as its exception.
pub struct RecoverableCommand {
    core: CommandCore,
    core_command: CommandRef,
    recovery_command: CommandRef,
    recovery_ran: AtomicBool,
}

impl RecoverableCommand {
    pub fn new(core_command: CommandRef, recovery_command: CommandRef) -> Self {
        Self::with_name("Recoverable", core_command, recovery_command)
    }

    pub fn with_name(
        name: impl Into<String>,
        core_command: CommandRef,
        recovery_command: CommandRef,
    ) -> Self {
        Self {
            core: CommandCore::new(name),
            core_command,
            recovery_command,
            recovery_ran: AtomicBool::new(false),
        }
    }

    pub fn core_command(&self) -> &CommandRef {
        &self.core_command
    }

    pub fn recovery_command(&self) -> &CommandRef {
        &self.recovery_command
    }

    fn recovery_state(&self) -> State {
        if self.recovery_ran.load(Ordering::SeqCst) {
            self.recovery_command.state()
        } else {
            State::Idle
        }
    }
}

impl Command for RecoverableCommand {
    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn children(&self) -> Vec<CommandRef> {
        vec![self.core_command.clone(), self.recovery_command.clone()]
    }

    fn execute(&self, ctx: &RunContext) -> Result<(), ExecError> {
        self.recovery_ran.store(false, Ordering::SeqCst);
        self.core_command.run_with(ctx)?;
        self.core.checkpoint();

        if self.core_command.state() == State::Aborted || self.core.state() == State::Aborted {
            return Ok(());
        }
        if self.core_command.state() == State::Failed {
            let err = self.core_command.exception();
            let recoverable = err.as_ref().is_some_and(|e| e.allows_recovery());
            self.core.set_exception(err);
            if recoverable {
                self.recovery_ran.store(true, Ordering::SeqCst);
                self.recovery_command.run_with(ctx)?;
                self.core.checkpoint();
            }
        }
        Ok(())
    }

    fn check_errors(&self) {
        let core_state = self.core_command.state();
        let recovery_state = self.recovery_state();
        let core_err = self.core_command.exception();

        if core_state == State::Aborted || recovery_state == State::Aborted {
            self.core.set_aborted();
        } else if recovery_state == State::Failed {
            self.core.set_failed(self.recovery_command.exception());
        } else if core_state == State::Failed
            && !core_err.as_ref().is_some_and(|e| e.allows_recovery())
        {
            self.core.set_failed(core_err);
        } else if core_state == State::Completed || recovery_state == State::Completed {
            if let Some(err) = core_err.filter(|e| e.allows_recovery()) {
                self.core.logger().error(&recovered_message(&err));
            }
        }
    }
}
