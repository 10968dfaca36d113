use super::{adopt_outcome, recovered_message};
use crate::command::{Command, CommandRef, State};
use crate::errors::ExecError;
use crate::log::RunContext;
use crate::state_machine::CommandCore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

/// Re-runs the core command while it fails with a retry-allowed error
///
/// At most `number_of_retries` attempts are made. Any other failure, a core
/// abort or an abort of this command stops the loop. `retry_delay` is slept
/// once after the loop, whatever the outcome.
pub struct RetryCommand {
    core: CommandCore,
    core_command: CommandRef,
    number_of_retries: usize,
    retry_delay: Duration,
    current_retry_index: AtomicUsize,
}

impl RetryCommand {
    pub fn new(core_command: CommandRef, number_of_retries: usize) -> Self {
        Self::with_name("Retry", core_command, number_of_retries, Duration::ZERO)
    }

    pub fn with_delay(
        core_command: CommandRef,
        number_of_retries: usize,
        retry_delay: Duration,
    ) -> Self {
        Self::with_name("Retry", core_command, number_of_retries, retry_delay)
    }

    pub fn with_name(
        name: impl Into<String>,
        core_command: CommandRef,
        number_of_retries: usize,
        retry_delay: Duration,
    ) -> Self {
        Self {
            core: CommandCore::new(name),
            core_command,
            number_of_retries,
            retry_delay,
            current_retry_index: AtomicUsize::new(0),
        }
    }

    pub fn core_command(&self) -> &CommandRef {
        &self.core_command
    }

    pub fn number_of_retries(&self) -> usize {
        self.number_of_retries
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Attempts made so far in the current (or last) run
    pub fn current_retry_index(&self) -> usize {
        self.current_retry_index.load(Ordering::SeqCst)
    }
}

impl Command for RetryCommand {
    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn children(&self) -> Vec<CommandRef> {
        vec![self.core_command.clone()]
    }

    fn execute(&self, ctx: &RunContext) -> Result<(), ExecError> {
        self.current_retry_index.store(0, Ordering::SeqCst);
        for attempt in 1..=self.number_of_retries {
            self.current_retry_index.store(attempt, Ordering::SeqCst);
            self.core_command.run_with(ctx)?;
            self.core.checkpoint();

            let core_state = self.core_command.state();
            if matches!(core_state, State::Completed | State::Aborted)
                || self.core.state() == State::Aborted
            {
                break;
            }
            let Some(err) = self.core_command.exception() else {
                break;
            };
            if !err.allows_retry() {
                break;
            }
            if attempt < self.number_of_retries {
                ctx.logger().error(&recovered_message(&err));
            }
        }

        if !self.retry_delay.is_zero() {
            thread::sleep(self.retry_delay);
        }
        Ok(())
    }

    fn check_errors(&self) {
        if self.current_retry_index() > 0 {
            adopt_outcome(&self.core, &self.core_command);
        }
    }
}
