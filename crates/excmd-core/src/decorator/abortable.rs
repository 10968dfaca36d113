use super::adopt_outcome;
use crate::command::{Command, CommandRef};
use crate::errors::ExecError;
use crate::log::RunContext;
use crate::state_machine::CommandCore;

type AbortCallback = Box<dyn Fn() + Send + Sync>;

/// Makes a blocking core interruptible
///
/// `abort` invokes the callback once per call, before forwarding the abort to
/// the core command. The callback typically signals whatever the core's unit
/// of work is blocked on.
pub struct AbortableCommand {
    core: CommandCore,
    core_command: CommandRef,
    on_abort: AbortCallback,
}

impl AbortableCommand {
    pub fn new<F>(core_command: CommandRef, on_abort: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self::with_name("Abortable", core_command, on_abort)
    }

    pub fn with_name<F>(name: impl Into<String>, core_command: CommandRef, on_abort: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            core: CommandCore::new(name),
            core_command,
            on_abort: Box::new(on_abort),
        }
    }

    pub fn core_command(&self) -> &CommandRef {
        &self.core_command
    }
}

impl Command for AbortableCommand {
    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn children(&self) -> Vec<CommandRef> {
        vec![self.core_command.clone()]
    }

    fn execute(&self, ctx: &RunContext) -> Result<(), ExecError> {
        self.core_command.run_with(ctx)?;
        self.core.checkpoint();
        Ok(())
    }

    fn check_errors(&self) {
        adopt_outcome(&self.core, &self.core_command);
    }

    fn abort(&self) {
        self.core.request_abort();
        (self.on_abort)();
        self.core_command.abort();
    }
}
