use super::{adopt_outcome, should_stop};
use crate::command::{Command, CommandRef, State};
use crate::errors::ExecError;
use crate::log::RunContext;
use crate::state_machine::CommandCore;
use std::sync::atomic::{AtomicUsize, Ordering};

type Predicate = Box<dyn Fn() -> bool + Send + Sync>;

/// Runs an optional init command, then the core command while a predicate holds
///
/// The predicate is evaluated once before every iteration, including the
/// first. A failed or aborted init command ends the run without entering
/// the loop.
pub struct WhileCommand {
    core: CommandCore,
    predicate: Predicate,
    init_command: Option<CommandRef>,
    core_command: CommandRef,
    current_cycle: AtomicUsize,
}

impl WhileCommand {
    pub fn new<P>(predicate: P, core_command: CommandRef) -> Self
    where
        P: Fn() -> bool + Send + Sync + 'static,
    {
        Self::with_name("While", predicate, None, core_command)
    }

    pub fn with_init<P>(predicate: P, init_command: CommandRef, core_command: CommandRef) -> Self
    where
        P: Fn() -> bool + Send + Sync + 'static,
    {
        Self::with_name("While", predicate, Some(init_command), core_command)
    }

    pub fn with_name<P>(
        name: impl Into<String>,
        predicate: P,
        init_command: Option<CommandRef>,
        core_command: CommandRef,
    ) -> Self
    where
        P: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            core: CommandCore::new(name),
            predicate: Box::new(predicate),
            init_command,
            core_command,
            current_cycle: AtomicUsize::new(0),
        }
    }

    pub fn core_command(&self) -> &CommandRef {
        &self.core_command
    }

    pub fn init_command(&self) -> Option<&CommandRef> {
        self.init_command.as_ref()
    }

    pub fn current_cycle(&self) -> usize {
        self.current_cycle.load(Ordering::SeqCst)
    }
}

impl Command for WhileCommand {
    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn children(&self) -> Vec<CommandRef> {
        let mut children = vec![self.core_command.clone()];
        children.extend(self.init_command.clone());
        children
    }

    fn execute(&self, ctx: &RunContext) -> Result<(), ExecError> {
        self.current_cycle.store(0, Ordering::SeqCst);

        if let Some(init) = &self.init_command {
            init.run_with(ctx)?;
            self.core.checkpoint();
            if matches!(init.state(), State::Failed | State::Aborted) {
                adopt_outcome(&self.core, init);
                return Ok(());
            }
            if self.core.state() == State::Aborted {
                return Ok(());
            }
        }

        while (self.predicate)() {
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
