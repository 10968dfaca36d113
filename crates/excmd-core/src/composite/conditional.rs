use crate::command::{Command, CommandRef, State};
use crate::errors::ExecError;
use crate::log::RunContext;
use crate::state_machine::CommandCore;
use crate::sync::lock_unpoisoned;
use std::sync::Mutex;

type Predicate = Box<dyn Fn() -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    True,
    False,
}

/// Runs exactly one of two branches, chosen by a predicate at run start
///
/// The branch not taken is never touched and keeps whatever state it had.
pub struct ConditionalCommand {
    core: CommandCore,
    predicate: Predicate,
    true_command: CommandRef,
    false_command: CommandRef,
    taken: Mutex<Option<Branch>>,
}

impl ConditionalCommand {
    pub fn new<P>(predicate: P, true_command: CommandRef, false_command: CommandRef) -> Self
    where
        P: Fn() -> bool + Send + Sync + 'static,
    {
        Self::with_name("Conditional", predicate, true_command, false_command)
    }

    pub fn with_name<P>(
        name: impl Into<String>,
        predicate: P,
        true_command: CommandRef,
        false_command: CommandRef,
    ) -> Self
    where
        P: Fn() -> bool + Send + Sync + 'static,
    {
        Self {
            core: CommandCore::new(name),
            predicate: Box::new(predicate),
            true_command,
            false_command,
            taken: Mutex::new(None),
        }
    }

    pub fn true_command(&self) -> &CommandRef {
        &self.true_command
    }

    pub fn false_command(&self) -> &CommandRef {
        &self.false_command
    }

    fn branch(&self, branch: Branch) -> &CommandRef {
        match branch {
            Branch::True => &self.true_command,
            Branch::False => &self.false_command,
        }
    }
}

impl Command for ConditionalCommand {
    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn children(&self) -> Vec<CommandRef> {
        vec![self.true_command.clone(), self.false_command.clone()]
    }

    fn execute(&self, ctx: &RunContext) -> Result<(), ExecError> {
        let branch = if (self.predicate)() {
            Branch::True
        } else {
            Branch::False
        };
        *lock_unpoisoned(&self.taken) = Some(branch);
        self.branch(branch).run_with(ctx)?;
        Ok(())
    }

    fn check_errors(&self) {
        let Some(branch) = *lock_unpoisoned(&self.taken) else {
            return;
        };
        let taken = self.branch(branch);
        match taken.state() {
            State::Aborted => self.core.set_aborted(),
            State::Failed => self.core.set_failed(taken.exception()),
            _ => {}
        }
    }
}
