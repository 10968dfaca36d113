use super::{resolve_from_children, ChildList};
use crate::command::{Command, CommandRef, State};
use crate::errors::{ExecError, Result};
use crate::log::RunContext;
use crate::state_machine::CommandCore;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Runs its children one after another, in insertion order
///
/// Stops at the first child that ends `Failed` or `Aborted`, or when the
/// sequence itself is aborted. Children after the stopping point are not run.
pub struct SequentialCommand {
    core: CommandCore,
    children: ChildList,
    ran: AtomicUsize,
}

impl SequentialCommand {
    pub fn new() -> Self {
        Self::with_name("Sequential")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            core: CommandCore::new(name),
            children: ChildList::new(),
            ran: AtomicUsize::new(0),
        }
    }

    /// Append a child
    ///
    /// # Errors
    ///
    /// `EngineError::ModifyWhileExecuting` while this command is running.
    pub fn add(&self, child: CommandRef) -> Result<&Self> {
        self.children.add(&self.core, child)?;
        Ok(self)
    }

    /// Builder form of [`SequentialCommand::add`]
    pub fn with(mut self, child: CommandRef) -> Self {
        self.children.push(child);
        self
    }

    /// # Errors
    ///
    /// `EngineError::IndexOutOfRange` outside `0..len()`.
    pub fn sub_command(&self, index: usize) -> Result<CommandRef> {
        self.children.get(&self.core, index)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SequentialCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl Command for SequentialCommand {
    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn children(&self) -> Vec<CommandRef> {
        self.children.snapshot()
    }

    fn execute(&self, ctx: &RunContext) -> std::result::Result<(), ExecError> {
        self.ran.store(0, Ordering::SeqCst);
        for child in self.children.snapshot() {
            if self.core.state() == State::Aborted {
                break;
            }
            self.ran.fetch_add(1, Ordering::SeqCst);
            child.run_with(ctx)?;
            self.core.checkpoint();
            if matches!(child.state(), State::Failed | State::Aborted) {
                break;
            }
        }
        Ok(())
    }

    fn check_errors(&self) {
        let children = self.children.snapshot();
        let ran = self.ran.load(Ordering::SeqCst).min(children.len());
        resolve_from_children(&self.core, &children[..ran]);
    }
}
