use super::{resolve_from_children, ChildList};
use crate::command::{Command, CommandRef};
use crate::errors::{ExecError, FatalError, Result};
use crate::log::RunContext;
use crate::state_machine::CommandCore;
use std::any::Any;
use std::thread;

/// Runs every child on its own thread and waits for all of them
///
/// Aborting a parallel command forwards the abort to the children but does
/// not stop them: each child ends according to its own checkpoints.
pub struct ParallelCommand {
    core: CommandCore,
    children: ChildList,
}

impl ParallelCommand {
    pub fn new() -> Self {
        Self::with_name("Parallel")
    }

    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            core: CommandCore::new(name),
            children: ChildList::new(),
        }
    }

    /// # Errors
    ///
    /// `EngineError::ModifyWhileExecuting` while this command is running.
    pub fn add(&self, child: CommandRef) -> Result<&Self> {
        self.children.add(&self.core, child)?;
        Ok(self)
    }

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

impl Default for ParallelCommand {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

impl Command for ParallelCommand {
    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn children(&self) -> Vec<CommandRef> {
        self.children.snapshot()
    }

    fn execute(&self, ctx: &RunContext) -> std::result::Result<(), ExecError> {
        let children = self.children.snapshot();
        for child in &children {
            child.reset_finished();
        }

        let span = tracing::Span::current();
        let outcomes: Vec<std::result::Result<(), FatalError>> = thread::scope(|scope| {
            let handles: Vec<_> = children
                .iter()
                .map(|child| {
                    let span = span.clone();
                    scope.spawn(move || span.in_scope(|| child.run_with(ctx)))
                })
                .collect();

            handles
                .into_iter()
                .zip(&children)
                .map(|(handle, child)| match handle.join() {
                    Ok(outcome) => outcome,
                    Err(payload) => Err(FatalError::new(format!(
                        "Command {} panicked: {}",
                        child.name(),
                        panic_message(payload.as_ref())
                    ))
                    .with_command(child.name())),
                })
                .collect()
        });

        // first fatal error in child order wins, the rest are dropped
        if let Some(err) = outcomes.into_iter().find_map(std::result::Result::err) {
            tracing::debug!(command = self.core.name(), error = %err, "fatal error in parallel branch");
            return Err(FatalError::new(format!(
                "Fatal error in one of the sub-commands of Parallel command {}",
                self.core.name()
            ))
            .with_command(self.core.name())
            .with_source(err)
            .into());
        }

        self.core.checkpoint();
        Ok(())
    }

    fn check_errors(&self) {
        resolve_from_children(&self.core, &self.children.snapshot());
    }
}
