//! Commands aggregating an ordered list of children

pub mod conditional;
pub mod parallel;
pub mod sequential;

pub use conditional::ConditionalCommand;
pub use parallel::ParallelCommand;
pub use sequential::SequentialCommand;

use crate::command::{CommandRef, State};
use crate::errors::{EngineError, Result};
use crate::state_machine::CommandCore;
use std::sync::{PoisonError, RwLock};

/// Child list guarded against modification while the owner runs
pub(crate) struct ChildList {
    children: RwLock<Vec<CommandRef>>,
}

impl ChildList {
    pub(crate) fn new() -> Self {
        Self {
            children: RwLock::new(Vec::new()),
        }
    }

    /// Append without the running check; only for builders consuming `self`
    pub(crate) fn push(&mut self, child: CommandRef) {
        self.children
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .push(child);
    }

    pub(crate) fn add(&self, owner: &CommandCore, child: CommandRef) -> Result<()> {
        let _not_running = owner
            .try_lock_run()
            .ok_or_else(|| EngineError::ModifyWhileExecuting {
                command: owner.name().to_string(),
                child: child.name().to_string(),
            })?;
        self.children
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(child);
        Ok(())
    }

    pub(crate) fn get(&self, owner: &CommandCore, index: usize) -> Result<CommandRef> {
        let children = self.children.read().unwrap_or_else(PoisonError::into_inner);
        children
            .get(index)
            .cloned()
            .ok_or_else(|| EngineError::IndexOutOfRange {
                command: owner.name().to_string(),
                index,
                len: children.len(),
            })
    }

    pub(crate) fn snapshot(&self) -> Vec<CommandRef> {
        self.children
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub(crate) fn len(&self) -> usize {
        self.children
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Final state of a composite from the children that ran
///
/// Any aborted child makes the composite `Aborted`; otherwise, unless the
/// composite itself was aborted, the first failed child fails it.
pub(crate) fn resolve_from_children(core: &CommandCore, ran: &[CommandRef]) {
    if ran.iter().any(|c| c.state() == State::Aborted) {
        core.set_aborted();
        return;
    }
    if core.state() == State::Aborted {
        return;
    }
    if let Some(failed) = ran.iter().find(|c| c.state() == State::Failed) {
        core.set_failed(failed.exception());
    }
}
