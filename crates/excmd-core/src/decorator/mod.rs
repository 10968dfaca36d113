//! Commands wrapping one core command with a cross-cutting behavior
//!
//! Every decorator owns exactly one core command, fixed at construction, plus
//! zero to two auxiliary commands. The base outcome rule: a failed child fails
//! the decorator, even over a local abort; an aborted child aborts it.

pub mod abortable;
pub mod cyclic;
pub mod generic_cyclic;
pub mod recoverable;
pub mod retry;
pub mod try_catch_finally;
pub mod while_loop;

pub use abortable::AbortableCommand;
pub use cyclic::CyclicCommand;
pub use generic_cyclic::{CycleBinding, GenericCyclicCommand};
pub use recoverable::RecoverableCommand;
pub use retry::RetryCommand;
pub use try_catch_finally::TryCatchFinallyCommand;
pub use while_loop::WhileCommand;

use crate::command::{CommandRef, State};
use crate::errors::CommandError;
use crate::state_machine::CommandCore;

/// Adopt a child's failure or abort
pub(crate) fn adopt_outcome(core: &CommandCore, child: &CommandRef) {
    match child.state() {
        State::Failed => core.set_failed(child.exception()),
        State::Aborted => core.set_aborted(),
        _ => {}
    }
}

/// Whether a loop should stop after a child run
pub(crate) fn should_stop(core: &CommandCore, child: &CommandRef) -> bool {
    matches!(core.state(), State::Failed | State::Aborted)
        || matches!(child.state(), State::Failed | State::Aborted)
}

pub(crate) fn recovered_message(err: &CommandError) -> String {
    format!("ERROR (RECOVERED)[{}] - {}", err.id(), err.text())
}
