//! The `Command` trait and the values it reports

use crate::errors::{CommandError, ExecError, FatalError};
use crate::log::RunContext;
use crate::observer::Subscription;
use crate::state_machine::{run_command, CommandCore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Shared handle onto a node of a command tree
pub type CommandRef = Arc<dyn Command>;

/// Lifecycle state of a command instance
///
/// `Idle -> Executing -> {Completed | Failed | Aborted}`; the terminal
/// states hold until the next run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    #[default]
    Idle,
    Executing,
    Completed,
    Failed,
    Aborted,
}

impl State {
    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Completed | State::Failed | State::Aborted)
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            State::Idle => "Idle",
            State::Executing => "Executing",
            State::Completed => "Completed",
            State::Failed => "Failed",
            State::Aborted => "Aborted",
        };
        f.write_str(s)
    }
}

/// Progress notification emitted as leaf descendants complete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    /// 0 to 100
    pub percent: u32,
    /// 0.0 to 1.0
    pub fraction: f64,
    pub message: String,
}

impl ProgressUpdate {
    pub(crate) fn complete() -> Self {
        Self {
            percent: 100,
            fraction: 1.0,
            message: "Complete".to_string(),
        }
    }
}

impl fmt::Display for ProgressUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A node of a command tree
///
/// Implementors provide the variant-specific parts: their [`CommandCore`],
/// their current children, the `execute` body and the `check_errors`
/// resolution. Everything else (running, signalling, observation) comes from
/// the provided methods and is the same for every variant.
pub trait Command: Send + Sync {
    fn core(&self) -> &CommandCore;

    /// Direct children in execution order
    fn children(&self) -> Vec<CommandRef> {
        Vec::new()
    }

    /// Variant body, called by `run` once the command is `Executing`
    ///
    /// # Errors
    ///
    /// A classified error fails this command; a fatal error fails it and
    /// propagates out of `run`.
    fn execute(&self, ctx: &RunContext) -> Result<(), ExecError>;

    /// Resolve this command's final state from its children after `execute`
    fn check_errors(&self) {}

    /// Run with a silent logger and a fresh run id
    ///
    /// # Errors
    ///
    /// Returns the fatal error that ended the run, if any. Classified
    /// failures are reported through `state()` and `exception()` instead.
    fn run(&self) -> Result<(), FatalError> {
        self.run_with(&RunContext::default())
    }

    /// Run inside an existing context; children inherit `ctx`
    ///
    /// # Errors
    ///
    /// Same as [`Command::run`].
    fn run_with(&self, ctx: &RunContext) -> Result<(), FatalError> {
        run_command(self, ctx)
    }

    fn pause(&self) {
        for child in self.children() {
            child.pause();
        }
        self.core().request_pause();
    }

    fn resume(&self) {
        for child in self.children() {
            child.resume();
        }
        self.core().request_resume();
    }

    fn abort(&self) {
        for child in self.children() {
            child.abort();
        }
        self.core().request_abort();
    }

    /// All commands below this one, depth-first pre-order
    fn descendants(&self) -> Vec<CommandRef> {
        let mut out = Vec::new();
        for child in self.children() {
            let below = child.descendants();
            out.push(child);
            out.extend(below);
        }
        out
    }

    fn name(&self) -> &str {
        self.core().name()
    }

    fn state(&self) -> State {
        self.core().state()
    }

    fn exception(&self) -> Option<CommandError> {
        self.core().exception()
    }

    fn elapsed(&self) -> Duration {
        self.core().elapsed()
    }

    fn elapsed_ms(&self) -> u128 {
        self.core().elapsed().as_millis()
    }

    fn fraction_completed(&self) -> f64 {
        self.core().fraction_completed()
    }

    fn percent_completed(&self) -> u32 {
        self.core().percent_completed()
    }

    fn reset_finished(&self) {
        self.core().reset_finished();
    }

    /// Block until the current run finishes; `None` waits indefinitely
    fn wait_until_finished(&self, timeout: Option<Duration>) -> bool {
        self.core().wait_until_finished(timeout)
    }

    fn wait_until_started(&self, timeout: Option<Duration>) -> bool {
        self.core().wait_until_started(timeout)
    }

    fn subscribe_state(&self, callback: Box<dyn Fn(&State) + Send + Sync>) -> Subscription {
        self.core().subscribe_state(callback)
    }

    fn subscribe_progress(
        &self,
        callback: Box<dyn Fn(&ProgressUpdate) + Send + Sync>,
    ) -> Subscription {
        self.core().subscribe_progress(callback)
    }
}

impl fmt::Debug for dyn Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}
