//! Per-instance state machine shared by every command variant
//!
//! A [`CommandCore`] owns everything one command instance needs regardless of
//! its variant: name, state and exception, abort/pause flags with the
//! condition variable checkpoints block on, started/finished signals, timing,
//! progress counters and the two notification streams.
//!
//! Every method takes `&self`; the core is shared between the thread running
//! the command and any thread calling `pause`/`resume`/`abort` on it.

use crate::command::{Command, CommandRef, ProgressUpdate, State};
use crate::errors::{CommandError, ExecError, FatalError};
use crate::log::{Logger, RunContext};
use crate::observer::{Subscribers, Subscription};
use crate::sync::{lock_unpoisoned, ManualResetEvent};
use crate::{log_op_end, log_op_error, log_op_start};
use excmd_core_types::schema::OP_COMMAND_RUN;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError, TryLockError};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Status {
    state: State,
    exception: Option<CommandError>,
}

#[derive(Debug, Default)]
struct Flags {
    aborted: bool,
    paused: bool,
}

#[derive(Debug, Default)]
struct Clock {
    start: Option<Instant>,
    stop: Option<Instant>,
}

impl Clock {
    fn elapsed(&self) -> Duration {
        match (self.start, self.stop) {
            (Some(start), Some(stop)) => stop.saturating_duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }
}

#[derive(Debug, Default)]
struct LeafCounts {
    total: usize,
    completed: usize,
}

/// Leaf-completion counter for one command
///
/// Lives behind an `Arc` because the callbacks registered on leaf descendants
/// must reach it from whatever thread those leaves complete on.
struct Progress {
    counts: Mutex<LeafCounts>,
    fraction_bits: AtomicU64,
    percent: AtomicU32,
    subscribers: Subscribers<ProgressUpdate>,
}

impl Progress {
    fn new() -> Self {
        Self {
            counts: Mutex::new(LeafCounts::default()),
            fraction_bits: AtomicU64::new(0f64.to_bits()),
            percent: AtomicU32::new(0),
            subscribers: Subscribers::new(),
        }
    }

    fn reset(&self, total: usize) {
        *lock_unpoisoned(&self.counts) = LeafCounts {
            total,
            completed: 0,
        };
        self.store(0, 0.0);
    }

    fn store(&self, percent: u32, fraction: f64) {
        self.fraction_bits.store(fraction.to_bits(), Ordering::SeqCst);
        self.percent.store(percent, Ordering::SeqCst);
    }

    fn fraction(&self) -> f64 {
        f64::from_bits(self.fraction_bits.load(Ordering::SeqCst))
    }

    fn percent(&self) -> u32 {
        self.percent.load(Ordering::SeqCst)
    }

    fn leaf_completed(&self) {
        let mut counts = lock_unpoisoned(&self.counts);
        // a leaf repeated by a loop completes more than once per run
        counts.completed = (counts.completed + 1).min(counts.total);
        let update = if counts.total > 0 {
            let percent = (counts.completed * 100 / counts.total) as u32;
            ProgressUpdate {
                percent,
                fraction: counts.completed as f64 / counts.total as f64,
                message: format!("{} percent complete", percent),
            }
        } else {
            ProgressUpdate::complete()
        };
        self.store(update.percent, update.fraction);
        // published under the counter lock so updates arrive in counting order
        self.subscribers.publish(&update);
    }

    fn finish_without_leaves(&self) {
        let counts = lock_unpoisoned(&self.counts);
        if counts.total == 0 {
            let update = ProgressUpdate::complete();
            self.store(update.percent, update.fraction);
            self.subscribers.publish(&update);
        }
    }
}

/// State machine and signalling shared by all command variants
pub struct CommandCore {
    name: String,
    run_lock: Mutex<()>,
    status: Mutex<Status>,
    flags: Mutex<Flags>,
    resumed: Condvar,
    started: ManualResetEvent,
    finished: ManualResetEvent,
    clock: Mutex<Clock>,
    progress: Arc<Progress>,
    state_subscribers: Subscribers<State>,
    logger: Mutex<Logger>,
}

impl CommandCore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            run_lock: Mutex::new(()),
            status: Mutex::new(Status::default()),
            flags: Mutex::new(Flags::default()),
            resumed: Condvar::new(),
            started: ManualResetEvent::new(false),
            finished: ManualResetEvent::new(true),
            clock: Mutex::new(Clock::default()),
            progress: Arc::new(Progress::new()),
            state_subscribers: Subscribers::new(),
            logger: Mutex::new(Logger::silent()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> State {
        lock_unpoisoned(&self.status).state
    }

    /// Classified error recorded by the most recent run, if any
    pub fn exception(&self) -> Option<CommandError> {
        lock_unpoisoned(&self.status).exception.clone()
    }

    /// Duration of the most recent run, or of the run in progress
    pub fn elapsed(&self) -> Duration {
        lock_unpoisoned(&self.clock).elapsed()
    }

    pub fn fraction_completed(&self) -> f64 {
        self.progress.fraction()
    }

    pub fn percent_completed(&self) -> u32 {
        self.progress.percent()
    }

    /// Logger of the most recent run
    pub fn logger(&self) -> Logger {
        lock_unpoisoned(&self.logger).clone()
    }

    /// Whether `run` currently holds this instance
    pub fn is_running(&self) -> bool {
        // a poisoned lock only means an earlier run panicked
        matches!(self.run_lock.try_lock(), Err(TryLockError::WouldBlock))
    }

    pub(crate) fn try_lock_run(&self) -> Option<std::sync::MutexGuard<'_, ()>> {
        match self.run_lock.try_lock() {
            Ok(guard) => Some(guard),
            Err(TryLockError::Poisoned(poisoned)) => Some(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => None,
        }
    }

    // ----- state transitions -----

    /// Transition to `state`, logging and publishing the change
    pub fn set_state(&self, state: State) {
        let previous = {
            let mut status = lock_unpoisoned(&self.status);
            std::mem::replace(&mut status.state, state)
        };
        self.announce(previous, state);
    }

    /// Become `Failed`, recording `exception`
    ///
    /// Overrides `Aborted`: a failure on this command's own path wins.
    pub fn set_failed(&self, exception: Option<CommandError>) {
        let previous = {
            let mut status = lock_unpoisoned(&self.status);
            status.exception = exception;
            std::mem::replace(&mut status.state, State::Failed)
        };
        self.announce(previous, State::Failed);
    }

    /// Become `Aborted` unless already `Failed` or `Aborted`
    pub fn set_aborted(&self) {
        let previous = {
            let mut status = lock_unpoisoned(&self.status);
            if matches!(status.state, State::Failed | State::Aborted) {
                return;
            }
            std::mem::replace(&mut status.state, State::Aborted)
        };
        self.announce(previous, State::Aborted);
    }

    /// Record an exception without changing state
    pub fn set_exception(&self, exception: Option<CommandError>) {
        lock_unpoisoned(&self.status).exception = exception;
    }

    fn announce(&self, previous: State, state: State) {
        self.logger()
            .info(&format!("Command {} : {} -> {}", self.name, previous, state));
        self.state_subscribers.publish(&state);
    }

    /// Turn a still-executing run into `Completed`
    pub fn signal_completion(&self) {
        if self.state() == State::Executing {
            self.set_state(State::Completed);
        }
        if self.state() == State::Completed {
            self.progress.finish_without_leaves();
        }
    }

    // ----- cooperative cancellation -----

    pub fn is_abort_requested(&self) -> bool {
        lock_unpoisoned(&self.flags).aborted
    }

    pub fn is_pause_requested(&self) -> bool {
        lock_unpoisoned(&self.flags).paused
    }

    /// Flag a pause for the next checkpoint of this command
    pub fn request_pause(&self) {
        lock_unpoisoned(&self.flags).paused = true;
        self.log_if_executing("PAUSED");
    }

    /// Clear a pending pause and wake a blocked checkpoint
    pub fn request_resume(&self) {
        lock_unpoisoned(&self.flags).paused = false;
        self.resumed.notify_all();
        self.log_if_executing("RESUMED");
    }

    /// Flag an abort, dropping any pending pause
    pub fn request_abort(&self) {
        {
            let mut flags = lock_unpoisoned(&self.flags);
            flags.aborted = true;
            flags.paused = false;
        }
        self.resumed.notify_all();
        self.log_if_executing("ABORTED");
    }

    fn log_if_executing(&self, what: &str) {
        if self.state() == State::Executing {
            self.logger()
                .info(&format!("Command {} is {}", self.name, what));
        }
    }

    /// Cancellation checkpoint
    ///
    /// With an abort pending the command becomes `Aborted` (unless it has
    /// already failed) and the call returns at once. With a pause pending
    /// the call blocks until `resume` or `abort`.
    pub fn checkpoint(&self) {
        let aborted = {
            let mut flags = lock_unpoisoned(&self.flags);
            while flags.paused && !flags.aborted {
                flags = self
                    .resumed
                    .wait(flags)
                    .unwrap_or_else(PoisonError::into_inner);
            }
            flags.aborted
        };
        if aborted {
            self.set_aborted();
        }
    }

    // ----- signals -----

    /// Arm the completion signal before starting `run` on another thread
    pub fn reset_finished(&self) {
        self.finished.reset();
    }

    pub fn wait_until_finished(&self, timeout: Option<Duration>) -> bool {
        self.finished.wait(timeout)
    }

    pub fn wait_until_started(&self, timeout: Option<Duration>) -> bool {
        self.started.wait(timeout)
    }

    // ----- observation -----

    pub fn subscribe_state<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&State) + Send + Sync + 'static,
    {
        self.state_subscribers.subscribe(callback)
    }

    pub fn subscribe_progress<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&ProgressUpdate) + Send + Sync + 'static,
    {
        self.progress.subscribers.subscribe(callback)
    }

    // ----- run plumbing -----

    fn begin_run(&self, ctx: &RunContext, leaves: usize) {
        *lock_unpoisoned(&self.logger) = ctx.logger().clone();
        *lock_unpoisoned(&self.flags) = Flags::default();
        self.finished.reset();
        self.started.reset();
        lock_unpoisoned(&self.status).exception = None;
        *lock_unpoisoned(&self.clock) = Clock {
            start: Some(Instant::now()),
            stop: None,
        };
        self.progress.reset(leaves);
    }

    fn subscribe_to_leaves(&self, leaves: &[CommandRef]) -> Vec<Subscription> {
        leaves
            .iter()
            .map(|leaf| {
                let progress = self.progress.clone();
                leaf.subscribe_state(Box::new(move |state: &State| {
                    if *state == State::Completed {
                        progress.leaf_completed();
                    }
                }))
            })
            .collect()
    }
}

impl std::fmt::Debug for CommandCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandCore")
            .field("name", &self.name)
            .field("state", &self.state())
            .finish()
    }
}

/// Teardown that must happen on every exit from `run`, panics included
struct RunTeardown<'a> {
    core: &'a CommandCore,
    subscriptions: Vec<Subscription>,
}

impl Drop for RunTeardown<'_> {
    fn drop(&mut self) {
        self.subscriptions.clear();
        if std::thread::panicking() && self.core.state() == State::Executing {
            self.core.set_failed(None);
        }
        lock_unpoisoned(&self.core.clock).stop = Some(Instant::now());
        self.core.finished.set();
        self.core.started.reset();
    }
}

/// Body of `Command::run_with`
pub(crate) fn run_command<C>(command: &C, ctx: &RunContext) -> Result<(), FatalError>
where
    C: Command + ?Sized,
{
    let core = command.core();
    let _serial = lock_unpoisoned(&core.run_lock);

    let leaves: Vec<CommandRef> = command
        .descendants()
        .into_iter()
        .filter(|d| d.children().is_empty())
        .collect();
    core.begin_run(ctx, leaves.len());
    let _teardown = RunTeardown {
        core,
        subscriptions: core.subscribe_to_leaves(&leaves),
    };

    let span = tracing::info_span!(
        OP_COMMAND_RUN,
        command = %core.name(),
        run_id = %ctx.run_id()
    );
    let _entered = span.enter();
    let start = Instant::now();
    log_op_start!(
        OP_COMMAND_RUN,
        command = core.name(),
        run_id = %ctx.run_id(),
        leaves = leaves.len()
    );

    core.set_state(State::Executing);
    core.started.set();

    match command.execute(ctx) {
        Ok(()) => command.check_errors(),
        Err(ExecError::Classified(err)) => {
            core.set_failed(Some(err));
            command.check_errors();
        }
        Err(ExecError::Fatal(err)) => {
            core.set_failed(None);
            log_op_error!(
                OP_COMMAND_RUN,
                err,
                duration_ms = start.elapsed().as_millis() as u64,
                command = core.name(),
                run_id = %ctx.run_id()
            );
            return Err(err);
        }
    }

    core.signal_completion();
    log_op_end!(
        OP_COMMAND_RUN,
        duration_ms = start.elapsed().as_millis() as u64,
        command = core.name(),
        run_id = %ctx.run_id(),
        state = %core.state()
    );
    Ok(())
}
