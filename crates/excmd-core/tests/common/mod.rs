use excmd_core::sync::ManualResetEvent;
use excmd_core::{
    Command, CommandCore, CommandRef, ExecError, FatalError, LogLevel, LogSink, ProgressUpdate,
    RunContext, SimpleCommand, State, Subscription,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub const TEST_ERROR_CODE: i32 = 1;
pub const TEST_ERROR_TEXT: &str = "Command delegate error";

/// Upper bound for any wait in these tests
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// Time given to another thread to reach a blocking point
pub const LATENCY: Duration = Duration::from_millis(200);

/// Arm the completion signal and run `command` on a new thread
#[allow(dead_code)]
pub fn spawn_run<C>(command: Arc<C>) -> JoinHandle<Result<(), FatalError>>
where
    C: Command + ?Sized + 'static,
{
    command.reset_finished();
    thread::spawn(move || command.run())
}

/// Same as [`spawn_run`], with an explicit context
#[allow(dead_code)]
pub fn spawn_run_with<C>(command: Arc<C>, ctx: RunContext) -> JoinHandle<Result<(), FatalError>>
where
    C: Command + ?Sized + 'static,
{
    command.reset_finished();
    thread::spawn(move || command.run_with(&ctx))
}

/// Run on another thread and wait for completion, returning the run's result
#[allow(dead_code)]
pub fn run_in_background<C>(command: Arc<C>) -> Result<(), FatalError>
where
    C: Command + ?Sized + 'static,
{
    let handle = spawn_run(command.clone());
    assert!(
        command.wait_until_finished(Some(WAIT_TIMEOUT)),
        "command {} did not finish in time",
        command.name()
    );
    handle.join().expect("run thread panicked")
}

/// Poll `condition` until it holds or `timeout` elapses
#[allow(dead_code)]
pub fn wait_for<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

/// Leaf failing with the standard classified test error
#[allow(dead_code)]
pub fn failing(name: &str) -> Arc<SimpleCommand> {
    Arc::new(SimpleCommand::with_name(name, || {
        Err(ExecError::failure(TEST_ERROR_CODE, TEST_ERROR_TEXT))
    }))
}

#[allow(dead_code)]
pub fn failing_recoverable(name: &str) -> Arc<SimpleCommand> {
    Arc::new(SimpleCommand::with_name(name, || {
        Err(ExecError::allow_recovery(TEST_ERROR_CODE, TEST_ERROR_TEXT))
    }))
}

#[allow(dead_code)]
pub fn failing_retryable(name: &str) -> Arc<SimpleCommand> {
    Arc::new(SimpleCommand::with_name(name, || {
        Err(ExecError::allow_retry(TEST_ERROR_CODE, TEST_ERROR_TEXT))
    }))
}

/// Leaf that sleeps for `duration`
#[allow(dead_code)]
pub fn sleeping(name: &str, duration: Duration) -> Arc<SimpleCommand> {
    Arc::new(SimpleCommand::with_name(name, move || {
        thread::sleep(duration);
        Ok(())
    }))
}

/// Leaf incrementing `counter` on every run
#[allow(dead_code)]
pub fn counting(name: &str, counter: &Arc<AtomicUsize>) -> Arc<SimpleCommand> {
    let counter = counter.clone();
    Arc::new(SimpleCommand::with_name(name, move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }))
}

/// Leaf that blocks until aborted or until its sleep time runs out
///
/// Unlike a plain leaf it reacts to `abort` by waking up and ending
/// `Aborted` through its own checkpoint.
pub struct AbortableSleep {
    core: CommandCore,
    sleep: Duration,
    wake: ManualResetEvent,
}

#[allow(dead_code)]
impl AbortableSleep {
    pub fn new(name: &str, sleep: Duration) -> Arc<Self> {
        Arc::new(Self {
            core: CommandCore::new(name),
            sleep,
            wake: ManualResetEvent::new(false),
        })
    }
}

impl Command for AbortableSleep {
    fn core(&self) -> &CommandCore {
        &self.core
    }

    fn execute(&self, _ctx: &RunContext) -> Result<(), ExecError> {
        self.wake.reset();
        // abort may have landed between the started signal and the reset
        if !self.core.is_abort_requested() {
            self.wake.wait(Some(self.sleep));
        }
        self.core.checkpoint();
        Ok(())
    }

    fn abort(&self) {
        self.core.request_abort();
        self.wake.set();
    }
}

/// Sink keeping every line it receives
#[derive(Default)]
pub struct RecordingSink {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines.lock().unwrap().clone()
    }

    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    pub fn contains(&self, fragment: &str) -> bool {
        self.lines().iter().any(|(_, m)| m.contains(fragment))
    }
}

impl LogSink for RecordingSink {
    fn log(&self, _timestamp: &str, level: LogLevel, message: &str) {
        self.lines.lock().unwrap().push((level, message.to_string()));
    }
}

/// Record every state a command publishes
#[allow(dead_code)]
pub fn record_states(command: &dyn Command) -> (Arc<Mutex<Vec<State>>>, Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let sub = command.subscribe_state(Box::new(move |s: &State| sink.lock().unwrap().push(*s)));
    (seen, sub)
}

/// Record every progress update a command publishes
#[allow(dead_code)]
pub fn record_progress(
    command: &dyn Command,
) -> (Arc<Mutex<Vec<ProgressUpdate>>>, Subscription) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let sub = command.subscribe_progress(Box::new(move |p: &ProgressUpdate| {
        sink.lock().unwrap().push(p.clone())
    }));
    (seen, sub)
}

/// States of `children`, in order
#[allow(dead_code)]
pub fn states(children: &[CommandRef]) -> Vec<State> {
    children.iter().map(|c| c.state()).collect()
}
