#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::*;
use excmd_core::{
    Command, LogLevel, Logger, RecoverableCommand, RetryCommand, RunContext, SimpleCommand, State,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_successful_core_skips_recovery() {
    let recoveries = Arc::new(AtomicUsize::new(0));
    let cmd = RecoverableCommand::new(SimpleCommand::null(), counting("Recover", &recoveries));

    cmd.run().unwrap();

    assert_eq!(cmd.state(), State::Completed);
    assert_eq!(recoveries.load(Ordering::SeqCst), 0);
    assert!(cmd.exception().is_none());
}

#[test]
fn test_noop_recovery_completes() {
    let sink = RecordingSink::new();
    let cmd = RecoverableCommand::with_name(
        "Recoverable",
        failing_recoverable("Core-Error"),
        SimpleCommand::null(),
    );

    cmd.run_with(&RunContext::new(Logger::with_sink(sink.clone()))).unwrap();

    assert_eq!(cmd.state(), State::Completed);
    assert_eq!(cmd.core_command().state(), State::Failed);
    assert_eq!(cmd.recovery_command().state(), State::Completed);
    let err = cmd.exception().expect("core failure is kept on the decorator");
    assert_eq!(err.id(), TEST_ERROR_CODE);
    assert_eq!(err.text(), TEST_ERROR_TEXT);
    assert!(sink.contains("ERROR (RECOVERED)[1] - Command delegate error"));
}

#[test]
fn test_plain_failure_is_not_recovered() {
    let recoveries = Arc::new(AtomicUsize::new(0));
    let cmd = RecoverableCommand::new(failing("Core-Error"), counting("Recover", &recoveries));

    cmd.run().unwrap();

    assert_eq!(cmd.state(), State::Failed);
    assert_eq!(recoveries.load(Ordering::SeqCst), 0);
    assert_eq!(cmd.recovery_command().state(), State::Idle);
}

#[test]
fn test_failing_recovery_fails_decorator() {
    let cmd = RecoverableCommand::new(failing_recoverable("Core-Error"), failing("Recover-Error"));

    cmd.run().unwrap();

    assert_eq!(cmd.state(), State::Failed);
    assert_eq!(cmd.recovery_command().state(), State::Failed);
}

#[test]
fn test_recovers_after_exhausted_retries() {
    let retry: Arc<RetryCommand> = Arc::new(RetryCommand::new(failing_retryable("Flaky"), 2));
    let cmd = RecoverableCommand::new(retry.clone(), SimpleCommand::null());

    cmd.run().unwrap();

    assert_eq!(retry.state(), State::Failed);
    assert_eq!(retry.current_retry_index(), 2);
    assert_eq!(cmd.state(), State::Completed);
}

#[test]
fn test_recovered_line_only_when_info_sink_present() {
    let sink = RecordingSink::new();
    let logger = Logger::with_sink(sink.clone()).with_info_enabled(false);
    let cmd = RecoverableCommand::new(failing_recoverable("Core-Error"), SimpleCommand::null());

    cmd.run_with(&RunContext::new(logger)).unwrap();

    assert!(sink.messages(LogLevel::Info).is_empty());
    assert_eq!(sink.messages(LogLevel::Error).len(), 1);
}
