#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::*;
use excmd_core::{Command, CommandRef, EngineError, SequentialCommand, SimpleCommand, State};
use std::sync::{Arc, Weak};

fn three_step(middle: impl Fn(&Weak<SequentialCommand>) -> CommandRef) -> Arc<SequentialCommand> {
    Arc::new_cyclic(|weak| {
        SequentialCommand::new()
            .with(Arc::new(SimpleCommand::named("S1")))
            .with(middle(weak))
            .with(Arc::new(SimpleCommand::named("S3")))
    })
}

fn pausing_step(weak: &Weak<SequentialCommand>) -> CommandRef {
    let weak = weak.clone();
    Arc::new(SimpleCommand::with_name("S2-Pause", move || {
        if let Some(seq) = weak.upgrade() {
            seq.pause();
        }
        Ok(())
    }))
}

fn aborting_step(weak: &Weak<SequentialCommand>) -> CommandRef {
    let weak = weak.clone();
    Arc::new(SimpleCommand::with_name("S2-Abort", move || {
        if let Some(seq) = weak.upgrade() {
            seq.abort();
        }
        Ok(())
    }))
}

#[test]
fn test_modify_while_executing_is_rejected() {
    let seq = Arc::new(
        SequentialCommand::with_name("Seq")
            .with(AbortableSleep::new("A1", LATENCY))
            .with(AbortableSleep::new("A2", LATENCY)),
    );
    let handle = spawn_run(seq.clone());
    assert!(seq.wait_until_started(Some(WAIT_TIMEOUT)));

    let err = seq
        .add(SimpleCommand::null())
        .err()
        .expect("adding to a running sequence must fail");
    assert!(matches!(err, EngineError::ModifyWhileExecuting { .. }));
    assert!(err.to_string().contains("Attempt to add"));

    handle.join().unwrap().unwrap();
    assert_eq!(seq.len(), 2);
    // allowed again once the run is over
    seq.add(SimpleCommand::null()).unwrap();
    assert_eq!(seq.len(), 3);
}

#[test]
fn test_timed_wait_returns_false_while_still_running() {
    let seq = Arc::new(
        SequentialCommand::with_name("Seq").with(AbortableSleep::new("A1", WAIT_TIMEOUT)),
    );
    let handle = spawn_run(seq.clone());
    assert!(seq.wait_until_started(Some(WAIT_TIMEOUT)));

    assert!(!seq.wait_until_finished(Some(LATENCY)));
    assert_eq!(seq.state(), State::Executing);

    seq.abort();
    handle.join().unwrap().unwrap();
    assert!(seq.wait_until_finished(Some(WAIT_TIMEOUT)));
    assert_eq!(seq.state(), State::Aborted);
}

#[test]
fn test_run_ok() {
    let seq = Arc::new(
        SequentialCommand::with_name("Seq")
            .with(Arc::new(SimpleCommand::named("S1")))
            .with(Arc::new(SimpleCommand::named("S2")))
            .with(Arc::new(SimpleCommand::named("S3"))),
    );
    run_in_background(seq.clone()).unwrap();

    assert_eq!(seq.state(), State::Completed);
    assert!(states(&seq.children()).iter().all(|s| *s == State::Completed));
    assert!(seq.exception().is_none());
}

#[test]
fn test_failure_leaves_later_children_idle() {
    let seq = Arc::new(
        SequentialCommand::with_name("Seq")
            .with(Arc::new(SimpleCommand::named("S1")))
            .with(failing("S2-Error"))
            .with(Arc::new(SimpleCommand::named("S3"))),
    );
    run_in_background(seq.clone()).unwrap();

    assert_eq!(seq.state(), State::Failed);
    assert_eq!(
        states(&seq.children()),
        vec![State::Completed, State::Failed, State::Idle]
    );
    let err = seq.exception().unwrap();
    assert_eq!(err.id(), TEST_ERROR_CODE);
    assert_eq!(err.text(), TEST_ERROR_TEXT);
}

#[test]
fn test_abort_from_inside() {
    let seq = three_step(aborting_step);
    run_in_background(seq.clone()).unwrap();

    assert_eq!(seq.state(), State::Aborted);
    assert_eq!(
        states(&seq.children()),
        vec![State::Completed, State::Completed, State::Idle]
    );
}

#[test]
fn test_pause_resume() {
    let seq = three_step(pausing_step);
    let handle = spawn_run(seq.clone());

    let second = seq.sub_command(1).unwrap();
    assert!(wait_for(|| second.state() == State::Completed, WAIT_TIMEOUT));
    std::thread::sleep(LATENCY);

    assert_eq!(seq.state(), State::Executing);
    assert_eq!(
        states(&seq.children()),
        vec![State::Completed, State::Completed, State::Idle]
    );

    seq.resume();
    assert!(seq.wait_until_finished(Some(WAIT_TIMEOUT)));
    handle.join().unwrap().unwrap();

    assert_eq!(seq.state(), State::Completed);
    assert!(states(&seq.children()).iter().all(|s| *s == State::Completed));
}

#[test]
fn test_pause_abort() {
    let seq = three_step(pausing_step);
    let handle = spawn_run(seq.clone());

    let second = seq.sub_command(1).unwrap();
    assert!(wait_for(|| second.state() == State::Completed, WAIT_TIMEOUT));
    std::thread::sleep(LATENCY);
    assert_eq!(seq.state(), State::Executing);

    seq.abort();
    assert!(seq.wait_until_finished(Some(WAIT_TIMEOUT)));
    handle.join().unwrap().unwrap();

    assert_eq!(seq.state(), State::Aborted);
    assert_eq!(
        states(&seq.children()),
        vec![State::Completed, State::Completed, State::Idle]
    );
}

#[test]
fn test_external_abort_interrupts_abortable_child() {
    let first = AbortableSleep::new("A1", LATENCY * 8);
    let second = AbortableSleep::new("A2", LATENCY * 5);
    let seq = Arc::new(
        SequentialCommand::new()
            .with(first.clone())
            .with(second.clone()),
    );
    let handle = spawn_run(seq.clone());
    assert!(first.wait_until_started(Some(WAIT_TIMEOUT)));
    std::thread::sleep(LATENCY);

    seq.abort();
    assert!(seq.wait_until_finished(Some(WAIT_TIMEOUT)));
    handle.join().unwrap().unwrap();

    assert_eq!(seq.state(), State::Aborted);
    assert_eq!(first.state(), State::Aborted);
    assert_eq!(second.state(), State::Idle);
    assert!(seq.elapsed() < LATENCY * 8);
}

#[test]
fn test_retrieve_sub_commands() {
    let branch1 = Arc::new(
        SequentialCommand::with_name("Branch 1")
            .with(Arc::new(SimpleCommand::named("B1-1")))
            .with(Arc::new(SimpleCommand::named("B1-2")))
            .with(Arc::new(SimpleCommand::named("B1-3"))),
    );
    let branch2 = Arc::new(
        SequentialCommand::with_name("Branch 2")
            .with(Arc::new(SimpleCommand::named("B2-1")))
            .with(Arc::new(SimpleCommand::named("B2-2")))
            .with(Arc::new(SimpleCommand::named("B2-3")))
            .with(Arc::new(SimpleCommand::named("B2-4")))
            .with(Arc::new(SimpleCommand::named("B2-5"))),
    );
    let main = SequentialCommand::with_name("Main")
        .with(Arc::new(SimpleCommand::named("A1")))
        .with(Arc::new(SimpleCommand::named("A2")))
        .with(branch1.clone())
        .with(branch2.clone());

    assert_eq!(branch1.descendants().len(), 3);
    assert_eq!(branch2.descendants().len(), 5);
    assert_eq!(main.descendants().len(), 12);
    assert_eq!(main.descendants().len(), 12);
    assert_eq!(branch1.children().len(), 3);
    assert_eq!(branch2.children().len(), 5);
    assert_eq!(main.children().len(), 4);
    assert_eq!(main.children().len(), 4);

    let names: Vec<String> = main
        .descendants()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    assert_eq!(&names[..4], &["A1", "A2", "Branch 1", "B1-1"]);
}

#[test]
fn test_rerun_is_idempotent() {
    let seq = SequentialCommand::new()
        .with(Arc::new(SimpleCommand::named("S1")))
        .with(failing("S2"))
        .with(Arc::new(SimpleCommand::named("S3")));

    seq.run().unwrap();
    let first = (seq.state(), seq.exception().map(|e| (e.id(), e.text().to_string())));
    seq.run().unwrap();
    let second = (seq.state(), seq.exception().map(|e| (e.id(), e.text().to_string())));

    assert_eq!(first, second);
    assert_eq!(first.0, State::Failed);
}
