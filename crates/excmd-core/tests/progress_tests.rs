#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use common::*;
use excmd_core::{
    Command, CommandRef, CyclicCommand, ParallelCommand, ProgressUpdate, SequentialCommand,
    SimpleCommand, State,
};
use std::sync::{Arc, Weak};

/// Ten leaves where `special` (1-based) is replaced by `make_special`
fn ten_leaves(
    special: usize,
    make_special: impl Fn(&Weak<SequentialCommand>) -> CommandRef,
) -> Arc<SequentialCommand> {
    Arc::new_cyclic(|weak| {
        let mut seq = SequentialCommand::with_name("Progress");
        for i in 1..=10 {
            let child: CommandRef = if i == special {
                make_special(weak)
            } else {
                Arc::new(SimpleCommand::named(format!("S{}", i)))
            };
            seq = seq.with(child);
        }
        seq
    })
}

fn percents(updates: &[ProgressUpdate]) -> Vec<u32> {
    updates.iter().map(|u| u.percent).collect()
}

#[test]
fn test_progress_runs_to_one_hundred() {
    let seq = ten_leaves(0, |_| unreachable!());
    let (updates, _sub) = record_progress(&*seq);

    seq.run().unwrap();

    let updates = updates.lock().unwrap();
    assert_eq!(percents(&updates), (1..=10).map(|i| i * 10).collect::<Vec<_>>());
    assert_eq!(updates[6].message, "70 percent complete");
    assert_eq!(seq.percent_completed(), 100);
    assert!((seq.fraction_completed() - 1.0).abs() < f64::EPSILON);
}

#[test]
fn test_progress_stops_at_failure() {
    let seq = ten_leaves(8, |_| failing("S8-Error"));
    let (updates, _sub) = record_progress(&*seq);

    seq.run().unwrap();

    assert_eq!(seq.state(), State::Failed);
    assert_eq!(updates.lock().unwrap().len(), 7);
    assert_eq!(seq.percent_completed(), 70);
    assert!((seq.fraction_completed() - 0.7).abs() < 1e-9);
}

#[test]
fn test_progress_stops_at_abort() {
    let seq = ten_leaves(8, |weak| {
        let weak = weak.clone();
        Arc::new(SimpleCommand::with_name("S8-Abort", move || {
            if let Some(seq) = weak.upgrade() {
                seq.abort();
            }
            Ok(())
        }))
    });
    let (updates, _sub) = record_progress(&*seq);

    seq.run().unwrap();

    // the aborting leaf itself completes before the sequence notices
    assert_eq!(seq.state(), State::Aborted);
    assert_eq!(updates.lock().unwrap().len(), 8);
    assert_eq!(seq.percent_completed(), 80);
}

#[test]
fn test_progress_restarts_on_rerun() {
    let seq = ten_leaves(8, |_| failing("S8-Error"));
    seq.run().unwrap();
    assert_eq!(seq.percent_completed(), 70);

    let (updates, _sub) = record_progress(&*seq);
    seq.run().unwrap();

    let updates = updates.lock().unwrap();
    assert_eq!(percents(&updates), vec![10, 20, 30, 40, 50, 60, 70]);
    assert_eq!(seq.percent_completed(), 70);
}

#[test]
fn test_progress_truncates_percent() {
    let seq = SequentialCommand::new()
        .with(Arc::new(SimpleCommand::named("A")))
        .with(Arc::new(SimpleCommand::named("B")))
        .with(Arc::new(SimpleCommand::named("C")));
    let (updates, _sub) = record_progress(&seq);

    seq.run().unwrap();

    assert_eq!(percents(&updates.lock().unwrap()), vec![33, 66, 100]);
}

#[test]
fn test_progress_of_nested_tree_counts_leaves_only() {
    let inner = Arc::new(
        ParallelCommand::with_name("Inner")
            .with(Arc::new(SimpleCommand::named("P1")))
            .with(Arc::new(SimpleCommand::named("P2"))),
    );
    let seq = SequentialCommand::new()
        .with(Arc::new(SimpleCommand::named("S1")))
        .with(inner.clone())
        .with(Arc::new(SimpleCommand::named("S3")));
    let (outer_updates, _outer) = record_progress(&seq);
    let (inner_updates, _inner) = record_progress(&*inner);

    seq.run().unwrap();

    assert_eq!(percents(&outer_updates.lock().unwrap()), vec![25, 50, 75, 100]);
    assert_eq!(percents(&inner_updates.lock().unwrap()), vec![50, 100]);
}

#[test]
fn test_repeated_leaf_counts_every_completion() {
    let cyclic = CyclicCommand::new(Arc::new(SimpleCommand::named("Tick")), 3);
    let (updates, _sub) = record_progress(&cyclic);

    cyclic.run().unwrap();

    // one leaf completing three times never goes past the leaf count
    assert_eq!(percents(&updates.lock().unwrap()), vec![100, 100, 100]);
    assert_eq!(cyclic.percent_completed(), 100);
}

#[test]
fn test_leafless_command_reports_complete() {
    let seq = SequentialCommand::new();
    let (updates, _sub) = record_progress(&seq);

    seq.run().unwrap();

    let updates = updates.lock().unwrap();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].message, "Complete");
    assert_eq!(seq.percent_completed(), 100);
}

#[test]
fn test_dropped_subscription_stops_updates() {
    let seq = ten_leaves(0, |_| unreachable!());
    let (updates, sub) = record_progress(&*seq);
    drop(sub);

    seq.run().unwrap();

    assert!(updates.lock().unwrap().is_empty());
    assert_eq!(seq.percent_completed(), 100);
}
