//! Runs a small stage-initialization tree with the development log profile
//!
//! ```text
//! cargo run -p excmd-core --example stage_initialization
//! RUST_LOG=excmd=info cargo run -p excmd-core --example stage_initialization
//! ```

use excmd_core::logging_facility::{init, Profile};
use excmd_core::{
    Command, ExecError, Logger, ParallelCommand, ProgressUpdate, RecoverableCommand,
    RetryCommand, RunContext, SequentialCommand, SimpleCommand, SimpleIoCommand,
    TracingSink, TryCatchFinallyCommand,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

fn motion(name: &str, millis: u64) -> Arc<SimpleCommand> {
    Arc::new(SimpleCommand::with_name(name, move || {
        thread::sleep(Duration::from_millis(millis));
        Ok(())
    }))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init(Profile::Development);

    let attempts = Arc::new(AtomicUsize::new(0));
    let a = attempts.clone();
    let connect = Arc::new(SimpleCommand::with_name("Connect camera", move || {
        if a.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(ExecError::allow_retry(7, "camera busy"))
        } else {
            Ok(())
        }
    }));
    let focus = Arc::new(
        SimpleIoCommand::with_name("Compute focus", |z: &f64| Ok(z * 0.5)).with_input(12.0),
    );

    let homing = ParallelCommand::with_name("Home axes")
        .with(motion("Home X", 150))
        .with(motion("Home Y", 200))
        .with(motion("Home Z", 100));
    let body = SequentialCommand::with_name("Initialize stage")
        .with(Arc::new(homing))
        .with(Arc::new(RecoverableCommand::with_name(
            "Camera",
            Arc::new(RetryCommand::with_name(
                "Retry connect",
                connect,
                3,
                Duration::from_millis(50),
            )),
            motion("Fallback to offline mode", 10),
        )))
        .with(focus.clone());
    let root = TryCatchFinallyCommand::with_name(
        "Stage init",
        Arc::new(body),
        motion("Park shutter", 20),
    );

    let _progress = root.subscribe_progress(Box::new(|p: &ProgressUpdate| {
        tracing::info!(target: "excmd::example", percent = p.percent, "{}", p);
    }));

    let ctx = RunContext::new(Logger::with_sink(Arc::new(TracingSink)));
    root.run_with(&ctx)?;

    tracing::info!(
        target: "excmd::example",
        state = %root.state(),
        elapsed_ms = root.elapsed_ms() as u64,
        focus = ?focus.output(),
        run_id = %ctx.run_id(),
        "stage initialization finished"
    );
    Ok(())
}
