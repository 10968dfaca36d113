//! excmd - composable command-execution engine
//!
//! Build trees of commands and run them with uniform semantics:
//! - Leaf commands wrapping user units of work, optionally with typed input/output
//! - Composites: sequential, parallel and conditional execution
//! - Decorators: abort callbacks, retries, recovery, try/finally, counted,
//!   collection-driven and predicate-driven loops
//! - Cooperative pause/resume/abort from any thread, observed at checkpoints
//! - Failure classification (failure, recovery-allowed, retry-allowed, fatal)
//! - Progress aggregated from leaf completions
//!
//! ```
//! use std::sync::Arc;
//! use excmd_core::{Command, SequentialCommand, SimpleCommand, State};
//!
//! let seq = SequentialCommand::with_name("Init")
//!     .with(Arc::new(SimpleCommand::named("Home axes")))
//!     .with(Arc::new(SimpleCommand::named("Open shutter")));
//! seq.run().unwrap();
//! assert_eq!(seq.state(), State::Completed);
//! assert_eq!(seq.percent_completed(), 100);
//! ```

pub mod command;
pub mod composite;
pub mod decorator;
pub mod errors;
pub mod leaf;
pub mod log;
pub mod logging_facility;
pub mod observer;
pub mod state_machine;
pub mod sync;

// Re-export commonly used types
pub use command::{Command, CommandRef, ProgressUpdate, State};
pub use composite::{ConditionalCommand, ParallelCommand, SequentialCommand};
pub use decorator::{
    AbortableCommand, CycleBinding, CyclicCommand, GenericCyclicCommand, RecoverableCommand,
    RetryCommand, TryCatchFinallyCommand, WhileCommand,
};
pub use errors::{
    CommandError, EngineError, ErrorKind, ExecError, FailureKind, FatalError, Result,
};
pub use excmd_core_types::RunId;
pub use leaf::{SimpleCommand, SimpleInputCommand, SimpleIoCommand};
pub use log::{LogLevel, LogSink, Logger, RunContext, TracingSink};
pub use observer::{Subscribers, Subscription};
pub use state_machine::CommandCore;
