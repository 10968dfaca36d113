//! Logging collaborator injected into a command tree
//!
//! Commands never log through a global. The root of a run receives a
//! [`RunContext`]; every child run inherits the same context, so all lines of
//! one tree execution go to the same sink and share one [`RunId`].

use crate::errors::timestamp;
use excmd_core_types::RunId;
use std::fmt;
use std::sync::Arc;

/// Severity of a line handed to a [`LogSink`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Destination for human-readable command log lines
///
/// Implementations decide delivery and formatting; the engine only decides
/// whether a line is emitted at all.
pub trait LogSink: Send + Sync {
    fn log(&self, timestamp: &str, level: LogLevel, message: &str);
}

/// Sink that forwards lines into `tracing` under the `excmd::command` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, timestamp: &str, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => tracing::info!(target: "excmd::command", timestamp, "{}", message),
            LogLevel::Error => {
                tracing::error!(target: "excmd::command", timestamp, "{}", message)
            }
        }
    }
}

/// Level-gated handle onto an optional sink
///
/// Info lines are forwarded only while `info_enabled` is set; error lines are
/// always forwarded. Without a sink nothing is logged.
#[derive(Clone, Default)]
pub struct Logger {
    sink: Option<Arc<dyn LogSink>>,
    info_enabled: bool,
}

impl Logger {
    /// Logger that drops every line
    pub fn silent() -> Self {
        Self::default()
    }

    /// Logger forwarding to `sink`, with info lines enabled
    pub fn with_sink(sink: Arc<dyn LogSink>) -> Self {
        Self {
            sink: Some(sink),
            info_enabled: true,
        }
    }

    /// Logger forwarding to [`TracingSink`]
    pub fn tracing() -> Self {
        Self::with_sink(Arc::new(TracingSink))
    }

    pub fn with_info_enabled(mut self, enabled: bool) -> Self {
        self.info_enabled = enabled;
        self
    }

    pub fn info_enabled(&self) -> bool {
        self.info_enabled
    }

    pub fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    pub fn info(&self, message: &str) {
        if self.info_enabled {
            self.emit(LogLevel::Info, message);
        }
    }

    pub fn error(&self, message: &str) {
        self.emit(LogLevel::Error, message);
    }

    fn emit(&self, level: LogLevel, message: &str) {
        if let Some(sink) = &self.sink {
            sink.log(&timestamp(), level, message);
        }
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("has_sink", &self.sink.is_some())
            .field("info_enabled", &self.info_enabled)
            .finish()
    }
}

/// Per-run context passed down the tree by `run_with`
#[derive(Debug, Clone)]
pub struct RunContext {
    logger: Logger,
    run_id: RunId,
}

impl RunContext {
    /// Context with a fresh run id
    pub fn new(logger: Logger) -> Self {
        Self {
            logger,
            run_id: RunId::new(),
        }
    }

    pub fn with_run_id(mut self, run_id: RunId) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(Logger::silent())
    }
}
