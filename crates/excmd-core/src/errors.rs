use std::sync::Arc;
use thiserror::Error;

/// Result type alias for tree-assembly operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Boxed error used as the optional cause of a command error
pub type ErrorSource = Arc<dyn std::error::Error + Send + Sync + 'static>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every error produced or carried by the engine maps to one kind, and each
/// kind maps to a stable error code used in structured logs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    // Classified failures raised by units of work
    CommandFailed,
    AllowRecovery,
    AllowRetry,

    // Unclassified failure, propagates out of `run`
    Fatal,

    // Tree assembly
    ModifyWhileExecuting,
    IndexOutOfRange,

    // Typed leaves
    MissingInput,
}

impl ErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::CommandFailed => "ERR_COMMAND_FAILED",
            ErrorKind::AllowRecovery => "ERR_ALLOW_RECOVERY",
            ErrorKind::AllowRetry => "ERR_ALLOW_RETRY",
            ErrorKind::Fatal => "ERR_FATAL",
            ErrorKind::ModifyWhileExecuting => "ERR_MODIFY_WHILE_EXECUTING",
            ErrorKind::IndexOutOfRange => "ERR_INDEX_OUT_OF_RANGE",
            ErrorKind::MissingInput => "ERR_MISSING_INPUT",
        }
    }
}

/// Severity class of a classified failure
///
/// The kinds form a lattice: every retry-allowed failure is also
/// recovery-allowed, so a `RecoverableCommand` wrapping a `RetryCommand`
/// still gets to recover once the retries are exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Ordinary failure; decorators only propagate it
    Failure,
    /// A `RecoverableCommand` may run its recovery command
    AllowRecovery,
    /// A `RetryCommand` may run its core command again
    AllowRetry,
}

impl FailureKind {
    pub fn allows_recovery(&self) -> bool {
        matches!(self, FailureKind::AllowRecovery | FailureKind::AllowRetry)
    }

    pub fn allows_retry(&self) -> bool {
        matches!(self, FailureKind::AllowRetry)
    }
}

/// Classified failure raised by a unit of work
///
/// A `CommandError` is caught at the `run` boundary of the command whose body
/// returned it, recorded as that command's exception and turned into the
/// `Failed` state. Ancestors observe it through their children.
#[derive(Debug, Clone)]
pub struct CommandError {
    id: i32,
    text: String,
    kind: FailureKind,
    timestamp: String,
    source: Option<ErrorSource>,
}

impl CommandError {
    /// Create a classified error of the given kind
    pub fn new(kind: FailureKind, id: i32, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
            kind,
            timestamp: timestamp(),
            source: None,
        }
    }

    /// Ordinary failure that no decorator intervenes on
    pub fn failure(id: i32, text: impl Into<String>) -> Self {
        Self::new(FailureKind::Failure, id, text)
    }

    /// Failure a `RecoverableCommand` may recover from
    pub fn allow_recovery(id: i32, text: impl Into<String>) -> Self {
        Self::new(FailureKind::AllowRecovery, id, text)
    }

    /// Failure a `RetryCommand` may retry (and a `RecoverableCommand` may recover from)
    pub fn allow_retry(id: i32, text: impl Into<String>) -> Self {
        Self::new(FailureKind::AllowRetry, id, text)
    }

    /// Attach the underlying cause
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Get the numeric error id supplied by the unit of work
    pub fn id(&self) -> i32 {
        self.id
    }

    /// Get the error description
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Get the failure classification
    pub fn failure_kind(&self) -> FailureKind {
        self.kind
    }

    /// Get the time the error was created (`%Y/%m/%d %H:%M:%S:%3f`, local time)
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn allows_recovery(&self) -> bool {
        self.kind.allows_recovery()
    }

    pub fn allows_retry(&self) -> bool {
        self.kind.allows_retry()
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        ErrorKind::from(self).code()
    }
}

impl PartialEq for CommandError {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.text == other.text
            && self.kind == other.kind
            && self.timestamp == other.timestamp
    }
}

impl std::fmt::Display for CommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.code(), self.id, self.text)
    }
}

impl std::error::Error for CommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Unclassified failure
///
/// Not handled by any command logic: it leaves the command that met it in the
/// `Failed` state and is returned from `run` to the caller.
#[derive(Debug, Clone)]
pub struct FatalError {
    kind: ErrorKind,
    command: Option<String>,
    message: String,
    source: Option<ErrorSource>,
}

impl FatalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Fatal,
            command: None,
            message: message.into(),
            source: None,
        }
    }

    /// A typed leaf was run before its input was set
    pub fn missing_input(command: impl Into<String>) -> Self {
        let command = command.into();
        Self {
            kind: ErrorKind::MissingInput,
            message: format!("Input of command {} was never set", command),
            command: Some(command),
            source: None,
        }
    }

    /// Wrap an arbitrary error as fatal
    pub fn from_error<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            kind: ErrorKind::Fatal,
            command: None,
            message: err.to_string(),
            source: Some(Arc::new(err)),
        }
    }

    /// Add the name of the command the error surfaced in
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Add source error
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the command context, if any
    pub fn command(&self) -> Option<&str> {
        self.command.as_deref()
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

impl std::fmt::Display for FatalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code(), self.message)?;
        if let Some(command) = &self.command {
            write!(f, " (command: {})", command)?;
        }
        Ok(())
    }
}

impl std::error::Error for FatalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Error returned by a unit of work
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// Handled by the framework: the command fails and ancestors re-classify
    #[error(transparent)]
    Classified(#[from] CommandError),

    /// Not handled: propagates out of `run`
    #[error(transparent)]
    Fatal(#[from] FatalError),
}

impl ExecError {
    /// Shorthand for `CommandError::failure(..).into()`
    pub fn failure(id: i32, text: impl Into<String>) -> Self {
        CommandError::failure(id, text).into()
    }

    pub fn allow_recovery(id: i32, text: impl Into<String>) -> Self {
        CommandError::allow_recovery(id, text).into()
    }

    pub fn allow_retry(id: i32, text: impl Into<String>) -> Self {
        CommandError::allow_retry(id, text).into()
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        FatalError::new(message).into()
    }
}

/// Misuse of the tree-assembly API
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Children cannot be added while the composite is executing
    #[error("Attempt to add sub-command {child} to executing command {command}")]
    ModifyWhileExecuting { command: String, child: String },

    /// Sub-command index outside the child list
    #[error("For command {command} sub-command index {index} is out of the allowed range [0 - {len})")]
    IndexOutOfRange {
        command: String,
        index: usize,
        len: usize,
    },
}

impl From<&CommandError> for ErrorKind {
    fn from(err: &CommandError) -> Self {
        match err.failure_kind() {
            FailureKind::Failure => ErrorKind::CommandFailed,
            FailureKind::AllowRecovery => ErrorKind::AllowRecovery,
            FailureKind::AllowRetry => ErrorKind::AllowRetry,
        }
    }
}

impl From<&FatalError> for ErrorKind {
    fn from(err: &FatalError) -> Self {
        err.kind
    }
}

impl From<&ExecError> for ErrorKind {
    fn from(err: &ExecError) -> Self {
        match err {
            ExecError::Classified(e) => ErrorKind::from(e),
            ExecError::Fatal(e) => ErrorKind::from(e),
        }
    }
}

impl From<&EngineError> for ErrorKind {
    fn from(err: &EngineError) -> Self {
        match err {
            EngineError::ModifyWhileExecuting { .. } => ErrorKind::ModifyWhileExecuting,
            EngineError::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
        }
    }
}

pub(crate) fn timestamp() -> String {
    chrono::Local::now()
        .format("%Y/%m/%d %H:%M:%S:%3f")
        .to_string()
}
