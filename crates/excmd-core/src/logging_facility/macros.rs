//! Boundary logging macros
//!
//! Every `run` call is one operation. The macros stamp the canonical
//! `component`/`op`/`event` fields so consumers can pair start and end.

/// Log the start of an operation
///
/// ```
/// # use excmd_core::log_op_start;
/// log_op_start!("command_run");
/// log_op_start!("command_run", command = "Home axes");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = excmd_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = excmd_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the end of an operation that returned normally
///
/// "Normally" includes runs that ended `Failed` or `Aborted`: only fatal
/// errors escaping `run` are logged with [`log_op_error!`].
///
/// ```
/// # use excmd_core::log_op_end;
/// log_op_end!("command_run", duration_ms = 12, state = "Completed");
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = excmd_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = excmd_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation that ended with an error
///
/// `$err` is borrowed; any error type with a `From<&E> for ErrorKind`
/// conversion is accepted.
///
/// ```
/// # use excmd_core::{log_op_error, errors::ExecError};
/// let err = ExecError::fatal("driver crashed");
/// log_op_error!("command_run", err, duration_ms = 3);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let kind = $crate::errors::ErrorKind::from(&$err);
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = excmd_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?kind,
            err_code = kind.code(),
            error = %$err,
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let kind = $crate::errors::ErrorKind::from(&$err);
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = excmd_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?kind,
            err_code = kind.code(),
            error = %$err,
            $($field)*
        );
    }};
}
