//! Fatal error reporting
//!
//! Every failure in this tool ends the process. These helpers give all of
//! them the same shape on the way out: one `FATAL:` line at error level,
//! details at debug level.

/// Errors that know whether the operator can fix them directly
///
/// A bad URI or an invalid config value is actionable and carries its own
/// message; a refused connection or a closed channel is not, and is reported
/// together with what we were doing at the time.
pub trait ContextualError: std::error::Error {
    fn is_user_actionable(&self) -> bool;

    /// The message to show as-is; only meaningful when actionable
    fn user_message(&self) -> Option<&str>;
}

/// Log a fatal error, naming `operation_context` for system errors
///
/// ```text
/// FATAL: Consume session: Failed to connect to AMQP broker: Connection refused (os error 111)
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    log::error!("{}", fatal_line(error, operation_context));
    if let Some(source) = error.source() {
        log::debug!("CAUSE: {}", source);
    }
    log::debug!("DEBUG_DETAILS: {:?}", error);
}

pub fn fatal_line<E: ContextualError>(error: &E, operation_context: &str) -> String {
    match error.user_message() {
        Some(message) if error.is_user_actionable() => format!("FATAL: {}", message),
        _ => format!("FATAL: {}: {}", operation_context, error),
    }
}
