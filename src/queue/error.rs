//! Queue Error Types
//!
//! Every variant is fatal for the session: they all mean the transport or
//! one of the standard streams is broken, and nothing in this layer can
//! repair that.

use crate::core::error_handling::ContextualError;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Failed to connect to AMQP broker: {message}")]
    Connection { message: String },

    #[error("Failed to open a channel: {message}")]
    Channel { message: String },

    #[error("Failed to declare queue '{queue}': {message}")]
    Declaration { queue: String, message: String },

    #[error("Failed to publish a message: {message}")]
    Publish { message: String },

    #[error("Failed to register consumer on queue '{queue}': {message}")]
    ConsumeRegistration { queue: String, message: String },

    #[error("Failed to receive a delivery: {message}")]
    Consume { message: String },

    #[error("Failed to acknowledge delivery {delivery_tag}: {message}")]
    Acknowledge { delivery_tag: u64, message: String },

    #[error("Failed to read from stdin: {source}")]
    Input {
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write to stdout: {source}")]
    Output {
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl ContextualError for QueueError {
    fn is_user_actionable(&self) -> bool {
        false
    }

    fn user_message(&self) -> Option<&str> {
        None
    }
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;
