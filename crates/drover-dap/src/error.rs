//! DAP error types.

use thiserror::Error;

/// Errors from DAP client operations.
#[derive(Debug, Error)]
pub enum DapError {
    /// Adapter process failed to start.
    #[error("adapter failed to start: {0}")]
    Spawn(#[from] std::io::Error),

    /// Transport-level communication error.
    #[error("transport error: {0}")]
    Transport(String),

    /// The adapter sent bytes that do not form a valid DAP message.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The transport closed while a request was still pending.
    #[error("transport closed before a response arrived")]
    TransportClosed,

    /// Request timed out waiting for a response.
    #[error("request timed out: {command}")]
    Timeout {
        /// The command that timed out.
        command: String,
    },

    /// Adapter answered the request with `success: false`.
    #[error("adapter rejected {command}: {message}")]
    Request {
        /// The command that was rejected.
        command: String,
        /// The adapter's own error message.
        message: String,
    },

    /// No adapter is registered under the given logical name.
    #[error("unknown adapter: {0}")]
    UnknownAdapter(String),

    /// Adapter registry configuration could not be parsed.
    #[error("adapter config error: {0}")]
    Config(String),
}
