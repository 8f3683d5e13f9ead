//! Session error types.

use drover_dap::DapError;
use thiserror::Error;

use crate::session::SessionState;

/// Errors from session and manager operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Operation invoked while the session is not in a required
    /// state. Raised before any wire traffic.
    #[error("cannot {operation}: session is {state}")]
    State {
        /// The operation that was attempted.
        operation: String,
        /// The session's actual state.
        state: SessionState,
    },

    /// No session is registered under this id.
    #[error("unknown session: {0}")]
    UnknownSession(String),

    /// A live session already holds this id.
    #[error("session id already in use: {0}")]
    DuplicateSession(String),

    /// No breakpoint exists at the given location.
    #[error("no breakpoint at {path}:{line}")]
    UnknownBreakpoint {
        /// The source path.
        path: String,
        /// The line number.
        line: i64,
    },

    /// No breakpoints exist for the given source.
    #[error("no breakpoints for source: {0}")]
    UnknownSource(String),

    /// No watch expression exists under this id.
    #[error("unknown watch: {0}")]
    UnknownWatch(String),

    /// A protocol-layer failure.
    #[error(transparent)]
    Dap(#[from] DapError),
}

impl SessionError {
    /// Shorthand for a state violation.
    pub fn state(operation: &str, state: SessionState) -> Self {
        Self::State {
            operation: operation.to_string(),
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_state_display() {
        let err = SessionError::state("stepOver", SessionState::Running);
        assert_eq!(err.to_string(), "cannot stepOver: session is running");
    }

    #[test]
    fn error_unknown_session_display() {
        let err = SessionError::UnknownSession("dbg-1".into());
        assert_eq!(err.to_string(), "unknown session: dbg-1");
    }

    #[test]
    fn error_unknown_breakpoint_display() {
        let err = SessionError::UnknownBreakpoint {
            path: "/src/app.js".into(),
            line: 12,
        };
        assert_eq!(err.to_string(), "no breakpoint at /src/app.js:12");
    }

    #[test]
    fn error_dap_passthrough_display() {
        let err: SessionError = DapError::TransportClosed.into();
        assert_eq!(err.to_string(), "transport closed before a response arrived");
    }
}
