//! Debug session orchestration for drover.
//!
//! Builds on `drover-dap` to run whole debugging sessions: a
//! lifecycle state machine per session, a breakpoint store with
//! replace-all sync to the adapter, watch expressions, an event log,
//! and a manager that holds many concurrent sessions.

pub mod breakpoints;
pub mod error;
pub mod events;
pub mod manager;
pub mod session;
pub mod watch;

pub use breakpoints::{Breakpoint, BreakpointSpec, BreakpointStats, BreakpointStore};
pub use error::SessionError;
pub use events::{EventLog, EventRecord};
pub use manager::SessionManager;
pub use session::{DebugSession, SessionInfo, SessionState};
pub use watch::{Watch, WatchStore};
