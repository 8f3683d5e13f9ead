//! Debug Adapter Protocol client layer for drover.
//!
//! This crate speaks DAP to an adapter subprocess: typed protocol
//! messages, Content-Length framing over a byte stream, sequence-
//! number request correlation, and an event channel that stays live
//! independently of request/response traffic. Session semantics live
//! in `drover-session`.

pub mod adapter;
pub mod capabilities;
pub mod client;
pub mod dispatcher;
pub mod error;
pub mod framing;
pub mod protocol;

// Re-export key types for convenience.
pub use adapter::{AdapterRegistry, AdapterSpec};
pub use capabilities::AdapterCapabilities;
pub use client::DapClient;
pub use error::DapError;
pub use protocol::*;
