//! Source map translation for drover debug sessions.
//!
//! Decodes version-3 source maps (base64 VLQ mappings, inline or
//! file-referenced) and translates stack frames and breakpoint paths
//! between original sources and the generated code adapters execute.

pub mod error;
pub mod map;
pub mod mapper;

pub use error::SourceMapError;
pub use map::{OriginalPosition, SourceMap};
pub use mapper::{MappedLocation, SourceMapper};
