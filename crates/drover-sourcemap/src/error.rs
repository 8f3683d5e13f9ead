//! Source map error types.

use thiserror::Error;

/// Errors from loading or decoding a source map.
#[derive(Debug, Error)]
pub enum SourceMapError {
    /// The map (or a mapped source) could not be read.
    #[error("source map io error: {0}")]
    Io(#[from] std::io::Error),

    /// The map is not valid version-3 source map data.
    #[error("source map parse error: {0}")]
    Parse(String),
}
