//! Path and stack-frame translation through source maps.
//!
//! The mapper caches parsed maps (and confirmed absences) per
//! generated file, so repeated stack transformations touch the
//! filesystem once per file.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use drover_dap::protocol::{Source, StackFrame};

use crate::error::SourceMapError;
use crate::map::{decode_base64, SourceMap};

const SOURCE_MAPPING_URL: &str = "//# sourceMappingURL=";
const INLINE_PREFIX: &str = "data:application/json;base64,";

/// An original-source location resolved from a generated position.
/// Lines and columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedLocation {
    /// Path of the original source file.
    pub path: PathBuf,
    /// 1-based line in the original source.
    pub line: i64,
    /// 1-based column in the original source.
    pub column: i64,
    /// Original symbol name, when the map records one.
    pub name: Option<String>,
}

/// Caching translator between generated and original sources.
#[derive(Debug, Default)]
pub struct SourceMapper {
    /// Parsed map per generated file; `None` caches a confirmed miss.
    maps: HashMap<PathBuf, Option<Arc<SourceMap>>>,
    /// Original-source file contents, split into lines.
    contents: HashMap<PathBuf, Option<Arc<Vec<String>>>>,
}

impl SourceMapper {
    /// Create an empty mapper.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a source map is available for the generated file.
    pub fn has_map(&mut self, generated: &Path) -> bool {
        self.map_for(generated).is_some()
    }

    /// Drop all cached maps and file contents.
    pub fn clear_cache(&mut self) {
        self.maps.clear();
        self.contents.clear();
    }

    /// The path the adapter should debug for a source the user named.
    /// A `.ts`/`.tsx` file with a compiled `.js` sibling resolves to
    /// the sibling; anything else passes through unchanged. This is a
    /// naming heuristic, not a reverse mapping: it assumes the common
    /// compile-next-to-source layout.
    pub fn resolve_debug_path(&mut self, source: &Path) -> PathBuf {
        let is_typescript = matches!(
            source.extension().and_then(|e| e.to_str()),
            Some("ts") | Some("tsx")
        );
        if is_typescript {
            let sibling = source.with_extension("js");
            if sibling.is_file() {
                return sibling;
            }
        }
        source.to_path_buf()
    }

    /// Map a 1-based generated position to its 1-based original
    /// location, including the original symbol name when the map
    /// records one. `None` when no map exists or the position is
    /// unmapped.
    pub fn map_generated_to_original(
        &mut self,
        generated: &Path,
        line: i64,
        column: i64,
    ) -> Option<MappedLocation> {
        if line < 1 {
            return None;
        }
        let map = self.map_for(generated)?;
        let position = map.lookup((line - 1) as usize, column - 1)?;
        let path = Self::resolve_source_path(generated, &position.source);
        Some(MappedLocation {
            path,
            line: position.line + 1,
            column: position.column + 1,
            name: position.name,
        })
    }

    /// Map a 1-based original position to a generated position.
    ///
    /// Known limitation: this is a path substitution, not a
    /// source-map-driven reverse lookup. Line and column pass
    /// through unchanged, which is only exact for transforms that
    /// preserve line structure. `None` when no compiled sibling
    /// exists to substitute.
    pub fn map_original_to_generated(
        &mut self,
        source: &Path,
        line: i64,
        column: i64,
    ) -> Option<(PathBuf, i64, i64)> {
        let generated = self.resolve_debug_path(source);
        if generated == source {
            return None;
        }
        Some((generated, line, column))
    }

    /// Rewrite a stack frame to its original source location, using
    /// the original symbol name when the map records one. Frames
    /// without a mappable location pass through unchanged.
    pub fn transform_stack_frame(&mut self, frame: StackFrame) -> StackFrame {
        let Some(path) = frame.source.as_ref().and_then(|s| s.path.clone()) else {
            return frame;
        };
        let generated = PathBuf::from(path);
        match self.map_generated_to_original(&generated, frame.line, frame.column) {
            Some(mapped) => StackFrame {
                id: frame.id,
                name: mapped.name.unwrap_or(frame.name),
                source: Some(Source::from_path(&mapped.path)),
                line: mapped.line,
                column: mapped.column,
            },
            None => frame,
        }
    }

    /// Transform every frame of a stack trace.
    pub fn transform_stack_trace(&mut self, frames: Vec<StackFrame>) -> Vec<StackFrame> {
        frames
            .into_iter()
            .map(|frame| self.transform_stack_frame(frame))
            .collect()
    }

    /// One line (1-based) of an original source file, for display
    /// next to a mapped location.
    pub fn source_line(&mut self, source: &Path, line: i64) -> Option<String> {
        if line < 1 {
            return None;
        }
        let content = self.content_for(source)?;
        content.get((line - 1) as usize).cloned()
    }

    fn map_for(&mut self, generated: &Path) -> Option<Arc<SourceMap>> {
        if let Some(cached) = self.maps.get(generated) {
            return cached.clone();
        }
        let loaded = match Self::load_map(generated) {
            Ok(map) => map.map(Arc::new),
            Err(e) => {
                tracing::debug!(file = %generated.display(), error = %e, "source map unusable");
                None
            }
        };
        self.maps.insert(generated.to_path_buf(), loaded.clone());
        loaded
    }

    /// Find and parse the map for a generated file: the trailing
    /// `sourceMappingURL` comment (inline or relative) wins, then a
    /// `<file>.map` sibling.
    fn load_map(generated: &Path) -> Result<Option<SourceMap>, SourceMapError> {
        let text = match fs::read_to_string(generated) {
            Ok(text) => text,
            Err(_) => return Ok(None),
        };

        let url = text
            .lines()
            .rev()
            .take(10)
            .find_map(|line| line.trim().strip_prefix(SOURCE_MAPPING_URL));

        if let Some(url) = url {
            let url = url.trim();
            if let Some(encoded) = url.strip_prefix(INLINE_PREFIX) {
                let bytes = decode_base64(encoded)?;
                let json = String::from_utf8(bytes)
                    .map_err(|e| SourceMapError::Parse(format!("inline map is not utf-8: {e}")))?;
                return SourceMap::parse(&json).map(Some);
            }
            let map_path = match generated.parent() {
                Some(dir) => dir.join(url),
                None => PathBuf::from(url),
            };
            if map_path.is_file() {
                return SourceMap::parse(&fs::read_to_string(map_path)?).map(Some);
            }
        }

        let mut sibling = generated.as_os_str().to_owned();
        sibling.push(".map");
        let sibling = PathBuf::from(sibling);
        if sibling.is_file() {
            return SourceMap::parse(&fs::read_to_string(sibling)?).map(Some);
        }
        Ok(None)
    }

    /// Map-relative source paths resolve against the generated
    /// file's directory; absolute paths stand as they are.
    fn resolve_source_path(generated: &Path, source: &str) -> PathBuf {
        let source_path = Path::new(source);
        if source_path.is_absolute() {
            source_path.to_path_buf()
        } else {
            match generated.parent() {
                Some(dir) => dir.join(source_path),
                None => source_path.to_path_buf(),
            }
        }
    }

    fn content_for(&mut self, source: &Path) -> Option<Arc<Vec<String>>> {
        if let Some(cached) = self.contents.get(source) {
            return cached.clone();
        }
        let loaded = fs::read_to_string(source)
            .ok()
            .map(|text| Arc::new(text.lines().map(str::to_owned).collect::<Vec<_>>()));
        self.contents.insert(source.to_path_buf(), loaded.clone());
        loaded
    }
}
