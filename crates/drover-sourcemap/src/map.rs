//! Version-3 source map decoding.
//!
//! The `mappings` field packs, per generated line, a comma-separated
//! list of base64-VLQ segments. Each full segment carries deltas for
//! generated column, source index, original line, and original
//! column; source index and original position carry over across
//! lines, generated column resets per line.

use serde::Deserialize;

use crate::error::SourceMapError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSourceMap {
    version: u32,
    sources: Vec<String>,
    #[serde(default)]
    names: Vec<String>,
    #[serde(default)]
    source_root: Option<String>,
    mappings: String,
}

/// One decoded mapping segment on a generated line. Only segments
/// that carry source information are retained; bare one-field
/// segments contribute nothing to lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Segment {
    generated_column: i64,
    source_index: usize,
    original_line: i64,
    original_column: i64,
    name_index: Option<usize>,
}

/// The position in an original source that a generated position
/// maps to. Lines and columns are 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalPosition {
    /// Path of the original source, with `sourceRoot` applied.
    pub source: String,
    /// 0-based line in the original source.
    pub line: i64,
    /// 0-based column in the original source.
    pub column: i64,
    /// Symbol name at the position, when the map records one.
    pub name: Option<String>,
}

/// A fully decoded source map.
#[derive(Debug)]
pub struct SourceMap {
    sources: Vec<String>,
    names: Vec<String>,
    /// Segments per generated line, ordered by generated column.
    lines: Vec<Vec<Segment>>,
}

impl SourceMap {
    /// Decode a version-3 source map from its JSON text.
    pub fn parse(json: &str) -> Result<Self, SourceMapError> {
        let raw: RawSourceMap = serde_json::from_str(json)
            .map_err(|e| SourceMapError::Parse(format!("bad source map json: {e}")))?;
        if raw.version != 3 {
            return Err(SourceMapError::Parse(format!(
                "unsupported version: {}",
                raw.version
            )));
        }

        let sources = match &raw.source_root {
            Some(root) if !root.is_empty() => raw
                .sources
                .iter()
                .map(|s| format!("{}/{}", root.trim_end_matches('/'), s))
                .collect(),
            _ => raw.sources.clone(),
        };

        let mut lines = Vec::new();
        let mut source_index: i64 = 0;
        let mut original_line: i64 = 0;
        let mut original_column: i64 = 0;
        let mut name_index: i64 = 0;

        for line_text in raw.mappings.split(';') {
            let mut segments = Vec::new();
            let mut generated_column: i64 = 0;
            for segment_text in line_text.split(',') {
                if segment_text.is_empty() {
                    continue;
                }
                let fields = decode_vlq_segment(segment_text)?;
                generated_column += fields[0];
                if fields.len() >= 4 {
                    source_index += fields[1];
                    original_line += fields[2];
                    original_column += fields[3];
                    let name = if fields.len() >= 5 {
                        name_index += fields[4];
                        usize::try_from(name_index).ok()
                    } else {
                        None
                    };
                    if source_index < 0 || original_line < 0 || original_column < 0 {
                        return Err(SourceMapError::Parse(
                            "segment resolved to a negative position".into(),
                        ));
                    }
                    segments.push(Segment {
                        generated_column,
                        source_index: source_index as usize,
                        original_line,
                        original_column,
                        name_index: name,
                    });
                }
            }
            lines.push(segments);
        }

        Ok(Self {
            sources,
            names: raw.names,
            lines,
        })
    }

    /// The original position for a generated position, both 0-based.
    /// Resolves to the last segment at or before the column, the way
    /// debuggers expect.
    pub fn lookup(&self, line: usize, column: i64) -> Option<OriginalPosition> {
        let segments = self.lines.get(line)?;
        let segment = segments
            .iter()
            .take_while(|s| s.generated_column <= column)
            .last()?;
        let source = self.sources.get(segment.source_index)?.clone();
        let name = segment
            .name_index
            .and_then(|i| self.names.get(i))
            .cloned();
        Some(OriginalPosition {
            source,
            line: segment.original_line,
            column: segment.original_column,
            name,
        })
    }

    /// Paths of all original sources the map refers to.
    pub fn sources(&self) -> &[String] {
        &self.sources
    }
}

fn base64_value(byte: u8) -> Option<i64> {
    match byte {
        b'A'..=b'Z' => Some((byte - b'A') as i64),
        b'a'..=b'z' => Some((byte - b'a') as i64 + 26),
        b'0'..=b'9' => Some((byte - b'0') as i64 + 52),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

/// Decode one comma-delimited segment of base64 VLQ values. Each
/// character carries 5 payload bits plus a continuation bit; the
/// sign lives in the lowest bit of the assembled value.
fn decode_vlq_segment(text: &str) -> Result<Vec<i64>, SourceMapError> {
    let mut values = Vec::with_capacity(5);
    let mut value: i64 = 0;
    let mut shift: u32 = 0;
    for &byte in text.as_bytes() {
        let digit = base64_value(byte)
            .ok_or_else(|| SourceMapError::Parse(format!("invalid vlq character: {byte:#x}")))?;
        value |= (digit & 31) << shift;
        if digit & 32 != 0 {
            shift += 5;
            if shift > 60 {
                return Err(SourceMapError::Parse("vlq value overflow".into()));
            }
        } else {
            let magnitude = value >> 1;
            values.push(if value & 1 == 1 { -magnitude } else { magnitude });
            value = 0;
            shift = 0;
        }
    }
    if shift != 0 {
        return Err(SourceMapError::Parse("truncated vlq segment".into()));
    }
    if values.is_empty() || values.len() == 2 || values.len() == 3 || values.len() > 5 {
        return Err(SourceMapError::Parse(format!(
            "segment has {} fields, expected 1, 4 or 5",
            values.len()
        )));
    }
    Ok(values)
}

/// Decode standard base64, tolerating padding and line breaks. Used
/// for inline `data:` source map URLs.
pub(crate) fn decode_base64(input: &str) -> Result<Vec<u8>, SourceMapError> {
    let mut out = Vec::with_capacity(input.len() / 4 * 3);
    let mut accumulator: u32 = 0;
    let mut bits: u32 = 0;
    for &byte in input.as_bytes() {
        if byte == b'=' || byte == b'\n' || byte == b'\r' {
            continue;
        }
        let value = base64_value(byte)
            .ok_or_else(|| SourceMapError::Parse(format!("invalid base64 character: {byte:#x}")))?;
        accumulator = (accumulator << 6) | value as u32;
        bits += 6;
        if bits >= 8 {
            bits -= 8;
            out.push((accumulator >> bits) as u8);
        }
    }
    Ok(out)
}
