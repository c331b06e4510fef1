//! Source positions and spans for multi-module type loading
//!
//! Every diagnostic produced by the type loader points at a `SourceSpan`. Spans
//! are handed to us by the parser collaborator, so they are plain copyable values:
//! a file id plus start and end positions. The `SourceMap` is only needed when a
//! diagnostic is rendered with a source snippet.

use std::collections::HashMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Unique identifier for a source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FileId(usize);

impl FileId {
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    pub const fn as_usize(self) -> usize {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileId({})", self.0)
    }
}

/// A 1-based line/column position plus the raw byte offset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
    #[cfg_attr(feature = "serde", serde(default))]
    pub byte_offset: usize,
}

impl SourcePosition {
    pub const fn new(line: usize, column: usize, byte_offset: usize) -> Self {
        Self {
            line,
            column,
            byte_offset,
        }
    }
}

/// A region of one source file
///
/// The default span (line 0) means "no position"; it is used for compiler
/// generated entities such as the standard prelude.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SourceSpan {
    pub start: SourcePosition,
    pub end: SourcePosition,
    #[cfg_attr(feature = "serde", serde(default))]
    pub file_id: FileId,
}

impl SourceSpan {
    pub const fn new(start: SourcePosition, end: SourcePosition, file_id: FileId) -> Self {
        Self {
            start,
            end,
            file_id,
        }
    }

    /// The "no position" span
    pub const fn unknown() -> Self {
        Self::new(
            SourcePosition::new(0, 0, 0),
            SourcePosition::new(0, 0, 0),
            FileId::new(0),
        )
    }

    /// A span covering a single line range, handy for synthesized syntax
    pub const fn at(file_id: FileId, line: usize, column: usize) -> Self {
        Self::new(
            SourcePosition::new(line, column, 0),
            SourcePosition::new(line, column + 1, 0),
            file_id,
        )
    }

    pub fn is_unknown(&self) -> bool {
        self.start.line == 0
    }

    /// Smallest span covering both; spans from different files keep `self`
    pub fn merge(self, other: SourceSpan) -> SourceSpan {
        if self.is_unknown() {
            return other;
        }
        if self.file_id != other.file_id || other.is_unknown() {
            return self;
        }
        let start = if (other.start.line, other.start.column) < (self.start.line, self.start.column)
        {
            other.start
        } else {
            self.start
        };
        let end = if (other.end.line, other.end.column) > (self.end.line, self.end.column) {
            other.end
        } else {
            self.end
        };
        SourceSpan::new(start, end, self.file_id)
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            write!(f, "<unknown>")
        } else {
            write!(f, "{}:{}", self.start.line, self.start.column)
        }
    }
}

/// One registered source file with precomputed line starts
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        let line_starts = std::iter::once(0)
            .chain(content.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            name: name.into(),
            content,
            line_starts,
        }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// 1-based line lookup, without the trailing line break
    pub fn line(&self, line_number: usize) -> Option<&str> {
        let start = *self.line_starts.get(line_number.checked_sub(1)?)?;
        let end = self
            .line_starts
            .get(line_number)
            .copied()
            .unwrap_or(self.content.len());
        Some(self.content[start..end].trim_end_matches(['\n', '\r']))
    }

    pub fn position_at(&self, offset: usize) -> SourcePosition {
        let line_index = self
            .line_starts
            .partition_point(|&start| start <= offset)
            .saturating_sub(1);
        let column = offset - self.line_starts[line_index] + 1;
        SourcePosition::new(line_index + 1, column, offset)
    }
}

/// All files of a compilation, addressed by `FileId`
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    files: HashMap<FileId, SourceFile>,
    next_id: usize,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, name: impl Into<String>, content: impl Into<String>) -> FileId {
        let id = FileId(self.next_id);
        self.next_id += 1;
        self.files.insert(id, SourceFile::new(name, content));
        id
    }

    pub fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(&id)
    }

    pub fn line(&self, id: FileId, line_number: usize) -> Option<&str> {
        self.file(id)?.line(line_number)
    }

    pub fn span_from_offsets(&self, id: FileId, start: usize, end: usize) -> Option<SourceSpan> {
        let file = self.file(id)?;
        Some(SourceSpan::new(
            file.position_at(start),
            file.position_at(end),
            id,
        ))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_lookup() {
        let mut map = SourceMap::new();
        let id = map.add_file("Main.hx", "class A {}\nclass B extends A {}\r\n");
        assert_eq!(map.line(id, 1), Some("class A {}"));
        assert_eq!(map.line(id, 2), Some("class B extends A {}"));
        assert_eq!(map.line(id, 3), Some(""));
        assert_eq!(map.line(id, 0), None);
    }

    #[test]
    fn test_offsets_to_positions() {
        let mut map = SourceMap::new();
        let id = map.add_file("Main.hx", "ab\ncd");
        let span = map.span_from_offsets(id, 3, 5).unwrap();
        assert_eq!(span.start.line, 2);
        assert_eq!(span.start.column, 1);
        assert_eq!(span.end.column, 3);
    }

    #[test]
    fn test_merge_ignores_unknown() {
        let a = SourceSpan::at(FileId::new(1), 3, 4);
        let b = SourceSpan::at(FileId::new(1), 5, 1);
        let merged = a.merge(b);
        assert_eq!(merged.start.line, 3);
        assert_eq!(merged.end.line, 5);
        assert_eq!(a.merge(SourceSpan::unknown()), a);
        assert_eq!(SourceSpan::unknown().merge(a), a);
    }
}
