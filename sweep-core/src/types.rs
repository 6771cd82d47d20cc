//! Transient data model for one pipeline run.
//!
//! `SourceFile` and `CodeChunk` exist only for the duration of a single run;
//! the durable entities (scan results, reports) live in `sweep-pipeline`.

use serde::{Deserialize, Serialize};

/// One extracted source file, keyed by its path relative to the scan root.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SourceFile {
    /// Path relative to the repository root, with `/` separators.
    pub relative_path: String,

    /// Decoded text content (malformed byte sequences replaced).
    pub content: String,

    /// Size of the decoded content in bytes.
    pub byte_size: usize,
}

impl SourceFile {
    pub fn new(relative_path: String, content: String) -> Self {
        let byte_size = content.len();
        Self {
            relative_path,
            content,
            byte_size,
        }
    }
}

/// A bounded, line-accurate slice of one file's content.
///
/// For a given file, chunk line ranges partition `1..=N` with no gaps or
/// overlaps, in ascending `chunk_index` order. `annotated_text` carries a
/// header naming the file and line range followed by the source lines, each
/// prefixed with its absolute 1-based line number, so a downstream engine
/// can cite exact locations.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CodeChunk {
    /// Path of the originating file, relative to the scan root.
    pub file_path: String,

    /// 1-based index of this chunk within its file.
    pub chunk_index: u32,

    /// First line covered by this chunk (1-based, inclusive).
    pub start_line: u32,

    /// Last line covered by this chunk (1-based, inclusive).
    pub end_line: u32,

    /// Header plus line-numbered body, ready for an analysis prompt.
    pub annotated_text: String,
}

impl CodeChunk {
    /// Number of source lines covered by this chunk.
    pub fn line_count(&self) -> u32 {
        self.end_line - self.start_line + 1
    }
}
