//! Size-bounded chunking of source files.
//!
//! A file is split on newlines into chunks no larger than a byte budget,
//! each annotated with a header naming the file and line range plus a
//! per-line absolute line number, so downstream findings can cite exact
//! locations without any other context.

use crate::types::CodeChunk;

/// Default chunk budget in bytes of raw source (annotation overhead not
/// counted against the budget).
pub const DEFAULT_CHUNK_BYTES: usize = 12_000;

/// Split `content` into annotated chunks of at most `max_bytes` of raw
/// source each.
///
/// Lines are never split: a single line larger than the budget becomes its
/// own oversized chunk. Every line of the input appears in exactly one
/// chunk, chunks are emitted in file order and `chunk_index` counts from
/// one within the file. Empty content yields no chunks.
pub fn chunk_source(file_path: &str, content: &str, max_bytes: usize) -> Vec<CodeChunk> {
    if content.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut pending: Vec<&str> = Vec::new();
    let mut pending_bytes = 0usize;
    let mut start_line = 1u32;
    let mut line_no = 0u32;

    for line in content.split('\n') {
        line_no += 1;
        // Each line is counted with its terminating newline.
        let line_bytes = line.len() + 1;

        if pending_bytes + line_bytes > max_bytes && !pending.is_empty() {
            chunks.push(build_chunk(
                file_path,
                chunks.len() as u32 + 1,
                start_line,
                &pending,
            ));
            pending.clear();
            pending_bytes = 0;
            start_line = line_no;
        }

        pending.push(line);
        pending_bytes += line_bytes;
    }

    if !pending.is_empty() {
        chunks.push(build_chunk(
            file_path,
            chunks.len() as u32 + 1,
            start_line,
            &pending,
        ));
    }

    chunks
}

fn build_chunk(file_path: &str, index: u32, start_line: u32, lines: &[&str]) -> CodeChunk {
    let end_line = start_line + lines.len() as u32 - 1;
    let mut text = format!("### FILE: {file_path}\n### LINES: {start_line}-{end_line}\n");
    let body: Vec<String> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("# {}: {}", start_line + i as u32, line))
        .collect();
    text.push_str(&body.join("\n"));

    CodeChunk {
        file_path: file_path.to_string(),
        chunk_index: index,
        start_line,
        end_line,
        annotated_text: text,
    }
}
