//! Sweep core - repository ingestion primitives.
//!
//! This crate provides the synchronous, side-effect-light half of the Sweep
//! vulnerability-scanning pipeline:
//!
//! - **Path filtering**: a deterministic, multi-stage inclusion policy that
//!   decides which files in an untrusted source tree are worth analyzing
//! - **Source extraction**: parallel directory walking with lenient text
//!   decoding and binary-content rejection
//! - **Chunking**: splitting file content into size-bounded, line-accurate
//!   units that a downstream reasoning engine can cite precisely
//!
//! Everything here is pure or read-only; cloning, analysis dispatch, and
//! persistence live in `sweep-pipeline`.

pub mod chunker;
pub mod error;
pub mod extractor;
pub mod filter;
pub mod types;

pub use chunker::{chunk_source, DEFAULT_CHUNK_BYTES};
pub use error::ExtractError;
pub use extractor::extract_sources;
pub use filter::FilterConfig;
pub use types::{CodeChunk, SourceFile};
