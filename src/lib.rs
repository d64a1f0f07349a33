//! # Table Chunker
//!
//! Recovers the structure of tables embedded in office documents and turns them into
//! retrieval-ready text chunks.
//!
//! ## Features
//!
//! - **Document decoding**: Tables from Excel workbooks (`.xlsx`, `.xlsm`) and Word documents
//!   (`.docx`), with merged cells taken from `<mergeCell>` ranges or `gridSpan`/`vMerge` spans
//! - **Merge normalization**: Overlapping or out-of-bounds merges are repaired into a canonical
//!   grid where every covered cell points at its origin
//! - **Multi-row header recovery**: Header depth is voted on by merge pattern, table structure
//!   and cell content, then validated, with a flat single-row header as fallback
//! - **Rendering**: HTML with `rowspan`/`colspan` or Markdown with flattened header labels
//! - **Chunking**: One chunk per table, optionally one more per data row carrying its full
//!   header path
//!
//! ## Usage
//!
//! ```no_run
//! use table_chunker::{decode_file, process_document, SheetFilter, TableConfig};
//!
//! let tables = decode_file("report.xlsx", &SheetFilter::default())?;
//! let report = process_document("report", &tables, &TableConfig::default());
//! for chunk in &report.chunks {
//!     println!("{}", chunk.content);
//! }
//! # Ok::<(), table_chunker::TableChunkerError>(())
//! ```
pub mod chunk;
pub mod config;
pub mod decode;
pub mod error;
pub mod format;
pub mod grid;
pub mod header;
pub mod normalize;
pub mod pipeline;

pub(crate) mod helpers;

#[cfg(test)]
mod testing;

pub use crate::chunk::{Chunk, ChunkContext, ChunkType};
pub use crate::config::{ChunkingStrategy, TableConfig, TableFormat};
pub use crate::decode::{decode_file, SheetFilter};
pub use crate::error::TableChunkerError;
pub use crate::grid::{Cell, Grid, MergeRange};
pub use crate::header::HeaderHierarchy;
pub use crate::normalize::{normalize, RawCell, RawTable};
pub use crate::pipeline::{process_document, process_table, DocumentReport, SkipReason, SkippedTable, TableChunks};
