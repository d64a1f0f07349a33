//! # Table Pipeline
//!
//! Runs normalization, header recovery, rendering and chunk emission for every table of a
//! document. Tables are independent: one malformed table is skipped and reported while its
//! siblings are still processed.
use crate::chunk::{chunk_id, emit, Chunk};
use crate::config::TableConfig;
use crate::error::TableChunkerError;
use crate::header::recover;
use crate::normalize::{normalize, RawTable};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Chunks emitted for one table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableChunks {
    pub table_id: String,
    pub header_rows: usize,
    /// True if the detected header failed validation and the flat header was used
    pub fallback: bool,
    pub chunks: Vec<Chunk>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Empty or dimensionally inconsistent raw grid
    Malformed,
    /// No body row left below the header
    HeaderOnly,
    /// Table processing is switched off
    Disabled,
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SkipReason::Malformed => "malformed",
            SkipReason::HeaderOnly => "header_only",
            SkipReason::Disabled => "disabled",
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedTable {
    pub table_id: String,
    pub reason: SkipReason,
    /// Error message for malformed tables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Outcome of processing every table of one document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReport {
    pub doc_id: String,
    pub chunks: Vec<Chunk>,
    /// Identifiers of the tables that produced chunks
    pub parsed: Vec<String>,
    pub skipped: Vec<SkippedTable>,
}

/// Processes a single table.
///
/// # Arguments
///
/// * `doc_id` - Identifier of the source document
/// * `table` - The decoded table
/// * `config` - Shared processing settings
///
/// # Returns
///
/// * `Result<TableChunks, TableChunkerError>` - The chunks, `MalformedTable` for an empty or
///   inconsistent grid, or `HeaderOnlyTable` when no body row remains
pub fn process_table(doc_id: &str, table: &RawTable, config: &TableConfig) -> Result<TableChunks, TableChunkerError> {
    let grid = normalize(table)?;
    let hierarchy = recover(&table.id, &grid, config);
    if hierarchy.depth() >= grid.row_count() {
        return Err(TableChunkerError::HeaderOnlyTable(table.id.clone()));
    }
    let chunks = emit(doc_id, table, &grid, &hierarchy, config);
    tracing::debug!(
        doc_id = %doc_id,
        table_id = %table.id,
        rows = grid.row_count(),
        cols = grid.col_count(),
        merges = grid.merges().len(),
        header_rows = hierarchy.depth(),
        fallback = hierarchy.is_fallback(),
        chunks = chunks.len(),
        "Table processed"
    );
    Ok(TableChunks {
        table_id: table.id.clone(),
        header_rows: hierarchy.depth(),
        fallback: hierarchy.is_fallback(),
        chunks,
    })
}

/// Processes every table of a document in parallel.
///
/// Chunks keep the input table order, and chunk ids are renumbered across the whole document.
pub fn process_document(doc_id: &str, tables: &[RawTable], config: &TableConfig) -> DocumentReport {
    let mut report = DocumentReport {
        doc_id: doc_id.to_owned(),
        ..Default::default()
    };
    if !config.enable_table_processing {
        tracing::info!(doc_id = %doc_id, tables = tables.len(), "Table processing disabled");
        report.skipped = tables
            .iter()
            .map(|table| SkippedTable {
                table_id: table.id.clone(),
                reason: SkipReason::Disabled,
                detail: None,
            })
            .collect();
        return report;
    }

    let results: Vec<Result<TableChunks, TableChunkerError>> = tables
        .par_iter()
        .map(|table| process_table(doc_id, table, config))
        .collect();

    for (table, result) in tables.iter().zip(results) {
        match result {
            Ok(table_chunks) => {
                report.parsed.push(table_chunks.table_id);
                report.chunks.extend(table_chunks.chunks);
            }
            Err(e) => {
                let reason = match e {
                    TableChunkerError::HeaderOnlyTable(_) => SkipReason::HeaderOnly,
                    _ => SkipReason::Malformed,
                };
                tracing::warn!(doc_id = %doc_id, table_id = %table.id, reason = %reason, error = %e, "Table skipped");
                report.skipped.push(SkippedTable {
                    table_id: table.id.clone(),
                    reason,
                    detail: Some(e.to_string()),
                });
            }
        }
    }
    for (index, chunk) in report.chunks.iter_mut().enumerate() {
        chunk.chunk_id = chunk_id(doc_id, index + 1);
    }

    tracing::info!(
        doc_id = %doc_id,
        parsed = report.parsed.len(),
        skipped = report.skipped.len(),
        chunks = report.chunks.len(),
        "Document processed"
    );
    report
}
