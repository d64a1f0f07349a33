//! # Table Formatter
//!
//! Serializes a grid and its header hierarchy into one of the supported [`TableFormat`]s.
//! HTML keeps merges as `rowspan`/`colspan` attributes, Markdown has no span concept and
//! repeats merged values in every covered column.
use crate::config::TableFormat;
use crate::grid::Grid;
use crate::header::HeaderHierarchy;

pub mod html;
pub mod markdown;

/// Text placed in cells that have no content.
pub(crate) const EMPTY_CELL: &str = "-";

/// A table serialized in one format.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedTable {
    pub format: TableFormat,
    pub text: String,
}

/// Renders the whole table.
pub fn render(grid: &Grid, hierarchy: &HeaderHierarchy, format: TableFormat) -> RenderedTable {
    let text = match format {
        TableFormat::Html => html::render(grid, hierarchy),
        TableFormat::Markdown => markdown::render(grid, hierarchy),
    };
    RenderedTable { format, text }
}

/// Renders a single body row as a self-contained table headed by the flattened labels.
pub fn render_record(labels: &[String], values: &[&str], format: TableFormat) -> RenderedTable {
    let text = match format {
        TableFormat::Html => html::render_record(labels, values),
        TableFormat::Markdown => markdown::render_record(labels, values),
    };
    RenderedTable { format, text }
}

pub(crate) fn or_placeholder(text: &str) -> &str {
    let text = text.trim();
    if text.is_empty() {
        EMPTY_CELL
    } else {
        text
    }
}
