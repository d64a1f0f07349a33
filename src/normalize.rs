//! # Merge Normalizer
//!
//! Turns a decoder's raw view of a table into a canonical [`Grid`]. Spreadsheet decoders
//! declare merges as explicit ranges, flow-document decoders attach span hints to the cell that
//! starts a merge. Both are reduced to one set of pairwise disjoint [`MergeRange`]s.
use crate::error::TableChunkerError;
use crate::grid::{Cell, Grid, MergeRange};
use serde::{Deserialize, Serialize};

/// Row and column span attached to the cell that starts a merge.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpanHint {
    pub row_span: usize,
    pub col_span: usize,
}

/// One decoded cell, positioned in the table's own 0-based coordinates.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCell {
    pub row: usize,
    pub col: usize,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<SpanHint>,
}

impl RawCell {
    pub fn new(row: usize, col: usize, text: impl Into<String>) -> Self {
        RawCell {
            row,
            col,
            text: text.into(),
            span: None,
        }
    }

    /// Attaches a span hint to this cell.
    pub fn with_span(mut self, row_span: usize, col_span: usize) -> Self {
        self.span = Some(SpanHint { row_span, col_span });
        self
    }
}

/// A table as handed over by a decoder, before any structure recovery.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTable {
    /// Identifier unique within the document
    pub id: String,
    /// Worksheet name for spreadsheet sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    /// Position of the table's first row in the source document
    #[serde(default)]
    pub row_offset: usize,
    pub row_count: usize,
    pub col_count: usize,
    #[serde(default)]
    pub cells: Vec<RawCell>,
    /// Explicit merge ranges, in the table's own coordinates
    #[serde(default)]
    pub merges: Vec<MergeRange>,
    /// Nearest non-empty text before the table in its source document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preceding_text: Option<String>,
    /// Nearest non-empty text after the table in its source document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub following_text: Option<String>,
}

impl RawTable {
    pub fn new(id: impl Into<String>, row_count: usize, col_count: usize) -> Self {
        RawTable {
            id: id.into(),
            row_count,
            col_count,
            ..Default::default()
        }
    }

    /// Builds a table from literal rows. The column count is the longest row.
    pub fn from_rows<R, S>(id: impl Into<String>, rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = RawTable::new(id, 0, 0);
        for (row, values) in rows.into_iter().enumerate() {
            for (col, text) in values.into_iter().enumerate() {
                table.cells.push(RawCell::new(row, col, text));
                table.col_count = table.col_count.max(col + 1);
            }
            table.row_count = row + 1;
        }
        table
    }

    pub fn with_sheet(mut self, sheet: impl Into<String>, row_offset: usize) -> Self {
        self.sheet = Some(sheet.into());
        self.row_offset = row_offset;
        self
    }

    /// Attaches the surrounding document text.
    pub fn with_context(mut self, preceding: Option<String>, following: Option<String>) -> Self {
        self.preceding_text = preceding;
        self.following_text = following;
        self
    }

    pub fn with_merge(mut self, range: MergeRange) -> Self {
        self.merges.push(range);
        self
    }
}

/// Normalizes a raw table into a canonical grid.
///
/// # Arguments
///
/// * `table` - The decoded table with its explicit merges and span hints
///
/// # Returns
///
/// * `Result<Grid, TableChunkerError>` - The grid, or `MalformedTable` when the table has no
///   rows, no columns, or a cell outside its declared bounds
pub fn normalize(table: &RawTable) -> Result<Grid, TableChunkerError> {
    let (row_count, col_count) = (table.row_count, table.col_count);
    if row_count == 0 || col_count == 0 {
        return Err(TableChunkerError::malformed(
            &table.id,
            format!("empty grid ({} rows × {} columns)", row_count, col_count),
        ));
    }

    // First declared raw cell per coordinate.
    let mut firsts: Vec<Option<&RawCell>> = vec![None; row_count * col_count];
    for raw in &table.cells {
        if raw.row >= row_count || raw.col >= col_count {
            return Err(TableChunkerError::malformed(
                &table.id,
                format!(
                    "cell ({}, {}) outside of {} rows × {} columns",
                    raw.row, raw.col, row_count, col_count
                ),
            ));
        }
        let slot = &mut firsts[raw.row * col_count + raw.col];
        if slot.is_none() {
            *slot = Some(raw);
        } else {
            tracing::debug!(table_id = %table.id, row = raw.row, col = raw.col, "Duplicate raw cell ignored");
        }
    }

    let hinted = firsts.iter().flatten().filter_map(|raw| {
        let hint = raw.span?;
        MergeRange::from_span(raw.row, raw.col, hint.row_span, hint.col_span)
    });
    let mut accepted = Vec::<MergeRange>::new();
    for candidate in table.merges.iter().copied().chain(hinted) {
        let Some(range) = candidate.clip(row_count, col_count) else {
            tracing::debug!(table_id = %table.id, range = %candidate, "Merge range outside of grid dropped");
            continue;
        };
        if range.is_single_cell() {
            continue;
        }
        if let Some(existing) = accepted.iter().find(|existing| existing.overlaps(&range)) {
            tracing::warn!(
                table_id = %table.id,
                range = %range,
                kept = %existing,
                "Overlapping merge range dropped"
            );
            continue;
        }
        accepted.push(range);
    }

    let mut cells: Vec<Cell> = firsts
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let text = raw.map(|raw| raw.text.clone()).unwrap_or_default();
            Cell::origin(index / col_count, index % col_count, text)
        })
        .collect();

    for range in &accepted {
        let origin_index = range.top * col_count + range.left;
        let covered = (range.top..=range.bottom)
            .flat_map(|row| (range.left..=range.right).map(move |col| row * col_count + col));
        let text = if cells[origin_index].is_blank() {
            covered
                .clone()
                .map(|index| &cells[index].text)
                .find(|text| !text.trim().is_empty())
                .cloned()
                .unwrap_or_default()
        } else {
            cells[origin_index].text.clone()
        };
        for index in covered.filter(|index| *index != origin_index) {
            let member = &mut cells[index];
            member.text.clear();
            member.origin = Some((range.top, range.left));
        }
        let origin = &mut cells[origin_index];
        origin.text = text;
        origin.row_span = range.row_span();
        origin.col_span = range.col_span();
    }

    Ok(Grid::from_parts(row_count, col_count, cells, accepted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_grid_is_malformed() {
        let result = normalize(&RawTable::new("t0", 0, 3));
        assert!(matches!(result, Err(TableChunkerError::MalformedTable { ref table_id, .. }) if table_id == "t0"));
        assert!(normalize(&RawTable::new("t1", 2, 0)).is_err());
    }

    #[test]
    fn out_of_bounds_cell_is_malformed() {
        let mut table = RawTable::from_rows("t", [["a", "b"]]);
        table.cells.push(RawCell::new(3, 0, "stray"));
        assert!(matches!(normalize(&table), Err(TableChunkerError::MalformedTable { .. })));
    }

    #[test]
    fn explicit_ranges_and_span_hints() {
        let mut table = RawTable::from_rows("t", [["A", "", "C"], ["", "", "F"], ["G", "H", "I"]]);
        table.merges.push(MergeRange::new(0, 0, 1, 1));
        table.cells[5] = RawCell::new(1, 2, "F").with_span(2, 1);
        let grid = normalize(&table).unwrap();

        assert_eq!(grid.merges(), &[MergeRange::new(0, 0, 1, 1), MergeRange::new(1, 2, 2, 2)]);
        assert_eq!(grid.get(0, 0).map(|cell| (cell.row_span, cell.col_span)), Some((2, 2)));
        assert_eq!(grid.get(1, 1).and_then(|cell| cell.origin), Some((0, 0)));
        assert_eq!(grid.text_at(2, 2), "F");
        assert_eq!(grid.get(2, 2).map(|cell| cell.text.as_str()), Some(""));
        assert_eq!(grid.resolved_row(1), vec!["A", "A", "F"]);
    }

    #[test]
    fn overlapping_ranges_keep_first() {
        let table = RawTable::from_rows("t", [["a", "b", "c"], ["d", "e", "f"]])
            .with_merge(MergeRange::new(0, 0, 0, 1))
            .with_merge(MergeRange::new(0, 1, 1, 2))
            .with_merge(MergeRange::new(1, 1, 1, 2));
        let grid = normalize(&table).unwrap();
        assert_eq!(grid.merges(), &[MergeRange::new(0, 0, 0, 1), MergeRange::new(1, 1, 1, 2)]);
        assert_eq!(grid.text_at(0, 2), "c");
        assert_eq!(grid.text_at(1, 2), "e");
    }

    #[test]
    fn ranges_are_clipped_to_bounds() {
        let table = RawTable::from_rows("t", [["a", "b"], ["c", "d"]])
            .with_merge(MergeRange::new(1, 0, 4, 6))
            .with_merge(MergeRange::new(0, 1, 0, 9))
            .with_merge(MergeRange::new(5, 5, 6, 6));
        let grid = normalize(&table).unwrap();
        assert_eq!(grid.merges(), &[MergeRange::new(1, 0, 1, 1)]);
        assert_eq!(grid.get(1, 0).map(|cell| cell.col_span), Some(2));
    }

    #[test]
    fn origin_text_falls_back_to_first_non_blank() {
        let table = RawTable::from_rows("t", [["", " ", "x"], ["", "body", "y"]]).with_merge(MergeRange::new(0, 0, 1, 1));
        let grid = normalize(&table).unwrap();
        assert_eq!(grid.get(0, 0).map(|cell| cell.text.as_str()), Some("body"));
        assert_eq!(grid.get(1, 1).map(|cell| cell.text.as_str()), Some(""));
    }

    #[test]
    fn duplicate_cells_keep_first() {
        let mut table = RawTable::from_rows("t", [["first", "b"]]);
        table.cells.push(RawCell::new(0, 0, "second").with_span(1, 2));
        let grid = normalize(&table).unwrap();
        assert_eq!(grid.text_at(0, 0), "first");
        assert!(grid.merges().is_empty());
    }

    #[test]
    fn missing_cells_are_empty() {
        let mut table = RawTable::new("t", 2, 2);
        table.cells.push(RawCell::new(1, 1, "only"));
        let grid = normalize(&table).unwrap();
        assert_eq!(grid.resolved_row(0), vec!["", ""]);
        assert_eq!(grid.resolved_row(1), vec!["", "only"]);
    }
}
