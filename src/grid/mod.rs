//! # Cell Grid Model
//!
//! The normalized, immutable representation of one table: `row_count × col_count` cells
//! stored row-major. A cell is either an *origin*, which owns its text and the span of the
//! merge it starts, or a *member* of a merge, which only records the coordinates of its
//! origin. Every coordinate resolves to exactly one origin.
use crate::error::TableChunkerError;
use crate::grid::reference::{col_to_index, index_to_reference, row_to_index, ReferenceError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::OnceLock;

pub mod reference;

/// Inclusive, 0-based rectangle of merged cells. The top-left cell is the origin.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MergeRange {
    pub top: usize,
    pub left: usize,
    pub bottom: usize,
    pub right: usize,
}

impl MergeRange {
    /// Creates a range from two corners given in any order.
    pub fn new(top: usize, left: usize, bottom: usize, right: usize) -> Self {
        MergeRange {
            top: top.min(bottom),
            left: left.min(right),
            bottom: top.max(bottom),
            right: left.max(right),
        }
    }

    /// Creates a range from an origin and its spans. Zero spans yield `None`.
    pub fn from_span(row: usize, col: usize, row_span: usize, col_span: usize) -> Option<Self> {
        if row_span == 0 || col_span == 0 {
            None
        } else {
            Some(Self::new(row, col, row + row_span - 1, col + col_span - 1))
        }
    }

    pub fn row_span(&self) -> usize {
        self.bottom - self.top + 1
    }

    pub fn col_span(&self) -> usize {
        self.right - self.left + 1
    }

    /// Returns true if the range covers a single cell, i.e. is not a merge at all.
    pub fn is_single_cell(&self) -> bool {
        self.top == self.bottom && self.left == self.right
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        self.top <= row && row <= self.bottom && self.left <= col && col <= self.right
    }

    pub fn overlaps(&self, other: &MergeRange) -> bool {
        self.top <= other.bottom
            && other.top <= self.bottom
            && self.left <= other.right
            && other.left <= self.right
    }

    /// Clips the range to a `row_count × col_count` grid.
    /// Returns `None` if the range lies entirely outside of it.
    pub fn clip(&self, row_count: usize, col_count: usize) -> Option<Self> {
        if self.top >= row_count || self.left >= col_count {
            None
        } else {
            Some(MergeRange {
                top: self.top,
                left: self.left,
                bottom: self.bottom.min(row_count - 1),
                right: self.right.min(col_count - 1),
            })
        }
    }

    /// Returns the A1-style reference of the range, e.g. `C1:D1`.
    pub fn reference(&self) -> String {
        format!(
            "{}:{}",
            index_to_reference(self.top, self.left),
            index_to_reference(self.bottom, self.right)
        )
    }
}

impl Display for MergeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.reference())
    }
}

impl TryFrom<&str> for MergeRange {
    type Error = TableChunkerError;

    /// Parses an A1-style range such as `B2:C5` or a single cell `A1`.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        static PATTERN: OnceLock<Regex> = OnceLock::new();
        let pattern = PATTERN.get_or_init(|| {
            Regex::new(r"^\$?([A-Z]+)\$?(\d+)(:\$?([A-Z]+)\$?(\d+))?$").expect("Hardcode regex pattern")
        });
        let upper = value.trim().to_ascii_uppercase();
        let error = || ReferenceError::RangeFormatError(value.to_owned());
        let captures = pattern.captures(upper.as_str()).ok_or_else(error)?;
        let left = captures.get(1).and_then(|m| col_to_index(m.as_str())).ok_or_else(error)?;
        let top = captures.get(2).and_then(|m| row_to_index(m.as_str())).ok_or_else(error)?;
        let right = captures.get(4).map(|m| col_to_index(m.as_str()).ok_or_else(error)).transpose()?;
        let bottom = captures.get(5).map(|m| row_to_index(m.as_str()).ok_or_else(error)).transpose()?;
        Ok(MergeRange::new(top, left, bottom.unwrap_or(top), right.unwrap_or(left)))
    }
}

/// One coordinate of a normalized grid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    /// Row index (0-based)
    pub row: usize,
    /// Column index (0-based)
    pub col: usize,
    /// Literal text, only ever non-empty on origin cells
    pub text: String,
    /// Number of rows covered by this cell's merge (1 for unmerged and member cells)
    pub row_span: usize,
    /// Number of columns covered by this cell's merge (1 for unmerged and member cells)
    pub col_span: usize,
    /// Coordinates of the origin cell for merge members, `None` for origins
    pub origin: Option<(usize, usize)>,
}

impl Cell {
    /// Creates an unmerged origin cell.
    pub(crate) fn origin(row: usize, col: usize, text: String) -> Self {
        Cell {
            row,
            col,
            text,
            row_span: 1,
            col_span: 1,
            origin: None,
        }
    }

    pub fn is_origin(&self) -> bool {
        self.origin.is_none()
    }

    /// Returns true if this is the origin of a merge spanning more than one cell.
    pub fn is_merge_origin(&self) -> bool {
        self.is_origin() && (self.row_span > 1 || self.col_span > 1)
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Returns the merge range this origin covers, `None` for members.
    pub fn span_range(&self) -> Option<MergeRange> {
        if self.is_origin() {
            MergeRange::from_span(self.row, self.col, self.row_span, self.col_span)
        } else {
            None
        }
    }
}

/// The canonical normalized table, built once by the merge normalizer.
#[derive(Clone, Debug)]
pub struct Grid {
    row_count: usize,
    col_count: usize,
    /// Cells in row-major order
    cells: Vec<Cell>,
    /// Accepted merge ranges in declaration order
    merges: Vec<MergeRange>,
}

impl Grid {
    pub(crate) fn from_parts(row_count: usize, col_count: usize, cells: Vec<Cell>, merges: Vec<MergeRange>) -> Self {
        debug_assert_eq!(cells.len(), row_count * col_count);
        Grid {
            row_count,
            col_count,
            cells,
            merges,
        }
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn col_count(&self) -> usize {
        self.col_count
    }

    /// Accepted merge ranges, in the order they were declared.
    pub fn merges(&self) -> &[MergeRange] {
        &self.merges
    }

    /// Gets the physical cell at the specified position, origin or member.
    pub fn get(&self, row: usize, col: usize) -> Option<&Cell> {
        if row < self.row_count && col < self.col_count {
            self.cells.get(row * self.col_count + col)
        } else {
            None
        }
    }

    /// Resolves the cell at the specified position to its origin.
    pub fn origin_of(&self, row: usize, col: usize) -> Option<&Cell> {
        let cell = self.get(row, col)?;
        match cell.origin {
            None => Some(cell),
            Some((origin_row, origin_col)) => self.get(origin_row, origin_col).filter(|origin| origin.is_origin()),
        }
    }

    /// Returns the trimmed text visible at a position after merge resolution.
    pub fn text_at(&self, row: usize, col: usize) -> &str {
        self.origin_of(row, col).map(|cell| cell.text.trim()).unwrap_or("")
    }

    /// Returns the physical cells of a row.
    pub fn row(&self, row: usize) -> &[Cell] {
        if row < self.row_count {
            &self.cells[row * self.col_count..(row + 1) * self.col_count]
        } else {
            &[]
        }
    }

    /// Returns the resolved text of every column in a row, repeating merged text.
    pub fn resolved_row(&self, row: usize) -> Vec<&str> {
        (0..self.col_count).map(|col| self.text_at(row, col)).collect()
    }

    /// Returns the distinct origins that intersect a row, in column order.
    pub fn row_origins(&self, row: usize) -> Vec<&Cell> {
        let mut origins = Vec::<&Cell>::new();
        for col in 0..self.col_count {
            if let Some(origin) = self.origin_of(row, col) {
                let seen = origins
                    .last()
                    .map(|last| last.row == origin.row && last.col == origin.col)
                    .unwrap_or(false);
                if !seen {
                    origins.push(origin);
                }
            }
        }
        origins
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2×3 grid with A1:B1 merged.
    fn sample() -> Grid {
        let mut cells = vec![
            Cell::origin(0, 0, "Parent".to_owned()),
            Cell::origin(0, 1, String::new()),
            Cell::origin(0, 2, "Solo".to_owned()),
            Cell::origin(1, 0, "a".to_owned()),
            Cell::origin(1, 1, "b".to_owned()),
            Cell::origin(1, 2, "c".to_owned()),
        ];
        cells[0].col_span = 2;
        cells[1].origin = Some((0, 0));
        Grid::from_parts(2, 3, cells, vec![MergeRange::new(0, 0, 0, 1)])
    }

    #[test]
    fn merge_range_geometry() {
        let range = MergeRange::new(2, 3, 0, 1);
        assert_eq!(range, MergeRange { top: 0, left: 1, bottom: 2, right: 3 });
        assert_eq!(range.row_span(), 3);
        assert_eq!(range.col_span(), 3);
        assert!(range.contains(1, 2));
        assert!(!range.contains(3, 2));
        assert!(range.overlaps(&MergeRange::new(2, 3, 4, 4)));
        assert!(!range.overlaps(&MergeRange::new(3, 0, 4, 4)));
        assert_eq!(range.clip(2, 3), Some(MergeRange::new(0, 1, 1, 2)));
        assert_eq!(range.clip(0, 3), None);
        assert_eq!(MergeRange::from_span(1, 1, 0, 2), None);
        assert!(MergeRange::new(4, 4, 4, 4).is_single_cell());
    }

    #[test]
    fn merge_range_reference() {
        let range = MergeRange::try_from("c1:D1").unwrap();
        assert_eq!(range, MergeRange::new(0, 2, 0, 3));
        assert_eq!(range.to_string(), "C1:D1");
        assert_eq!(MergeRange::try_from("$A$2").unwrap(), MergeRange::new(1, 0, 1, 0));
        assert!(MergeRange::try_from("A0:B2").is_err());
        assert!(MergeRange::try_from("1:3").is_err());
    }

    #[test]
    fn grid_resolves_members_to_origin() {
        let grid = sample();
        assert_eq!(grid.get(0, 1).map(Cell::is_origin), Some(false));
        assert_eq!(grid.origin_of(0, 1).map(|cell| (cell.row, cell.col)), Some((0, 0)));
        assert_eq!(grid.text_at(0, 1), "Parent");
        assert_eq!(grid.text_at(5, 5), "");
        assert_eq!(grid.resolved_row(0), vec!["Parent", "Parent", "Solo"]);
        assert_eq!(grid.row_origins(0).len(), 2);
        assert_eq!(grid.row_origins(1).len(), 3);
        assert_eq!(grid.row(1).len(), 3);
        assert!(grid.row(2).is_empty());
        assert_eq!(grid.get(0, 0).and_then(Cell::span_range), Some(MergeRange::new(0, 0, 0, 1)));
    }
}
