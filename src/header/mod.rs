//! # Header Structure Recovery
//!
//! Decides how many leading rows of a [`Grid`] are header rows, turns those rows into a
//! per-column label path and checks that the result is structurally sound. When it is not,
//! a flat single-row header taken literally from the first grid row is used instead.
//!
//! ## Stages
//!
//! - [`detect`]: three independent heuristics and a vote over their proposals
//! - [`hierarchy`]: label inheritance through merged header cells
//! - [`validate`]: label, width and merge-chain checks
use crate::config::TableConfig;
use crate::grid::Grid;

pub mod detect;
pub mod hierarchy;
pub mod validate;

/// Number of leading grid rows classified as header.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    pub row_count: usize,
}

/// Per-column header label paths, outermost label first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeaderHierarchy {
    depth: usize,
    columns: Vec<Vec<String>>,
    fallback: bool,
}

impl HeaderHierarchy {
    pub(crate) fn new(depth: usize, columns: Vec<Vec<String>>) -> Self {
        HeaderHierarchy {
            depth,
            columns,
            fallback: false,
        }
    }

    /// Number of header rows the hierarchy was built from.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn col_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if this is the flat substitute produced after a failed validation.
    pub fn is_fallback(&self) -> bool {
        self.fallback
    }

    /// Label path of a column, outermost first.
    pub fn labels(&self, col: usize) -> &[String] {
        self.columns.get(col).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn label(&self, col: usize, depth: usize) -> &str {
        self.labels(col).get(depth).map(String::as_str).unwrap_or("")
    }

    /// Joins the non-empty labels of a column with `/`, collapsing consecutive duplicates
    /// left behind by row-spanning header cells.
    pub fn flattened_label(&self, col: usize) -> String {
        let mut parts = Vec::<&str>::new();
        for label in self.labels(col).iter().map(|label| label.as_str()) {
            if !label.is_empty() && parts.last() != Some(&label) {
                parts.push(label);
            }
        }
        parts.join("/")
    }

    /// Flattened labels of every column, in column order.
    pub fn flattened(&self) -> Vec<String> {
        (0..self.col_count()).map(|col| self.flattened_label(col)).collect()
    }
}

/// Recovers the header structure of a grid, never failing.
///
/// # Arguments
///
/// * `table_id` - Identifier used in log records
/// * `grid` - The normalized table
/// * `config` - Detection settings
///
/// # Returns
///
/// * `HeaderHierarchy` - The validated hierarchy, or the flat fallback
pub fn recover(table_id: &str, grid: &Grid, config: &TableConfig) -> HeaderHierarchy {
    let block = detect::detect(grid, config);
    let hierarchy = hierarchy::build(grid, block);
    match validate::validate(grid, &hierarchy) {
        Ok(()) => hierarchy,
        Err(issue) => {
            tracing::warn!(
                table_id = %table_id,
                header_rows = block.row_count,
                issue = %issue,
                "Header structure rejected, falling back to a flat header"
            );
            hierarchy::flat(grid)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::MergeRange;
    use crate::normalize::{normalize, RawTable};

    #[test]
    fn flattened_labels() {
        let hierarchy = HeaderHierarchy::new(
            2,
            vec![
                vec!["学校名称".to_owned(), "学校名称".to_owned()],
                vec!["本科生情况".to_owned(), "新生人数".to_owned()],
                vec!["".to_owned(), "备注".to_owned()],
            ],
        );
        assert_eq!(hierarchy.flattened(), vec!["学校名称", "本科生情况/新生人数", "备注"]);
        assert_eq!(hierarchy.label(1, 1), "新生人数");
        assert_eq!(hierarchy.label(4, 0), "");
        assert!(hierarchy.labels(9).is_empty());
    }

    #[test]
    fn straddling_header_falls_back() {
        let table = RawTable::from_rows(
            "t",
            [["Region", "", "Total"], ["", "Split", ""], ["north", "1", "2"], ["south", "3", "4"]],
        )
        .with_merge(MergeRange::new(0, 0, 0, 1))
        .with_merge(MergeRange::new(1, 1, 1, 2));
        let grid = normalize(&table).unwrap();
        let hierarchy = recover("t", &grid, &TableConfig::default());
        assert!(hierarchy.is_fallback());
        assert_eq!(hierarchy.depth(), 1);
        assert_eq!(hierarchy.flattened(), vec!["Region", "", "Total"]);
    }
}
