//! Structural validation of a header hierarchy against its grid.
use crate::grid::Grid;
use crate::header::HeaderHierarchy;
use thiserror::Error;

/// Reasons a header hierarchy is rejected. Handled by the flat fallback, never surfaced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderIssue {
    #[error("no header rows")]
    EmptyHierarchy,

    #[error("column {col} has no top-level label")]
    MissingLabel { col: usize },

    #[error("hierarchy has {actual} columns, grid has {expected}")]
    ColumnCountMismatch { expected: usize, actual: usize },

    #[error("column {col} has {actual} labels, header depth is {expected}")]
    PathLengthMismatch { col: usize, expected: usize, actual: usize },

    #[error("cell ({row}, {col}) points to an origin that does not cover it")]
    DanglingOrigin { row: usize, col: usize },

    #[error("header row {row} reuses a merge origin after a gap at column {col}")]
    NonContiguousMerge { row: usize, col: usize },

    #[error("header row {row} merge at column {col} straddles two parents")]
    StraddlingMerge { row: usize, col: usize },
}

/// Checks a hierarchy for label completeness, width and merge-chain integrity.
///
/// # Arguments
///
/// * `grid` - The grid the hierarchy was built from
/// * `hierarchy` - The candidate hierarchy
///
/// # Returns
///
/// * `Result<(), HeaderIssue>` - The first issue found, if any
pub fn validate(grid: &Grid, hierarchy: &HeaderHierarchy) -> Result<(), HeaderIssue> {
    let depth = hierarchy.depth();
    if depth == 0 {
        return Err(HeaderIssue::EmptyHierarchy);
    }
    if hierarchy.col_count() != grid.col_count() {
        return Err(HeaderIssue::ColumnCountMismatch {
            expected: grid.col_count(),
            actual: hierarchy.col_count(),
        });
    }
    for col in 0..hierarchy.col_count() {
        let actual = hierarchy.labels(col).len();
        if actual != depth {
            return Err(HeaderIssue::PathLengthMismatch { col, expected: depth, actual });
        }
        if hierarchy.label(col, 0).trim().is_empty() {
            return Err(HeaderIssue::MissingLabel { col });
        }
    }

    let mut keys = Vec::<Vec<(usize, usize)>>::with_capacity(depth);
    for row in 0..depth {
        keys.push(origin_keys(grid, row)?);
    }
    for (row, row_keys) in keys.iter().enumerate() {
        check_contiguous(row, row_keys)?;
    }
    for row in 1..depth {
        for col in 0..grid.col_count().saturating_sub(1) {
            if keys[row][col] != keys[row][col + 1] {
                continue;
            }
            if (0..row).any(|parent| keys[parent][col] != keys[parent][col + 1]) {
                return Err(HeaderIssue::StraddlingMerge { row, col });
            }
        }
    }
    Ok(())
}

/// Resolves every column of a header row to the coordinates of its merge origin.
fn origin_keys(grid: &Grid, row: usize) -> Result<Vec<(usize, usize)>, HeaderIssue> {
    (0..grid.col_count())
        .map(|col| {
            let dangling = HeaderIssue::DanglingOrigin { row, col };
            let cell = grid.get(row, col).ok_or(dangling.clone())?;
            match cell.origin {
                None => Ok((row, col)),
                Some((origin_row, origin_col)) => {
                    let origin = grid.origin_of(row, col).ok_or(dangling.clone())?;
                    let covers = origin
                        .span_range()
                        .map(|range| range.contains(row, col))
                        .unwrap_or(false);
                    if covers {
                        Ok((origin_row, origin_col))
                    } else {
                        Err(dangling)
                    }
                }
            }
        })
        .collect()
}

fn check_contiguous(row: usize, keys: &[(usize, usize)]) -> Result<(), HeaderIssue> {
    let mut closed = Vec::<(usize, usize)>::new();
    for (col, key) in keys.iter().enumerate() {
        if col > 0 && keys[col - 1] == *key {
            continue;
        }
        if closed.contains(key) {
            return Err(HeaderIssue::NonContiguousMerge { row, col });
        }
        closed.push(*key);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::MergeRange;
    use crate::header::hierarchy::build;
    use crate::header::HeaderBlock;
    use crate::normalize::{normalize, RawTable};
    use crate::testing::enrollment_table;

    #[test]
    fn two_level_header_is_valid() {
        let grid = normalize(&enrollment_table()).unwrap();
        let hierarchy = build(&grid, HeaderBlock { row_count: 2 });
        assert_eq!(validate(&grid, &hierarchy), Ok(()));
    }

    #[test]
    fn zero_depth_fails() {
        let grid = normalize(&enrollment_table()).unwrap();
        let hierarchy = build(&grid, HeaderBlock { row_count: 0 });
        assert_eq!(validate(&grid, &hierarchy), Err(HeaderIssue::EmptyHierarchy));
    }

    #[test]
    fn missing_top_label_fails() {
        let grid = normalize(&RawTable::from_rows("t", [["Name", "", "Total"], ["a", "1", "2"]])).unwrap();
        let hierarchy = build(&grid, HeaderBlock { row_count: 1 });
        assert_eq!(validate(&grid, &hierarchy), Err(HeaderIssue::MissingLabel { col: 1 }));
    }

    #[test]
    fn width_mismatch_fails() {
        let grid = normalize(&RawTable::from_rows("t", [["Name", "Total"], ["a", "1"]])).unwrap();
        let hierarchy = HeaderHierarchy::new(1, vec![vec!["Name".to_owned()]]);
        assert_eq!(
            validate(&grid, &hierarchy),
            Err(HeaderIssue::ColumnCountMismatch { expected: 2, actual: 1 })
        );
    }

    #[test]
    fn child_merge_straddling_parents_fails() {
        let table = RawTable::from_rows("t", [["A", "", "B"], ["x", "y", ""], ["1", "2", "3"]])
            .with_merge(MergeRange::new(0, 0, 0, 1))
            .with_merge(MergeRange::new(1, 1, 1, 2));
        let grid = normalize(&table).unwrap();
        let hierarchy = build(&grid, HeaderBlock { row_count: 2 });
        assert_eq!(
            validate(&grid, &hierarchy),
            Err(HeaderIssue::StraddlingMerge { row: 1, col: 1 })
        );
    }

    #[test]
    fn contiguity() {
        assert_eq!(check_contiguous(0, &[(0, 0), (0, 0), (0, 2)]), Ok(()));
        assert_eq!(
            check_contiguous(0, &[(0, 0), (0, 1), (0, 0)]),
            Err(HeaderIssue::NonContiguousMerge { row: 0, col: 2 })
        );
    }
}
