//! Header hierarchy construction with label inheritance through merged header cells.
use crate::grid::Grid;
use crate::header::{HeaderBlock, HeaderHierarchy};

/// Builds the label path of every column from the header rows.
///
/// Each header cell resolves to its merge origin, so a parent spanning several columns gives
/// all of them the same label, and a cell spanning several header rows repeats its label at
/// every depth it covers.
pub fn build(grid: &Grid, block: HeaderBlock) -> HeaderHierarchy {
    let depth = block.row_count.min(grid.row_count());
    let columns = (0..grid.col_count())
        .map(|col| (0..depth).map(|row| grid.text_at(row, col).to_owned()).collect())
        .collect();
    HeaderHierarchy::new(depth, columns)
}

/// Builds the flat fallback header: the literal text of the first grid row, without
/// inheritance. Merge members contribute empty labels.
pub fn flat(grid: &Grid) -> HeaderHierarchy {
    let columns = grid
        .row(0)
        .iter()
        .map(|cell| vec![if cell.is_origin() { cell.text.trim().to_owned() } else { String::new() }])
        .collect();
    let mut hierarchy = HeaderHierarchy::new(1, columns);
    hierarchy.fallback = true;
    hierarchy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use crate::testing::enrollment_table;

    #[test]
    fn labels_are_inherited_from_merge_origins() {
        let grid = normalize(&enrollment_table()).unwrap();
        let hierarchy = build(&grid, HeaderBlock { row_count: 2 });

        assert_eq!(hierarchy.depth(), 2);
        assert_eq!(hierarchy.col_count(), 5);
        assert_eq!(hierarchy.labels(0), ["学校名称", "学校名称"]);
        assert_eq!(hierarchy.labels(2), ["本科生情况", "新生人数"]);
        assert_eq!(hierarchy.labels(3), ["本科生情况", "毕业生人数"]);
        assert_eq!(hierarchy.flattened_label(0), "学校名称");
        assert_eq!(hierarchy.flattened_label(3), "本科生情况/毕业生人数");
        assert!((0..5).all(|col| hierarchy.labels(col).len() == 2));
    }

    #[test]
    fn flat_header_uses_literal_first_row() {
        let grid = normalize(&enrollment_table()).unwrap();
        let hierarchy = flat(&grid);
        assert!(hierarchy.is_fallback());
        assert_eq!(hierarchy.depth(), 1);
        assert_eq!(hierarchy.flattened(), vec!["学校名称", "年度", "本科生情况", "", "备注"]);
    }

    #[test]
    fn zero_depth_hierarchy() {
        let grid = normalize(&enrollment_table()).unwrap();
        let hierarchy = build(&grid, HeaderBlock::default());
        assert_eq!(hierarchy.depth(), 0);
        assert_eq!(hierarchy.col_count(), 5);
        assert!(hierarchy.labels(0).is_empty());
    }
}
