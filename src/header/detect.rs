//! Header row detection.
//!
//! Each strategy looks at the leading rows of a grid and proposes how many of them form the
//! header, `0` meaning it has no opinion. [`vote`] reduces the three proposals to one count.
use crate::config::TableConfig;
use crate::grid::Grid;
use crate::header::HeaderBlock;
use crate::helpers::string::is_numeric;
use std::collections::HashSet;

/// Rows whose numeric share reaches this ratio are considered data.
const NUMERIC_RATIO_LIMIT: f64 = 0.3;

/// Share of non-empty cells that must contain a header keyword.
const KEYWORD_RATIO_THRESHOLD: f64 = 0.3;

const EPSILON: f64 = 1e-9;

/// Detects the header block of a grid.
///
/// # Arguments
///
/// * `grid` - The normalized table
/// * `config` - Supplies the row window, merge density threshold and header keywords
///
/// # Returns
///
/// * `HeaderBlock` - At most `row_count - 1` rows, so at least one data row remains
///   whenever the grid has two rows or more
pub fn detect(grid: &Grid, config: &TableConfig) -> HeaderBlock {
    let window = config.max_header_rows.min(grid.row_count());
    let proposals = [
        by_merge_pattern(grid, window, config.merge_density_threshold),
        by_structure(grid, window),
        by_content(grid, window, &config.header_keywords),
    ];
    let row_count = vote(proposals).min(grid.row_count().saturating_sub(1));
    tracing::debug!(?proposals, header_rows = row_count, "Header rows voted");
    HeaderBlock { row_count }
}

/// Reduces the strategy proposals to a single header row count.
///
/// A strategy without an opinion votes for the single-row default. A count backed by at
/// least two votes wins, otherwise the smallest count is taken.
pub fn vote(proposals: [usize; 3]) -> usize {
    let [a, b, c] = proposals.map(|count| count.max(1));
    if a == b || a == c {
        a
    } else if b == c {
        b
    } else {
        a.min(b).min(c)
    }
}

/// Proposes the leading run of rows rich in header-shaped merges.
///
/// A header-shaped merge spans two cells or more and ends inside the detection window, so
/// body-level merges reaching below it are not counted.
pub fn by_merge_pattern(grid: &Grid, window: usize, threshold: f64) -> usize {
    (0..window)
        .take_while(|&row| header_merge_density(grid, row, window) > threshold)
        .count()
}

/// Proposes the leading run of rows that look structurally different from the body.
///
/// The body baseline is taken from the rows after the detection window. A row is
/// header-like when it is denser in merges than the body, or as dense and less varied.
pub fn by_structure(grid: &Grid, window: usize) -> usize {
    let body: Vec<usize> = (window..grid.row_count()).filter(|&row| !is_empty_row(grid, row)).collect();
    if body.is_empty() {
        return 0;
    }
    let body_density = mean(body.iter().map(|&row| merge_density(grid, row)));
    let body_unique = mean(body.iter().map(|&row| unique_ratio(grid, row)));
    (0..window)
        .take_while(|&row| {
            if is_empty_row(grid, row) {
                return false;
            }
            let density = merge_density(grid, row);
            density > body_density + EPSILON
                || ((density - body_density).abs() <= EPSILON && unique_ratio(grid, row) + EPSILON < body_unique)
        })
        .count()
}

/// Proposes the leading run of rows that read like labels rather than values.
/// Without keywords there is nothing to match and the strategy has no opinion.
pub fn by_content(grid: &Grid, window: usize, keywords: &[String]) -> usize {
    if keywords.iter().all(|keyword| keyword.is_empty()) {
        return 0;
    }
    (0..window).take_while(|&row| is_label_row(grid, row, keywords)).count()
}

fn is_label_row(grid: &Grid, row: usize, keywords: &[String]) -> bool {
    let texts: Vec<&str> = grid.resolved_row(row).into_iter().filter(|text| !text.is_empty()).collect();
    if texts.is_empty() {
        return false;
    }
    let total = texts.len() as f64;
    let numeric = texts.iter().filter(|text| is_numeric(text)).count() as f64;
    if numeric / total >= NUMERIC_RATIO_LIMIT {
        return false;
    }
    let matched = texts
        .iter()
        .filter(|text| keywords.iter().any(|keyword| !keyword.is_empty() && text.contains(keyword.as_str())))
        .count() as f64;
    matched / total > KEYWORD_RATIO_THRESHOLD
}

/// Share of the distinct cells intersecting a row that are header-shaped merges.
fn header_merge_density(grid: &Grid, row: usize, window: usize) -> f64 {
    let origins = grid.row_origins(row);
    if origins.is_empty() {
        return 0.0;
    }
    let merged = origins
        .iter()
        .filter(|origin| origin.is_merge_origin() && origin.row + origin.row_span <= window)
        .count();
    merged as f64 / origins.len() as f64
}

/// Share of the distinct cells intersecting a row that are merges of any shape.
fn merge_density(grid: &Grid, row: usize) -> f64 {
    let origins = grid.row_origins(row);
    if origins.is_empty() {
        return 0.0;
    }
    origins.iter().filter(|origin| origin.is_merge_origin()).count() as f64 / origins.len() as f64
}

/// Distinct non-empty resolved texts relative to the column count.
fn unique_ratio(grid: &Grid, row: usize) -> f64 {
    if grid.col_count() == 0 {
        return 0.0;
    }
    let distinct: HashSet<&str> = grid.resolved_row(row).into_iter().filter(|text| !text.is_empty()).collect();
    distinct.len() as f64 / grid.col_count() as f64
}

fn is_empty_row(grid: &Grid, row: usize) -> bool {
    grid.resolved_row(row).iter().all(|text| text.is_empty())
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_MERGE_DENSITY_THRESHOLD;
    use crate::grid::MergeRange;
    use crate::normalize::{normalize, RawTable};
    use crate::testing::enrollment_table;

    fn keywords() -> Vec<String> {
        TableConfig::default().header_keywords
    }

    fn enrollment() -> Grid {
        normalize(&enrollment_table()).unwrap()
    }

    #[test]
    fn voting_rules() {
        assert_eq!(vote([2, 2, 1]), 2);
        assert_eq!(vote([1, 3, 3]), 3);
        assert_eq!(vote([0, 3, 3]), 3);
        assert_eq!(vote([0, 3, 2]), 1);
        assert_eq!(vote([0, 0, 2]), 1);
        assert_eq!(vote([2, 3, 4]), 2);
        assert_eq!(vote([0, 0, 0]), 1);
    }

    #[test]
    fn strategies_agree_on_two_level_header() {
        let grid = enrollment();
        assert_eq!(by_merge_pattern(&grid, 3, DEFAULT_MERGE_DENSITY_THRESHOLD), 2);
        assert_eq!(by_structure(&grid, 3), 2);
        assert_eq!(by_content(&grid, 3, &keywords()), 2);
        assert_eq!(detect(&grid, &TableConfig::default()), HeaderBlock { row_count: 2 });
    }

    #[test]
    fn plain_table_has_one_header_row() {
        let grid = normalize(&RawTable::from_rows(
            "t",
            [["名称", "人数"], ["一班", "40"], ["二班", "38"], ["三班", "41"]],
        ))
        .unwrap();
        assert_eq!(by_merge_pattern(&grid, 3, DEFAULT_MERGE_DENSITY_THRESHOLD), 0);
        assert_eq!(by_content(&grid, 3, &keywords()), 1);
        assert_eq!(detect(&grid, &TableConfig::default()).row_count, 1);
    }

    #[test]
    fn content_without_keywords() {
        let grid = normalize(&RawTable::from_rows(
            "t",
            [["Region", "Q1", "Q2"], ["North", "10", "12"], ["South", "8", "9"]],
        ))
        .unwrap();
        assert_eq!(by_content(&grid, 3, &[]), 0);
        assert_eq!(by_content(&grid, 3, &keywords()), 0);
    }

    #[test]
    fn text_table_without_keywords_keeps_one_header_row() {
        let grid = normalize(&RawTable::from_rows(
            "t",
            [["Name", "City"], ["Alice", "Paris"], ["Bob", "Rome"], ["Carl", "Oslo"]],
        ))
        .unwrap();
        let config = TableConfig {
            header_keywords: vec![],
            ..Default::default()
        };
        assert_eq!(by_content(&grid, 3, &config.header_keywords), 0);
        assert_eq!(detect(&grid, &config), HeaderBlock { row_count: 1 });
    }

    #[test]
    fn single_column_merge_counts_as_header_signal() {
        let table = RawTable::from_rows(
            "t",
            [["Region", "Sales", "", "Note", "Owner"], ["", "Q1", "Q2", "", ""], ["North", "10", "12", "a", "x"]],
        )
        .with_merge(MergeRange::new(0, 1, 0, 2));
        let grid = normalize(&table).unwrap();
        assert_eq!(by_merge_pattern(&grid, 3, TableConfig::default().merge_density_threshold), 1);
    }

    #[test]
    fn result_is_capped_below_row_count() {
        let grid = normalize(&RawTable::from_rows("t", [["名称", "备注"]])).unwrap();
        assert_eq!(detect(&grid, &TableConfig::default()).row_count, 0);

        let grid = normalize(&RawTable::from_rows("t", [["名称", "备注"], ["人数", "合计"]])).unwrap();
        assert_eq!(detect(&grid, &TableConfig::default()).row_count, 1);
    }

    #[test]
    fn body_merges_are_not_header_shaped() {
        let table = RawTable::from_rows(
            "t",
            [["Group", "Value"], ["A", "1"], ["", "2"], ["", "3"], ["B", "4"]],
        )
        .with_merge(MergeRange::new(1, 0, 3, 0));
        let grid = normalize(&table).unwrap();
        assert_eq!(by_merge_pattern(&grid, 3, DEFAULT_MERGE_DENSITY_THRESHOLD), 0);
    }
}
