//! Markdown rendering. Markdown tables cannot express spans, so merged values are repeated in
//! every column and row they cover.
use crate::format::or_placeholder;
use crate::grid::Grid;
use crate::header::HeaderHierarchy;
use crate::helpers::string::{escape_markdown_cell, is_numeric};

/// Share of numeric data values above which a column is right-aligned.
const NUMERIC_COLUMN_RATIO: f64 = 0.7;

/// Renders one header line per header depth, the separator line, then one line per body row.
pub(crate) fn render(grid: &Grid, hierarchy: &HeaderHierarchy) -> String {
    let body = hierarchy.depth().min(grid.row_count())..grid.row_count();
    let mut lines = Vec::<String>::with_capacity(grid.row_count() + 1);
    for depth in 0..hierarchy.depth() {
        lines.push(line((0..grid.col_count()).map(|col| hierarchy.label(col, depth))));
    }
    if lines.is_empty() {
        lines.push(line((0..grid.col_count()).map(|_| "")));
    }
    let numeric: Vec<bool> = (0..grid.col_count())
        .map(|col| is_numeric_column(body.clone().map(|row| grid.text_at(row, col))))
        .collect();
    lines.push(separator(&numeric));
    for row in body {
        lines.push(line(grid.resolved_row(row)));
    }
    lines.join("\n")
}

pub(crate) fn render_record(labels: &[String], values: &[&str]) -> String {
    let numeric: Vec<bool> = values.iter().map(|value| is_numeric(value)).collect();
    [
        line(labels.iter().map(String::as_str)),
        separator(&numeric),
        line(values.iter().copied()),
    ]
    .join("\n")
}

fn line<'a>(cells: impl IntoIterator<Item = &'a str>) -> String {
    let cells: Vec<String> = cells
        .into_iter()
        .map(|text| escape_markdown_cell(or_placeholder(text)))
        .collect();
    format!("| {} |", cells.join(" | "))
}

fn separator(numeric: &[bool]) -> String {
    let cells: Vec<&str> = numeric
        .iter()
        .map(|numeric| if *numeric { "---:" } else { "---" })
        .collect();
    format!("| {} |", cells.join(" | "))
}

fn is_numeric_column<'a>(values: impl Iterator<Item = &'a str>) -> bool {
    let (total, numeric) = values
        .filter(|value| !value.is_empty())
        .fold((0usize, 0usize), |(total, numeric), value| {
            (total + 1, numeric + is_numeric(value) as usize)
        });
    total > 0 && numeric as f64 / total as f64 > NUMERIC_COLUMN_RATIO
}
