//! HTML rendering with explicit span attributes.
use crate::format::or_placeholder;
use crate::grid::Grid;
use crate::header::HeaderHierarchy;
use crate::helpers::string::escape_html;
use std::fmt::Write;

const TABLE_OPEN: &str = "<table border='1'>";
const TABLE_CLOSE: &str = "</table>";

/// Renders every grid row as one `<tr>` line. Rows inside the header depth use `<th>`.
/// Each merge origin is written once with its full span; merge members are skipped.
pub(crate) fn render(grid: &Grid, hierarchy: &HeaderHierarchy) -> String {
    let mut html = String::from(TABLE_OPEN);
    html.push('\n');
    for row in 0..grid.row_count() {
        let tag = if row < hierarchy.depth() { "th" } else { "td" };
        html.push_str("<tr>");
        for cell in grid.row(row).iter().filter(|cell| cell.is_origin()) {
            let _ = write!(html, "<{}", tag);
            if cell.row_span > 1 {
                let _ = write!(html, " rowspan=\"{}\"", cell.row_span);
            }
            if cell.col_span > 1 {
                let _ = write!(html, " colspan=\"{}\"", cell.col_span);
            }
            let _ = write!(html, ">{}</{}>", escape_html(or_placeholder(&cell.text)), tag);
        }
        html.push_str("</tr>\n");
    }
    html.push_str(TABLE_CLOSE);
    html
}

pub(crate) fn render_record(labels: &[String], values: &[&str]) -> String {
    let header: String = labels
        .iter()
        .map(|label| format!("<th>{}</th>", escape_html(or_placeholder(label))))
        .collect();
    let body: String = values
        .iter()
        .map(|value| format!("<td>{}</td>", escape_html(or_placeholder(value))))
        .collect();
    format!("{}\n<tr>{}</tr>\n<tr>{}</tr>\n{}", TABLE_OPEN, header, body, TABLE_CLOSE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::MergeRange;
    use crate::header::hierarchy::build;
    use crate::header::HeaderBlock;
    use crate::normalize::{normalize, RawTable};
    use crate::testing::enrollment_table;
    use regex::Regex;

    /// Recovers the merge ranges encoded in rendered markup by replaying the HTML table layout.
    fn recover_merges(html: &str) -> Vec<MergeRange> {
        let cell = Regex::new(r#"<t[hd](?: rowspan="(\d+)")?(?: colspan="(\d+)")?>"#).unwrap();
        let mut occupied = Vec::<Vec<bool>>::new();
        let mut merges = Vec::new();
        for (row, line) in html.lines().filter(|line| line.starts_with("<tr>")).enumerate() {
            for captures in cell.captures_iter(line) {
                let span = |index: usize| captures.get(index).map_or(1, |m| m.as_str().parse::<usize>().unwrap());
                let (row_span, col_span) = (span(1), span(2));
                occupied.resize(occupied.len().max(row + row_span), Vec::new());
                let mut col = 0;
                while occupied[row].get(col).copied().unwrap_or(false) {
                    col += 1;
                }
                for r in row..row + row_span {
                    let cells = &mut occupied[r];
                    cells.resize(cells.len().max(col + col_span), false);
                    cells[col..col + col_span].iter_mut().for_each(|cell| *cell = true);
                }
                if row_span > 1 || col_span > 1 {
                    merges.push(MergeRange::from_span(row, col, row_span, col_span).unwrap());
                }
            }
        }
        merges
    }

    #[test]
    fn two_level_header() {
        let grid = normalize(&enrollment_table()).unwrap();
        let html = render(&grid, &build(&grid, HeaderBlock { row_count: 2 }));
        let lines: Vec<&str> = html.lines().collect();

        assert_eq!(lines.len(), 8);
        assert_eq!(lines[0], "<table border='1'>");
        assert_eq!(
            lines[1],
            "<tr><th rowspan=\"2\">学校名称</th><th rowspan=\"2\">年度</th><th colspan=\"2\">本科生情况</th><th rowspan=\"2\">备注</th></tr>"
        );
        assert_eq!(lines[2], "<tr><th>新生人数</th><th>毕业生人数</th></tr>");
        assert_eq!(lines[5], "<tr><td>清华大学</td><td>2022</td><td>3600</td><td>3300</td><td>-</td></tr>");
        assert_eq!(lines[7], "</table>");
        assert_eq!(html.matches("colspan=\"2\"").count(), 1);
    }

    #[test]
    fn merges_round_trip_through_span_attributes() {
        let table = RawTable::from_rows(
            "t",
            [
                ["a", "", "b", "c"],
                ["", "", "d", ""],
                ["e", "f", "", ""],
                ["g", "h", "", "i"],
            ],
        )
        .with_merge(MergeRange::new(0, 0, 1, 1))
        .with_merge(MergeRange::new(1, 2, 1, 3))
        .with_merge(MergeRange::new(2, 1, 3, 2))
        .with_merge(MergeRange::new(2, 3, 2, 3));
        let grid = normalize(&table).unwrap();
        let html = render(&grid, &build(&grid, HeaderBlock { row_count: 1 }));

        let mut expected = grid.merges().to_vec();
        let mut recovered = recover_merges(&html);
        expected.sort();
        recovered.sort();
        assert_eq!(recovered, expected);
    }

    #[test]
    fn text_is_escaped() {
        let grid = normalize(&RawTable::from_rows("t", [["<b>", "x&y"], ["", "1"]])).unwrap();
        let html = render(&grid, &build(&grid, HeaderBlock { row_count: 1 }));
        assert!(html.contains("<th>&lt;b&gt;</th><th>x&amp;y</th>"));
        assert!(html.contains("<tr><td>-</td><td>1</td></tr>"));
    }

    #[test]
    fn single_record() {
        let labels = vec!["学校名称".to_owned(), "本科生情况/新生人数".to_owned()];
        assert_eq!(
            render_record(&labels, &["清华大学", ""]),
            "<table border='1'>\n<tr><th>学校名称</th><th>本科生情况/新生人数</th></tr>\n<tr><td>清华大学</td><td>-</td></tr>\n</table>"
        );
    }
}
