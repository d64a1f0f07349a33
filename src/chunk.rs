//! # Chunk Emitter
//!
//! Produces the retrieval units of one table: a `table_full` chunk holding the rendered table
//! and, with the `full_and_rows` strategy, one `table_row` chunk per body row.
use crate::config::{ChunkingStrategy, TableConfig, TableFormat};
use crate::format::{render, render_record};
use crate::grid::Grid;
use crate::header::HeaderHierarchy;
use crate::normalize::RawTable;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    TableFull,
    TableRow,
}

/// Text surrounding a chunk in its source document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

/// One retrieval unit. Identified by `(doc_id, table_id, chunk_type, row_index)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// `{doc_id}_{n}`, numbered from 1 in emission order
    pub chunk_id: String,
    pub chunk_type: ChunkType,
    pub doc_id: String,
    pub table_id: String,
    /// Table the chunk was cut from, set on row chunks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet: Option<String>,
    pub content: String,
    pub table_format: TableFormat,
    /// Flattened header label of every column
    pub header_context: Vec<String>,
    pub header_rows: usize,
    /// Grid row of a row chunk
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_index: Option<usize>,
    /// First source row covered by the chunk
    pub start_row: usize,
    /// Last source row covered by the chunk
    pub end_row: usize,
    /// A1 references of the table's merges, relative to the table
    pub merged_cells: Vec<String>,
    #[serde(default)]
    pub context: ChunkContext,
}

/// Emits the chunks of one table in order: the full chunk, then body rows top to bottom.
///
/// # Arguments
///
/// * `doc_id` - Identifier of the source document
/// * `table` - The raw table, for identity and source position
/// * `grid` - The normalized grid
/// * `hierarchy` - The validated or fallback header hierarchy
/// * `config` - Selects the format and the chunking strategy
///
/// # Returns
///
/// * `Vec<Chunk>` - Chunk ids are numbered from 1 within this table
pub fn emit(
    doc_id: &str,
    table: &RawTable,
    grid: &Grid,
    hierarchy: &HeaderHierarchy,
    config: &TableConfig,
) -> Vec<Chunk> {
    let format = config.table_format;
    let header_context = hierarchy.flattened();
    let header_rows = hierarchy.depth();
    let merged_cells: Vec<String> = grid.merges().iter().map(|range| range.reference()).collect();
    let base = Chunk {
        chunk_id: String::new(),
        chunk_type: ChunkType::TableFull,
        doc_id: doc_id.to_owned(),
        table_id: table.id.clone(),
        parent_id: None,
        sheet: table.sheet.clone(),
        content: String::new(),
        table_format: format,
        header_context,
        header_rows,
        row_index: None,
        start_row: table.row_offset,
        end_row: table.row_offset + grid.row_count() - 1,
        merged_cells,
        context: ChunkContext {
            previous: table.preceding_text.clone(),
            next: table.following_text.clone(),
        },
    };

    let mut chunks = vec![Chunk {
        content: render(grid, hierarchy, format).text,
        ..base.clone()
    }];
    if config.table_chunking_strategy == ChunkingStrategy::FullAndRows {
        let body = header_rows.min(grid.row_count())..grid.row_count();
        for row in body.clone() {
            let values = grid.resolved_row(row);
            let previous = (row > body.start).then(|| record_line(grid, row - 1));
            let next = (row + 1 < body.end).then(|| record_line(grid, row + 1));
            chunks.push(Chunk {
                chunk_type: ChunkType::TableRow,
                parent_id: Some(table.id.clone()),
                content: render_record(&base.header_context, &values, format).text,
                row_index: Some(row),
                start_row: table.row_offset + row,
                end_row: table.row_offset + row,
                context: ChunkContext { previous, next },
                ..base.clone()
            });
        }
    }
    for (index, chunk) in chunks.iter_mut().enumerate() {
        chunk.chunk_id = chunk_id(doc_id, index + 1);
    }
    chunks
}

pub(crate) fn chunk_id(doc_id: &str, sequence: usize) -> String {
    format!("{}_{}", doc_id, sequence)
}

/// Resolved values of a row joined with ` | `, used as neighbor context.
fn record_line(grid: &Grid, row: usize) -> String {
    grid.resolved_row(row).join(" | ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::recover;
    use crate::normalize::normalize;
    use crate::testing::enrollment_table;

    fn chunks(strategy: ChunkingStrategy, format: TableFormat) -> Vec<Chunk> {
        let table = enrollment_table().with_sheet("Sheet1", 4);
        let config = TableConfig {
            table_format: format,
            table_chunking_strategy: strategy,
            ..Default::default()
        };
        let grid = normalize(&table).unwrap();
        let hierarchy = recover(&table.id, &grid, &config);
        emit("doc", &table, &grid, &hierarchy, &config)
    }

    #[test]
    fn full_only_emits_one_chunk() {
        let chunks = chunks(ChunkingStrategy::FullOnly, TableFormat::Html);
        assert_eq!(chunks.len(), 1);
        let full = &chunks[0];
        assert_eq!(full.chunk_id, "doc_1");
        assert_eq!(full.chunk_type, ChunkType::TableFull);
        assert_eq!(full.sheet.as_deref(), Some("Sheet1"));
        assert_eq!(full.header_rows, 2);
        assert_eq!((full.start_row, full.end_row), (4, 9));
        assert_eq!(full.merged_cells, vec!["A1:A2", "B1:B2", "C1:D1", "E1:E2"]);
        assert_eq!(
            full.header_context,
            vec!["学校名称", "年度", "本科生情况/新生人数", "本科生情况/毕业生人数", "备注"]
        );
        assert!(full.content.starts_with("<table border='1'>"));
    }

    #[test]
    fn full_and_rows_emits_one_chunk_per_body_row() {
        let chunks = chunks(ChunkingStrategy::FullAndRows, TableFormat::Markdown);
        assert_eq!(chunks.len(), 1 + (6 - 2));
        assert_eq!(chunks[0].chunk_type, ChunkType::TableFull);

        let rows: Vec<&Chunk> = chunks[1..].iter().collect();
        assert!(rows.iter().all(|chunk| chunk.chunk_type == ChunkType::TableRow));
        assert_eq!(
            rows.iter().map(|chunk| chunk.row_index).collect::<Vec<_>>(),
            vec![Some(2), Some(3), Some(4), Some(5)]
        );
        assert_eq!(rows[0].chunk_id, "doc_2");
        assert_eq!(rows[0].parent_id.as_deref(), Some("table_0"));
        assert_eq!((rows[0].start_row, rows[0].end_row), (6, 6));
        assert_eq!(
            rows[0].content,
            "| 学校名称 | 年度 | 本科生情况/新生人数 | 本科生情况/毕业生人数 | 备注 |\n\
             | --- | ---: | ---: | ---: | --- |\n\
             | 清华大学 | 2021 | 3500 | 3200 | 新校区 |"
        );
        assert_eq!(rows[0].context.previous, None);
        assert_eq!(rows[0].context.next.as_deref(), Some("北京大学 | 2021 | 3400 | 3100 | 扩招"));
        assert_eq!(rows[3].context.next, None);
    }

    #[test]
    fn chunks_serialize_with_snake_case_tags() {
        let chunks = chunks(ChunkingStrategy::FullAndRows, TableFormat::Html);
        let value = serde_json::to_value(&chunks[1]).unwrap();
        assert_eq!(value["chunk_type"], "table_row");
        assert_eq!(value["table_format"], "html");
        assert_eq!(value["row_index"], 2);
        assert!(value.get("sheet").is_some());
    }
}
