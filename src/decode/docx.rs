//! Word `.docx` decoding: every top-level `<w:tbl>` of the main document part becomes one
//! table. Horizontal merges come from `<w:gridSpan>`, vertical merges from `<w:vMerge>`
//! restart/continue chains, and both are handed to the normalizer as span hints.
use crate::decode::DecodeError;
use crate::error::TableChunkerError;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::normalize::{RawCell, RawTable};
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::collections::HashMap;
use std::io::{Read, Seek};
use zip::ZipArchive;

// XML tag names for parsing WordprocessingML
const TAG_TABLE: QName = QName(b"w:tbl");              // Table
const TAG_TABLE_ROW: QName = QName(b"w:tr");           // Table row
const TAG_TABLE_CELL: QName = QName(b"w:tc");          // Table cell
const TAG_GRID_BEFORE: QName = QName(b"w:gridBefore"); // Grid columns skipped before the first cell
const TAG_GRID_SPAN: QName = QName(b"w:gridSpan");     // Horizontal merge
const TAG_VERTICAL_MERGE: QName = QName(b"w:vMerge");  // Vertical merge
const TAG_PARAGRAPH: QName = QName(b"w:p");            // Paragraph
const TAG_TEXT: QName = QName(b"w:t");                 // Text run content
const TAG_TAB: QName = QName(b"w:tab");                // Tab character
const TAG_BREAK: QName = QName(b"w:br");               // Line break

const DOCUMENT_PATH: &str = "word/document.xml";

#[derive(Debug)]
struct CellInfo {
    paragraphs: Vec<String>,
    grid_span: usize,
    /// `Some(true)` starts a vertical merge, `Some(false)` continues the one above
    v_merge: Option<bool>,
}

impl Default for CellInfo {
    fn default() -> Self {
        CellInfo {
            paragraphs: Vec::new(),
            grid_span: 1,
            v_merge: None,
        }
    }
}

#[derive(Debug, Default)]
struct RowInfo {
    grid_before: usize,
    cells: Vec<CellInfo>,
}

#[derive(Debug, Default)]
struct TableBuilder {
    rows: Vec<RowInfo>,
    in_cell: bool,
}

impl TableBuilder {
    fn current_row(&mut self) -> Option<&mut RowInfo> {
        self.rows.last_mut()
    }

    fn current_cell(&mut self) -> Option<&mut CellInfo> {
        if self.in_cell {
            self.rows.last_mut().and_then(|row| row.cells.last_mut())
        } else {
            None
        }
    }

    /// Lays the cells out on the table grid. A continuation cell extends the row span of the
    /// merge started in the same grid column of the rows above; without one it is a plain cell.
    fn build(self, id: String) -> RawTable {
        let mut table = RawTable::new(id, self.rows.len(), 0);
        let mut spans = Vec::<(usize, usize)>::new();
        // grid column -> (index of the restart cell, last row covered)
        let mut open = HashMap::<usize, (usize, usize)>::new();
        for (row, info) in self.rows.into_iter().enumerate() {
            let mut col = info.grid_before;
            for cell in info.cells {
                let col_span = cell.grid_span.max(1);
                let continued = match (cell.v_merge, open.get_mut(&col)) {
                    (Some(false), Some((index, last_row))) if *last_row + 1 == row => {
                        spans[*index].0 += 1;
                        *last_row = row;
                        true
                    }
                    _ => false,
                };
                if !continued {
                    if cell.v_merge == Some(true) {
                        open.insert(col, (table.cells.len(), row));
                    } else {
                        open.remove(&col);
                    }
                    table.cells.push(RawCell::new(row, col, cell.paragraphs.join("\n")));
                    spans.push((1, col_span));
                }
                col += col_span;
            }
            table.col_count = table.col_count.max(col);
        }
        for (cell, (row_span, col_span)) in table.cells.iter_mut().zip(spans) {
            if row_span > 1 || col_span > 1 {
                *cell = cell.clone().with_span(row_span, col_span);
            }
        }
        table
    }
}

/// Reads every top-level table of a document.
///
/// # Arguments
///
/// * `reader` - The document package
///
/// # Returns
///
/// * `Result<Vec<RawTable>, TableChunkerError>` - Tables `table_1`, `table_2`, ... in
///   document order, each with its surrounding paragraphs as context
pub fn read_tables<RS: Read + Seek>(reader: RS) -> Result<Vec<RawTable>, TableChunkerError> {
    let mut zip = ZipArchive::new(reader)?;
    let mut reader = zip
        .xml_reader(DOCUMENT_PATH)?
        .ok_or_else(|| DecodeError::MissingPart(DOCUMENT_PATH.to_owned()))?;

    let mut tables = Vec::<RawTable>::new();
    let mut builder = None::<TableBuilder>;
    let mut depth = 0usize;
    let mut in_text = false;
    let mut paragraph = String::new();
    let mut last_paragraph = None::<String>;
    let mut awaiting_following = Vec::<usize>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_TABLE => {
            depth += 1;
            if depth == 1 {
                builder = Some(TableBuilder::default());
            }
        }
        Event::End(event) if event.name() == TAG_TABLE => {
            if depth == 1 {
                if let Some(finished) = builder.take() {
                    let id = format!("table_{}", tables.len() + 1);
                    let table = finished.build(id).with_context(last_paragraph.clone(), None);
                    awaiting_following.push(tables.len());
                    tables.push(table);
                }
            }
            depth = depth.saturating_sub(1);
        }
        Event::Start(event) if depth == 1 && event.name() == TAG_TABLE_ROW => {
            if let Some(builder) = builder.as_mut() {
                builder.rows.push(RowInfo::default());
            }
        }
        Event::Start(event) if depth == 1 && event.name() == TAG_TABLE_CELL => {
            if let Some(builder) = builder.as_mut() {
                if let Some(row) = builder.current_row() {
                    row.cells.push(CellInfo::default());
                    builder.in_cell = true;
                }
            }
        }
        Event::End(event) if depth == 1 && event.name() == TAG_TABLE_CELL => {
            if let Some(builder) = builder.as_mut() {
                builder.in_cell = false;
            }
        }
        Event::Start(event) if depth == 1 && event.name() == TAG_GRID_BEFORE => {
            let value = event.parse_attribute_value::<usize>("w:val")?;
            if let Some(row) = builder.as_mut().filter(|builder| !builder.in_cell).and_then(TableBuilder::current_row) {
                row.grid_before = value.unwrap_or(0);
            }
        }
        Event::Start(event) if depth == 1 && event.name() == TAG_GRID_SPAN => {
            let value = event.parse_attribute_value::<usize>("w:val")?;
            if let Some(cell) = builder.as_mut().and_then(TableBuilder::current_cell) {
                cell.grid_span = value.unwrap_or(1).max(1);
            }
        }
        Event::Start(event) if depth == 1 && event.name() == TAG_VERTICAL_MERGE => {
            let restart = event.get_attribute_value("w:val")?.map(|value| value == "restart").unwrap_or(false);
            if let Some(cell) = builder.as_mut().and_then(TableBuilder::current_cell) {
                cell.v_merge = Some(restart);
            }
        }
        Event::Start(event) if event.name() == TAG_TEXT => in_text = true,
        Event::End(event) if event.name() == TAG_TEXT => in_text = false,
        Event::Text(event) if in_text => paragraph.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if in_text => paragraph.push_bytes_ref(&event)?,
        Event::Start(event) if event.name() == TAG_TAB => paragraph.push(' '),
        Event::Start(event) if event.name() == TAG_BREAK => paragraph.push('\n'),
        Event::End(event) if event.name() == TAG_PARAGRAPH => {
            let text = std::mem::take(&mut paragraph).trim().to_owned();
            if text.is_empty() {
                continue;
            }
            if depth == 0 {
                for index in awaiting_following.drain(..) {
                    tables[index].following_text = Some(text.clone());
                }
                last_paragraph = Some(text);
            } else if let Some(cell) = builder.as_mut().and_then(|builder| {
                builder.rows.last_mut().and_then(|row| row.cells.last_mut())
            }) {
                cell.paragraphs.push(text);
            }
        }
    });
    Ok(tables)
}
