//! Excel `.xlsx` decoding: worksheets are read cell by cell together with their merge ranges,
//! then split into table blocks separated by empty rows.
use crate::decode::{DecodeError, SheetFilter};
use crate::error::{ResultMessage, TableChunkerError};
use crate::grid::reference::reference_to_index;
use crate::grid::MergeRange;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::normalize::{RawCell, RawTable};
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, Read, Seek};
use zip::ZipArchive;

// XML tag names for parsing Excel XLSX format
const TAG_SHARED_STRING_ITEM: QName = QName(b"si"); // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");     // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                // Text content within strings
const TAG_SHEET: QName = QName(b"sheet");           // Worksheet definition
const TAG_ROW: QName = QName(b"row");               // Row in worksheet
const TAG_CELL: QName = QName(b"c");                // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is");      // Inline string value
const TAG_VALUE: QName = QName(b"v");               // Cell value content
const TAG_MERGE_CELL: QName = QName(b"mergeCell");  // Merged range
const TAG_RELATIONSHIP: &[u8] = b"Relationship";

const WORKBOOK_PATH: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PATH: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PATH: &str = "xl/sharedStrings.xml";

/// How the text of a `<c>` element is stored.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ValueKind {
    SharedString,
    InlineString,
    Boolean,
    Literal,
}

/// Cells and merges of one worksheet, in sheet coordinates.
#[derive(Debug, Default)]
struct SheetData {
    /// Non-blank cell texts keyed by `(row, col)`
    cells: BTreeMap<(usize, usize), String>,
    merges: Vec<MergeRange>,
}

/// Reads the tables of every accepted worksheet.
///
/// # Arguments
///
/// * `reader` - The workbook package
/// * `filter` - Worksheet selection
///
/// # Returns
///
/// * `Result<Vec<RawTable>, TableChunkerError>` - Table blocks, sheet by sheet, top to bottom
pub fn read_tables<RS: Read + Seek>(reader: RS, filter: &SheetFilter) -> Result<Vec<RawTable>, TableChunkerError> {
    let mut zip = ZipArchive::new(reader)?;
    let sheets = load_workbook(&mut zip)?;
    if sheets.is_empty() {
        Err(DecodeError::EmptyWorkbook)?
    }
    let shared_strings = load_shared_strings(&mut zip)?;

    let mut tables = Vec::new();
    for (sheet_name, zip_path) in sheets.iter().filter(|(name, _)| filter.accept(name)) {
        let sheet = read_sheet(&mut zip, zip_path, &shared_strings).with_prefix(sheet_name)?;
        let blocks = split_blocks(sheet_name, &sheet);
        tracing::debug!(
            sheet = %sheet_name,
            cells = sheet.cells.len(),
            merges = sheet.merges.len(),
            tables = blocks.len(),
            "Worksheet decoded"
        );
        tables.extend(blocks);
    }
    Ok(tables)
}

/// Loads worksheet names and their part paths, in workbook order.
fn load_workbook<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Vec<(String, String)>, TableChunkerError> {
    let relationships = load_relationships(zip, WORKBOOK_RELS_PATH)?;
    let mut reader = zip
        .xml_reader(WORKBOOK_PATH)?
        .ok_or_else(|| DecodeError::MissingPart(WORKBOOK_PATH.to_owned()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(&*id) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
    });
    Ok(sheets)
}

/// Loads worksheet relationships, mapping relationship ids to part paths.
fn load_relationships<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    path: &str,
) -> Result<HashMap<String, String>, TableChunkerError> {
    let mut reader = zip
        .xml_reader(path)?
        .ok_or_else(|| DecodeError::MissingPart(path.to_owned()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            // Only process worksheet relationships
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(&target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Normalizes a relationship target to a path inside the package.
fn to_zip_path(path: &str) -> String {
    if let Some(stripped) = path.strip_prefix('/') {
        stripped.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Loads the shared string table. A workbook without one has no shared strings.
fn load_shared_strings<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Vec<String>, TableChunkerError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_reader(SHARED_STRINGS_PATH)? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

/// Reads the cells and merge ranges of one worksheet part.
fn read_sheet<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    zip_path: &str,
    shared_strings: &[String],
) -> Result<SheetData, TableChunkerError> {
    let mut reader = zip
        .xml_reader(zip_path)?
        .ok_or_else(|| DecodeError::MissingPart(zip_path.to_owned()))?;
    let mut sheet = SheetData::default();
    let mut row_count = 0usize;
    let mut col_count = 0usize;
    let mut row = 0usize;
    let mut col = 0usize;
    let mut kind = ValueKind::Literal;
    let mut value = String::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_ROW => {
            if let Some(number) = event.parse_attribute_value::<usize>("r")? {
                row_count = number.saturating_sub(1);
            }
            col_count = 0;
        }
        Event::End(event) if event.name() == TAG_ROW => {
            row_count += 1;
        }
        Event::Start(event) if event.name() == TAG_CELL => {
            (row, col) = event.get_attribute_value("r")?
                .and_then(|reference| reference_to_index(&reference))
                .unwrap_or((row_count, col_count));
            col_count = col + 1;
            kind = match event.get_attribute_value("t")?.as_deref() {
                Some("s") => ValueKind::SharedString,
                Some("inlineStr") => ValueKind::InlineString,
                Some("b") => ValueKind::Boolean,
                _ => ValueKind::Literal,
            };
            value.clear();
        }
        Event::Start(event) if event.name() == TAG_INLINE_STRING => {
            value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
        }
        Event::Start(event) if event.name() == TAG_VALUE => {
            value = read_string_value(&mut reader, TAG_VALUE, true)?;
        }
        Event::End(event) if event.name() == TAG_CELL => {
            let text = match kind {
                ValueKind::SharedString if !value.trim().is_empty() => {
                    let index = value.trim().parse::<usize>()?;
                    shared_strings
                        .get(index)
                        .cloned()
                        .ok_or_else(|| DecodeError::SharedStringIndexError(value.clone()))?
                }
                ValueKind::Boolean if !value.is_empty() => {
                    if value.trim() == "1" { "TRUE".to_owned() } else { "FALSE".to_owned() }
                }
                _ => std::mem::take(&mut value),
            };
            if !text.trim().is_empty() {
                sheet.cells.insert((row, col), text);
            }
            value.clear();
        }
        Event::Start(event) if event.name() == TAG_MERGE_CELL => {
            if let Some(reference) = event.get_attribute_value("ref")? {
                sheet.merges.push(MergeRange::try_from(&*reference)?);
            }
        }
    });
    Ok(sheet)
}

/// Reads string content up to `end_tag`, skipping phonetic annotations.
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, TableChunkerError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}

/// Splits a worksheet into table blocks: maximal runs of rows that hold a value or intersect
/// a merge range. Columns without any value are dropped from each block.
fn split_blocks(sheet_name: &str, sheet: &SheetData) -> Vec<RawTable> {
    let mut occupied: Vec<usize> = sheet.cells.keys().map(|(row, _)| *row).collect();
    for range in &sheet.merges {
        occupied.extend(range.top..=range.bottom);
    }
    occupied.sort_unstable();
    occupied.dedup();

    let mut runs = Vec::<(usize, usize)>::new();
    for row in occupied {
        match runs.last_mut() {
            Some((_, end)) if *end + 1 == row => *end = row,
            _ => runs.push((row, row)),
        }
    }

    let row_text = |row: usize| -> Option<String> {
        let values: Vec<&str> = sheet
            .cells
            .range((row, 0)..=(row, usize::MAX))
            .map(|(_, text)| text.trim())
            .collect();
        (!values.is_empty()).then(|| values.join(" | "))
    };

    let mut tables = Vec::new();
    for (index, &(start, end)) in runs.iter().enumerate() {
        let mut columns: Vec<usize> = sheet
            .cells
            .range((start, 0)..=(end, usize::MAX))
            .map(|((_, col), _)| *col)
            .collect();
        columns.sort_unstable();
        columns.dedup();
        if columns.is_empty() {
            continue;
        }

        let id = format!("{}_table_{}", sheet_name, tables.len() + 1);
        let mut table = RawTable::new(id, end - start + 1, columns.len()).with_sheet(sheet_name, start);
        for ((row, col), text) in sheet.cells.range((start, 0)..=(end, usize::MAX)) {
            if let Ok(position) = columns.binary_search(col) {
                table.cells.push(RawCell::new(row - start, position, text.clone()));
            }
        }
        for range in sheet.merges.iter().filter(|range| range.top >= start && range.bottom <= end) {
            let left = columns.partition_point(|col| *col < range.left);
            let right = columns.partition_point(|col| *col <= range.right);
            if left >= right {
                continue;
            }
            let local = MergeRange::new(range.top - start, left, range.bottom - start, right - 1);
            if !local.is_single_cell() {
                table.merges.push(local);
            }
        }
        let preceding = index.checked_sub(1).and_then(|previous| row_text(runs[previous].1));
        let following = runs.get(index + 1).and_then(|next| row_text(next.0));
        tables.push(table.with_context(preceding, following));
    }
    tables
}
