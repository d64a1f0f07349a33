//! # Document Decoders
//!
//! Extract embedded tables from Office Open XML documents as [`RawTable`]s:
//!
//! - `.xlsx` / `.xlsm` workbooks: every worksheet is split into table blocks ([`xlsx`])
//! - `.docx` documents: every top-level table ([`docx`])
use crate::error::{ResultMessage, TableChunkerError};
use crate::normalize::RawTable;
use glob::Pattern;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

pub mod docx;
pub mod xlsx;

/// Errors related to document decoding
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Unsupported document type '{0}', expected .xlsx, .xlsm or .docx")]
    UnsupportedDocument(String),

    #[error("Required part '{0}' is missing from the package")]
    MissingPart(String),

    #[error("Workbook has no worksheets")]
    EmptyWorkbook,

    #[error("Invalid shared string index '{0}'")]
    SharedStringIndexError(String),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    Xlsx,
    Docx,
}

impl DocumentKind {
    /// Determines the document kind from the file extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, DecodeError> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|extension| extension.to_str())
            .map(|extension| extension.to_ascii_lowercase());
        match extension.as_deref() {
            Some("xlsx") | Some("xlsm") => Ok(DocumentKind::Xlsx),
            Some("docx") => Ok(DocumentKind::Docx),
            _ => Err(DecodeError::UnsupportedDocument(path.display().to_string())),
        }
    }
}

/// Worksheet selection by glob patterns on sheet names.
#[derive(Clone, Debug, Default)]
pub struct SheetFilter {
    patterns: Option<Vec<Pattern>>,
}

impl SheetFilter {
    /// Creates a filter from glob patterns. No patterns accept every sheet.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, TableChunkerError> {
        if patterns.is_empty() {
            return Ok(SheetFilter::default());
        }
        let patterns = patterns
            .iter()
            .map(|pattern| Pattern::new(pattern.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SheetFilter {
            patterns: Some(patterns),
        })
    }

    /// Checks if a sheet name matches the filter patterns.
    /// Returns true if no patterns are specified or if the name matches any pattern.
    pub fn accept(&self, sheet_name: &str) -> bool {
        match &self.patterns {
            Some(patterns) => patterns.iter().any(|pattern| pattern.matches(sheet_name)),
            None => true,
        }
    }
}

/// Decodes every table of a document file.
///
/// # Arguments
///
/// * `path` - Path to a `.xlsx`, `.xlsm` or `.docx` file
/// * `filter` - Worksheet selection, ignored for `.docx`
///
/// # Returns
///
/// * `Result<Vec<RawTable>, TableChunkerError>` - Tables in document order
pub fn decode_file<P: AsRef<Path>>(path: P, filter: &SheetFilter) -> Result<Vec<RawTable>, TableChunkerError> {
    let path = path.as_ref();
    let name = path.display().to_string();
    let kind = DocumentKind::from_path(path)?;
    let reader = BufReader::new(File::open(path).map_err(TableChunkerError::from).with_prefix(&name)?);
    let tables = match kind {
        DocumentKind::Xlsx => xlsx::read_tables(reader, filter),
        DocumentKind::Docx => docx::read_tables(reader),
    }
    .with_prefix(&name)?;
    tracing::info!(file = %name, tables = tables.len(), "Document decoded");
    Ok(tables)
}
