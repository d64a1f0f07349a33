use thiserror::Error;

/// Main error type for the table chunker.
/// Aggregates errors from the standard library, dependencies, decoders and the engine itself.
#[derive(Error, Debug)]
pub enum TableChunkerError {
    #[error("{0}")]
    WithContextError(String),

    // Engine errors
    /// Raw grid is empty or inconsistent with its declared dimensions.
    #[error("Malformed table '{table_id}': {reason}")]
    MalformedTable { table_id: String, reason: String },

    /// Every row of the table was classified as header, nothing is left to chunk.
    #[error("Table '{0}' has no data rows below its header")]
    HeaderOnlyTable(String),

    // Standard library errors
    #[error("{0}")]
    IoError(#[from] std::io::Error),

    #[error("{0}")]
    ParseIntError(#[from] std::num::ParseIntError),

    #[error("{0}")]
    StringEncodingError(#[from] std::str::Utf8Error),

    #[error("{0}")]
    PatternError(#[from] glob::PatternError),

    // Third-party library errors
    #[error("{0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("{0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("{0}")]
    XmlEncodingError(#[from] quick_xml::encoding::EncodingError),

    #[error("{0}")]
    XmlAttributeError(#[from] quick_xml::events::attributes::AttrError),

    #[error("{0}")]
    TomlError(#[from] toml::de::Error),

    // Helper module errors
    #[error("{0}")]
    XmlHelperError(#[from] crate::helpers::xml::XmlError),

    #[error("{0}")]
    ReferenceError(#[from] crate::grid::reference::ReferenceError),

    // Configuration and decoder errors
    #[error("{0}")]
    ConfigError(#[from] crate::config::ConfigError),

    #[error("{0}")]
    DecodeError(#[from] crate::decode::DecodeError),
}

impl TableChunkerError {
    /// Builds a [`TableChunkerError::MalformedTable`] for the given table.
    pub(crate) fn malformed(table_id: &str, reason: impl Into<String>) -> Self {
        Self::MalformedTable {
            table_id: table_id.to_owned(),
            reason: reason.into(),
        }
    }
}

pub(crate) trait ResultMessage {
    fn with_prefix(self, message: &str) -> Self;
}

impl<T> ResultMessage for Result<T, TableChunkerError> {
    fn with_prefix(self, message: &str) -> Self {
        self.map_err(|e| TableChunkerError::WithContextError(format!("{}: {}", message, e)))
    }
}
