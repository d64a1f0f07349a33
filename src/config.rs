//! # Table Processing Configuration
//!
//! [`TableConfig`] is built once, before any table is processed, and then shared read-only.
//! It can come from defaults, a TOML document or environment variables. Enumerated settings
//! are parsed up front so an unknown format or strategy is rejected before processing starts.
use crate::error::TableChunkerError;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while reading configuration.
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Unsupported table format '{0}', expected 'html' or 'markdown'")]
    UnsupportedFormat(String),

    #[error("Unsupported chunking strategy '{0}', expected 'full_only' or 'full_and_rows'")]
    UnsupportedStrategy(String),

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

/// Rendering target of a table.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum TableFormat {
    Html,
    #[default]
    Markdown,
}

impl TableFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableFormat::Html => "html",
            TableFormat::Markdown => "markdown",
        }
    }
}

impl FromStr for TableFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "html" => Ok(TableFormat::Html),
            "markdown" | "md" => Ok(TableFormat::Markdown),
            _ => Err(ConfigError::UnsupportedFormat(value.to_owned())),
        }
    }
}

impl TryFrom<String> for TableFormat {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Display for TableFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which chunks are emitted per table.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "String")]
pub enum ChunkingStrategy {
    /// One `table_full` chunk
    #[default]
    FullOnly,
    /// One `table_full` chunk followed by one `table_row` chunk per data row
    FullAndRows,
}

impl ChunkingStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkingStrategy::FullOnly => "full_only",
            ChunkingStrategy::FullAndRows => "full_and_rows",
        }
    }
}

impl FromStr for ChunkingStrategy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "full_only" => Ok(ChunkingStrategy::FullOnly),
            "full_and_rows" => Ok(ChunkingStrategy::FullAndRows),
            _ => Err(ConfigError::UnsupportedStrategy(value.to_owned())),
        }
    }
}

impl TryFrom<String> for ChunkingStrategy {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Display for ChunkingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keywords that mark a row as header-like in content-pattern detection.
pub const DEFAULT_HEADER_KEYWORDS: &[&str] = &["年度", "年份", "学校", "名称", "情况", "人数", "合计", "备注"];

pub const DEFAULT_MAX_HEADER_ROWS: usize = 3;

pub const DEFAULT_MERGE_DENSITY_THRESHOLD: f64 = 0.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub table_format: TableFormat,
    pub table_chunking_strategy: ChunkingStrategy,
    pub enable_table_processing: bool,
    pub header_keywords: Vec<String>,
    /// Upper bound of rows examined by header detection
    pub max_header_rows: usize,
    /// Minimum share of header-shaped merges for a row to count as merge-pattern header
    pub merge_density_threshold: f64,
}

impl Default for TableConfig {
    fn default() -> Self {
        TableConfig {
            table_format: TableFormat::default(),
            table_chunking_strategy: ChunkingStrategy::default(),
            enable_table_processing: true,
            header_keywords: DEFAULT_HEADER_KEYWORDS.iter().map(|keyword| keyword.to_string()).collect(),
            max_header_rows: DEFAULT_MAX_HEADER_ROWS,
            merge_density_threshold: DEFAULT_MERGE_DENSITY_THRESHOLD,
        }
    }
}

impl TableConfig {
    /// Parses a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, TableChunkerError> {
        let config: TableConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TableChunkerError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Builds the configuration from `TABLE_*` environment variables on top of the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().merge_env(|key| env::var(key).ok())
    }

    /// Overrides settings with the values returned by `lookup` for the `TABLE_*` keys.
    /// Empty values are ignored.
    pub fn merge_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(value) = lookup("TABLE_FORMAT") {
            self.table_format = value.parse()?;
        }
        if let Some(value) = lookup("TABLE_CHUNKING_STRATEGY") {
            self.table_chunking_strategy = value.parse()?;
        }
        if let Some(value) = lookup("ENABLE_TABLE_PROCESSING") {
            self.enable_table_processing = parse_bool(&value).ok_or_else(|| ConfigError::InvalidValue {
                key: "ENABLE_TABLE_PROCESSING".to_owned(),
                value: value.clone(),
            })?;
        }
        if let Some(value) = lookup("TABLE_HEADER_KEYWORDS") {
            self.header_keywords = value
                .split([',', '，'])
                .map(str::trim)
                .filter(|keyword| !keyword.is_empty())
                .map(str::to_owned)
                .collect();
        }
        if let Some(value) = lookup("TABLE_MAX_HEADER_ROWS") {
            self.max_header_rows = value.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "TABLE_MAX_HEADER_ROWS".to_owned(),
                value: value.clone(),
            })?;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_header_rows == 0 {
            return Err(ConfigError::InvalidValue {
                key: "max_header_rows".to_owned(),
                value: self.max_header_rows.to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.merge_density_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "merge_density_threshold".to_owned(),
                value: self.merge_density_threshold.to_string(),
            });
        }
        Ok(())
    }

    pub fn log_summary(&self) {
        tracing::info!(
            format = %self.table_format,
            strategy = %self.table_chunking_strategy,
            enabled = self.enable_table_processing,
            keywords = self.header_keywords.len(),
            max_header_rows = self.max_header_rows,
            "Table config loaded"
        );
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
