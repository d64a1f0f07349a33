//! table-chunker: decodes the tables of a `.xlsx` or `.docx` document and prints their chunks
//! as JSON lines on stdout. Logs go to stderr.

use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use table_chunker::{
    decode_file, process_document, ChunkingStrategy, SheetFilter, TableConfig, TableFormat,
};

// ── CLI ─────────────────────────────────────────────────────────────

/// Recover table structure from office documents and emit retrieval chunks.
#[derive(Parser, Debug)]
#[command(name = "table-chunker", version, about)]
struct Cli {
    /// Document to process (.xlsx, .xlsm or .docx).
    file: PathBuf,

    /// Document identifier used in chunk ids. Defaults to the file stem.
    #[arg(long)]
    doc_id: Option<String>,

    /// Path to a TOML config file. `TABLE_*` environment variables override it.
    #[arg(long, env = "TABLE_CHUNKER_CONFIG")]
    config: Option<PathBuf>,

    /// Rendering format: html or markdown.
    #[arg(long)]
    format: Option<TableFormat>,

    /// Chunking strategy: full_only or full_and_rows.
    #[arg(long)]
    strategy: Option<ChunkingStrategy>,

    /// Worksheet name glob, repeatable. Every sheet is read when omitted.
    #[arg(long = "sheet")]
    sheets: Vec<String>,

    /// Print the whole document report as one JSON object instead of chunk lines.
    #[arg(long)]
    report: bool,
}

fn load_config(cli: &Cli) -> anyhow::Result<TableConfig> {
    let mut config = match &cli.config {
        Some(path) => TableConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?
            .merge_env(|key| std::env::var(key).ok())?,
        None => TableConfig::from_env()?,
    };
    if let Some(format) = cli.format {
        config.table_format = format;
    }
    if let Some(strategy) = cli.strategy {
        config.table_chunking_strategy = strategy;
    }
    Ok(config)
}

// ── main ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    config.log_summary();

    let doc_id = match &cli.doc_id {
        Some(doc_id) => doc_id.clone(),
        None => cli
            .file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .context("cannot derive a document id from the file name, pass --doc-id")?,
    };

    let filter = SheetFilter::new(&cli.sheets)?;
    let tables = decode_file(&cli.file, &filter)?;
    let report = process_document(&doc_id, &tables, &config);

    let mut out = BufWriter::new(std::io::stdout().lock());
    if cli.report {
        serde_json::to_writer_pretty(&mut out, &report)?;
        writeln!(out)?;
    } else {
        for chunk in &report.chunks {
            serde_json::to_writer(&mut out, chunk)?;
            writeln!(out)?;
        }
    }
    out.flush()?;

    for skipped in &report.skipped {
        info!(table_id = %skipped.table_id, reason = %skipped.reason, "skipped table");
    }
    info!(
        doc_id = %report.doc_id,
        tables = tables.len(),
        chunks = report.chunks.len(),
        "done"
    );
    Ok(())
}
