//! CSV word lists.
//!
//! # Format
//! ```text
//! word,pinyin,meaning,example,audioLink
//! 你好,nǐ hǎo,hello,你好吗？,https://cdn.example.com/nihao.mp3
//! 谢谢,xiè xie,thank you,,
//! ```
//!
//! The header row is required. Column order is free and extra columns are
//! carried through to the importer untouched.
//!
//! Rows are numbered by record: the first record after the header is row 1.
//! Blank lines are skipped and a quoted field may span several lines, so a
//! row number is not a file line; [`CsvRows::line_of`] maps one to the other.

use vocab_core::{check_headers, ImportError, ImportOptions, RawRow};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parsed CSV content.
#[derive(Debug, Clone)]
pub struct CsvRows {
    pub headers: Vec<String>,
    pub rows: Vec<RawRow>,
    /// File line (1-based) each row starts on.
    pub lines: Vec<u64>,
}

impl CsvRows {
    /// File line of the 1-based `row`.
    pub fn line_of(&self, row: usize) -> Option<u64> {
        self.lines.get(row.checked_sub(1)?).copied()
    }
}

/// Parse a CSV word list into raw rows.
///
/// Oversized input is rejected before parsing and a missing required column
/// rejects the file before any row is read.
pub fn read_csv(bytes: &[u8], options: &ImportOptions) -> Result<CsvRows, ImportError> {
    options.check_size(bytes.len())?;
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ImportError::Malformed {
            row: 0,
            message: e.to_string(),
        })?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();
    check_headers(&headers)?;

    let mut rows = Vec::new();
    let mut lines = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ImportError::Malformed {
            row: idx + 1,
            message: e.to_string(),
        })?;

        lines.push(record.position().map_or(0, |pos| pos.line()));

        let mut row = RawRow::new();
        for (col, value) in record.iter().enumerate() {
            match headers.get(col) {
                Some(name) => row.push(name.as_str(), value),
                None => row.push(format!("column{}", col + 1), value),
            }
        }
        rows.push(row);
    }

    tracing::debug!(rows = rows.len(), columns = headers.len(), "parsed csv word list");
    Ok(CsvRows {
        headers,
        rows,
        lines,
    })
}
