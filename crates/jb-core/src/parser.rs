//! Delimited-text parser for land record tables
//!
//! Records arrive either as a CSV export or as text pasted straight out of
//! the registry portal, which is tab separated. The delimiter is detected
//! from the header line unless the caller names one.

use crate::error::{Error, Result};
use crate::table::{CellValue, Column, Row, Table};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Field separator of a delimited input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    Tab,
    Comma,
    Semicolon,
}

impl Delimiter {
    /// The separator byte handed to the csv reader
    pub fn as_byte(self) -> u8 {
        match self {
            Delimiter::Tab => b'\t',
            Delimiter::Comma => b',',
            Delimiter::Semicolon => b';',
        }
    }

    /// Pick the delimiter that occurs most often in a header line
    ///
    /// Tab wins ties, and a line without any separator is treated as tab
    /// separated.
    pub fn detect(header_line: &str) -> Self {
        let count = |d: Delimiter| header_line.bytes().filter(|&b| b == d.as_byte()).count();

        [Delimiter::Comma, Delimiter::Semicolon]
            .into_iter()
            .fold(Delimiter::Tab, |best, candidate| {
                if count(candidate) > count(best) {
                    candidate
                } else {
                    best
                }
            })
    }
}

impl FromStr for Delimiter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tab" | "\\t" | "\t" => Ok(Delimiter::Tab),
            "comma" | "," => Ok(Delimiter::Comma),
            "semicolon" | ";" => Ok(Delimiter::Semicolon),
            other => Err(format!(
                "unknown delimiter '{}', expected tab, comma or semicolon",
                other
            )),
        }
    }
}

/// Parse a delimited file into a Table
pub fn parse_file<P: AsRef<Path>>(path: P, delimiter: Option<Delimiter>) -> Result<Table> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    parse_text(&content, path.to_path_buf(), delimiter)
}

/// Parse delimited text (pasted data, stdin, tests) into a Table
pub fn parse_str(content: &str, source_name: &str, delimiter: Option<Delimiter>) -> Result<Table> {
    parse_text(content, PathBuf::from(source_name), delimiter)
}

fn parse_text(content: &str, path: PathBuf, delimiter: Option<Delimiter>) -> Result<Table> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let header_line = content
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or_default();
    let delimiter = delimiter.unwrap_or_else(|| Delimiter::detect(header_line));
    tracing::debug!(source = %path.display(), ?delimiter, "parsing table");

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true) // Allow varying number of fields
        .delimiter(delimiter.as_byte())
        .from_reader(content.as_bytes());

    // Parse headers into columns
    let headers = csv_reader.headers().map_err(|e| Error::Csv {
        path: path.clone(),
        source: e,
    })?;

    let columns: Vec<Column> = headers
        .iter()
        .enumerate()
        .map(|(i, name)| Column::new(name.trim().to_string(), i))
        .collect();

    if columns.iter().all(|c| c.name.is_empty()) {
        return Err(Error::Parse {
            path,
            message: "no columns found in input".to_string(),
        });
    }

    // Parse rows
    let mut rows = Vec::new();
    for (row_idx, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|e| Error::Csv {
            path: path.clone(),
            source: e,
        })?;

        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        let mut cells: Vec<CellValue> = record.iter().map(CellValue::parse).collect();

        // Pad with empty cells if row is shorter than header
        if cells.len() < columns.len() {
            cells.resize(columns.len(), CellValue::Empty);
        }

        if cells.len() > columns.len() {
            tracing::warn!(
                row = row_idx + 1,
                source = %path.display(),
                "row has more cells than columns, truncating"
            );
            cells.truncate(columns.len());
        }

        rows.push(Row::new(cells));
    }

    Ok(Table {
        columns,
        rows,
        source_path: path,
    })
}
