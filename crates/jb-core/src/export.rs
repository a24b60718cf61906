//! Export of converted tables and totals
//!
//! This module provides:
//! - CSV export of a converted table, derived column included
//! - A JSON report holding the raw and converted totals

use crate::convert::{Conversion, RawTotals};
use crate::error::{Error, Result};
use crate::table::Table;
use crate::units::Area;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Write a table as comma separated values
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let csv_err = |e: csv::Error| Error::Csv {
        path: table.source_path.clone(),
        source: e,
    };

    csv_writer
        .write_record(table.columns.iter().map(|c| c.name.as_str()))
        .map_err(csv_err)?;

    for row in &table.rows {
        csv_writer
            .write_record(row.cells.iter().map(|c| c.to_string_value()))
            .map_err(csv_err)?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Write a table to a CSV file
pub fn export_csv<P: AsRef<Path>>(table: &Table, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    write_csv(table, BufWriter::new(file))
}

/// Summary of one conversion, saved alongside the exported table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Input the totals were computed from
    pub source: PathBuf,
    /// When the report was generated
    pub generated_at: DateTime<Utc>,
    /// Number of records converted
    pub rows: usize,
    /// Column sums before conversion
    pub raw: RawTotals,
    /// Grand total in Sarshai
    pub total_sarshai: i64,
    /// Grand total in Kila/Kanal/Marla/Sarshai
    pub area: Area,
    /// Area cells read as 0
    pub coerced_cells: usize,
    /// Rows rounded to a whole Sarshai
    pub rounded_rows: usize,
}

impl Report {
    /// Build a report from a finished conversion
    pub fn from_conversion(conversion: &Conversion) -> Self {
        Self {
            source: conversion.table.source_path.clone(),
            generated_at: Utc::now(),
            rows: conversion.row_count(),
            raw: conversion.raw,
            total_sarshai: conversion.total_sarshai,
            area: conversion.area,
            coerced_cells: conversion.coerced_cells,
            rounded_rows: conversion.rounded_rows,
        }
    }

    /// Save the report as pretty JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
