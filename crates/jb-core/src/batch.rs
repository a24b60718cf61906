//! Batch conversion of every record file under a set of directories

use crate::convert::{convert_table, ColumnNames, Conversion};
use crate::error::{Error, Result};
use crate::export::{export_csv, Report};
use crate::parser::{parse_file, Delimiter};
use crate::scanner::{scan_directory, RecordFile};
use crate::units::{Area, UnitSystem};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// A batch job description, stored as JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFile {
    /// Root directories to scan for record files
    pub roots: Vec<PathBuf>,
    /// Output directory for converted tables and reports
    pub output_dir: PathBuf,
    /// Area column names
    #[serde(default)]
    pub columns: ColumnNames,
    /// Field separator; detected per file when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<Delimiter>,
}

impl BatchFile {
    /// Load a batch file from JSON
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| Error::FileRead {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        serde_json::from_str(&content).map_err(Error::Json)
    }

    /// Save the batch file to JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

/// Outcome for one converted file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSummary {
    pub source: PathBuf,
    pub rows: usize,
    pub total_sarshai: i64,
    pub area: Area,
    /// Converted table written for this file
    pub table_path: PathBuf,
    /// JSON report written for this file
    pub report_path: PathBuf,
}

/// Result of running a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResult {
    /// Files that converted successfully
    pub converted: Vec<FileSummary>,
    /// Combined Sarshai across all converted files
    pub total_sarshai: i64,
    /// Combined area across all converted files
    pub area: Area,
    /// Files that failed (source path, error message)
    pub errors: Vec<(PathBuf, String)>,
}

/// Convert every record file named by a batch job
///
/// A failing file is recorded in `errors` and skipped; it does not stop the
/// batch, contribute to the combined total, or leave output files behind.
/// Files inside `output_dir` are never read as input, so earlier results are
/// not counted again when the output directory sits under a root.
pub fn run_batch(batch: &BatchFile, units: &UnitSystem) -> Result<BatchResult> {
    fs::create_dir_all(&batch.output_dir)?;
    let output_dir = canonical(&batch.output_dir);
    let scan = scan_directory(&batch.roots)?;

    let mut converted = Vec::new();
    let mut errors = Vec::new();
    let mut total_sarshai: i64 = 0;
    let mut used_names = HashSet::new();

    for file in &scan.files {
        let source = &file.path;
        if canonical(source).starts_with(&output_dir) {
            tracing::debug!(source = %source.display(), "skipping file in output directory");
            continue;
        }

        let conversion = match convert_source(batch, units, source) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(source = %source.display(), error = %e, "skipping file");
                errors.push((source.clone(), e.to_string()));
                continue;
            }
        };

        let combined = match total_sarshai.checked_add(conversion.total_sarshai) {
            Some(total) => total,
            None => {
                tracing::warn!(source = %source.display(), "combined total overflowed");
                errors.push((source.clone(), "combined total overflowed".to_string()));
                continue;
            }
        };

        let name = output_name(file, &mut used_names);
        match write_outputs(&batch.output_dir, &name, &conversion) {
            Ok((table_path, report_path)) => {
                total_sarshai = combined;
                converted.push(FileSummary {
                    source: source.clone(),
                    rows: conversion.row_count(),
                    total_sarshai: conversion.total_sarshai,
                    area: conversion.area,
                    table_path,
                    report_path,
                });
            }
            Err(e) => errors.push((source.clone(), e.to_string())),
        }
    }

    tracing::info!(
        converted = converted.len(),
        failed = errors.len(),
        total_sarshai,
        "batch complete"
    );

    Ok(BatchResult {
        converted,
        total_sarshai,
        area: units.from_base_units(total_sarshai),
        errors,
    })
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn convert_source(batch: &BatchFile, units: &UnitSystem, source: &Path) -> Result<Conversion> {
    let table = parse_file(source, batch.delimiter)?;
    convert_table(&table, units, &batch.columns)
}

/// Output name for a record file
///
/// The path below its root, extension dropped and separators turned into
/// `_`. A name already taken in this batch gets `_2`, `_3`, ... appended.
fn output_name(file: &RecordFile, used: &mut HashSet<String>) -> String {
    let base = file
        .relative_path()
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("_");
    let base = if base.is_empty() {
        "records".to_string()
    } else {
        base
    };

    let mut name = base.clone();
    let mut suffix = 2;
    while !used.insert(name.clone()) {
        name = format!("{}_{}", base, suffix);
        suffix += 1;
    }
    name
}

fn write_outputs(output_dir: &Path, name: &str, conversion: &Conversion) -> Result<(PathBuf, PathBuf)> {
    let table_path = output_dir.join(format!("{}_converted.csv", name));
    let report_path = output_dir.join(format!("{}_report.json", name));

    export_csv(&conversion.table, &table_path)?;
    Report::from_conversion(conversion).save(&report_path)?;

    Ok((table_path, report_path))
}
