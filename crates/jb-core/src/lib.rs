//! jb-core: Core library for totalling Jamabandi land records
//!
//! This library provides functionality to:
//! - Parse pasted or exported record tables (tab, comma or semicolon separated)
//! - Convert each record's Kanal/Marla into Sarshai, the base unit
//! - Total a row set and decompose it into Kila, Kanal, Marla and Sarshai
//! - Export converted tables and JSON reports
//! - Run batch conversions over directories of record files

pub mod batch;
pub mod convert;
pub mod error;
pub mod export;
pub mod parser;
pub mod scanner;
pub mod table;
pub mod units;

pub use batch::{run_batch, BatchFile, BatchResult, FileSummary};
pub use convert::{convert_table, ColumnNames, Conversion, RawSum, RawTotals, DERIVED_COLUMN};
pub use error::{Error, Result};
pub use export::{export_csv, write_csv, Report};
pub use parser::{parse_file, parse_str, Delimiter};
pub use scanner::{scan_directory, RecordFile, ScanResult};
pub use table::{CellValue, Column, Row, Table};
pub use units::{Area, UnitSystem};
