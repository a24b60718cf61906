//! Row-set conversion: per-record Sarshai plus grand totals
//!
//! `records -> coerce cells -> per-row Sarshai -> sum -> decompose`

use crate::error::{Error, Result};
use crate::table::{CellValue, Table};
use crate::units::{Area, UnitSystem};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the column appended to the converted table
pub const DERIVED_COLUMN: &str = "Total_Sarshai";

/// Names of the area columns to read from a row set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnNames {
    pub kanal: String,
    pub marla: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            kanal: "Kanal".to_string(),
            marla: "Marla".to_string(),
        }
    }
}

/// Most decimal places a raw sum keeps
const MAX_SCALE: u32 = 24;

/// Exact decimal sum of one raw area column
///
/// Held as `units / 10^scale`. Fractional cells enter through their shortest
/// decimal form, so `0.1 + 0.2` sums to exactly `0.3`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct RawSum {
    units: i128,
    scale: u32,
}

impl RawSum {
    /// A whole-number sum
    pub fn whole(value: i64) -> Self {
        Self {
            units: value as i128,
            scale: 0,
        }
    }

    /// The exact decimal a parsed fractional cell was written as
    ///
    /// Returns `None` for values needing more than 24 decimal places.
    pub fn from_f64(value: f64) -> Option<Self> {
        value.to_string().parse().ok()
    }

    /// Add two sums, returning `None` on overflow
    pub fn checked_add(self, other: Self) -> Option<Self> {
        let scale = self.scale.max(other.scale);
        let lhs = self.units.checked_mul(10i128.checked_pow(scale - self.scale)?)?;
        let rhs = other.units.checked_mul(10i128.checked_pow(scale - other.scale)?)?;
        Some(
            Self {
                units: lhs.checked_add(rhs)?,
                scale,
            }
            .normalized(),
        )
    }

    /// The sum as an integer, if it has no fractional part and fits an `i64`
    pub fn as_whole(&self) -> Option<i64> {
        if self.is_whole() {
            i64::try_from(self.units).ok()
        } else {
            None
        }
    }

    /// True if the sum has no fractional part
    pub fn is_whole(&self) -> bool {
        self.scale == 0
    }

    fn normalized(mut self) -> Self {
        while self.scale > 0 && self.units % 10 == 0 {
            self.units /= 10;
            self.scale -= 1;
        }
        self
    }
}

impl fmt::Display for RawSum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_whole() {
            return write!(f, "{}", self.units);
        }

        let scale = self.scale as usize;
        let digits = format!("{:0>width$}", self.units.unsigned_abs(), width = scale + 1);
        let (int, frac) = digits.split_at(digits.len() - scale);
        let sign = if self.units < 0 { "-" } else { "" };
        write!(f, "{}{}.{}", sign, int, frac)
    }
}

impl FromStr for RawSum {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        let (int, frac) = digits.split_once('.').unwrap_or((digits, ""));

        if (int.is_empty() && frac.is_empty())
            || !int.chars().chain(frac.chars()).all(|c| c.is_ascii_digit())
        {
            return Err(format!("invalid decimal '{}'", s));
        }
        if frac.len() > MAX_SCALE as usize {
            return Err(format!("decimal '{}' has too many places", s));
        }

        let units: i128 = format!("{}{}", int, frac)
            .parse()
            .map_err(|_| format!("decimal '{}' out of range", s))?;

        Ok(Self {
            units: if negative { -units } else { units },
            scale: frac.len() as u32,
        }
        .normalized())
    }
}

impl From<RawSum> for String {
    fn from(sum: RawSum) -> Self {
        sum.to_string()
    }
}

impl TryFrom<String> for RawSum {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        s.parse()
    }
}

/// Column sums before conversion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTotals {
    pub kanal: RawSum,
    pub marla: RawSum,
}

/// Result of converting a row set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversion {
    /// Copy of the input with the `Total_Sarshai` column appended
    pub table: Table,
    /// Sarshai for each row, in row order
    pub row_base_units: Vec<i64>,
    /// Sums of the raw Kanal and Marla columns
    pub raw: RawTotals,
    /// Grand total in Sarshai
    pub total_sarshai: i64,
    /// Grand total in Kila/Kanal/Marla/Sarshai
    pub area: Area,
    /// Non-numeric or empty area cells that were read as 0
    pub coerced_cells: usize,
    /// Rows whose fractional area was rounded to a whole Sarshai
    pub rounded_rows: usize,
}

impl Conversion {
    /// Number of converted rows
    pub fn row_count(&self) -> usize {
        self.row_base_units.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Amount {
    Whole(i64),
    Fraction(f64),
}

impl Amount {
    fn as_f64(self) -> f64 {
        match self {
            Amount::Whole(i) => i as f64,
            Amount::Fraction(f) => f,
        }
    }

    fn is_negative(self) -> bool {
        self.as_f64() < 0.0
    }
}

/// Read an area cell, returning `None` when it has to be coerced to 0
fn read_amount(cell: Option<&CellValue>) -> Option<Amount> {
    match cell {
        Some(CellValue::Integer(i)) => Some(Amount::Whole(*i)),
        Some(CellValue::Float(f)) => Some(Amount::Fraction(*f)),
        _ => None,
    }
}

fn add_raw(sum: &mut RawSum, amount: Amount, row: usize) -> Result<()> {
    let cell = match amount {
        Amount::Whole(i) => Some(RawSum::whole(i)),
        Amount::Fraction(f) => RawSum::from_f64(f),
    };
    *sum = cell
        .and_then(|cell| sum.checked_add(cell))
        .ok_or(Error::Overflow { row })?;
    Ok(())
}

/// Convert every record of a row set and total the result
///
/// Fails before computing anything if either area column is missing.
/// Unreadable cells never fail the batch; they count as 0.
pub fn convert_table(table: &Table, units: &UnitSystem, names: &ColumnNames) -> Result<Conversion> {
    let kanal_col = table.find_column(&names.kanal).map(|c| c.index);
    let marla_col = table.find_column(&names.marla).map(|c| c.index);

    let (kanal_col, marla_col) = match (kanal_col, marla_col) {
        (Some(k), Some(m)) => (k, m),
        (k, m) => {
            let mut missing = Vec::new();
            if k.is_none() {
                missing.push(names.kanal.clone());
            }
            if m.is_none() {
                missing.push(names.marla.clone());
            }
            return Err(Error::MissingColumns { missing });
        }
    };

    let mut raw = RawTotals::default();
    let mut row_base_units = Vec::with_capacity(table.row_count());
    let mut total_sarshai: i64 = 0;
    let mut coerced_cells = 0;
    let mut rounded_rows = 0;

    for (idx, row) in table.rows.iter().enumerate() {
        let row_no = idx + 1;

        let mut read = |col: usize, name: &str| -> Amount {
            let cell = row.get(col);
            read_amount(cell).unwrap_or_else(|| {
                coerced_cells += 1;
                match cell {
                    Some(CellValue::String(s)) => {
                        tracing::warn!(row = row_no, column = name, value = %s, "non-numeric area cell read as 0");
                    }
                    _ => tracing::trace!(row = row_no, column = name, "empty area cell read as 0"),
                }
                Amount::Whole(0)
            })
        };
        let kanal = read(kanal_col, &names.kanal);
        let marla = read(marla_col, &names.marla);

        if kanal.is_negative() || marla.is_negative() {
            tracing::warn!(row = row_no, kanal = kanal.as_f64(), marla = marla.as_f64(), "negative area");
        }

        add_raw(&mut raw.kanal, kanal, row_no)?;
        add_raw(&mut raw.marla, marla, row_no)?;

        let base = match (kanal, marla) {
            (Amount::Whole(k), Amount::Whole(m)) => units.checked_to_base_units(k, m),
            _ => units
                .to_base_units_rounded(kanal.as_f64(), marla.as_f64())
                .map(|(sarshai, rounded)| {
                    if rounded {
                        rounded_rows += 1;
                        tracing::warn!(row = row_no, sarshai, "fractional area rounded to whole Sarshai");
                    }
                    sarshai
                }),
        }
        .ok_or(Error::Overflow { row: row_no })?;

        total_sarshai = total_sarshai
            .checked_add(base)
            .ok_or(Error::Overflow { row: row_no })?;
        row_base_units.push(base);
    }

    let area = units.from_base_units(total_sarshai);

    let mut converted = table.clone();
    converted.push_column(
        DERIVED_COLUMN,
        row_base_units.iter().map(|&s| CellValue::Integer(s)),
    );

    tracing::debug!(
        source = %table.source_path.display(),
        rows = row_base_units.len(),
        total_sarshai,
        coerced_cells,
        "converted table"
    );

    Ok(Conversion {
        table: converted,
        row_base_units,
        raw,
        total_sarshai,
        area,
        coerced_cells,
        rounded_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;

    const UNITS: UnitSystem = UnitSystem::JAMABANDI;

    fn convert(csv: &str) -> Result<Conversion> {
        let table = parse_str(csv, "test.csv", None).unwrap();
        convert_table(&table, &UNITS, &ColumnNames::default())
    }

    #[test]
    fn test_convert_portal_example() {
        let text = "Khewat\tKhatoni\tKhasra\tType of Land\tSource of Irrigation\tKanal\tMarla\n\
                    594\t846\t0//303\tप्लाट\t\t0\t19\n\
                    594\t846\t0//492\tगढडे\t\t0\t3\n";
        let result = convert(text).unwrap();

        assert_eq!(result.row_base_units, vec![171, 27]);
        assert_eq!(result.total_sarshai, 198);
        assert_eq!(
            result.area,
            Area {
                kila: 0,
                kanal: 1,
                marla: 2,
                sarshai: 0
            }
        );
        assert_eq!(result.raw.kanal.as_whole(), Some(0));
        assert_eq!(result.raw.marla.as_whole(), Some(22));
        assert_eq!(result.coerced_cells, 0);
    }

    #[test]
    fn test_derived_column_appended_without_touching_input() {
        let table = parse_str("Khasra,Kanal,Marla\n1//2,1,0\n", "test.csv", None).unwrap();
        let result = convert_table(&table, &UNITS, &ColumnNames::default()).unwrap();

        assert_eq!(table.column_count(), 3);
        assert_eq!(result.table.column_count(), 4);
        assert_eq!(result.table.columns[3].name, DERIVED_COLUMN);
        assert_eq!(result.table.rows[0].cells[3], CellValue::Integer(180));
        assert_eq!(result.table.rows[0].cells[1], CellValue::Integer(1));
    }

    #[test]
    fn test_non_numeric_cells_coerce_to_zero() {
        let result = convert("Kanal,Marla\n2,\nabc,4\n1,x\n").unwrap();

        assert_eq!(result.row_base_units, vec![360, 36, 180]);
        assert_eq!(result.coerced_cells, 3);
        assert_eq!(result.raw.kanal.as_whole(), Some(3));
        assert_eq!(result.raw.marla.as_whole(), Some(4));
    }

    #[test]
    fn test_short_row_coerces_missing_cell() {
        let result = convert("Kanal,Marla\n5\n").unwrap();
        assert_eq!(result.row_base_units, vec![900]);
        assert_eq!(result.coerced_cells, 1);
    }

    #[test]
    fn test_missing_marla_column_rejects_batch() {
        let err = convert("Khasra,Kanal\n1//1,4\n").unwrap_err();
        match err {
            Error::MissingColumns { missing } => assert_eq!(missing, vec!["Marla".to_string()]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_both_columns_names_both() {
        let err = convert("Khasra,Area\n1//1,4\n").unwrap_err();
        match err {
            Error::MissingColumns { missing } => {
                assert_eq!(missing, vec!["Kanal".to_string(), "Marla".to_string()])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_custom_column_names() {
        let table = parse_str("K,M\n1,1\n", "test.csv", None).unwrap();
        let names = ColumnNames {
            kanal: "K".to_string(),
            marla: "M".to_string(),
        };
        let result = convert_table(&table, &UNITS, &names).unwrap();
        assert_eq!(result.total_sarshai, 189);
    }

    #[test]
    fn test_empty_row_set() {
        let result = convert("Kanal,Marla\n").unwrap();
        assert_eq!(result.row_count(), 0);
        assert_eq!(result.total_sarshai, 0);
        assert_eq!(result.area, Area::default());
        assert_eq!(result.raw, RawTotals::default());
    }

    #[test]
    fn test_fractional_cells_round_per_row() {
        let result = convert("Kanal,Marla\n0,0.5\n0.5,0\n1,1.0\n").unwrap();

        // 4.5 rounds away from zero
        assert_eq!(result.row_base_units, vec![5, 90, 189]);
        assert_eq!(result.rounded_rows, 1);
        assert_eq!(result.raw.marla.as_whole(), None);
        assert_eq!(result.raw.kanal.to_string(), "1.5");
        assert_eq!(result.raw.marla.to_string(), "1.5");
    }

    #[test]
    fn test_negative_cells_pass_through() {
        let result = convert("Kanal,Marla\n2,0\n-1,0\n").unwrap();
        assert_eq!(result.row_base_units, vec![360, -180]);
        assert_eq!(result.total_sarshai, 180);
        assert_eq!(result.area.kanal, 1);
    }

    #[test]
    fn test_overflow_is_reported() {
        let csv = format!("Kanal,Marla\n{},0\n", i64::MAX / 100);
        let err = convert(&csv).unwrap_err();
        assert!(matches!(err, Error::Overflow { row: 1 }));
    }

    #[test]
    fn test_row_sum_matches_converted_column_sums() {
        let mut csv = String::from("Kanal,Marla\n");
        for i in 0..100 {
            csv.push_str(&format!("{},{}\n", i % 9, (i * 3) % 23));
        }
        let result = convert(&csv).unwrap();

        let from_raw = UNITS.to_base_units(
            result.raw.kanal.as_whole().unwrap(),
            result.raw.marla.as_whole().unwrap(),
        );
        assert_eq!(result.total_sarshai, from_raw);
        assert_eq!(result.row_base_units.iter().sum::<i64>(), result.total_sarshai);
        assert_eq!(result.area.to_base_units(&UNITS), result.total_sarshai);
    }

    #[test]
    fn test_raw_sum_display() {
        let whole = RawSum::whole(22);
        assert_eq!(whole.to_string(), "22");
        assert!(whole.is_whole());

        assert_eq!("0.05".parse::<RawSum>().unwrap().to_string(), "0.05");
        assert_eq!("-1.50".parse::<RawSum>().unwrap().to_string(), "-1.5");
        assert_eq!("-0.25".parse::<RawSum>().unwrap().to_string(), "-0.25");
        assert_eq!("3.0".parse::<RawSum>().unwrap(), RawSum::whole(3));
        assert!("1.2.3".parse::<RawSum>().is_err());
        assert!("abc".parse::<RawSum>().is_err());
    }

    #[test]
    fn test_fractional_raw_sums_are_exact() {
        let result = convert("Kanal,Marla
0,0.1
0,0.2
0.7,0
1.1,0
").unwrap();

        assert_eq!(result.raw.marla.to_string(), "0.3");
        assert_eq!(result.raw.kanal.to_string(), "1.8");
    }

    #[test]
    fn test_raw_sum_checked_add() {
        let tenth = RawSum::from_f64(0.1).unwrap();
        let sum = tenth.checked_add(RawSum::from_f64(0.9).unwrap()).unwrap();
        assert_eq!(sum, RawSum::whole(1));
        assert_eq!(sum.as_whole(), Some(1));

        let max = RawSum::whole(i64::MAX);
        assert_eq!(max.checked_add(max).unwrap().as_whole(), None);
        assert!(RawSum::from_f64(1e-30).is_none());
    }

    #[test]
    fn test_raw_totals_serialize_as_decimal_strings() {
        let result = convert("Kanal,Marla
0,0.1
2,0.2
").unwrap();
        let json = serde_json::to_string(&result.raw).unwrap();
        assert_eq!(json, r#"{"kanal":"2","marla":"0.3"}"#);

        let back: RawTotals = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result.raw);
    }
}
