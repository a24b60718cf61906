//! C FFI bindings for jb-core
//!
//! This crate provides a C-compatible API for embedding the land-area
//! conversion in other applications.

use jb_core::{Area, ColumnNames, Report, UnitSystem};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

/// Opaque handle to a converted record table
pub struct FfiConversion {
    inner: jb_core::Conversion,
}

/// An area in Kila/Kanal/Marla/Sarshai, laid out for C
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JbArea {
    pub kila: i64,
    pub kanal: i64,
    pub marla: i64,
    pub sarshai: i64,
}

impl From<Area> for JbArea {
    fn from(area: Area) -> Self {
        Self {
            kila: area.kila,
            kanal: area.kanal,
            marla: area.marla,
            sarshai: area.sarshai,
        }
    }
}

/// Convert a Kanal/Marla pair into Sarshai
///
/// Saturates at the `i64` bounds on overflow.
#[no_mangle]
pub extern "C" fn jb_to_base_units(kanal: i64, marla: i64) -> i64 {
    let units = UnitSystem::JAMABANDI;
    let total = kanal as i128 * units.sarshai_per_kanal() as i128
        + marla as i128 * units.sarshai_per_marla as i128;
    total.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

/// Decompose a Sarshai count into Kila, Kanal, Marla and Sarshai
///
/// # Safety
/// - `out` must be a valid pointer to a `JbArea`
/// - Returns false if `out` is null
#[no_mangle]
pub unsafe extern "C" fn jb_from_base_units(total: i64, out: *mut JbArea) -> bool {
    if out.is_null() {
        return false;
    }
    *out = UnitSystem::JAMABANDI.from_base_units(total).into();
    true
}

/// Parse and convert a record file using the default `Kanal`/`Marla` columns
///
/// # Safety
/// - `path` must be a valid C string
/// - Returns null on error
#[no_mangle]
pub unsafe extern "C" fn jb_convert_file(path: *const c_char) -> *mut FfiConversion {
    if path.is_null() {
        return ptr::null_mut();
    }

    let path = match CStr::from_ptr(path).to_str() {
        Ok(s) => s,
        Err(_) => return ptr::null_mut(),
    };

    let table = match jb_core::parse_file(path, None) {
        Ok(t) => t,
        Err(_) => return ptr::null_mut(),
    };

    match jb_core::convert_table(&table, &UnitSystem::JAMABANDI, &ColumnNames::default()) {
        Ok(conversion) => Box::into_raw(Box::new(FfiConversion { inner: conversion })),
        Err(_) => ptr::null_mut(),
    }
}

/// Free a conversion
///
/// # Safety
/// - `conversion` must be a valid pointer returned by `jb_convert_file` or null
#[no_mangle]
pub unsafe extern "C" fn jb_free_conversion(conversion: *mut FfiConversion) {
    if !conversion.is_null() {
        drop(Box::from_raw(conversion));
    }
}

/// Get the number of converted rows
///
/// # Safety
/// - `conversion` must be a valid pointer returned by `jb_convert_file`
#[no_mangle]
pub unsafe extern "C" fn jb_conversion_row_count(conversion: *const FfiConversion) -> usize {
    if conversion.is_null() {
        return 0;
    }
    (*conversion).inner.row_count()
}

/// Get the Sarshai of a single row
///
/// # Safety
/// - `conversion` must be a valid pointer returned by `jb_convert_file`
/// - Returns 0 if the row is out of bounds
#[no_mangle]
pub unsafe extern "C" fn jb_conversion_row_sarshai(conversion: *const FfiConversion, row: usize) -> i64 {
    if conversion.is_null() {
        return 0;
    }
    (&(*conversion)
        .inner
        .row_base_units)
        .get(row)
        .copied()
        .unwrap_or(0)
}

/// Get the grand total in Sarshai
///
/// # Safety
/// - `conversion` must be a valid pointer returned by `jb_convert_file`
#[no_mangle]
pub unsafe extern "C" fn jb_conversion_total_sarshai(conversion: *const FfiConversion) -> i64 {
    if conversion.is_null() {
        return 0;
    }
    (*conversion).inner.total_sarshai
}

/// Get the grand total in Kila/Kanal/Marla/Sarshai
///
/// # Safety
/// - `conversion` must be a valid pointer returned by `jb_convert_file`
/// - `out` must be a valid pointer to a `JbArea`
#[no_mangle]
pub unsafe extern "C" fn jb_conversion_area(conversion: *const FfiConversion, out: *mut JbArea) -> bool {
    if conversion.is_null() || out.is_null() {
        return false;
    }
    *out = (*conversion).inner.area.into();
    true
}

/// Get the totals report as a JSON string
///
/// # Safety
/// - `conversion` must be a valid pointer returned by `jb_convert_file`
/// - Caller must free the returned string with `jb_free_string`
#[no_mangle]
pub unsafe extern "C" fn jb_conversion_report_json(conversion: *const FfiConversion) -> *mut c_char {
    if conversion.is_null() {
        return ptr::null_mut();
    }

    let report = Report::from_conversion(&(*conversion).inner);
    serde_json::to_string(&report)
        .ok()
        .and_then(|s| CString::new(s).ok())
        .map(|s| s.into_raw())
        .unwrap_or(ptr::null_mut())
}

/// Free a string returned by other FFI functions
///
/// # Safety
/// - `s` must be a valid pointer returned by a jb_* function or null
#[no_mangle]
pub unsafe extern "C" fn jb_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_to_base_units() {
        assert_eq!(jb_to_base_units(0, 19), 171);
        assert_eq!(jb_to_base_units(1, 2), 198);
        assert_eq!(jb_to_base_units(i64::MAX, 0), i64::MAX);
        assert_eq!(jb_to_base_units(i64::MIN, 0), i64::MIN);
    }

    #[test]
    fn test_from_base_units() {
        let mut area = JbArea::default();
        assert!(unsafe { jb_from_base_units(1630, &mut area) });
        assert_eq!(
            area,
            JbArea {
                kila: 1,
                kanal: 1,
                marla: 1,
                sarshai: 1
            }
        );
        assert!(!unsafe { jb_from_base_units(1630, ptr::null_mut()) });
    }

    #[test]
    fn test_convert_file() {
        let path = std::env::temp_dir().join(format!("jb-ffi-{}.tsv", std::process::id()));
        fs::write(&path, "Khasra\tKanal\tMarla\n0//303\t0\t19\n0//492\t0\t3\n").unwrap();
        let c_path = CString::new(path.to_str().unwrap()).unwrap();

        unsafe {
            let conversion = jb_convert_file(c_path.as_ptr());
            fs::remove_file(&path).unwrap();
            assert!(!conversion.is_null());

            assert_eq!(jb_conversion_row_count(conversion), 2);
            assert_eq!(jb_conversion_row_sarshai(conversion, 0), 171);
            assert_eq!(jb_conversion_row_sarshai(conversion, 5), 0);
            assert_eq!(jb_conversion_total_sarshai(conversion), 198);

            let mut area = JbArea::default();
            assert!(jb_conversion_area(conversion, &mut area));
            assert_eq!((area.kanal, area.marla), (1, 2));

            let json = jb_conversion_report_json(conversion);
            assert!(!json.is_null());
            let text = CStr::from_ptr(json).to_str().unwrap().to_owned();
            assert!(text.contains("\"total_sarshai\":198"));

            jb_free_string(json);
            jb_free_conversion(conversion);
        }
    }

    #[test]
    fn test_convert_missing_file_returns_null() {
        let c_path = CString::new("/nonexistent/records.csv").unwrap();
        assert!(unsafe { jb_convert_file(c_path.as_ptr()) }.is_null());
        assert!(unsafe { jb_convert_file(ptr::null()) }.is_null());
    }
}
