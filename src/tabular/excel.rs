#![cfg(feature = "excel")]

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::{Duration, NaiveDate};

use crate::error::{ImportError, ImportResult};
use crate::pipeline::parse::format_date;
use crate::types::Sheet;

use super::SheetSelection;

/// Read one sheet of an Excel document (`.xlsx`, `.xls`, `.ods`, etc.) into a [`Sheet`].
///
/// Behavior:
/// - Picks the sheet named or indexed by `selection`; [`SheetSelection::First`] uses the first
///   sheet in the workbook
/// - Detects the first non-empty row as the header row
/// - Renders every cell as text: integral numbers without a fraction, date cells in the
///   pipeline date format
pub fn read_excel(bytes: &[u8], selection: &SheetSelection) -> ImportResult<Sheet> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet = match selection {
        SheetSelection::First => names.first().cloned(),
        SheetSelection::Named(name) => names.iter().find(|n| *n == name).cloned(),
        SheetSelection::Index(idx) => names.get(*idx).cloned(),
    }
    .ok_or_else(|| ImportError::NoReadableSheet {
        sheet: selection.label(),
    })?;

    let range = workbook.worksheet_range(&sheet)?;
    sheet_from_range(sheet, &range)
}

fn sheet_from_range(name: String, range: &calamine::Range<Data>) -> ImportResult<Sheet> {
    let mut header: Option<Vec<String>> = None;
    let mut data: Vec<Vec<String>> = Vec::new();

    for row in range.rows() {
        match header {
            None => {
                if row.iter().any(|c| !matches!(c, Data::Empty)) {
                    header = Some(row.iter().map(|c| cell_to_text(c).trim().to_owned()).collect());
                }
            }
            Some(_) => data.push(row.iter().map(cell_to_text).collect()),
        }
    }

    let header = header.ok_or(ImportError::EmptyDocument)?;
    Ok(Sheet::from_cells(Some(name), header, data))
}

fn cell_to_text(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => serial_to_date(dt.as_f64())
            .map(format_date)
            .unwrap_or_else(|| dt.as_f64().to_string()),
        Data::DateTimeIso(s) => s.split('T').next().unwrap_or(s).to_string(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
        Data::Empty => String::new(),
    }
}

/// Convert an Excel serial date (days since 1899-12-30, 1900 date system) to a calendar date.
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_signed(Duration::days(serial.floor() as i64))
}
