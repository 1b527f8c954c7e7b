//! Write a batch of test cases out as CSV, JSON or an Excel workbook.

use std::fs;
use std::io;
use std::path::Path;

use rust_xlsxwriter::{Format, Workbook, XlsxError};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::testgen::case::{TestCase, COLUMNS};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Excel error: {0}")]
    Xlsx(#[from] XlsxError),
    #[error("unsupported export format `{0}` (use .csv, .json or .xlsx)")]
    UnsupportedFormat(String),
}

#[derive(Serialize)]
struct JsonExport<'a> {
    test_cases: &'a [TestCase],
}

/// Pick the writer from the file extension.
pub fn export(path: &Path, cases: &[TestCase]) -> Result<(), ExportError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match ext.as_str() {
        "csv" => write_csv(path, cases),
        "json" => write_json(path, cases),
        "xlsx" => write_xlsx(path, cases),
        other => Err(ExportError::UnsupportedFormat(other.to_string())),
    }
}

pub fn write_csv(path: &Path, cases: &[TestCase]) -> Result<(), ExportError> {
    ensure_parent(path)?;
    let mut w = csv::Writer::from_path(path)?;
    write_rows(&mut w, cases)?;
    w.flush()?;
    info!(path = %path.display(), count = cases.len(), "exported CSV");
    Ok(())
}

pub fn write_json(path: &Path, cases: &[TestCase]) -> Result<(), ExportError> {
    ensure_parent(path)?;
    let text = serde_json::to_string_pretty(&JsonExport { test_cases: cases })?;
    fs::write(path, text)?;
    info!(path = %path.display(), count = cases.len(), "exported JSON");
    Ok(())
}

const SHEET_NAME: &str = "Test Cases";
const COLUMN_WIDTHS: [f64; 8] = [12.0, 30.0, 40.0, 30.0, 50.0, 30.0, 40.0, 25.0];

/// One sheet: bold header row, then one wrapped row per case.
pub fn write_xlsx(path: &Path, cases: &[TestCase]) -> Result<(), ExportError> {
    ensure_parent(path)?;

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let wrap = Format::new().set_text_wrap();

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    for (col, (name, width)) in COLUMNS.iter().zip(COLUMN_WIDTHS).enumerate() {
        let col = col as u16;
        sheet.write_string_with_format(0, col, *name, &header)?;
        sheet.set_column_width(col, width)?;
    }
    for (row, case) in cases.iter().enumerate() {
        let row = row as u32 + 1;
        for (col, (_, value)) in case.to_row().iter().enumerate() {
            sheet.write_string_with_format(row, col as u16, value.as_str(), &wrap)?;
        }
    }

    workbook.save(path)?;
    info!(path = %path.display(), count = cases.len(), "exported Excel workbook");
    Ok(())
}

/// CSV into any writer. Headers are the human column names.
pub fn write_rows<W: io::Write>(w: &mut csv::Writer<W>, cases: &[TestCase]) -> Result<(), ExportError> {
    w.write_record(COLUMNS)?;
    for case in cases {
        w.write_record(case.to_row().iter().map(|(_, v)| v.as_str()))?;
    }
    Ok(())
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
